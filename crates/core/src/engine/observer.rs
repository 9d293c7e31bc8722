use std::sync::Arc;

use crate::{request::UssdRequest, response::UssdResponse, session::Session};

/// Lifecycle notifications. All methods default to no-ops.
///
/// Observers run inline on the turn and must not block.
pub trait RequestObserver: Send + Sync {
    /// Called before the chain runs.
    fn before_request(&self, _request: &UssdRequest) {}

    /// Called with the response actually returned to the transport.
    fn after_request(&self, _request: &UssdRequest, _response: &UssdResponse) {}

    /// A session was loaded or created for the turn.
    fn session_opened(&self, _session: &Session) {}

    /// A session was written back after a successful turn.
    fn session_saved(&self, _session: &Session) {}
}

#[derive(Clone, Default)]
pub(crate) struct Observers(Arc<Vec<Arc<dyn RequestObserver>>>);

impl Observers {
    pub(crate) fn new(observers: Vec<Arc<dyn RequestObserver>>) -> Self {
        Self(Arc::new(observers))
    }

    pub(crate) fn before_request(&self, request: &UssdRequest) {
        self.0.iter().for_each(|o| o.before_request(request));
    }

    pub(crate) fn after_request(&self, request: &UssdRequest, response: &UssdResponse) {
        self.0.iter().for_each(|o| o.after_request(request, response));
    }

    pub(crate) fn session_opened(&self, session: &Session) {
        self.0.iter().for_each(|o| o.session_opened(session));
    }

    pub(crate) fn session_saved(&self, session: &Session) {
        self.0.iter().for_each(|o| o.session_saved(session));
    }
}
