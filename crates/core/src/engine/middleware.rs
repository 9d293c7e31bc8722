use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use async_trait::async_trait;
use tracing::{debug, info, info_span, warn, Instrument};

use super::dispatch::Dispatcher;
use crate::{
    error::{EngineError, Result},
    request::UssdRequest,
    response::UssdResponse,
};

type LayerFuture<'a> = Pin<Box<dyn Future<Output = Result<UssdResponse>> + Send + 'a>>;

/// Wraps every turn.
///
/// The first middleware installed sits closest to the dispatcher.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Process a request, calling `next` to continue inward.
    async fn handle(&self, request: &mut UssdRequest, next: Next<'_>) -> Result<UssdResponse> {
        next.run(request).await
    }

    /// Offer a response for an error raised further in. `None` declines.
    fn process_exception(&self, _request: &UssdRequest, _error: &EngineError) -> Option<UssdResponse> {
        None
    }
}

/// The remaining inner layers of the chain.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    chain: &'a Chain,
    layer: usize,
}

impl<'a> Next<'a> {
    /// Hands the request to the next layer.
    pub async fn run(self, request: &mut UssdRequest) -> Result<UssdResponse> {
        self.chain.call(self.layer, request).await
    }
}

/// Dispatcher wrapped by the configured middleware.
///
/// Layer 0 is the dispatcher, layer `i` is middleware `i - 1`. An error
/// leaving layer `i` is offered to the exception hooks of middleware `i..`,
/// so the dispatcher's errors reach every hook and a middleware's own errors
/// only reach the layers around it.
pub(crate) struct Chain {
    dispatcher: Dispatcher,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl Chain {
    pub(crate) fn new(dispatcher: Dispatcher, middleware: Vec<Arc<dyn Middleware>>) -> Self {
        Self {
            dispatcher,
            middleware,
        }
    }

    pub(crate) async fn run(&self, request: &mut UssdRequest) -> Result<UssdResponse> {
        self.call(self.middleware.len(), request).await
    }

    fn call<'a>(&'a self, layer: usize, request: &'a mut UssdRequest) -> LayerFuture<'a> {
        Box::pin(async move {
            let result = match layer.checked_sub(1) {
                None => self.dispatcher.dispatch(request).await,
                Some(index) => {
                    let next = Next {
                        chain: self,
                        layer: index,
                    };
                    self.middleware[index].handle(request, next).await
                }
            };

            match result {
                Ok(response) => Ok(response),
                Err(error) => {
                    for middleware in &self.middleware[layer..] {
                        if let Some(response) = middleware.process_exception(request, &error) {
                            debug!(layer, error = %error, "Error handled by middleware");
                            return Ok(response);
                        }
                    }
                    Err(error)
                }
            }
        })
    }
}

/// Opens a span per turn and logs its outcome and duration.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMiddleware;

#[async_trait]
impl Middleware for TracingMiddleware {
    async fn handle(&self, request: &mut UssdRequest, next: Next<'_>) -> Result<UssdResponse> {
        let span = info_span!(
            "ussd_turn",
            msisdn = %request.msisdn(),
            session_id = %request.session_id(),
        );
        let started = std::time::Instant::now();
        let input = request.input().as_raw();
        let result = next.run(request).instrument(span).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(response) => info!(
                msisdn = %request.msisdn(),
                input = %input,
                status = %response.status,
                elapsed_ms,
                "Handled turn"
            ),
            Err(error) => warn!(
                msisdn = %request.msisdn(),
                input = %input,
                error = %error,
                elapsed_ms,
                "Turn failed"
            ),
        }
        result
    }
}

/// Retries turns that failed because the session backend was unavailable.
///
/// A failed turn never persists anything, so running it again is safe.
#[derive(Debug, Clone, Copy)]
pub struct StoreRetryMiddleware {
    attempts: usize,
    backoff: Duration,
}

impl StoreRetryMiddleware {
    /// `attempts` counts the first try.
    pub fn new(attempts: usize, backoff: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            backoff,
        }
    }
}

impl Default for StoreRetryMiddleware {
    fn default() -> Self {
        Self::new(2, Duration::from_millis(50))
    }
}

#[async_trait]
impl Middleware for StoreRetryMiddleware {
    async fn handle(&self, request: &mut UssdRequest, next: Next<'_>) -> Result<UssdResponse> {
        let mut attempt = 1;
        loop {
            match next.run(request).await {
                Err(error) if error.is_store_unavailable() && attempt < self.attempts => {
                    warn!(attempt, error = %error, "Session store unavailable, retrying");
                    request.session = None;
                    attempt += 1;
                    tokio::time::sleep(self.backoff).await;
                }
                result => return result,
            }
        }
    }
}
