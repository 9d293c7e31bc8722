//! Dial-code routing across several applications.

use std::sync::Arc;

use tracing::debug;

use crate::{
    app::UssdApp,
    error::{ConfigurationError, InputError},
    input::{IntoSegments, RequestData, SegmentSequence},
    request::{UssdRequest, SERVICE_CODE},
    response::UssdResponse,
    session::SessionKey,
};

/// Maps dial codes, optionally below a shared base code, to applications.
#[derive(Default)]
pub struct AppRouter {
    base: Option<SegmentSequence>,
    routes: Vec<(SegmentSequence, Arc<UssdApp>)>,
}

/// A matched route.
pub struct Route<'a> {
    /// Application owning the matched code.
    pub app: &'a Arc<UssdApp>,
    /// Full code that selected the app, base code included.
    pub code: SegmentSequence,
}

impl AppRouter {
    /// Router with no base code.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only input starting with `base` is routed; route codes follow it.
    pub fn with_base(base: impl IntoSegments) -> Self {
        Self {
            base: Some(SegmentSequence::from_segments(base.into_segments())),
            routes: Vec::new(),
        }
    }

    /// Mounts `app` under `code`. Codes must be unique.
    pub fn route(
        &mut self,
        code: impl IntoSegments,
        app: Arc<UssdApp>,
    ) -> Result<&mut Self, ConfigurationError> {
        let code = SegmentSequence::from_segments(code.into_segments());
        if self.routes.iter().any(|(existing, _)| *existing == code) {
            return Err(ConfigurationError::Invalid(format!(
                "code '{code}' is already routed"
            )));
        }
        debug!(code = %code, app = %app.name(), "Added route");
        self.routes.push((code, app));
        Ok(self)
    }

    /// Pick the longest route code that prefixes `raw`.
    pub fn resolve(&self, raw: &str) -> Option<Route<'_>> {
        let input = SegmentSequence::parse(raw);
        let offset = match &self.base {
            Some(base) if input.starts_with(base) => base.len(),
            Some(_) => return None,
            None => 0,
        };
        let rest = SegmentSequence::from_segments(input.iter().skip(offset));

        let (code, app) = self
            .routes
            .iter()
            .filter(|(code, _)| rest.starts_with(code))
            .max_by_key(|(code, _)| code.len())?;

        let full = SegmentSequence::from_segments(input.iter().take(offset + code.len()));
        Some(Route { app, code: full })
    }

    /// Route and run a turn. The route code is split off as the service code.
    pub async fn handle(
        &self,
        msisdn: &str,
        session_id: &str,
        raw: &str,
    ) -> Result<Option<UssdResponse>, InputError> {
        let Some(route) = self.resolve(raw) else {
            debug!(input = raw, "No route for input");
            return Ok(None);
        };
        let mut data = RequestData::parse(raw);
        data.partition(&route.code, Some(SERVICE_CODE))?;
        let request = UssdRequest::from_data(SessionKey::new(msisdn, session_id), raw, data);
        Ok(Some(route.app.handle(request).await))
    }

    /// Number of mounted applications.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether nothing is mounted.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::Status, testing::demo_app};

    #[test]
    fn longest_code_wins_below_base() -> anyhow::Result<()> {
        let short = Arc::new(demo_app());
        let long = Arc::new(demo_app());
        let mut router = AppRouter::with_base("384");
        router.route("1", Arc::clone(&short))?.route("1*2", Arc::clone(&long))?;
        assert_eq!(router.len(), 2);

        let route = router.resolve("384*1*2*9").unwrap();
        assert!(Arc::ptr_eq(route.app, &long));
        assert!(route.code.equals("384*1*2"));

        let route = router.resolve("384*1*5").unwrap();
        assert!(Arc::ptr_eq(route.app, &short));

        assert!(router.resolve("385*1").is_none());
        assert!(router.resolve("384*7").is_none());
        assert!(router.route("1", short).is_err());
        Ok(())
    }

    #[tokio::test]
    async fn handle_strips_route_code() -> anyhow::Result<()> {
        let mut router = AppRouter::new();
        router.route("55", Arc::new(demo_app()))?;

        let response = router.handle("2547", "s", "55").await?.unwrap();
        assert_eq!(response.status, Status::Continue);
        assert!(response.body.starts_with("Welcome"));

        let response = router.handle("2547", "s", "55*1").await?.unwrap();
        assert!(response.body.starts_with("Balance"));

        assert!(router.handle("2547", "s", "66").await?.is_none());
        Ok(())
    }
}
