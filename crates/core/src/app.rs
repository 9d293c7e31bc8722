//! Application assembly and the transport entry points.

use std::sync::Arc;

use tracing::error;

use crate::{
    config::AppConfig,
    engine::{Chain, Dispatcher, Middleware, Observers, RequestObserver},
    error::ConfigurationError,
    models::Status,
    pagination::truncate,
    request::UssdRequest,
    response::UssdResponse,
    screen::{ScreenRegistry, ScreenTarget},
    session::{CacheBackend, SessionStore},
};

/// A configured menu application.
pub struct UssdApp {
    config: Arc<AppConfig>,
    registry: Arc<ScreenRegistry>,
    store: Arc<SessionStore>,
    chain: Chain,
    observers: Observers,
}

impl UssdApp {
    /// Starts assembling an application.
    pub fn builder(config: AppConfig, registry: ScreenRegistry) -> UssdAppBuilder {
        UssdAppBuilder {
            config,
            registry,
            backend: None,
            middleware: Vec::new(),
            observers: Vec::new(),
        }
    }

    /// Configured application name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Effective configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Registered screens.
    pub fn registry(&self) -> &ScreenRegistry {
        &self.registry
    }

    /// Session store used by the dispatcher.
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Run one turn. Always produces a response: errors nobody handled
    /// become an `END` page with the configured error message.
    pub async fn handle(&self, mut request: UssdRequest) -> UssdResponse {
        self.observers.before_request(&request);
        let budget = self.config.page_budget();
        let response = match self.chain.run(&mut request).await {
            Ok(response) => UssdResponse::new(response.status, truncate(&response.body, budget)),
            Err(err) => {
                error!(
                    app = %self.config.name,
                    session = %request.key(),
                    error = %err,
                    "Unhandled error, ending session"
                );
                UssdResponse::end(truncate(&self.config.error_message, budget))
            }
        };
        self.observers.after_request(&request, &response);
        response
    }

    /// Transport boundary: raw input in, status and page out.
    pub async fn handle_raw(&self, msisdn: &str, session_id: &str, raw: &str) -> (Status, String) {
        self.handle(UssdRequest::new(msisdn, session_id, raw))
            .await
            .into_parts()
    }
}

/// Collects the parts of a [`UssdApp`].
pub struct UssdAppBuilder {
    config: AppConfig,
    registry: ScreenRegistry,
    backend: Option<Arc<dyn CacheBackend>>,
    middleware: Vec<Arc<dyn Middleware>>,
    observers: Vec<Arc<dyn RequestObserver>>,
}

impl UssdAppBuilder {
    /// Use this backend instead of the one named in the configuration.
    pub fn backend(mut self, backend: Arc<dyn CacheBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Add a middleware outside of the ones added before.
    pub fn middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Adds a lifecycle observer. Observers run in registration order.
    pub fn observer(mut self, observer: impl RequestObserver + 'static) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    /// Validates the configuration and the initial screen, then wires the store.
    ///
    /// Fails when the initial screen is not registered.
    pub fn build(self) -> Result<UssdApp, ConfigurationError> {
        self.config.validate()?;
        self.registry
            .resolve(&ScreenTarget::Name(self.config.initial_screen.clone()), None)
            .map_err(|err| {
                ConfigurationError::Invalid(format!(
                    "initial screen '{}' is not routable: {err}",
                    self.config.initial_screen
                ))
            })?;

        let config = Arc::new(self.config);
        let registry = Arc::new(self.registry);
        let store = Arc::new(match self.backend {
            Some(backend) => SessionStore::new(backend, &config),
            None => SessionStore::from_config(&config),
        });
        let observers = Observers::new(self.observers);
        let dispatcher = Dispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&store),
            Arc::clone(&config),
            observers.clone(),
        );

        Ok(UssdApp {
            chain: Chain::new(dispatcher, self.middleware),
            config,
            registry,
            store,
            observers,
        })
    }
}
