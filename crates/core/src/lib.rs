#![warn(clippy::all, missing_docs)]

//! Session and screen navigation engine for USSD menu applications.
//!
//! This crate hosts the input model, screen registry, session store,
//! pagination, navigation and the dispatch engine with its middleware
//! chain. Transports hand each turn to a [`UssdApp`] and relay the
//! returned [`UssdResponse`].

pub mod app;
pub mod config;
pub mod engine;
pub mod error;
pub mod input;
pub mod models;
pub mod navigation;
pub mod pagination;
pub mod request;
pub mod response;
pub mod router;
pub mod screen;
pub mod session;

#[cfg(test)]
mod testing;

pub use app::{UssdApp, UssdAppBuilder};
pub use config::AppConfig;
pub use engine::{Middleware, Next, RequestObserver, StoreRetryMiddleware, TracingMiddleware};
pub use error::{ConfigurationError, EngineError, InputError, PaginationError, StoreError};
pub use input::{RequestData, SegmentSequence};
pub use models::{Choice, Status};
pub use request::UssdRequest;
pub use response::UssdResponse;
pub use router::AppRouter;
pub use screen::{
    ArityError, Redirect, Screen, ScreenContext, ScreenDescriptor, ScreenHandle, ScreenRegistry,
    ScreenResult,
};
pub use session::{CacheBackend, FileBackend, MemoryBackend, Session, SessionKey, SessionStore};
