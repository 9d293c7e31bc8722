//! Turn processing: the dispatcher, the middleware chain around it and
//! lifecycle observers.

mod dispatch;
mod middleware;
mod observer;

pub(crate) use dispatch::Dispatcher;
pub(crate) use middleware::Chain;
pub use middleware::{Middleware, Next, StoreRetryMiddleware, TracingMiddleware};
pub(crate) use observer::Observers;
pub use observer::RequestObserver;
