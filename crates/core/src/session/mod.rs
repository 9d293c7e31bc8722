//! Session models, backends and the store that persists them between turns.

mod backend;
mod file;
mod lock;
mod models;
mod store;

pub use backend::{CacheBackend, MemoryBackend};
pub use file::FileBackend;
pub use lock::{IdentityLocks, SessionLease};
pub use models::{History, ScreenState, Session, SessionKey, SessionPhase};
pub use store::SessionStore;
