//! Error taxonomy for the engine.

use std::time::Duration;

use thiserror::Error;

/// Result alias used throughout the engine.
pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// Errors raised while wiring an application together.
///
/// These are fatal at startup and never expected at runtime.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A screen name failed validation after namespace expansion.
    #[error("invalid screen name '{name}': {reason}")]
    InvalidScreenName {
        /// Name after expansion.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Two non-abstract screens resolved to the same name.
    #[error("screen name conflict: '{0}' is already registered")]
    NameConflict(String),

    /// A relative name was used outside of any registered namespace.
    #[error("namespace error: {0}")]
    Namespace(String),

    /// A screen descriptor is incomplete or contradictory.
    #[error("invalid screen descriptor '{name}': {reason}")]
    InvalidDescriptor {
        /// Screen the descriptor belongs to.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Configuration values are missing or inconsistent.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// The layered configuration could not be loaded.
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Failures of the session store or its backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend did not answer within the configured timeout.
    #[error("session backend timed out after {0:?} during {1}")]
    Timeout(Duration, &'static str),

    /// The per-identity lease could not be acquired in time.
    #[error("timed out after {0:?} waiting for the session lock of '{1}'")]
    LockTimeout(Duration, String),

    /// The backend reported an I/O failure.
    #[error("session backend failure: {0}")]
    Backend(String),

    /// A stored payload could not be encoded or decoded.
    #[error("session payload error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem failure in the file backend.
    #[error("session backend I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the input model.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    /// A prefix did not match the head of the input.
    #[error("'{prefix}' is not a prefix of '{head}'")]
    NotAPrefix {
        /// Expected prefix.
        prefix: String,
        /// Input it was matched against.
        head: String,
    },

    /// A length partition asked for more segments than the head holds.
    #[error("cannot partition {requested} segments from a head of {available}")]
    OutOfRange {
        /// Segments asked for.
        requested: usize,
        /// Segments left.
        available: usize,
    },

    /// The name is used by the input model itself.
    #[error("partition name '{0}' is reserved")]
    ReservedName(String),
}

/// Errors raised by the pagination engine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaginationError {
    /// Navigation controls and footer leave no room for content.
    #[error("page size {page_size} leaves no room for content after {reserved} reserved characters")]
    PageTooSmall {
        /// Configured page size.
        page_size: usize,
        /// Characters taken by controls and footer.
        reserved: usize,
    },
}

/// Unified error surfaced by a turn.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Wiring failure.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// A redirect or navigation target could not be resolved.
    #[error("navigation error: {0}")]
    Navigation(String),

    /// The session store could not be reached.
    #[error("session store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// A chain of redirects exceeded the configured hop limit.
    #[error("redirect limit of {limit} exceeded: {}", .trail.join(" -> "))]
    RedirectLoopExceeded {
        /// Configured hop limit.
        limit: usize,
        /// Screens visited, starting with the one that first redirected.
        trail: Vec<String>,
    },

    /// Screen logic failed.
    #[error("screen '{screen}' failed: {source}")]
    Screen {
        /// Screen that failed.
        screen: String,
        /// Underlying failure.
        #[source]
        source: anyhow::Error,
    },

    /// Paging failure.
    #[error(transparent)]
    Pagination(#[from] PaginationError),

    /// Malformed input.
    #[error(transparent)]
    Input(#[from] InputError),
}

impl EngineError {
    pub(crate) fn navigation(message: impl Into<String>) -> Self {
        Self::Navigation(message.into())
    }

    /// Whether the error came from the session backend.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }

    /// Whether the error is a fatal redirect loop.
    pub fn is_redirect_loop(&self) -> bool {
        matches!(self, Self::RedirectLoopExceeded { .. })
    }
}
