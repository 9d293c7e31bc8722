use std::{collections::VecDeque, fmt};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{models::Status, pagination::PageCache};

/// Identity of a conversation: subscriber number plus transport session id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    /// Subscriber number.
    pub msisdn: String,
    /// Transport session id. Not part of the backend key.
    pub session_id: String,
}

impl SessionKey {
    /// Key for one subscriber and transport session.
    pub fn new(msisdn: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            msisdn: msisdn.into(),
            session_id: session_id.into(),
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.msisdn, self.session_id)
    }
}

/// Persisted state of the screen a session is positioned on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenState {
    /// Fully qualified screen name.
    pub screen: String,
    /// Declared state attributes and their current values.
    #[serde(default)]
    pub attributes: Map<String, Value>,
    /// Positional arguments carried by the redirect that entered the screen.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub redirect_args: Vec<String>,
}

impl ScreenState {
    /// Fresh state for `screen`.
    pub fn new(screen: impl Into<String>) -> Self {
        Self {
            screen: screen.into(),
            attributes: Map::new(),
            redirect_args: Vec::new(),
        }
    }
}

/// Bounded stack of previously active screen states, newest last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    entries: VecDeque<ScreenState>,
    limit: usize,
}

impl History {
    /// Empty history holding at most `limit` entries.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(limit.min(32)),
            limit: limit.max(1),
        }
    }

    /// Push a state, evicting the oldest entry once the limit is reached.
    pub fn push(&mut self, state: ScreenState) {
        while self.entries.len() >= self.limit {
            self.entries.pop_front();
        }
        self.entries.push_back(state);
    }

    /// Removes the most recent entry.
    pub fn pop(&mut self) -> Option<ScreenState> {
        self.entries.pop_back()
    }

    /// Most recent entry.
    pub fn peek(&self) -> Option<&ScreenState> {
        self.entries.back()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the history is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Capacity.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &ScreenState> {
        self.entries.iter()
    }
}

/// Where a session stands between turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No screen has been entered yet.
    New,
    /// The last response was `CON`.
    AwaitingInput,
    /// The last response was `END`.
    Terminal,
}

/// Everything remembered about one subscriber between turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Store identity.
    pub key: SessionKey,
    /// Start of the current staleness window.
    pub created_at: DateTime<Utc>,
    /// Last time the session was opened.
    pub accessed_at: Option<DateTime<Utc>>,
    /// Application data shared by all screens.
    #[serde(default)]
    pub data: Map<String, Value>,
    /// Per-conversation context, cleared on reset.
    #[serde(default)]
    pub context: Map<String, Value>,
    /// State of the current screen. `None` before the first render.
    #[serde(default)]
    pub state: Option<ScreenState>,
    /// Screens to return to with the previous code.
    pub history: History,
    /// Pages of the last paginated body.
    #[serde(default)]
    pub pages: Option<PageCache>,
    /// Status of the last emitted page.
    #[serde(default)]
    pub last_status: Option<Status>,
    /// Set when a stored session outlived its lifetime.
    #[serde(skip)]
    pub stale: bool,
}

impl Session {
    /// Fresh session in the `New` phase.
    pub fn new(key: SessionKey, history_size: usize) -> Self {
        Self {
            key,
            created_at: Utc::now(),
            accessed_at: None,
            data: Map::new(),
            context: Map::new(),
            state: None,
            history: History::with_limit(history_size),
            pages: None,
            last_status: None,
            stale: false,
        }
    }

    /// True until the session has completed its first turn.
    pub fn is_new(&self) -> bool {
        self.accessed_at.is_none()
    }

    /// Where the session is in its lifecycle.
    pub fn phase(&self) -> SessionPhase {
        match (&self.state, self.last_status) {
            (_, Some(Status::End)) => SessionPhase::Terminal,
            (None, _) => SessionPhase::New,
            (Some(_), _) => SessionPhase::AwaitingInput,
        }
    }

    /// Whether the session is older than `lifetime`.
    pub fn is_expired(&self, lifetime: std::time::Duration, now: DateTime<Utc>) -> bool {
        match ChronoDuration::from_std(lifetime) {
            Ok(lifetime) => now - self.created_at > lifetime,
            Err(_) => false,
        }
    }

    /// Drop all conversation state, keeping the identity.
    pub fn reset(&mut self) {
        self.data.clear();
        self.context.clear();
        self.state = None;
        self.history.clear();
        self.pages = None;
        self.last_status = None;
        self.created_at = Utc::now();
    }

    /// Renew the lifetime window after a stale session was restored.
    pub fn mark_restored(&mut self) {
        self.stale = false;
        self.created_at = Utc::now();
    }

    /// Record the end of a turn.
    pub(crate) fn finish_turn(&mut self, status: Status) {
        self.last_status = Some(status);
        self.accessed_at = Some(Utc::now());
    }
}
