use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use super::descriptor::ScreenHandle;
use crate::models::Status;

/// Outcome of running a screen for one pass.
#[derive(Debug, Clone)]
pub enum ScreenResult {
    /// Show the body and wait for more input.
    Continue(String),
    /// Show the body and finish the session.
    End(String),
    /// Enter another screen within the same turn.
    Redirect(Redirect),
}

impl ScreenResult {
    /// Continue with `body`.
    pub fn con(body: impl Into<String>) -> Self {
        Self::Continue(body.into())
    }

    /// End with `body`.
    pub fn end(body: impl Into<String>) -> Self {
        Self::End(body.into())
    }

    /// Status of a terminal result; `None` for redirects.
    pub fn status(&self) -> Option<Status> {
        match self {
            Self::Continue(_) => Some(Status::Continue),
            Self::End(_) => Some(Status::End),
            Self::Redirect(_) => None,
        }
    }
}

impl From<Redirect> for ScreenResult {
    fn from(redirect: Redirect) -> Self {
        Self::Redirect(redirect)
    }
}

/// Screen addressed by a redirect.
#[derive(Clone)]
pub enum ScreenTarget {
    /// Absolute or `.`-relative name.
    Name(String),
    /// An already resolved screen.
    Handle(ScreenHandle),
}

impl ScreenTarget {
    /// Name as written, before expansion.
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Handle(handle) => handle.name(),
        }
    }
}

impl fmt::Debug for ScreenTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.debug_tuple("Name").field(name).finish(),
            Self::Handle(handle) => f.debug_tuple("Handle").field(&handle.name()).finish(),
        }
    }
}

impl From<&str> for ScreenTarget {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for ScreenTarget {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<&ScreenHandle> for ScreenTarget {
    fn from(handle: &ScreenHandle) -> Self {
        Self::Handle(handle.clone())
    }
}

impl From<ScreenHandle> for ScreenTarget {
    fn from(handle: ScreenHandle) -> Self {
        Self::Handle(handle)
    }
}

/// Redirect to another screen, optionally seeding its state.
#[derive(Debug, Clone)]
pub struct Redirect {
    /// Screen to render next.
    pub target: ScreenTarget,
    /// Positional arguments, read by the target through
    /// [`ScreenContext::redirect_args`](super::ScreenContext::redirect_args).
    pub args: Vec<String>,
    /// Initial values for the target's declared state attributes.
    pub params: Map<String, Value>,
}

impl Redirect {
    /// Redirect to `target`, without arguments.
    pub fn to(target: impl Into<ScreenTarget>) -> Self {
        Self {
            target: target.into(),
            args: Vec::new(),
            params: Map::new(),
        }
    }

    /// Appends one positional argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends positional arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Seed a state attribute. Values that fail to serialize become `null`.
    pub fn param(mut self, name: impl Into<String>, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.params.insert(name.into(), value);
        self
    }
}
