//! Screens: the handler contract, descriptors and the registry.

mod context;
mod descriptor;
pub mod namespace;
mod registry;
mod result;

use std::fmt;

pub use context::ScreenContext;
pub use descriptor::{ScreenBuilder, ScreenDescriptor, ScreenHandle};
pub use registry::ScreenRegistry;
pub use result::{Redirect, ScreenResult, ScreenTarget};

/// Logic behind one menu screen.
///
/// Screens are stateless; anything that must survive a turn lives in the
/// declared state attributes or the session maps reachable through the
/// [`ScreenContext`].
pub trait Screen: Send + Sync {
    /// Handle one input (or a redirect) and produce the next step.
    fn render(&self, ctx: &mut ScreenContext<'_>, args: &[String]) -> anyhow::Result<ScreenResult>;

    /// Called instead of `render` when a stale session resumes on this
    /// screen. The default starts over from the initial screen.
    fn restore(&self, ctx: &mut ScreenContext<'_>, args: &[String]) -> anyhow::Result<ScreenResult> {
        let _ = args;
        ctx.reset_session();
        Ok(ctx.home().into())
    }

    /// Called when more input segments arrive than the screen accepts.
    ///
    /// Returning `None` shows whatever was printed as a `CON` page.
    fn arity_error(
        &self,
        ctx: &mut ScreenContext<'_>,
        error: &ArityError,
    ) -> anyhow::Result<Option<ScreenResult>> {
        let _ = error;
        ctx.print("Invalid Choice");
        Ok(None)
    }
}

/// Too many input segments for a screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArityError {
    /// Screen that rejected the input.
    pub screen: String,
    /// Segments it accepts.
    pub arity: usize,
    /// Segments it was given.
    pub args: Vec<String>,
}

impl fmt::Display for ArityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "screen '{}' takes at most {} input(s), got {}",
            self.screen,
            self.arity,
            self.args.len()
        )
    }
}
