use anyhow::{anyhow, bail};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use super::{
    descriptor::ScreenDescriptor,
    result::{Redirect, ScreenResult},
};
use crate::{input::RequestData, session::Session};

/// Everything a screen may read or change while it runs.
pub struct ScreenContext<'a> {
    session: &'a mut Session,
    descriptor: &'a ScreenDescriptor,
    input: &'a RequestData,
    initial_screen: &'a str,
    restoring: bool,
    payload: Vec<String>,
}

impl<'a> ScreenContext<'a> {
    pub(crate) fn new(
        session: &'a mut Session,
        descriptor: &'a ScreenDescriptor,
        input: &'a RequestData,
        initial_screen: &'a str,
        restoring: bool,
    ) -> Self {
        Self {
            session,
            descriptor,
            input,
            initial_screen,
            restoring,
            payload: Vec::new(),
        }
    }

    /// Subscriber number.
    pub fn msisdn(&self) -> &str {
        &self.session.key.msisdn
    }

    /// Transport session id.
    pub fn session_id(&self) -> &str {
        &self.session.key.session_id
    }

    /// Descriptor of the screen being rendered.
    pub fn descriptor(&self) -> &ScreenDescriptor {
        self.descriptor
    }

    /// Request input including the service and initial code partitions.
    pub fn input(&self) -> &RequestData {
        self.input
    }

    /// True while a stale session is being restored.
    pub fn is_restoring(&self) -> bool {
        self.restoring
    }

    /// Append a line to the response body.
    pub fn print(&mut self, line: impl Into<String>) -> &mut Self {
        self.payload.push(line.into());
        self
    }

    /// Body accumulated so far.
    pub fn payload(&self) -> String {
        self.payload.join("\n")
    }

    /// Finish with the accumulated body and keep the session open.
    pub fn con(&mut self) -> ScreenResult {
        ScreenResult::Continue(self.take_payload())
    }

    /// Finish with the accumulated body and end the session.
    pub fn end(&mut self) -> ScreenResult {
        ScreenResult::End(self.take_payload())
    }

    pub(crate) fn take_payload(&mut self) -> String {
        let body = self.payload.join("\n");
        self.payload.clear();
        body
    }

    /// Redirect resolved against this screen's module.
    pub fn redirect(&self, target: &str) -> Redirect {
        Redirect::to(target)
    }

    /// Redirect to the initial screen.
    pub fn home(&self) -> Redirect {
        Redirect::to(self.initial_screen)
    }

    /// Name sessions start and reset to.
    pub fn initial_screen(&self) -> &str {
        self.initial_screen
    }

    /// Positional arguments of the redirect that entered this screen.
    pub fn redirect_args(&self) -> &[String] {
        self.session
            .state
            .as_ref()
            .map(|state| state.redirect_args.as_slice())
            .unwrap_or_default()
    }

    /// Current value of a state attribute.
    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.session
            .state
            .as_ref()
            .and_then(|state| state.attributes.get(attribute))
            .filter(|value| !value.is_null())
    }

    /// Typed read of a state attribute.
    pub fn get_as<T: DeserializeOwned>(&self, attribute: &str) -> anyhow::Result<Option<T>> {
        self.get(attribute)
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
            .map_err(|err| anyhow!("state attribute '{attribute}' has an unexpected type: {err}"))
    }

    /// Set a declared state attribute; it is persisted with the screen state.
    pub fn set(&mut self, attribute: &str, value: impl Serialize) -> anyhow::Result<()> {
        if !self.descriptor.declares(attribute) {
            bail!(
                "screen '{}' does not declare state attribute '{attribute}'",
                self.descriptor.name()
            );
        }
        let value = serde_json::to_value(value)?;
        let state = self
            .session
            .state
            .as_mut()
            .ok_or_else(|| anyhow!("no active screen state to store '{attribute}'"))?;
        state.attributes.insert(attribute.to_string(), value);
        Ok(())
    }

    /// Application data shared across screens.
    pub fn data(&self) -> &Map<String, Value> {
        &self.session.data
    }

    /// Mutable session payload.
    pub fn data_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.session.data
    }

    /// Conversation context, cleared when the session resets.
    pub fn context(&self) -> &Map<String, Value> {
        &self.session.context
    }

    /// Mutable per-screen context.
    pub fn context_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.session.context
    }

    /// Number of screens that `previous` can go back to.
    pub fn history_len(&self) -> usize {
        self.session.history.len()
    }

    /// Drop all session state; usually followed by a redirect home.
    pub fn reset_session(&mut self) {
        self.session.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        screen::{Screen, ScreenRegistry},
        session::{ScreenState, SessionKey},
    };

    struct Form;

    impl Screen for Form {
        fn render(&self, ctx: &mut ScreenContext<'_>, _args: &[String]) -> anyhow::Result<ScreenResult> {
            Ok(ctx.con())
        }
    }

    #[test]
    fn state_attributes_must_be_declared() -> anyhow::Result<()> {
        let mut registry = ScreenRegistry::new();
        let form = registry.register(
            ScreenDescriptor::builder("app.form")
                .handler(Form)
                .state(["amount"]),
        )?;
        let mut session = Session::new(SessionKey::new("2547", "s"), 4);
        session.state = Some(ScreenState::new("app.form"));
        let input = RequestData::parse("1");

        let mut ctx = ScreenContext::new(&mut session, &form, &input, "app.home", false);
        assert_eq!(ctx.get("amount"), None);
        ctx.set("amount", 250)?;
        assert_eq!(ctx.get_as::<u32>("amount")?, Some(250));
        assert!(ctx.get_as::<String>("amount").is_err());
        assert!(ctx.set("pin", "1234").is_err());

        ctx.print("Amount").print("saved");
        assert!(matches!(ctx.con(), ScreenResult::Continue(body) if body == "Amount\nsaved"));
        assert_eq!(ctx.payload(), "");
        assert_eq!(ctx.home().target.name(), "app.home");

        ctx.reset_session();
        assert!(ctx.set("amount", 1).is_err());
        assert!(session.state.is_none());
        Ok(())
    }
}
