use std::{collections::HashMap, sync::Arc};

use tracing::debug;

use super::{
    descriptor::{ScreenBuilder, ScreenDescriptor, ScreenHandle},
    namespace::{expand_name, start_case, validate_screen_name, Namespaces},
    result::ScreenTarget,
};
use crate::error::{ConfigurationError, EngineError};

const DEFAULT_ARITY: usize = 1;

/// All screens known to an application, keyed by fully qualified name.
///
/// Populated at startup, then shared read-only behind an `Arc`.
#[derive(Default)]
pub struct ScreenRegistry {
    screens: HashMap<String, ScreenHandle>,
    namespaces: Namespaces,
}

impl ScreenRegistry {
    /// Empty registry with no namespaces.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a namespace for a module path (usually `module_path!()`).
    ///
    /// A name starting with `.` is appended to the namespace of the nearest
    /// registered ancestor module.
    pub fn namespace(&mut self, module: &str, name: &str) -> Result<String, ConfigurationError> {
        let resolved = self.namespaces.register(module, name)?;
        debug!(module, namespace = %resolved, "Registered namespace");
        Ok(resolved)
    }

    /// Namespace that applies to `module`.
    pub fn namespace_of_module(&self, module: &str) -> Option<&str> {
        self.namespaces.lookup(module)
    }

    /// Resolve, validate and store a descriptor.
    pub fn register(&mut self, builder: ScreenBuilder) -> Result<ScreenHandle, ConfigurationError> {
        let namespace = builder
            .module
            .as_deref()
            .and_then(|module| self.namespaces.lookup(module));
        let name = expand_name(&builder.name, namespace).ok_or_else(|| {
            ConfigurationError::Namespace(format!(
                "relative screen name '{}' declared in {} has no registered namespace",
                builder.name,
                builder.module.as_deref().unwrap_or("an unknown module")
            ))
        })?;
        validate_screen_name(&name)?;

        let parent = builder.parent.as_ref();
        let arity = builder
            .arity
            .or_else(|| parent.map(|p| p.arity))
            .unwrap_or(DEFAULT_ARITY);
        let nav_menu = builder
            .nav_menu
            .or_else(|| parent.map(|p| p.nav_menu))
            .unwrap_or(true);
        let mut state: Vec<String> = parent.map(|p| p.state.clone()).unwrap_or_default();
        for attribute in builder.state {
            if attribute.trim().is_empty() {
                return Err(ConfigurationError::InvalidDescriptor {
                    name,
                    reason: "state attribute names must not be empty".to_string(),
                });
            }
            if !state.contains(&attribute) {
                state.push(attribute);
            }
        }
        let handler = builder
            .handler
            .or_else(|| parent.and_then(|p| p.handler.clone()));

        if !builder.is_abstract && handler.is_none() {
            return Err(ConfigurationError::InvalidDescriptor {
                name,
                reason: "concrete screens need a handler".to_string(),
            });
        }

        if let Some(existing) = self.screens.get(&name) {
            if !existing.is_abstract() {
                return Err(ConfigurationError::NameConflict(name));
            }
        }

        let short = name.rsplit('.').next().unwrap_or(&name);
        let label = builder.label.unwrap_or_else(|| start_case(short));
        let descriptor = ScreenDescriptor {
            label,
            description: builder.description,
            is_abstract: builder.is_abstract,
            arity,
            state,
            nav_menu,
            handler,
            parent: parent.map(|p| p.name().to_string()),
            name: name.clone(),
        };

        let handle = ScreenHandle(Arc::new(descriptor));
        debug!(
            screen = %name,
            is_abstract = handle.is_abstract(),
            arity,
            "Registered screen"
        );
        self.screens.insert(name, handle.clone());
        Ok(handle)
    }

    /// Looks up an exact, already expanded name.
    pub fn get(&self, name: &str) -> Option<&ScreenHandle> {
        self.screens.get(name)
    }

    /// Find a routable screen.
    ///
    /// `namespace` expands `.`-relative names, usually the namespace of the
    /// screen issuing the redirect.
    pub fn resolve(
        &self,
        target: &ScreenTarget,
        namespace: Option<&str>,
    ) -> Result<ScreenHandle, EngineError> {
        let handle = match target {
            ScreenTarget::Handle(handle) => handle.clone(),
            ScreenTarget::Name(name) => {
                let full = expand_name(name, namespace).ok_or_else(|| {
                    EngineError::navigation(format!(
                        "relative screen '{name}' used outside of a namespace"
                    ))
                })?;
                self.screens
                    .get(&full)
                    .cloned()
                    .ok_or_else(|| EngineError::navigation(format!("unknown screen '{full}'")))?
            }
        };

        if handle.is_abstract() {
            return Err(EngineError::navigation(format!(
                "screen '{}' is abstract",
                handle.name()
            )));
        }
        Ok(handle)
    }

    /// Routable screen names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .screens
            .values()
            .filter(|handle| !handle.is_abstract())
            .map(|handle| handle.name())
            .collect();
        names.sort_unstable();
        names
    }

    /// Number of registered screens, abstract ones included.
    pub fn len(&self) -> usize {
        self.screens.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.screens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screen::{Screen, ScreenContext, ScreenResult};

    #[derive(Default)]
    struct SendMoney;

    impl Screen for SendMoney {
        fn render(&self, _ctx: &mut ScreenContext<'_>, _args: &[String]) -> anyhow::Result<ScreenResult> {
            Ok(ScreenResult::end("sent"))
        }
    }

    fn registry() -> ScreenRegistry {
        let mut registry = ScreenRegistry::new();
        registry.namespace("bank", "bank").unwrap();
        registry
    }

    #[test]
    fn relative_names_take_the_module_namespace() -> anyhow::Result<()> {
        let mut registry = registry();
        let handle = registry.register(ScreenDescriptor::of::<SendMoney>().module("bank::screens"))?;
        assert_eq!(handle.name(), "bank.send_money");
        assert_eq!(handle.label(), "Send Money");
        assert_eq!(handle.arity(), 1);
        assert!(handle.shows_nav_menu());

        let absolute = registry.register(
            ScreenDescriptor::builder("tools.echo")
                .handler(SendMoney)
                .label("Echo"),
        )?;
        assert_eq!(absolute.name(), "tools.echo");
        assert_eq!(registry.names(), vec!["bank.send_money", "tools.echo"]);
        Ok(())
    }

    #[test]
    fn relative_name_without_namespace_fails() {
        let mut registry = ScreenRegistry::new();
        let err = registry
            .register(ScreenDescriptor::of::<SendMoney>().module("nowhere"))
            .err();
        assert!(matches!(err, Some(ConfigurationError::Namespace(_))));

        let err = registry.register(ScreenDescriptor::builder("x y").handler(SendMoney)).err();
        assert!(matches!(err, Some(ConfigurationError::InvalidScreenName { .. })));
    }

    #[test]
    fn names_are_validated_after_expansion() -> anyhow::Result<()> {
        let mut registry = registry();
        let short = registry.register(ScreenDescriptor::builder(".a").module("bank").handler(SendMoney))?;
        assert_eq!(short.name(), "bank.a");

        for bad in [".", "..a", ".a b", "x", "-ab"] {
            let err = registry
                .register(ScreenDescriptor::builder(bad).module("bank").handler(SendMoney))
                .err();
            assert!(
                matches!(err, Some(ConfigurationError::InvalidScreenName { .. })),
                "{bad}"
            );
        }
        Ok(())
    }

    #[test]
    fn duplicates_conflict_unless_abstract() -> anyhow::Result<()> {
        let mut registry = registry();
        registry.register(ScreenDescriptor::builder("bank.base").abstract_())?;
        registry.register(ScreenDescriptor::builder("bank.base").handler(SendMoney))?;
        let err = registry
            .register(ScreenDescriptor::builder("bank.base").handler(SendMoney))
            .err();
        assert!(matches!(err, Some(ConfigurationError::NameConflict(name)) if name == "bank.base"));
        Ok(())
    }

    #[test]
    fn children_inherit_from_abstract_parents() -> anyhow::Result<()> {
        let mut registry = registry();
        let base = registry.register(
            ScreenDescriptor::builder("bank.form")
                .abstract_()
                .handler(SendMoney)
                .arity(2)
                .state(["amount"])
                .nav_menu(false),
        )?;
        let child = registry.register(
            ScreenDescriptor::builder(".deposit")
                .module("bank")
                .extends(&base)
                .state(["account", "amount"]),
        )?;
        assert_eq!(child.arity(), 2);
        assert_eq!(child.state_attributes(), ["amount", "account"]);
        assert!(!child.shows_nav_menu());
        assert_eq!(child.parent(), Some("bank.form"));
        assert!(child.declares("account"));

        let err = registry.register(ScreenDescriptor::builder("bank.bare")).err();
        assert!(matches!(err, Some(ConfigurationError::InvalidDescriptor { .. })));
        Ok(())
    }

    #[test]
    fn resolve_rejects_unknown_and_abstract_targets() -> anyhow::Result<()> {
        let mut registry = registry();
        let base = registry.register(ScreenDescriptor::builder("bank.base").abstract_())?;
        let home = registry.register(ScreenDescriptor::builder("bank.home").handler(SendMoney))?;

        let found = registry.resolve(&".home".into(), Some("bank"))?;
        assert!(found.same(&home));
        assert!(registry.resolve(&ScreenTarget::from(&home), None)?.same(&home));

        let err = registry.resolve(&"bank.missing".into(), None).err();
        assert!(matches!(err, Some(EngineError::Navigation(_))));
        let err = registry.resolve(&ScreenTarget::from(&base), None).err();
        assert!(matches!(err, Some(EngineError::Navigation(_))));
        let err = registry.resolve(&".home".into(), None).err();
        assert!(matches!(err, Some(EngineError::Navigation(_))));
        Ok(())
    }
}
