use std::{fmt, ops::Deref, sync::Arc};

use super::{
    namespace::{short_type_name, snake_case},
    Screen,
};

/// Static metadata and handler of a registered screen.
pub struct ScreenDescriptor {
    pub(crate) name: String,
    pub(crate) label: String,
    pub(crate) description: Option<String>,
    pub(crate) is_abstract: bool,
    pub(crate) arity: usize,
    pub(crate) state: Vec<String>,
    pub(crate) nav_menu: bool,
    pub(crate) handler: Option<Arc<dyn Screen>>,
    pub(crate) parent: Option<String>,
}

impl ScreenDescriptor {
    /// Start describing a screen called `name` (absolute or `.`-relative).
    pub fn builder(name: impl Into<String>) -> ScreenBuilder {
        ScreenBuilder::new(name.into())
    }

    /// Describe a screen whose relative name is derived from its type:
    /// `SendMoney` registers as `.send_money`.
    pub fn of<T>() -> ScreenBuilder
    where
        T: Screen + Default + 'static,
    {
        let name = format!(".{}", snake_case(short_type_name(std::any::type_name::<T>())));
        ScreenBuilder::new(name).handler(T::default())
    }

    /// Fully qualified name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human label, derived from the type name when not set.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Longer description for menus.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Abstract screens only exist to be extended.
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Maximum number of input segments accepted per turn.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Declared state attribute names.
    pub fn state_attributes(&self) -> &[String] {
        &self.state
    }

    /// Whether `attribute` is a declared state attribute.
    pub fn declares(&self, attribute: &str) -> bool {
        self.state.iter().any(|name| name == attribute)
    }

    /// Whether the global previous/home codes apply on this screen.
    pub fn shows_nav_menu(&self) -> bool {
        self.nav_menu
    }

    /// Name of the abstract descriptor this one extends.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub(crate) fn handler(&self) -> Option<&Arc<dyn Screen>> {
        self.handler.as_ref()
    }
}

impl fmt::Debug for ScreenDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScreenDescriptor")
            .field("name", &self.name)
            .field("label", &self.label)
            .field("abstract", &self.is_abstract)
            .field("arity", &self.arity)
            .field("state", &self.state)
            .field("nav_menu", &self.nav_menu)
            .finish_non_exhaustive()
    }
}

/// Shared reference to a registered descriptor.
#[derive(Clone)]
pub struct ScreenHandle(pub(crate) Arc<ScreenDescriptor>);

impl ScreenHandle {
    /// Whether both handles point at the same descriptor.
    pub fn same(&self, other: &ScreenHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for ScreenHandle {
    type Target = ScreenDescriptor;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Debug for ScreenHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScreenHandle({})", self.0.name)
    }
}

/// Builder consumed by [`ScreenRegistry::register`](super::ScreenRegistry::register).
pub struct ScreenBuilder {
    pub(crate) name: String,
    pub(crate) module: Option<String>,
    pub(crate) label: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) is_abstract: bool,
    pub(crate) arity: Option<usize>,
    pub(crate) state: Vec<String>,
    pub(crate) nav_menu: Option<bool>,
    pub(crate) handler: Option<Arc<dyn Screen>>,
    pub(crate) parent: Option<ScreenHandle>,
}

impl ScreenBuilder {
    fn new(name: String) -> Self {
        Self {
            name,
            module: None,
            label: None,
            description: None,
            is_abstract: false,
            arity: None,
            state: Vec::new(),
            nav_menu: None,
            handler: None,
            parent: None,
        }
    }

    /// Module declaring the screen, normally `module_path!()`; relative names
    /// resolve against its namespace.
    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// Overrides the handler built by `of`.
    pub fn handler(mut self, handler: impl Screen + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Sets the label.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Abstract descriptors hold shared settings and are never routable.
    pub fn abstract_(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Inherit arity, state attributes, nav-menu flag and handler from `parent`.
    pub fn extends(mut self, parent: &ScreenHandle) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    /// Maximum number of input segments the screen accepts.
    pub fn arity(mut self, arity: usize) -> Self {
        self.arity = Some(arity);
        self
    }

    /// Declares state attributes. Inherited ones are kept.
    pub fn state<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.extend(attributes.into_iter().map(Into::into));
        self
    }

    /// Enable or disable the global previous/home codes.
    pub fn nav_menu(mut self, enabled: bool) -> Self {
        self.nav_menu = Some(enabled);
        self
    }
}
