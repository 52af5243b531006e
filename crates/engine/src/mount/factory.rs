//! Widget construction.
//!
//! The engine never knows how a widget is built. It asks a [`WidgetFactory`]
//! for a root and a disposer, and keeps the disposer until the next pass.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::registry::WidgetDescriptor;
use crate::validate::ValidatedParams;

/// A constructed widget: its root markup and the callback that tears it down.
pub struct MountedWidget {
    /// Markup placed inside the anchor.
    pub root_html: String,
    dispose: Box<dyn FnOnce()>,
}

impl MountedWidget {
    /// Creates a widget with a disposer.
    pub fn new(root_html: impl Into<String>, dispose: impl FnOnce() + 'static) -> Self {
        Self {
            root_html: root_html.into(),
            dispose: Box::new(dispose),
        }
    }

    /// Creates a widget that holds no resources.
    pub fn stateless(root_html: impl Into<String>) -> Self {
        Self::new(root_html, || {})
    }

    pub(crate) fn into_parts(self) -> (String, Box<dyn FnOnce()>) {
        (self.root_html, self.dispose)
    }
}

impl fmt::Debug for MountedWidget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountedWidget")
            .field("root_html", &self.root_html)
            .finish_non_exhaustive()
    }
}

/// Failure while constructing or binding a widget.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MountError {
    /// The widget is registered but nothing knows how to build it.
    #[error("no constructor for widget `{0}`")]
    NoConstructor(String),
    /// The constructor reported an error.
    #[error("{0}")]
    Construction(String),
    /// The constructor panicked.
    #[error("widget `{name}` panicked: {message}")]
    Panicked {
        /// Widget name.
        name: String,
        /// Panic payload, when it was a string.
        message: String,
    },
}

/// Builds live widgets from validated parameters.
pub trait WidgetFactory {
    /// Construct the widget described by `descriptor`, bound to `params`.
    fn instantiate(
        &self,
        descriptor: &WidgetDescriptor,
        params: &ValidatedParams,
    ) -> Result<MountedWidget, MountError>;
}

type Constructor = Box<dyn Fn(&ValidatedParams) -> Result<MountedWidget, MountError>>;

/// A [`WidgetFactory`] backed by one constructor closure per widget name.
#[derive(Default)]
pub struct FactoryTable {
    constructors: HashMap<String, Constructor>,
}

impl FactoryTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the constructor for `name`.
    pub fn insert<F>(&mut self, name: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn(&ValidatedParams) -> Result<MountedWidget, MountError> + 'static,
    {
        self.constructors.insert(name.into(), Box::new(constructor));
        self
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with<F>(mut self, name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(&ValidatedParams) -> Result<MountedWidget, MountError> + 'static,
    {
        self.insert(name, constructor);
        self
    }

    /// Whether a constructor exists for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }
}

impl WidgetFactory for FactoryTable {
    fn instantiate(
        &self,
        descriptor: &WidgetDescriptor,
        params: &ValidatedParams,
    ) -> Result<MountedWidget, MountError> {
        let constructor = self
            .constructors
            .get(&descriptor.name)
            .ok_or_else(|| MountError::NoConstructor(descriptor.name.clone()))?;
        constructor(params)
    }
}

impl fmt::Debug for FactoryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.constructors.keys().collect();
        names.sort();
        f.debug_struct("FactoryTable").field("widgets", &names).finish()
    }
}
