//! Widget registry: the catalog of mountable widgets.
//!
//! Widget modules register their descriptors during startup, before the first
//! render. Rendering only reads from a registry, usually a [`snapshot`] of the
//! process-wide one.

pub mod defaults;
pub mod types;

pub use types::{ParamSpec, ParamType, WidgetCategory, WidgetDescriptor};

use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

/// Name-keyed catalog of widget descriptors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WidgetRegistry {
    widgets: BTreeMap<String, WidgetDescriptor>,
}

impl WidgetRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `descriptor` under `name`; a later registration of the same name wins.
    pub fn register(&mut self, name: impl Into<String>, mut descriptor: WidgetDescriptor) {
        let name = name.into();
        if descriptor.name != name {
            log::debug!(
                "registering descriptor '{}' under key '{}'",
                descriptor.name,
                name
            );
            descriptor.name = name.clone();
        }
        if self.widgets.insert(name.clone(), descriptor).is_some() {
            log::debug!("widget '{}' re-registered, replacing previous descriptor", name);
        }
    }

    /// Looks up a descriptor by name.
    pub fn lookup(&self, name: &str) -> Option<&WidgetDescriptor> {
        self.widgets.get(name)
    }

    /// All registrations, sorted by name.
    pub fn list(&self) -> Vec<(&str, &WidgetDescriptor)> {
        self.widgets
            .iter()
            .map(|(name, descriptor)| (name.as_str(), descriptor))
            .collect()
    }

    /// Check if a widget name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.widgets.contains_key(name)
    }

    /// Number of registered widgets.
    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }
}

static GLOBAL: Lazy<RwLock<WidgetRegistry>> = Lazy::new(|| RwLock::new(WidgetRegistry::new()));

/// The process-wide registry.
pub fn global() -> &'static RwLock<WidgetRegistry> {
    &GLOBAL
}

/// Registers a widget in the process-wide registry.
///
/// Call this from each widget module's startup hook, before any render.
pub fn register(name: impl Into<String>, descriptor: WidgetDescriptor) {
    global()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register(name, descriptor);
}

/// Copy of the process-wide registry for one engine or render.
pub fn snapshot() -> WidgetRegistry {
    global()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}
