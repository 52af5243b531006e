#![deny(missing_docs)]
//! inlay engine: widget registry, parameter validation and the mount
//! lifecycle that turns processed content into live widgets.

/// Engine configuration.
pub mod config;
/// Render passes, hosts and widget factories.
pub mod mount;
/// Widget descriptors and the process-wide registry.
pub mod registry;
/// Parameter validation against descriptor schemas.
pub mod validate;

pub use config::{DEFAULT_ANCHOR_RETRY_BUDGET, EngineConfig};
pub use mount::{
    FactoryTable, Host, MarkerStatus, MarkupHost, MountEngine, MountError, MountedInstance,
    MountedWidget, PassToken, RenderOutcome, RenderReport, WidgetFactory,
};
pub use registry::{ParamSpec, ParamType, WidgetCategory, WidgetDescriptor, WidgetRegistry};
pub use validate::{ParamValue, ValidatedParams, ValidationError, validate};
