#![deny(missing_docs)]
//! inlay core: placeholder discovery, verbatim neutralization, sanitization,
//! and content analysis.

/// Title/description/heading extraction over rendered markup.
pub mod analyze;
/// Core error and diagnostic types.
pub mod error;
/// Placeholder discovery and anchor substitution.
pub mod preprocess;
/// HTML allow-list cleaning.
pub mod sanitize;
/// Placeholder dialects and parameter decoding.
pub mod shortcode;
/// Verbatim region tracking and placeholder neutralization.
pub mod verbatim;

pub use analyze::{AnalyzeOptions, ContentSummary, Heading, analyze, analyze_with_options};
pub use error::{Diagnostics, InlayError, SourceLocation, Warning};
pub use preprocess::{
    ANCHOR_ATTRIBUTE, Dialect, Marker, ProcessOptions, Processed, process, process_with_options,
};
pub use sanitize::sanitize_markup;
pub use shortcode::{ParamsError, decode_params};
pub use verbatim::{NEUTRALIZER, neutralize, strip_neutralizers};
