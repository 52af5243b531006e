use thiserror::Error;

/// Source location information for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// Byte offset into the raw content.
    pub offset: usize,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed, in characters)
    pub column: usize,
}

impl SourceLocation {
    /// Resolve a byte offset in `source` into a line/column location.
    pub fn from_offset(source: &str, offset: usize) -> Self {
        let mut offset = offset.min(source.len());
        while !source.is_char_boundary(offset) {
            offset -= 1;
        }
        let before = &source[..offset];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = before[line_start..].chars().count() + 1;
        Self {
            offset,
            line,
            column,
        }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Errors that can occur while rewriting or analysing markup.
#[derive(Debug, Error)]
pub enum InlayError {
    /// lol_html rejected the markup or a handler failed.
    #[error("Rewrite error: {0}")]
    Rewrite(#[from] lol_html::errors::RewritingError),
}

/// Non-fatal findings recorded while preprocessing content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// Placeholder parameters could not be decoded; defaults apply downstream.
    MalformedParams {
        /// Where the placeholder starts.
        location: SourceLocation,
        /// Marker the parameters belonged to.
        marker_id: String,
        /// Decoder message.
        message: String,
    },
    /// `data-component` carried a name outside `[a-z0-9-]+`.
    InvalidWidgetName {
        /// Where the element starts.
        location: SourceLocation,
        /// The rejected name.
        name: String,
    },
    /// A verbatim element was opened but never closed.
    UnclosedVerbatim {
        /// Where the element was opened.
        location: SourceLocation,
        /// Element name (code, pre, ...).
        tag: String,
    },
    /// Sanitizing removed the element carrying a marker's anchor.
    AnchorRemoved {
        /// Where the placeholder starts.
        location: SourceLocation,
        /// Marker that was dropped.
        marker_id: String,
        /// Widget the marker named.
        widget_name: String,
    },
}

impl Warning {
    /// Get the location of this warning
    pub fn location(&self) -> &SourceLocation {
        match self {
            Warning::MalformedParams { location, .. }
            | Warning::InvalidWidgetName { location, .. }
            | Warning::UnclosedVerbatim { location, .. }
            | Warning::AnchorRemoved { location, .. } => location,
        }
    }

    /// Stable machine-readable kind, used by the bindings.
    pub fn kind(&self) -> &'static str {
        match self {
            Warning::MalformedParams { .. } => "malformed_params",
            Warning::InvalidWidgetName { .. } => "invalid_widget_name",
            Warning::UnclosedVerbatim { .. } => "unclosed_verbatim",
            Warning::AnchorRemoved { .. } => "anchor_removed",
        }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::MalformedParams {
                location,
                marker_id,
                message,
            } => write!(
                f,
                "{}: malformed params for {} ({})",
                location, marker_id, message
            ),
            Warning::InvalidWidgetName { location, name } => {
                write!(f, "{}: invalid widget name '{}'", location, name)
            }
            Warning::UnclosedVerbatim { location, tag } => {
                write!(f, "{}: unclosed <{}> runs to end of content", location, tag)
            }
            Warning::AnchorRemoved {
                location,
                marker_id,
                widget_name,
            } => write!(
                f,
                "{}: sanitizing removed the anchor of {} ({})",
                location, marker_id, widget_name
            ),
        }
    }
}

/// Collection of preprocessing diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// List of non-fatal warnings
    pub warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Create a new empty diagnostics collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a warning to the collection
    pub fn add_warning(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }

    /// Check if there are any warnings
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Total count of diagnostics
    pub fn count(&self) -> usize {
        self.warnings.len()
    }
}
