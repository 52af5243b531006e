use inlay_core::{Marker, Warning};
use inlay_engine::registry::defaults::default_descriptors;
use inlay_engine::{EngineConfig, ValidatedParams, WidgetDescriptor};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::*;

// ============================================================================
// Config
// ============================================================================

/// Configuration accepted by the WASM functions.
///
/// Accepts the full engine configuration; `process` and `analyze` read their
/// own section. Unknown or mistyped input falls back to defaults.
fn parse_config(config: JsValue) -> EngineConfig {
    if config.is_undefined() || config.is_null() {
        return EngineConfig::default();
    }
    serde_wasm_bindgen::from_value(config).unwrap_or_default()
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsError> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
}

// ============================================================================
// Process API
// ============================================================================

/// A recoverable finding, flattened for JS.
#[derive(Debug, Clone, Serialize)]
pub struct WarningEntry {
    /// Machine-readable kind, e.g. `malformed_params`.
    pub kind: &'static str,
    /// Human-readable message.
    pub message: String,
    /// 1-based line.
    pub line: usize,
    /// 1-based column.
    pub column: usize,
}

impl From<&Warning> for WarningEntry {
    fn from(warning: &Warning) -> Self {
        let location = warning.location();
        Self {
            kind: warning.kind(),
            message: warning.to_string(),
            line: location.line,
            column: location.column,
        }
    }
}

/// Result of preprocessing content.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessResult {
    /// Markup with anchors in place of placeholders.
    pub markup: String,
    /// Markers in document order.
    pub markers: Vec<Marker>,
    /// Recoverable findings.
    pub warnings: Vec<WarningEntry>,
}

/// Replaces widget placeholders with anchors and lists the markers found.
///
/// # Arguments
///
/// * `content` - Stored post or page HTML
/// * `config` - Optional engine configuration (JsValue)
#[wasm_bindgen]
pub fn process(content: &str, config: JsValue) -> Result<JsValue, JsError> {
    let cfg = parse_config(config);
    let processed = inlay_core::process_with_options(content, &cfg.process)
        .map_err(|e| JsError::new(&format!("Process error: {}", e)))?;

    let result = ProcessResult {
        warnings: processed
            .diagnostics
            .warnings
            .iter()
            .map(WarningEntry::from)
            .collect(),
        markup: processed.markup,
        markers: processed.markers,
    };
    to_js(&result)
}

// ============================================================================
// Analyze API
// ============================================================================

/// Extracts title, description and headings from rendered markup.
#[wasm_bindgen]
pub fn analyze(markup: &str, config: JsValue) -> Result<JsValue, JsError> {
    let cfg = parse_config(config);
    let summary = inlay_core::analyze_with_options(markup, &cfg.analyze)
        .map_err(|e| JsError::new(&format!("Analyze error: {}", e)))?;
    to_js(&summary)
}

// ============================================================================
// Registry / Validation API
// ============================================================================

/// Error detail for a failed validation.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationFailure {
    /// Offending parameter.
    pub param: String,
    /// Human-readable message.
    pub message: String,
}

/// Result of validating a parameter bag.
#[derive(Debug, Clone, Serialize)]
pub struct ValidateResult {
    /// Whether the bag passed.
    pub ok: bool,
    /// Coerced parameters, when `ok`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<ValidatedParams>,
    /// Failure detail, when not `ok`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ValidationFailure>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(transparent)]
struct RawParams(Option<Map<String, Value>>);

/// Validates `params` against a widget descriptor.
///
/// Used by the editor's settings panel before it writes a placeholder.
#[wasm_bindgen]
pub fn validate(descriptor: JsValue, params: JsValue) -> Result<JsValue, JsError> {
    let descriptor: WidgetDescriptor = serde_wasm_bindgen::from_value(descriptor)
        .map_err(|e| JsError::new(&format!("Invalid descriptor: {}", e)))?;
    let raw = if params.is_undefined() || params.is_null() {
        RawParams::default()
    } else {
        serde_wasm_bindgen::from_value(params)
            .map_err(|e| JsError::new(&format!("Invalid params: {}", e)))?
    };

    let result = match inlay_engine::validate(&descriptor, raw.0.as_ref()) {
        Ok(params) => ValidateResult {
            ok: true,
            params: Some(params),
            error: None,
        },
        Err(err) => ValidateResult {
            ok: false,
            params: None,
            error: Some(ValidationFailure {
                param: err.param_name().to_string(),
                message: err.to_string(),
            }),
        },
    };
    to_js(&result)
}

/// Descriptors of the stock blog widgets, in palette order.
#[wasm_bindgen(js_name = defaultWidgets)]
pub fn default_widgets() -> Result<JsValue, JsError> {
    to_js(&default_descriptors())
}
