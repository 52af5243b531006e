//! Engine configuration.

use inlay_core::{AnalyzeOptions, ProcessOptions};
use serde::{Deserialize, Serialize};

use crate::mount::DEFAULT_ERROR_CLASS;

/// Default number of anchor resolution attempts per pass, including the first.
pub const DEFAULT_ANCHOR_RETRY_BUDGET: usize = 5;

/// Settings for a [`MountEngine`](crate::mount::MountEngine).
///
/// Every field has a default, so partial JSON from a JS caller works:
///
/// ```
/// use inlay_engine::EngineConfig;
///
/// let json = r#"{"anchorRetryBudget": 2, "process": {"sanitize": false}}"#;
/// let config = EngineConfig::from_json(json).unwrap();
/// assert_eq!(config.anchor_retry_budget, 2);
/// assert!(!config.process.sanitize);
/// assert_eq!(config.analyze.description_words, 30);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Anchor resolution attempts before a pass is abandoned.
    #[serde(alias = "anchor_retry_budget")]
    pub anchor_retry_budget: usize,
    /// Class placed on inline error elements.
    #[serde(alias = "error_class")]
    pub error_class: String,
    /// Preprocessing options used by `render_content`.
    pub process: ProcessOptions,
    /// Options for the summary produced after each completed pass.
    pub analyze: AnalyzeOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            anchor_retry_budget: DEFAULT_ANCHOR_RETRY_BUDGET,
            error_class: DEFAULT_ERROR_CLASS.to_string(),
            process: ProcessOptions::default(),
            analyze: AnalyzeOptions::default(),
        }
    }
}

impl EngineConfig {
    /// Parse configuration from JSON, filling gaps with defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_default() {
        assert_eq!(EngineConfig::from_json("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn accepts_snake_case_aliases() {
        let config = EngineConfig::from_json(r#"{"error_class":"oops"}"#).unwrap();
        assert_eq!(config.error_class, "oops");
    }

    #[test]
    fn rejects_wrong_types() {
        assert!(EngineConfig::from_json(r#"{"anchorRetryBudget":"many"}"#).is_err());
    }
}
