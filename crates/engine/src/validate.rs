//! Parameter validation: raw placeholder params to typed widget params.
//!
//! Validation is all-or-nothing. Either every declared parameter is resolved
//! (supplied or defaulted) and coerced to its declared type, or the call fails
//! with the first problem found and the widget is not mounted.

use regex::Regex;
use serde::Serialize;
use serde::ser::SerializeMap;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::registry::{ParamSpec, ParamType, WidgetDescriptor};

/// A typed parameter value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// string and select parameters.
    Text(String),
    /// number parameters.
    Number(f64),
    /// boolean parameters.
    Bool(bool),
    /// multiselect parameters.
    List(Vec<String>),
}

impl ParamValue {
    /// The string value, if this is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The numeric value, if this is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The boolean value, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The selected values, if this is a list.
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            ParamValue::List(items) => Some(items),
            _ => None,
        }
    }
}

/// Fully resolved parameters, in declaration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidatedParams {
    entries: Vec<(String, ParamValue)>,
}

impl ValidatedParams {
    /// Looks up a parameter by name.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Iterates in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of resolved parameters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no parameters were resolved.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, name: &str, value: ParamValue) {
        self.entries.push((name.to_string(), value));
    }
}

impl Serialize for ValidatedParams {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Why a parameter bag was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Required parameter absent and no default declared.
    #[error("missing required parameter `{0}`")]
    Missing(String),
    /// Value not representable as a finite number.
    #[error("parameter `{name}` must be a number, got `{found}`")]
    InvalidNumber {
        /// Parameter name.
        name: String,
        /// Offending value as text.
        found: String,
    },
    /// select value outside the allowed set.
    #[error("parameter `{name}` must be one of [{allowed}], got `{value}`")]
    InvalidOption {
        /// Parameter name.
        name: String,
        /// Offending value.
        value: String,
        /// Allowed values, comma separated.
        allowed: String,
    },
    /// multiselect tokens outside the allowed set.
    #[error("parameter `{name}` has invalid options: {}", .invalid.join(", "))]
    InvalidOptions {
        /// Parameter name.
        name: String,
        /// Every rejected token, in input order.
        invalid: Vec<String>,
    },
    /// String value does not match `validation_pattern`.
    #[error("invalid format for `{0}`")]
    InvalidFormat(String),
    /// `validation_pattern` is not a valid regular expression.
    #[error("parameter `{name}` has an unusable validation pattern: {message}")]
    BadPattern {
        /// Parameter name.
        name: String,
        /// Regex compiler message.
        message: String,
    },
}

impl ValidationError {
    /// Name of the parameter that failed.
    pub fn param_name(&self) -> &str {
        match self {
            ValidationError::Missing(name) | ValidationError::InvalidFormat(name) => name,
            ValidationError::InvalidNumber { name, .. }
            | ValidationError::InvalidOption { name, .. }
            | ValidationError::InvalidOptions { name, .. }
            | ValidationError::BadPattern { name, .. } => name,
        }
    }
}

/// Validate a raw parameter bag against a descriptor's schema.
///
/// `raw` is `None` when the placeholder carried no (or undecodable) params.
/// Parameters the descriptor does not declare are ignored.
pub fn validate(
    descriptor: &WidgetDescriptor,
    raw: Option<&Map<String, Value>>,
) -> Result<ValidatedParams, ValidationError> {
    let mut validated = ValidatedParams::default();

    for spec in &descriptor.params {
        let supplied = raw
            .and_then(|bag| bag.get(&spec.name))
            .filter(|value| !value.is_null());

        let source = match (supplied, &spec.default_value) {
            (Some(value), _) => value,
            (None, Some(default)) => default,
            (None, None) if spec.required => {
                return Err(ValidationError::Missing(spec.name.clone()));
            }
            (None, None) => continue,
        };

        let value = coerce(spec, source)?;
        check_pattern(spec, &value)?;
        validated.insert(&spec.name, value);
    }

    if let Some(bag) = raw {
        for key in bag.keys() {
            if descriptor.get_param(key).is_none() {
                log::trace!("widget '{}' ignores undeclared param '{}'", descriptor.name, key);
            }
        }
    }

    Ok(validated)
}

fn coerce(spec: &ParamSpec, value: &Value) -> Result<ParamValue, ValidationError> {
    match spec.kind {
        ParamType::Number => {
            let number = match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            number
                .filter(|n| n.is_finite())
                .map(ParamValue::Number)
                .ok_or_else(|| ValidationError::InvalidNumber {
                    name: spec.name.clone(),
                    found: scalar_string(value),
                })
        }
        ParamType::Boolean => Ok(ParamValue::Bool(match value {
            Value::Bool(b) => *b,
            other => scalar_string(other).trim().eq_ignore_ascii_case("true"),
        })),
        ParamType::Select => {
            let selected = scalar_string(value);
            if let Some(options) = &spec.options
                && !options.contains(&selected)
            {
                return Err(ValidationError::InvalidOption {
                    name: spec.name.clone(),
                    value: selected,
                    allowed: options.join(", "),
                });
            }
            Ok(ParamValue::Text(selected))
        }
        ParamType::Multiselect => {
            let tokens = split_tokens(value);
            if let Some(options) = &spec.options {
                let invalid: Vec<String> = tokens
                    .iter()
                    .filter(|token| !options.contains(token))
                    .cloned()
                    .collect();
                if !invalid.is_empty() {
                    return Err(ValidationError::InvalidOptions {
                        name: spec.name.clone(),
                        invalid,
                    });
                }
            }
            Ok(ParamValue::List(tokens))
        }
        ParamType::String => Ok(ParamValue::Text(scalar_string(value))),
    }
}

fn check_pattern(spec: &ParamSpec, value: &ParamValue) -> Result<(), ValidationError> {
    let (Some(pattern), Some(text)) = (&spec.validation_pattern, value.as_str()) else {
        return Ok(());
    };
    let re = Regex::new(pattern).map_err(|err| ValidationError::BadPattern {
        name: spec.name.clone(),
        message: err.to_string(),
    })?;
    if re.is_match(text) {
        Ok(())
    } else {
        Err(ValidationError::InvalidFormat(spec.name.clone()))
    }
}

/// multiselect input: an array, or a comma-separated string.
fn split_tokens(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(scalar_string)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        other => scalar_string(other)
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        compound => compound.to_string(),
    }
}
