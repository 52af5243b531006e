//! Placeholder dialects and parameter decoding.
//!
//! Two author-facing forms reduce to the same marker shape:
//!
//! - bracket form: `[component latest-posts params="{&quot;count&quot;:3}"]`
//! - attribute form: `<div data-component="latest-posts" data-params='{"count":3}'></div>`
//!
//! `[[component ...]]` is the escape for the bracket form and renders as the
//! un-doubled text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

/// Default number of entity-decode/JSON-parse rounds for parameter payloads.
pub const DEFAULT_DECODE_PASSES: usize = 3;

static BRACKET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?x)
        \[\[(?P<escaped>component\b(?:[^\]"']|"[^"]*"|'[^']*')*)\]\]
        |
        \[component\s+(?P<name>[a-z0-9-]+)
            (?:\s+params\s*=\s*(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)'))?
        \s*\]
        "#,
    )
    .expect("valid regex")
});

static WIDGET_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9-]+$").expect("valid regex"));

/// One bracket-dialect match inside a text run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BracketMatch<'a> {
    /// `[[component ...]]`: keep the inner text, un-doubled.
    Escaped {
        /// Byte range of the whole match within the text run.
        range: std::ops::Range<usize>,
        /// Text to display in place of the match, e.g. `[component x]`.
        literal: String,
    },
    /// A live placeholder.
    Live {
        /// Byte range of the whole match within the text run.
        range: std::ops::Range<usize>,
        /// Widget name.
        name: &'a str,
        /// Raw `params` payload, still entity-encoded.
        params: Option<&'a str>,
    },
}

/// Find bracket-dialect placeholders (and their escapes) in a text run.
pub fn find_bracket_placeholders(text: &str) -> Vec<BracketMatch<'_>> {
    BRACKET_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            if let Some(inner) = caps.name("escaped") {
                return Some(BracketMatch::Escaped {
                    range: whole.range(),
                    literal: format!("[{}]", inner.as_str()),
                });
            }
            Some(BracketMatch::Live {
                range: whole.range(),
                name: caps.name("name")?.as_str(),
                params: caps.name("dq").or_else(|| caps.name("sq")).map(|m| m.as_str()),
            })
        })
        .collect()
}

/// Whether `name` is acceptable as a widget name.
pub fn is_valid_widget_name(name: &str) -> bool {
    WIDGET_NAME_RE.is_match(name)
}

/// Why a parameter payload could not be turned into a key/value bag.
#[derive(Debug, Error)]
pub enum ParamsError {
    /// The payload never parsed as JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The payload parsed, but not to an object.
    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),
    /// Still encoded after the allowed number of decode passes.
    #[error("still encoded after {0} decode passes")]
    Exhausted(usize),
}

/// Decode a parameter payload that may be entity-encoded and/or JSON-string encoded.
///
/// Each pass decodes one layer of HTML entities and parses JSON; a JSON string
/// result is fed into the next pass. Empty payloads decode to an empty bag.
pub fn decode_params(raw: &str, max_passes: usize) -> Result<Map<String, Value>, ParamsError> {
    let mut current = raw.trim().to_string();
    if current.is_empty() {
        return Ok(Map::new());
    }

    for pass in 0..max_passes {
        let decoded = html_escape::decode_html_entities(&current).into_owned();
        match serde_json::from_str::<Value>(decoded.trim()) {
            Ok(Value::Object(map)) => return Ok(map),
            Ok(Value::String(inner)) => {
                log::debug!("params pass {} yielded a JSON string, decoding again", pass + 1);
                current = inner;
            }
            Ok(other) => return Err(ParamsError::NotAnObject(json_kind(&other))),
            Err(err) => {
                if decoded == current {
                    return Err(err.into());
                }
                log::debug!("params pass {} still entity-encoded, decoding again", pass + 1);
                current = decoded;
            }
        }
    }

    Err(ParamsError::Exhausted(max_passes))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
