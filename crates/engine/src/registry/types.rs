//! Registry type definitions for widget descriptors and parameter schemas.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Where a widget is offered in the editor palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetCategory {
    /// Lists and blocks of site content (posts, tags, categories).
    #[default]
    Content,
    /// Sidebar-style utility widgets.
    Widget,
    /// Widgets that collect input.
    Form,
    /// Images, galleries, embeds.
    Media,
}

impl WidgetCategory {
    /// Lowercase name used in serialized descriptors.
    pub fn as_str(&self) -> &'static str {
        match self {
            WidgetCategory::Content => "content",
            WidgetCategory::Widget => "widget",
            WidgetCategory::Form => "form",
            WidgetCategory::Media => "media",
        }
    }
}

impl fmt::Display for WidgetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WidgetCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "content" => Ok(WidgetCategory::Content),
            "widget" => Ok(WidgetCategory::Widget),
            "form" => Ok(WidgetCategory::Form),
            "media" => Ok(WidgetCategory::Media),
            other => Err(format!("unknown widget category '{}'", other)),
        }
    }
}

/// Declared type of a widget parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    /// Free text.
    #[default]
    String,
    /// Finite number.
    Number,
    /// `true`/`false`.
    Boolean,
    /// One value out of `options`.
    Select,
    /// Any subset of `options`.
    Multiselect,
}

/// Schema for one widget parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamSpec {
    /// Parameter key in the placeholder's params object.
    pub name: String,
    /// Declared type.
    #[serde(rename = "type", default)]
    pub kind: ParamType,
    /// Whether validation fails when the parameter is missing and has no default.
    #[serde(default)]
    pub required: bool,
    /// Value used when the parameter is missing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    /// Allowed values for select/multiselect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    /// Regular expression string values must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_pattern: Option<String>,
    /// Help text shown in the editor.
    #[serde(default)]
    pub description: String,
}

impl ParamSpec {
    /// Creates an optional parameter with no default.
    pub fn new(name: impl Into<String>, kind: ParamType) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            default_value: None,
            options: None,
            validation_pattern: None,
            description: String::new(),
        }
    }

    /// Marks the parameter as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the default value.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Sets the allowed values.
    pub fn with_options(mut self, options: &[&str]) -> Self {
        self.options = Some(options.iter().map(|o| o.to_string()).collect());
        self
    }

    /// Sets the validation pattern.
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.validation_pattern = Some(pattern.into());
        self
    }

    /// Sets the help text.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Display metadata and parameter schema for one widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetDescriptor {
    /// Registry key (e.g. "latest-posts").
    pub name: String,
    /// Human readable title.
    pub title: String,
    /// Short explanation for the editor palette.
    #[serde(default)]
    pub description: String,
    /// Palette category.
    #[serde(default)]
    pub category: WidgetCategory,
    /// Icon identifier.
    #[serde(default)]
    pub icon: String,
    /// Parameters in declaration order.
    #[serde(default)]
    pub params: Vec<ParamSpec>,
}

impl WidgetDescriptor {
    /// Creates a descriptor with no parameters.
    pub fn new(
        name: impl Into<String>,
        title: impl Into<String>,
        category: WidgetCategory,
    ) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            description: String::new(),
            category,
            icon: String::new(),
            params: Vec::new(),
        }
    }

    /// Sets the palette description.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the icon identifier.
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    /// Appends a parameter.
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    /// Looks up a declared parameter.
    pub fn get_param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }
}
