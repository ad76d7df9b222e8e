//! Schema types for discovered resources and their presentation overrides.

use crate::date_range::{grammar_for, FieldValues, OpenRangePolicy, ValidationRejected};
use serde::{Deserialize, Serialize};

/// XML-Schema string range as it appears in Hydra documentation.
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

/// A discovered API: its entrypoint and the resources it exposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiDescription {
    pub entrypoint: String,
    #[serde(default)]
    pub title: Option<String>,
    pub resources: Vec<ResourceDescription>,
}

/// One entity type exposed by the remote API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescription {
    pub name: String,
    pub fields: Vec<FieldDescription>,
}

impl ResourceDescription {
    pub fn field(&self, name: &str) -> Option<&FieldDescription> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// One attribute of a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescription {
    pub name: String,
    /// Semantic type tag from the source schema (an IRI or a resource reference).
    #[serde(default)]
    pub range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_override: Option<RenderStrategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_override: Option<InputStrategy>,
    #[serde(default = "default_list_visible")]
    pub list_visible: bool,
}

impl FieldDescription {
    /// A field with no overrides, visible in list views.
    pub fn new(name: impl Into<String>, range: Option<String>) -> Self {
        Self {
            name: name.into(),
            range,
            render_override: None,
            input_override: None,
            list_visible: true,
        }
    }
}

fn default_list_visible() -> bool {
    true
}

/// Display-time strategy for a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStrategy {
    /// Single line, truncated with an ellipsis inside list cells.
    EllipsisText,
    RichText,
    Plain,
}

impl RenderStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStrategy::EllipsisText => "ellipsis_text",
            RenderStrategy::RichText => "rich_text",
            RenderStrategy::Plain => "plain",
        }
    }
}

/// Edit-time widget for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Text,
    /// Multiline rich-text editor.
    RichText,
}

/// Validator attached to an input strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Validator {
    DateRange(OpenRangePolicy),
}

/// Edit-time strategy: a widget plus an optional validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputStrategy {
    pub kind: InputKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator: Option<Validator>,
}

impl InputStrategy {
    /// Plain text input validated by the date-range grammar.
    pub fn date_range(policy: OpenRangePolicy) -> Self {
        Self {
            kind: InputKind::Text,
            validator: Some(Validator::DateRange(policy)),
        }
    }

    pub fn rich_text() -> Self {
        Self {
            kind: InputKind::RichText,
            validator: None,
        }
    }

    /// Run the attached validator, if any, against the current form state.
    pub fn validate(
        &self,
        value: Option<&str>,
        all_values: &FieldValues,
    ) -> Result<(), ValidationRejected> {
        match self.validator {
            Some(Validator::DateRange(policy)) => grammar_for(policy).check(value, all_values),
            None => Ok(()),
        }
    }
}
