use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How a submitted value is checked by the validation engine.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ValidationType {
    #[default]
    Text,
    Numeric,
    Url,
    Enum,
    Categories,
}

/// One outstanding question for the user.
///
/// Created by an analyzer and consumed once a valid response for `field` is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataCollectionRequest {
    /// Stable key of the field (e.g. `app_name`).
    pub field: String,
    pub display_name: String,
    pub description: String,
    pub required: bool,
    /// Candidate values offered to the user.
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub validation_type: ValidationType,
    /// Regular expression the whole value must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Accepted values for `enum` fields (compared case-insensitively).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub valid_values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_categories: Option<usize>,
}

impl DataCollectionRequest {
    /// Creates a plain text request with no constraints.
    pub fn text(field: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            display_name: display_name.into(),
            description: String::new(),
            required: false,
            suggestions: Vec::new(),
            validation_type: ValidationType::Text,
            pattern: None,
            max_length: None,
            valid_values: Vec::new(),
            max_categories: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    pub fn with_validation_type(mut self, validation_type: ValidationType) -> Self {
        self.validation_type = validation_type;
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn with_valid_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.valid_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_categories(mut self, max_categories: usize) -> Self {
        self.max_categories = Some(max_categories);
        self
    }
}
