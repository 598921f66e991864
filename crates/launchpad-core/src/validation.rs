//! Validation engine for user-supplied field values.
//!
//! [`validate`] is a pure function: the same value and request always produce the
//! same [`ValidationResult`]. Checks run in a fixed order:
//!
//! 1. surrounding whitespace is trimmed
//! 2. empty values: invalid when required, valid (skipped) otherwise
//! 3. `max_length`
//! 4. type check (`numeric`, `url`, `enum`, `categories`)
//! 5. `pattern`, which must match the whole value

use crate::session::{DataCollectionRequest, ValidationType};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// URI schemes accepted for `url` fields.
pub const ACCEPTED_URL_SCHEMES: &[&str] = &["https://", "http://"];

/// Outcome of validating one value. Never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Corrective hints for the user.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            error_message: None,
            suggestions: Vec::new(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            error_message: Some(message.into()),
            suggestions: Vec::new(),
        }
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }
}

/// Validates `raw_value` against the constraints of `request`.
pub fn validate(raw_value: &str, request: &DataCollectionRequest) -> ValidationResult {
    let value = raw_value.trim();
    let name = &request.display_name;

    if value.is_empty() {
        return if request.required {
            ValidationResult::invalid(format!("{name} is required"))
        } else {
            ValidationResult::ok()
        };
    }

    if let Some(max) = request.max_length {
        let length = value.chars().count();
        if length > max {
            return ValidationResult::invalid(format!(
                "{name} is too long: {length} characters (maximum {max})"
            ))
            .with_suggestions(vec![format!("Shorten the text to {max} characters")]);
        }
    }

    let type_check = match request.validation_type {
        ValidationType::Text => ValidationResult::ok(),
        ValidationType::Numeric => check_numeric(value, name),
        ValidationType::Url => check_url(value, name),
        ValidationType::Enum => check_enum(value, request),
        ValidationType::Categories => check_categories(value, request),
    };
    if !type_check.valid {
        return type_check;
    }

    if let Some(pattern) = request.pattern.as_deref() {
        return check_pattern(value, pattern, name);
    }

    ValidationResult::ok()
}

fn check_numeric(value: &str, name: &str) -> ValidationResult {
    match value.parse::<i64>() {
        Ok(_) => ValidationResult::ok(),
        Err(_) => ValidationResult::invalid(format!("{name} must be a whole number")),
    }
}

fn check_url(value: &str, name: &str) -> ValidationResult {
    let lowered = value.to_ascii_lowercase();
    if ACCEPTED_URL_SCHEMES
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        ValidationResult::ok()
    } else {
        ValidationResult::invalid(format!("{name} must be a link starting with https://"))
            .with_suggestions(vec![format!("https://{value}")])
    }
}

fn check_enum(value: &str, request: &DataCollectionRequest) -> ValidationResult {
    let matches = request
        .valid_values
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(value));
    if matches {
        ValidationResult::ok()
    } else {
        ValidationResult::invalid(format!(
            "{} must be one of: {}",
            request.display_name,
            request.valid_values.join(", ")
        ))
        .with_suggestions(request.valid_values.clone())
    }
}

fn check_categories(value: &str, request: &DataCollectionRequest) -> ValidationResult {
    let name = &request.display_name;
    let entries: Vec<&str> = value.split(',').map(str::trim).collect();

    if entries.iter().any(|entry| entry.is_empty()) {
        return ValidationResult::invalid(format!("{name} contains an empty entry"))
            .with_suggestions(vec![entries
                .iter()
                .filter(|entry| !entry.is_empty())
                .copied()
                .collect::<Vec<_>>()
                .join(", ")]);
    }

    if let Some(max) = request.max_categories {
        if entries.len() > max {
            return ValidationResult::invalid(format!(
                "{name} allows at most {max} entries, got {}",
                entries.len()
            ))
            .with_suggestions(vec![entries[..max].join(", ")]);
        }
    }

    ValidationResult::ok()
}

fn check_pattern(value: &str, pattern: &str, name: &str) -> ValidationResult {
    match Regex::new(&format!("^(?:{pattern})$")) {
        Ok(regex) if regex.is_match(value) => ValidationResult::ok(),
        Ok(_) => ValidationResult::invalid(format!("{name} has an invalid format")),
        Err(err) => ValidationResult::invalid(format!(
            "{name} cannot be checked: invalid pattern ({err})"
        )),
    }
}
