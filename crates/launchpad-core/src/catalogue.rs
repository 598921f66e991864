//! Known fields of the target store.
//!
//! The catalogue turns a bare field key into a typed [`DataCollectionRequest`] and is
//! the single source of truth for which fields are mandatory for publishing.

use crate::session::{DataCollectionRequest, ValidationType};
use std::collections::HashSet;

/// Stable field keys.
pub mod fields {
    pub const APP_NAME: &str = "app_name";
    pub const APP_TYPE: &str = "app_type";
    pub const CATEGORIES: &str = "categories";
    pub const AGE_LEGAL: &str = "age_legal";
    pub const SHORT_DESCRIPTION: &str = "short_description";
    pub const FULL_DESCRIPTION: &str = "full_description";
    pub const WHATS_NEW: &str = "whats_new";
    pub const MODERATOR_COMMENT: &str = "moderator_comment";
    pub const PRICE: &str = "price";
    pub const WEBSITE: &str = "website";
}

/// Static description of one store field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub field: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    /// Must be collected before a publish attempt.
    pub mandatory: bool,
    pub validation_type: ValidationType,
    pub max_length: Option<usize>,
    pub valid_values: &'static [&'static str],
    pub max_categories: Option<usize>,
    pub pattern: Option<&'static str>,
    /// Lowercase tokens that identify this field inside a store error message.
    pub error_keywords: &'static [&'static str],
}

impl FieldSpec {
    /// Builds a request for this field with no suggestions.
    pub fn to_request(&self, required: bool) -> DataCollectionRequest {
        let mut request = DataCollectionRequest::text(self.field, self.display_name)
            .with_description(self.description)
            .required(required)
            .with_validation_type(self.validation_type)
            .with_valid_values(self.valid_values.iter().copied());
        request.max_length = self.max_length;
        request.max_categories = self.max_categories;
        request.pattern = self.pattern.map(str::to_string);
        request
    }

    /// One line summary used in classifier instructions.
    pub fn describe(&self) -> String {
        let mut constraints = vec![self.validation_type.to_string()];
        if let Some(max) = self.max_length {
            constraints.push(format!("max {max} chars"));
        }
        if !self.valid_values.is_empty() {
            constraints.push(format!("one of {}", self.valid_values.join("|")));
        }
        if let Some(max) = self.max_categories {
            constraints.push(format!("comma-separated, at most {max}"));
        }
        format!(
            "- {} ({}): {} [{}]",
            self.field,
            self.display_name,
            self.description,
            constraints.join(", ")
        )
    }
}

const STORE_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        field: fields::APP_NAME,
        display_name: "App name",
        description: "Name shown on the store page",
        mandatory: true,
        validation_type: ValidationType::Text,
        max_length: Some(50),
        valid_values: &[],
        max_categories: None,
        pattern: None,
        error_keywords: &["name", "appname", "title"],
    },
    FieldSpec {
        field: fields::APP_TYPE,
        display_name: "App type",
        description: "Store section the app is listed in",
        mandatory: true,
        validation_type: ValidationType::Enum,
        max_length: None,
        valid_values: &["GAMES", "MAIN"],
        max_categories: None,
        pattern: None,
        error_keywords: &["apptype", "section"],
    },
    FieldSpec {
        field: fields::CATEGORIES,
        display_name: "Categories",
        description: "Store categories, comma-separated",
        mandatory: true,
        validation_type: ValidationType::Categories,
        max_length: None,
        valid_values: &[],
        max_categories: Some(2),
        pattern: None,
        error_keywords: &["category", "categories"],
    },
    FieldSpec {
        field: fields::AGE_LEGAL,
        display_name: "Age rating",
        description: "Minimum user age",
        mandatory: true,
        validation_type: ValidationType::Enum,
        max_length: None,
        valid_values: &["0+", "6+", "12+", "16+", "18+"],
        max_categories: None,
        pattern: None,
        error_keywords: &["age", "agelegal", "rating"],
    },
    FieldSpec {
        field: fields::SHORT_DESCRIPTION,
        display_name: "Short description",
        description: "One sentence shown under the app name",
        mandatory: false,
        validation_type: ValidationType::Text,
        max_length: Some(80),
        valid_values: &[],
        max_categories: None,
        pattern: None,
        error_keywords: &["shortdescription"],
    },
    FieldSpec {
        field: fields::FULL_DESCRIPTION,
        display_name: "Full description",
        description: "Long description on the store page",
        mandatory: false,
        validation_type: ValidationType::Text,
        max_length: Some(4000),
        valid_values: &[],
        max_categories: None,
        pattern: None,
        error_keywords: &["fulldescription"],
    },
    FieldSpec {
        field: fields::WHATS_NEW,
        display_name: "What's new",
        description: "Changes in this release",
        mandatory: false,
        validation_type: ValidationType::Text,
        max_length: Some(5000),
        valid_values: &[],
        max_categories: None,
        pattern: None,
        error_keywords: &["whatsnew", "changelog"],
    },
    FieldSpec {
        field: fields::MODERATOR_COMMENT,
        display_name: "Comment for moderators",
        description: "Notes for the review team",
        mandatory: false,
        validation_type: ValidationType::Text,
        max_length: Some(180),
        valid_values: &[],
        max_categories: None,
        pattern: None,
        error_keywords: &["moderator", "moderatorcomment"],
    },
    FieldSpec {
        field: fields::PRICE,
        display_name: "Price",
        description: "Price in minor currency units, 0 for free apps",
        mandatory: false,
        validation_type: ValidationType::Numeric,
        max_length: Some(9),
        valid_values: &[],
        max_categories: None,
        pattern: Some(r"\d+"),
        error_keywords: &["price", "paid"],
    },
    FieldSpec {
        field: fields::WEBSITE,
        display_name: "Website",
        description: "Developer or product website",
        mandatory: false,
        validation_type: ValidationType::Url,
        max_length: Some(255),
        valid_values: &[],
        max_categories: None,
        pattern: None,
        error_keywords: &["website", "url", "homepage"],
    },
];

/// The catalogue of fields known for the target store.
#[derive(Debug, Clone, Copy)]
pub struct FieldCatalogue {
    specs: &'static [FieldSpec],
}

impl Default for FieldCatalogue {
    fn default() -> Self {
        Self::store()
    }
}

impl FieldCatalogue {
    /// The built-in store catalogue.
    pub fn store() -> Self {
        Self {
            specs: STORE_FIELDS,
        }
    }

    pub fn all(&self) -> &'static [FieldSpec] {
        self.specs
    }

    pub fn lookup(&self, field: &str) -> Option<&'static FieldSpec> {
        self.specs.iter().find(|spec| spec.field == field)
    }

    pub fn mandatory(&self) -> impl Iterator<Item = &'static FieldSpec> {
        self.specs.iter().filter(|spec| spec.mandatory)
    }

    pub fn optional(&self) -> impl Iterator<Item = &'static FieldSpec> {
        self.specs.iter().filter(|spec| !spec.mandatory)
    }

    pub fn is_mandatory(&self, field: &str) -> bool {
        self.lookup(field).is_some_and(|spec| spec.mandatory)
    }

    /// Builds a typed request for `field`.
    ///
    /// Fields unknown to the catalogue become plain text requests whose display name
    /// is the key itself.
    pub fn request_for(&self, field: &str, required: bool) -> DataCollectionRequest {
        match self.lookup(field) {
            Some(spec) => spec.to_request(required),
            None => DataCollectionRequest::text(field, field).required(required),
        }
    }

    /// Fields whose error keywords appear as whole tokens in `text`.
    ///
    /// Words are lowercase runs of alphanumerics joined by `_`, `-` or `'`. Each word
    /// yields its parts and its joined form, and each pair of adjacent words yields
    /// their concatenation. So `app_type`, `App type` and `appType` all produce
    /// `apptype`, and `what's new` produces `whatsnew`.
    pub fn fields_mentioned_in(&self, text: &str) -> Vec<&'static FieldSpec> {
        let tokens = keyword_tokens(text);

        self.specs
            .iter()
            .filter(|spec| {
                spec.error_keywords
                    .iter()
                    .any(|keyword| tokens.contains(*keyword))
            })
            .collect()
    }

    /// Multi-line catalogue summary for classifier instructions.
    pub fn describe(&self) -> String {
        let mut out = String::from("Obligatory fields:\n");
        for spec in self.mandatory() {
            out.push_str(&spec.describe());
            out.push('\n');
        }
        out.push_str("Optional fields:\n");
        for spec in self.optional() {
            out.push_str(&spec.describe());
            out.push('\n');
        }
        out
    }
}

fn is_joiner(c: char) -> bool {
    matches!(c, '_' | '-' | '\'')
}

fn keyword_tokens(text: &str) -> HashSet<String> {
    let lowered = text.to_lowercase();
    let words: Vec<String> = lowered
        .split(|c: char| !c.is_alphanumeric() && !is_joiner(c))
        .map(|word| word.chars().filter(|c| !is_joiner(*c)).collect::<String>())
        .filter(|word| !word.is_empty())
        .collect();

    let mut tokens: HashSet<String> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect();
    for pair in words.windows(2) {
        tokens.insert(format!("{}{}", pair[0], pair[1]));
    }
    tokens.extend(words);
    tokens
}
