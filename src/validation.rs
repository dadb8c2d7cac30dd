use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{MAX_TEXT_LENGTH, MIN_TEXT_LENGTH};

/// Body of `POST /posts` and `POST /posts/comment/{id}`.
#[derive(Deserialize, Default, Debug)]
pub struct TextInput {
    #[serde(default)]
    pub text: Option<String>,
}

/// Field name to message, serialized as a flat JSON object.
#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.insert(field.to_string(), message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", field, message)?;
            first = false;
        }
        Ok(())
    }
}

/// Checks post and comment text. Length counts characters, not bytes, and is
/// measured on the text as given. Blank text counts as missing.
pub fn validate_text(text: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();

    if text.trim().is_empty() {
        errors.add("text", "Text field is required");
    } else {
        let len = text.chars().count();
        if !(MIN_TEXT_LENGTH..=MAX_TEXT_LENGTH).contains(&len) {
            errors.add(
                "text",
                format!(
                    "Text must be between {} and {} characters",
                    MIN_TEXT_LENGTH, MAX_TEXT_LENGTH
                ),
            );
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
