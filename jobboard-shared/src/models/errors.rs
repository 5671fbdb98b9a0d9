use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Error body returned by the backend: `{ message, errors? }`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// The main error message
    #[serde(default)]
    pub message: String,
    /// Field-level validation messages keyed by field name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, Vec<String>>>,
}

impl ErrorResponse {
    /// Creates a new error response with just a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            errors: None,
        }
    }

    /// Parses a raw response body, falling back to the trimmed text as the message
    /// when the body is not the expected JSON shape.
    #[must_use]
    pub fn from_body(body: &str) -> Self {
        serde_json::from_str::<Self>(body)
            .ok()
            .filter(|parsed| !parsed.message.is_empty() || parsed.has_field_errors())
            .unwrap_or_else(|| Self::new(body.trim()))
    }

    /// Checks if this error response carries field errors.
    #[must_use]
    pub fn has_field_errors(&self) -> bool {
        self.errors.as_ref().is_some_and(|errors| !errors.is_empty())
    }

    /// First message reported for `field`, if any.
    #[must_use]
    pub fn field_error(&self, field: &str) -> Option<&str> {
        self.errors
            .as_ref()
            .and_then(|errors| errors.get(field))
            .and_then(|messages| messages.first())
            .map(String::as_str)
    }
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.errors {
            Some(errors) if !errors.is_empty() => {
                let fields = errors
                    .iter()
                    .map(|(field, messages)| format!("{field}: {}", messages.join(", ")))
                    .collect::<Vec<_>>()
                    .join("; ");
                if self.message.is_empty() {
                    write!(f, "{fields}")
                } else {
                    write!(f, "{} ({fields})", self.message)
                }
            }
            _ => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ErrorResponse {}
