use std::collections::BTreeMap;

use reqwest::StatusCode;
use shared::models::ErrorResponse;
use strum::{AsRefStr, Display};
use thiserror::Error;

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Coarse failure classes every gateway call is reduced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Transport failure: connection refused, DNS, timeout, broken stream.
    Network,
    /// Missing, expired, or rejected bearer token.
    Unauthorized,
    /// Request rejected with field-level errors.
    Validation,
    /// The requested resource does not exist.
    NotFound,
    /// Any other non-success response.
    Server,
    /// The response body did not match the expected shape.
    Decode,
}

#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct GatewayError {
    kind: ErrorKind,
    message: String,
    status: Option<StatusCode>,
    field_errors: BTreeMap<String, Vec<String>>,
    #[source]
    source: Option<reqwest::Error>,
}

impl GatewayError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            field_errors: BTreeMap::new(),
            source: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Decode, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    /// Classify a non-success response from its status and raw body.
    #[must_use]
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let kind = match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ErrorKind::Unauthorized,
            StatusCode::NOT_FOUND => ErrorKind::NotFound,
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ErrorKind::Validation,
            _ => ErrorKind::Server,
        };

        let response = ErrorResponse::from_body(body);
        let message = if response.message.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        } else {
            response.message
        };

        Self {
            kind,
            message,
            status: Some(status),
            field_errors: response.errors.unwrap_or_default(),
            source: None,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        self.status
    }

    #[must_use]
    pub const fn field_errors(&self) -> &BTreeMap<String, Vec<String>> {
        &self.field_errors
    }

    #[must_use]
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_decode() {
            ErrorKind::Decode
        } else if let Some(status) = err.status() {
            return Self::from_status(status, "");
        } else {
            ErrorKind::Network
        };

        Self {
            kind,
            message: err.to_string(),
            status: err.status(),
            field_errors: BTreeMap::new(),
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::decode(err.to_string())
    }
}

impl From<url::ParseError> for GatewayError {
    fn from(err: url::ParseError) -> Self {
        Self::network(format!("invalid endpoint: {err}"))
    }
}
