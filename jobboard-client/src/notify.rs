//! User-facing notifications.
//!
//! [`Notification::from_error`] is the only place gateway failures are turned
//! into text for the user; screens never format errors themselves.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use crate::error::{ErrorKind, GatewayError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, AsRefStr, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: Level,
    pub text: String,
}

impl Notification {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: Level::Warning,
            text: text.into(),
        }
    }

    /// Map a gateway failure onto what the user should see.
    ///
    /// `action` names what was being attempted, e.g. "loading messages".
    #[must_use]
    pub fn from_error(action: &str, err: &GatewayError) -> Self {
        let (level, text) = match err.kind() {
            ErrorKind::Network => (
                Level::Error,
                format!("{action} failed: the server could not be reached ({})", err.message()),
            ),
            ErrorKind::Unauthorized => (
                Level::Warning,
                format!(
                    "{action} failed: your session is missing or expired; run `jobboard session login`"
                ),
            ),
            ErrorKind::Validation => {
                let mut text = format!("{action} failed: {}", err.message());
                for (field, messages) in err.field_errors() {
                    text.push_str(&format!("\n  {field}: {}", messages.join(", ")));
                }
                (Level::Warning, text)
            }
            ErrorKind::NotFound => (Level::Info, format!("{action}: nothing was found")),
            ErrorKind::Server => (
                Level::Error,
                format!("{action} failed: the server reported an error ({})", err.message()),
            ),
            ErrorKind::Decode => (
                Level::Error,
                format!("{action} failed: the server sent a response this client does not understand"),
            ),
        };
        Self { level, text }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.text)
    }
}
