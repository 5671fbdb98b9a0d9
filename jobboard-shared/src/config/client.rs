use std::{env, fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";
const DEFAULT_REALTIME_URL: &str = "http://localhost:4000/realtime";
const DEFAULT_PRESENCE_CHANNEL: &str = "online-users";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration file {path}: {message}")]
    Parse { path: String, message: String },
    #[error("unsupported configuration format for {0}; use yaml, json, or toml")]
    UnsupportedFormat(String),
    #[error("invalid value for {name}: {message}")]
    InvalidEnv { name: &'static str, message: String },
    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Presence channel every client tracks itself on.
    pub presence_channel: String,
    /// Whether the backend records `read_at`; when off, unread badges stay at zero.
    pub read_receipts: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            presence_channel: DEFAULT_PRESENCE_CHANNEL.to_string(),
            read_receipts: true,
        }
    }
}

/// Client configuration resolved from defaults, an optional file, and `JOBBOARD_*` variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub realtime_url: String,
    pub request_timeout_secs: u64,
    pub logging: LoggingConfig,
    pub chat: ChatConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ClientConfig {
    /// Generates a default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            realtime_url: DEFAULT_REALTIME_URL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            logging: LoggingConfig::default(),
            chat: ChatConfig::default(),
        }
    }

    /// Loads the configuration from a file, environment variables, or defaults.
    ///
    /// Environment variables only apply to values the file left at their default.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, an environment
    /// override is malformed, or the resolved configuration fails validation.
    pub fn load_config(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => Self::with_defaults(),
        };

        config.apply_env_overrides()?;
        config.validate().map_err(ConfigError::Invalid)?;

        tracing::debug!(
            api = %config.api_base_url,
            realtime = %config.realtime_url,
            "resolved client configuration"
        );
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        let parse_error = |message: String| ConfigError::Parse {
            path: display.clone(),
            message,
        };

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => {
                serde_yml::from_str(&content).map_err(|err| parse_error(err.to_string()))
            }
            Some("json") => {
                serde_json::from_str(&content).map_err(|err| parse_error(err.to_string()))
            }
            Some("toml") => toml::from_str(&content).map_err(|err| parse_error(err.to_string())),
            _ => Err(ConfigError::UnsupportedFormat(display.clone())),
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        let defaults = Self::with_defaults();

        if self.api_base_url == defaults.api_base_url
            && let Ok(value) = env::var("JOBBOARD_API_URL")
        {
            self.api_base_url = value;
        }
        if self.realtime_url == defaults.realtime_url
            && let Ok(value) = env::var("JOBBOARD_REALTIME_URL")
        {
            self.realtime_url = value;
        }
        if self.request_timeout_secs == defaults.request_timeout_secs
            && let Ok(value) = env::var("JOBBOARD_REQUEST_TIMEOUT_SECS")
        {
            self.request_timeout_secs =
                value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                    name: "JOBBOARD_REQUEST_TIMEOUT_SECS",
                    message: format!("expected a whole number of seconds, got `{value}`"),
                })?;
        }
        if self.logging.level == defaults.logging.level
            && let Ok(value) = env::var("JOBBOARD_LOG_LEVEL")
        {
            self.logging.level = value;
        }
        if self.logging.format == defaults.logging.format
            && let Ok(value) = env::var("JOBBOARD_LOG_FORMAT")
        {
            self.logging.format = match value.trim().to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "text" => LogFormat::Text,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        name: "JOBBOARD_LOG_FORMAT",
                        message: format!("expected `text` or `json`, got `{value}`"),
                    });
                }
            };
        }

        Ok(())
    }

    /// Validate the resolved configuration.
    ///
    /// # Errors
    /// Returns every problem found rather than stopping at the first one.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for (name, value) in [
            ("api_base_url", &self.api_base_url),
            ("realtime_url", &self.realtime_url),
        ] {
            match Url::parse(value) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {}
                Ok(url) => errors.push(format!(
                    "{name} must use http or https, got `{}`",
                    url.scheme()
                )),
                Err(err) => errors.push(format!("{name} is not a valid URL: {err}")),
            }
        }

        if self.request_timeout_secs == 0 {
            errors.push("request_timeout_secs must be greater than 0".to_string());
        }

        if self.chat.presence_channel.trim().is_empty() {
            errors.push("chat.presence_channel must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
