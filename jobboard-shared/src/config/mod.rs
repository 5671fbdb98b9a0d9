//! # Configuration
//!
//! Client-side configuration: backend endpoints, timeouts, logging, and chat behavior.

pub mod client;

pub use client::{ChatConfig, ClientConfig, ConfigError, LogFormat, LoggingConfig};
