//! Log output for the CLI. Everything goes to stderr so command output stays pipeable.

use shared::config::{LogFormat, LoggingConfig};
use tracing_subscriber::{EnvFilter, filter::LevelFilter, fmt};

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn initialize_tracing(logging: &LoggingConfig) {
    let fmt_builder = fmt::fmt()
        .with_env_filter(build_env_filter(logging))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true);

    let installed = if matches!(logging.format, LogFormat::Json) {
        fmt_builder.json().with_ansi(false).try_init()
    } else {
        fmt_builder.with_ansi(true).try_init()
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

fn build_env_filter(logging: &LoggingConfig) -> EnvFilter {
    let default_level = default_level(logging);
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::builder()
            .with_default_directive(default_level.into())
            .from_env_lossy()
    })
}

fn default_level(logging: &LoggingConfig) -> LevelFilter {
    logging.level.parse::<LevelFilter>().unwrap_or(LevelFilter::INFO)
}
