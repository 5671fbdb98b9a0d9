use std::{fs, path::Path};

use anyhow::{Context, Result};
use clap::ValueEnum;
use shared::config::ClientConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Serialize the default configuration in `format`.
///
/// # Errors
/// Returns an error if serialization fails.
pub fn render_config(format: ConfigFormat) -> Result<String> {
    let config = ClientConfig::with_defaults();
    let rendered = match format {
        ConfigFormat::Yaml => serde_yml::to_string(&config)?,
        ConfigFormat::Json => serde_json::to_string_pretty(&config)?,
        ConfigFormat::Toml => toml::to_string_pretty(&config)?,
    };
    Ok(rendered)
}

/// Print the template, or write it to `output`.
///
/// # Errors
/// Returns an error if serialization or writing the file fails.
pub fn generate_config(format: ConfigFormat, output: Option<&Path>) -> Result<()> {
    let rendered = render_config(format)?;
    match output {
        Some(path) => {
            fs::write(path, rendered.as_bytes())
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("Configuration file '{}' generated successfully.", path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}
