mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./tracksift.toml",
        "~/.config/tracksift/config.toml",
        "/etc/tracksift/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.extract.chunk_size == 0 {
        anyhow::bail!("extract.chunk_size must be greater than 0");
    }

    if config.extract.max_element_size == 0 {
        anyhow::bail!("extract.max_element_size must be greater than 0");
    }

    if config.http.timeout_secs == 0 {
        anyhow::bail!("http.timeout_secs must be greater than 0");
    }

    if config.http.user_agent.trim().is_empty() {
        tracing::warn!("http.user_agent is empty; requests will carry no User-Agent");
    }

    Ok(())
}
