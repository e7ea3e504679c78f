//! Configuration loading
//!
//! Layers, lowest priority first: built-in defaults, an optional TOML file,
//! then `HOMEBOARD__SECTION__KEY` environment variables.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::Context;
use config::{Config, Environment, File, FileFormat};
use tracing::info;

use homeboard_core::HomeboardConfig;

/// Default config file, read when present
pub const DEFAULT_CONFIG_FILE: &str = "homeboard.toml";

/// Names an explicit config file, which then must exist
pub const CONFIG_PATH_VAR: &str = "HOMEBOARD_CONFIG";

/// Load from the file named by `HOMEBOARD_CONFIG`, or `homeboard.toml` if present
pub fn load_config() -> anyhow::Result<HomeboardConfig> {
    let explicit = env::var(CONFIG_PATH_VAR).ok().map(PathBuf::from);
    load_config_from(explicit.as_deref())
}

pub fn load_config_from(path: Option<&Path>) -> anyhow::Result<HomeboardConfig> {
    let file = match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            File::from(path).format(FileFormat::Toml).required(true)
        }
        None => File::new(DEFAULT_CONFIG_FILE, FileFormat::Toml).required(false),
    };

    let config: HomeboardConfig = Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix("HOMEBOARD")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("failed to read configuration")?
        .try_deserialize()
        .context("invalid configuration")?;

    config.validate()?;
    Ok(config)
}
