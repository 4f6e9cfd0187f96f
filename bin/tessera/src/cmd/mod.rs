//! Command implementations.

pub mod build;
pub mod check;
pub mod watch;

use std::path::Path;

use color_eyre::eyre::{Result, WrapErr};
use tessera_core::Config;

/// Load the project configuration, with environment overrides.
pub fn load_config(config_path: &Path) -> Result<Config> {
    Config::load_with_env(config_path)
        .wrap_err_with(|| format!("Failed to load configuration from {}", config_path.display()))
}
