pub mod agent;
pub mod config_cmd;
pub mod serve;
pub mod tools;

use std::path::Path;

use tooloop_config::{AppConfig, ConfigError};

/// Load from `--config` when given, else from the default location.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match path {
        Some(path) => AppConfig::load_with_env(path),
        None => AppConfig::load(),
    }
}
