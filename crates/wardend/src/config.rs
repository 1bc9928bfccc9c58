//! Daemon configuration
//!
//! All settings have working defaults; the TOML file is optional and may set
//! any subset of fields.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use warden_api::RULE_BASE_ID;
use warden_core::DEFAULT_REDIRECT_URL;
use warden_util::{default_data_dir, default_socket_path};

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WardendConfig {
    /// Unix socket the IPC server listens on
    pub socket_path: PathBuf,

    /// Directory holding the session database
    pub data_dir: PathBuf,

    /// Neutral destination for views redirected off unblocked domains
    pub redirect_url: String,

    /// Base offset for positional enforcement rule ids
    pub rule_base_id: u32,
}

impl Default for WardendConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            data_dir: default_data_dir(),
            redirect_url: DEFAULT_REDIRECT_URL.to_string(),
            rule_base_id: RULE_BASE_ID,
        }
    }
}

/// Load configuration; `None` means defaults only.
pub fn load_config(path: Option<&Path>) -> Result<WardendConfig> {
    let Some(path) = path else {
        return Ok(WardendConfig::default());
    };

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    toml::from_str(&raw).with_context(|| format!("Invalid config file {}", path.display()))
}
