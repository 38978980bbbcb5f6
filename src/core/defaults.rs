//! File-backed defaults for a maintenance run.
//!
//! `~/.config/wpkeeper/wpkeeper.json` may override any of the built-in values
//! below. Every field is optional; a missing file means built-in defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::paths;

pub const DEFAULT_METADATA_URL: &str = "http://169.254.169.254/metadata/v1.json";

/// Root configuration structure for wpkeeper.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default = "default_exec_timeout_secs")]
    pub exec_timeout_secs: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wp_cli_path: Option<String>,

    #[serde(default = "default_metadata_url")]
    pub metadata_url: String,

    #[serde(default = "default_marker_file")]
    pub marker_file: String,

    #[serde(default = "default_notify")]
    pub notify: NotifyConfig,
}

/// Settings for the optional hume notification sink
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default = "default_notify_command")]
    pub command: String,

    #[serde(default = "default_notify_task")]
    pub task: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            exec_timeout_secs: default_exec_timeout_secs(),
            wp_cli_path: None,
            metadata_url: default_metadata_url(),
            marker_file: default_marker_file(),
            notify: default_notify(),
        }
    }
}

// =============================================================================
// Default value functions
// =============================================================================

fn default_exec_timeout_secs() -> u64 {
    300
}

fn default_metadata_url() -> String {
    DEFAULT_METADATA_URL.to_string()
}

fn default_marker_file() -> String {
    "wp-config.php".to_string()
}

fn default_notify() -> NotifyConfig {
    NotifyConfig {
        command: default_notify_command(),
        task: default_notify_task(),
    }
}

fn default_notify_command() -> String {
    "hume".to_string()
}

fn default_notify_task() -> String {
    "WPUPDATER".to_string()
}

// =============================================================================
// Loading functions
// =============================================================================

/// Load wpkeeper.json, falling back to built-in defaults.
///
/// A missing file is silent. A present but broken file is reported once
/// and ignored.
pub fn load_defaults() -> Defaults {
    let path = match paths::wpkeeper_json() {
        Ok(path) => path,
        Err(_) => return Defaults::default(),
    };

    if !path.exists() {
        return Defaults::default();
    }

    match load_defaults_from(&path) {
        Ok(defaults) => defaults,
        Err(err) => {
            tracing::warn!("Ignoring {}: {}", path.display(), err.details);
            Defaults::default()
        }
    }
}

/// Load defaults from an explicit file.
pub fn load_defaults_from(path: &Path) -> Result<Defaults> {
    let content = fs::read_to_string(path).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("read {}", path.display())))
    })?;

    serde_json::from_str(&content)
        .map_err(|e| Error::config_invalid_json(path.display().to_string(), e))
}
