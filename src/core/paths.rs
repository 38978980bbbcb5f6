use crate::error::{Error, Result};
use std::env;
use std::path::PathBuf;

/// Base config directory (~/.config/wpkeeper/)
pub fn wpkeeper() -> Result<PathBuf> {
    if let Ok(dir) = env::var("WPKEEPER_CONFIG_DIR") {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }

    let home = env::var("HOME").map_err(|_| {
        Error::internal_unexpected("HOME environment variable not set on Unix-like system")
    })?;
    Ok(PathBuf::from(home).join(".config").join("wpkeeper"))
}

/// Global wpkeeper.json config file path
pub fn wpkeeper_json() -> Result<PathBuf> {
    Ok(wpkeeper()?.join("wpkeeper.json"))
}
