//! Immutable settings for one run.
//!
//! Built once at startup from CLI flags layered over `wpkeeper.json`, then
//! handed to every component. Nothing reads ambient process state after this.

use std::time::Duration;

use crate::defaults::Defaults;
use crate::error::{Error, Result};

pub const WP_CLI_BINARY: &str = "wp";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Operator explicitly allowed running as root; also adds `--allow-root` to WP-CLI calls.
    pub allow_root: bool,
    /// Effective UID was 0 when settings were resolved.
    pub running_as_root: bool,
    pub exec_timeout: Duration,
    pub wp_cli: String,
    pub marker_file: String,
    pub metadata_url: String,
    pub notify_task: String,
}

/// Values supplied on the command line. `None` falls through to the file/built-in value.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub allow_root: bool,
    pub exec_timeout_secs: Option<u64>,
    pub wp_cli_path: Option<String>,
}

impl Settings {
    pub fn resolve(overrides: SettingsOverrides, defaults: &Defaults) -> Result<Self> {
        let timeout_secs = match overrides.exec_timeout_secs {
            Some(0) => {
                return Err(Error::validation_invalid_argument(
                    "exec-timeout",
                    "Timeout must be at least one second",
                    Some("0".to_string()),
                ))
            }
            Some(secs) => secs,
            None if defaults.exec_timeout_secs == 0 => {
                return Err(Error::config_invalid_value(
                    "exec_timeout_secs",
                    Some("0".to_string()),
                    "Timeout must be at least one second",
                ))
            }
            None => defaults.exec_timeout_secs,
        };

        let wp_cli = match overrides.wp_cli_path.or_else(|| defaults.wp_cli_path.clone()) {
            Some(path) => shellexpand::tilde(&path).to_string(),
            None => which::which(WP_CLI_BINARY)
                .map(|p| p.display().to_string())
                .map_err(|_| Error::tool_not_found(WP_CLI_BINARY))?,
        };

        Ok(Self {
            allow_root: overrides.allow_root,
            running_as_root: running_as_root(),
            exec_timeout: Duration::from_secs(timeout_secs),
            wp_cli,
            marker_file: defaults.marker_file.clone(),
            metadata_url: defaults.metadata_url.clone(),
            notify_task: defaults.notify.task.clone(),
        })
    }

    pub fn check_privileges(&self) -> Result<()> {
        ensure_privileges(self.allow_root, self.running_as_root)
    }
}

/// Refuse to run as root unless the operator opted in.
///
/// Callable before any settings exist, so nothing is looked up or spawned first.
pub fn ensure_privileges(allow_root: bool, running_as_root: bool) -> Result<()> {
    if running_as_root && !allow_root {
        return Err(Error::root_not_allowed());
    }
    Ok(())
}

pub fn running_as_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(allow_root: bool, running_as_root: bool) -> Settings {
        Settings {
            allow_root,
            running_as_root,
            exec_timeout: Duration::from_secs(300),
            wp_cli: "/usr/local/bin/wp".to_string(),
            marker_file: "wp-config.php".to_string(),
            metadata_url: crate::defaults::DEFAULT_METADATA_URL.to_string(),
            notify_task: "WPUPDATER".to_string(),
        }
    }

    #[test]
    fn root_without_opt_in_is_refused() {
        let err = settings(false, true).check_privileges().unwrap_err();
        assert_eq!(err.code.as_str(), "privilege.root_not_allowed");
    }

    #[test]
    fn root_with_opt_in_is_allowed() {
        assert!(settings(true, true).check_privileges().is_ok());
        assert!(settings(false, false).check_privileges().is_ok());
    }

    #[test]
    fn privileges_can_be_checked_without_settings() {
        let err = ensure_privileges(false, true).unwrap_err();
        assert_eq!(err.code.as_str(), "privilege.root_not_allowed");
        assert!(ensure_privileges(true, true).is_ok());
        assert!(ensure_privileges(false, false).is_ok());
    }

    #[test]
    fn cli_values_override_file_values() {
        let defaults = Defaults {
            exec_timeout_secs: 60,
            wp_cli_path: Some("/opt/wp-from-file".to_string()),
            ..Defaults::default()
        };
        let resolved = Settings::resolve(
            SettingsOverrides {
                allow_root: true,
                exec_timeout_secs: Some(30),
                wp_cli_path: Some("/opt/wp-from-cli".to_string()),
            },
            &defaults,
        )
        .unwrap();

        assert_eq!(resolved.exec_timeout, Duration::from_secs(30));
        assert_eq!(resolved.wp_cli, "/opt/wp-from-cli");
        assert!(resolved.allow_root);
    }

    #[test]
    fn file_tool_path_is_used_when_flag_absent() {
        let defaults = Defaults {
            wp_cli_path: Some("/opt/wp-from-file".to_string()),
            ..Defaults::default()
        };
        let resolved = Settings::resolve(SettingsOverrides::default(), &defaults).unwrap();
        assert_eq!(resolved.wp_cli, "/opt/wp-from-file");
        assert_eq!(resolved.exec_timeout, Duration::from_secs(300));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let defaults = Defaults {
            wp_cli_path: Some("/opt/wp".to_string()),
            ..Defaults::default()
        };
        let err = Settings::resolve(
            SettingsOverrides {
                exec_timeout_secs: Some(0),
                ..SettingsOverrides::default()
            },
            &defaults,
        )
        .unwrap_err();
        assert_eq!(err.code.as_str(), "validation.invalid_argument");
    }
}
