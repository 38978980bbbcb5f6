//! WP-CLI invocation.
//!
//! Every call is `wp --no-color [--allow-root] --path=<dir> <args...>` and goes
//! through the injected [`ProcessRunner`] with the run-wide timeout.

use regex::Regex;

use crate::error::{Error, Result};
use crate::process::{ExecutionResult, ProcessRunner};
use crate::settings::Settings;

/// Working path for commands that do not target a site.
const NEUTRAL_PATH: &str = "/tmp";

/// Sub-resources that can be listed and updated one by one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    Plugin,
    Theme,
}

impl Extension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Extension::Plugin => "plugin",
            Extension::Theme => "theme",
        }
    }
}

pub struct WpCli {
    runner: Box<dyn ProcessRunner>,
    settings: Settings,
}

impl WpCli {
    pub fn new(runner: Box<dyn ProcessRunner>, settings: Settings) -> Self {
        Self { runner, settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn argv(&self, path: &str, args: &[String]) -> Vec<String> {
        let mut argv = vec![self.settings.wp_cli.clone(), "--no-color".to_string()];
        if self.settings.allow_root {
            argv.push("--allow-root".to_string());
        }
        argv.push(format!("--path={}", path));
        argv.extend(args.iter().cloned());
        argv
    }

    pub fn run(&self, path: &str, args: &[String]) -> Result<ExecutionResult> {
        self.runner
            .run(&self.argv(path, args), self.settings.exec_timeout)
    }

    fn run_strs(&self, path: &str, args: &[&str]) -> Result<ExecutionResult> {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        self.run(path, &args)
    }

    /// Confirm the binary is really WP-CLI. Returns its version.
    pub fn verify(&self) -> Result<String> {
        let argv = vec![
            self.settings.wp_cli.clone(),
            "cli".to_string(),
            "version".to_string(),
        ];
        let output = self
            .runner
            .run(&argv, self.settings.exec_timeout)
            .map(|r| r.stdout)
            .unwrap_or_default();

        parse_cli_version(&output)
            .ok_or_else(|| Error::tool_not_functional(&self.settings.wp_cli, output.trim()))
    }

    pub fn self_update(&self) -> Result<ExecutionResult> {
        self.run_strs(NEUTRAL_PATH, &["cli", "update", "--yes"])
    }

    /// Core version at `path`. `None` for anything that is not a working install.
    pub fn core_version(&self, path: &str) -> Option<String> {
        let result = self.run_strs(path, &["core", "version"]).ok()?;
        if !result.success() {
            return None;
        }
        let version = result.stdout.trim();
        (!version.is_empty()).then(|| version.to_string())
    }

    /// Option value, trimmed. Empty on any failure.
    pub fn option(&self, path: &str, name: &str) -> String {
        self.run_strs(path, &["option", "get", name])
            .map(|r| r.stdout.trim().to_string())
            .unwrap_or_default()
    }

    /// Names of active then inactive extensions of `kind`.
    pub fn list(&self, path: &str, kind: Extension) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for status in ["active", "inactive"] {
            let status_arg = format!("--status={}", status);
            let result = self.run_strs(path, &[kind.as_str(), "list", &status_arg, "--field=name"])?;
            if !result.success() {
                let stderr = result.error_text();
                return Err(Error::new(
                    crate::error::ErrorCode::InternalUnexpected,
                    format!("{} list exited with {}: {}", kind.as_str(), result.exit_code, stderr),
                    serde_json::json!({ "stderr": stderr }),
                ));
            }
            names.extend(
                result
                    .stdout
                    .lines()
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string),
            );
        }
        Ok(names)
    }
}

/// `"WP-CLI 2.10.0"` → `Some("2.10.0")`. The version part needs at least one dot.
pub fn parse_cli_version(output: &str) -> Option<String> {
    let banner = Regex::new(r"WP-CLI (\S*\.\S*)").ok()?;
    banner
        .captures(output.trim())
        .map(|caps| caps[1].to_string())
}
