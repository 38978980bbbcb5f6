//! Best-effort notification sink.
//!
//! The orchestrator always holds a [`Notifier`]; when no sink is configured it
//! is [`NoopNotifier`]. Delivery failures are logged and swallowed.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::process::{ProcessRunner, SystemRunner};

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait Notifier {
    fn notify(&self, severity: Severity, message: &str, task: &str);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _severity: Severity, _message: &str, _task: &str) {}
}

/// Sends messages through the hume client (`hume -L <level> -t <task> <msg>`),
/// which forwards them to the local humed daemon.
pub struct HumeNotifier<R: ProcessRunner = SystemRunner> {
    command: PathBuf,
    runner: R,
}

impl HumeNotifier<SystemRunner> {
    /// Locate the client binary once, at startup.
    pub fn locate(command: &str) -> Result<Self> {
        let expanded = shellexpand::tilde(command).to_string();
        let path = which::which(&expanded).map_err(|_| Error::notifier_unavailable(command))?;
        Ok(Self::with_runner(path, SystemRunner::new()))
    }
}

impl<R: ProcessRunner> HumeNotifier<R> {
    pub fn with_runner(command: PathBuf, runner: R) -> Self {
        Self { command, runner }
    }

    fn argv(&self, severity: Severity, message: &str, task: &str) -> Vec<String> {
        vec![
            self.command.display().to_string(),
            "-L".to_string(),
            severity.as_str().to_string(),
            "-t".to_string(),
            task.to_string(),
            message.to_string(),
        ]
    }
}

impl<R: ProcessRunner> Notifier for HumeNotifier<R> {
    fn notify(&self, severity: Severity, message: &str, task: &str) {
        match self.runner.run(&self.argv(severity, message, task), DELIVERY_TIMEOUT) {
            Ok(result) if result.success() => {}
            Ok(result) => tracing::debug!("hume delivery failed: {}", result.error_text()),
            Err(err) => tracing::debug!("hume delivery failed: {}", err),
        }
    }
}
