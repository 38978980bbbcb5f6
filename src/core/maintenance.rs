//! Maintenance orchestration.
//!
//! [`Maintainer::start`] runs every pre-flight gate in order (privileges,
//! WP-CLI self-check, tag gate, discovery) and either returns a ready
//! maintainer or aborts. [`Maintainer::execute`] then applies one operation
//! to every installation; a failing installation is reported and the batch
//! moves on.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::apache::ConfigParser;
use crate::discovery::{self, Sources};
use crate::error::{Error, Result};
use crate::gate::{self, MetadataProvider};
use crate::notify::{Notifier, Severity};
use crate::output::OperationReport;
use crate::probe::Installation;
use crate::process::ProcessRunner;
use crate::settings::Settings;
use crate::skip::{self, SkipSpec};
use crate::wpcli::{Extension, WpCli};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    UpdateCore,
    UpdateDb,
    UpdatePlugins,
    UpdateThemes,
    DeleteExpiredTransients,
    OptimizeDatabase,
    /// Arbitrary WP-CLI command, already split into words.
    Custom { command: String, args: Vec<String> },
}

impl Operation {
    /// Parse a `--run` value with shell-style quoting.
    pub fn custom(command: &str) -> Result<Self> {
        let args = shell_words::split(command).map_err(|err| {
            Error::validation_invalid_argument("run", err.to_string(), Some(command.to_string()))
        })?;
        if args.is_empty() {
            return Err(Error::validation_invalid_argument(
                "run",
                "Command is empty",
                Some(command.to_string()),
            ));
        }
        Ok(Operation::Custom {
            command: command.to_string(),
            args,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::UpdateCore => "update-core",
            Operation::UpdateDb => "update-db",
            Operation::UpdatePlugins => "update-plugins",
            Operation::UpdateThemes => "update-themes",
            Operation::DeleteExpiredTransients => "delete-expired-transients",
            Operation::OptimizeDatabase => "optimize-database",
            Operation::Custom { .. } => "run",
        }
    }
}

/// Which operations to run. [`Selection::operations`] fixes their order.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub core: bool,
    pub db: bool,
    pub plugins: bool,
    pub themes: bool,
    pub transients: bool,
    pub optimize: bool,
    pub custom: Vec<String>,
}

impl Selection {
    pub fn operations(&self) -> Result<Vec<Operation>> {
        let mut ops = Vec::new();
        let fixed = [
            (self.core, Operation::UpdateCore),
            (self.db, Operation::UpdateDb),
            (self.plugins, Operation::UpdatePlugins),
            (self.themes, Operation::UpdateThemes),
            (self.transients, Operation::DeleteExpiredTransients),
            (self.optimize, Operation::OptimizeDatabase),
        ];
        ops.extend(fixed.into_iter().filter(|(on, _)| *on).map(|(_, op)| op));
        for command in &self.custom {
            ops.push(Operation::custom(command)?);
        }
        Ok(ops)
    }
}

/// External systems the maintainer talks to.
pub struct Collaborators {
    pub runner: Box<dyn ProcessRunner>,
    pub parser: Box<dyn ConfigParser>,
    pub metadata: Box<dyn MetadataProvider>,
    pub notifier: Box<dyn Notifier>,
}

#[derive(Debug, Clone)]
pub struct RunRequest {
    pub sources: Sources,
    pub required_tags: Option<BTreeSet<String>>,
    pub skip_plugins: Vec<String>,
    pub skip_themes: Vec<String>,
    pub update_wpcli: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WpCliStatus {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_update: Option<bool>,
}

pub struct Maintainer {
    wp: WpCli,
    notifier: Box<dyn Notifier>,
    wpcli: WpCliStatus,
    installations: Vec<Installation>,
    skip_plugins: Vec<SkipSpec>,
    skip_themes: Vec<SkipSpec>,
}

impl Maintainer {
    pub fn start(settings: Settings, collaborators: Collaborators, request: RunRequest) -> Result<Self> {
        let Collaborators {
            runner,
            parser,
            metadata,
            notifier,
        } = collaborators;
        let task = settings.notify_task.clone();
        let abort = |err: Error| {
            tracing::error!("{}", err);
            notifier.notify(Severity::Error, &err.message, &task);
            err
        };

        settings.check_privileges().map_err(abort)?;

        let wp = WpCli::new(runner, settings);
        let version = wp.verify().map_err(abort)?;
        tracing::debug!("Using WP-CLI {} at {}", version, wp.settings().wp_cli);

        gate::authorize(request.required_tags.as_ref(), metadata.as_ref()).map_err(abort)?;

        let self_update = request.update_wpcli.then(|| update_wpcli(&wp, notifier.as_ref(), &task));

        let skip_plugins = parse_skips("plugin", &request.skip_plugins, notifier.as_ref(), &task);
        let skip_themes = parse_skips("theme", &request.skip_themes, notifier.as_ref(), &task);

        let roots = discovery::content_roots(&request.sources, parser.as_ref(), notifier.as_ref(), &task)
            .map_err(abort)?;
        let installations = discovery::discover(&wp, &roots);

        Ok(Self {
            wp,
            notifier,
            wpcli: WpCliStatus {
                version,
                self_update,
            },
            installations,
            skip_plugins,
            skip_themes,
        })
    }

    pub fn installations(&self) -> &[Installation] {
        &self.installations
    }

    pub fn wpcli(&self) -> &WpCliStatus {
        &self.wpcli
    }

    /// Run `operations` in the given order.
    pub fn run(&self, operations: &[Operation]) -> Vec<OperationReport> {
        operations.iter().map(|op| self.execute(op)).collect()
    }

    /// Apply one operation to every installation.
    pub fn execute(&self, operation: &Operation) -> OperationReport {
        let mut report = OperationReport::new(operation.name());
        tracing::info!("Running {} on {} installation(s)", operation.name(), self.installations.len());

        for site in &self.installations {
            let path = site.path.as_str();
            match operation {
                Operation::UpdateCore => {
                    self.invoke(&mut report, path, None, &["core", "update"], |err| {
                        format!("Error updating core {}: {}", path, err)
                    });
                }
                Operation::UpdateDb => {
                    self.invoke(&mut report, path, None, &["core", "update-db"], |err| {
                        format!("Error updating database {}: {}", path, err)
                    });
                }
                Operation::UpdatePlugins => {
                    self.update_extensions(&mut report, path, Extension::Plugin, &self.skip_plugins)
                }
                Operation::UpdateThemes => {
                    self.update_extensions(&mut report, path, Extension::Theme, &self.skip_themes)
                }
                Operation::DeleteExpiredTransients => {
                    self.invoke(&mut report, path, None, &["transient", "delete", "--expired"], |err| {
                        format!("Error deleting transients {}: {}", path, err)
                    });
                }
                Operation::OptimizeDatabase => {
                    self.invoke(&mut report, path, None, &["db", "optimize"], |err| {
                        format!("Error whilst optimizing database {}: {}", path, err)
                    });
                }
                Operation::Custom { command, args } => {
                    let args: Vec<&str> = args.iter().map(String::as_str).collect();
                    let output = self.invoke(&mut report, path, Some(command.as_str()), &args, |err| {
                        format!("Error running \"{}\" in {}: {}", command, path, err)
                    });
                    if let Some(stdout) = output.filter(|s| !s.trim().is_empty()) {
                        tracing::info!("{} [{}]:\n{}", path, command, stdout.trim_end());
                    }
                }
            }
        }

        report
    }

    fn update_extensions(
        &self,
        report: &mut OperationReport,
        path: &str,
        kind: Extension,
        skips: &[SkipSpec],
    ) {
        let names = match self.wp.list(path, kind) {
            Ok(names) => names,
            Err(err) => {
                self.warn(format!("Error listing {}s in {}: {}", kind.as_str(), path, err));
                report.record_error(path, None, err.to_string());
                return;
            }
        };

        for name in &names {
            if skip::should_skip(skips, name, path) {
                tracing::debug!("Skipping {} {} in {}", kind.as_str(), name, path);
                report.record_skipped(path, Some(name.as_str()));
                continue;
            }
            self.invoke(report, path, Some(name.as_str()), &[kind.as_str(), "update", name.as_str()], |err| {
                format!("Error updating {} {} in {}: {}", kind.as_str(), name, path, err)
            });
        }
    }

    /// One WP-CLI call against one installation. Returns stdout on success.
    fn invoke(
        &self,
        report: &mut OperationReport,
        path: &str,
        name: Option<&str>,
        args: &[&str],
        failure: impl FnOnce(&str) -> String,
    ) -> Option<String> {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let error = match self.wp.run(path, &args) {
            Ok(result) if result.success() => {
                tracing::debug!("{} {}: ok", path, args.join(" "));
                report.record_updated(path, name);
                return Some(result.stdout);
            }
            Ok(result) => result.error_text(),
            Err(err) => err.message,
        };

        self.warn(failure(&error));
        report.record_error(path, name, error);
        None
    }

    fn warn(&self, message: String) {
        tracing::warn!("{}", message);
        self.notifier
            .notify(Severity::Warning, &message, &self.wp.settings().notify_task);
    }
}

fn update_wpcli(wp: &WpCli, notifier: &dyn Notifier, task: &str) -> bool {
    let error = match wp.self_update() {
        Ok(result) if result.success() => {
            let message = result.stdout.trim();
            tracing::info!("{}", message);
            notifier.notify(Severity::Info, message, task);
            return true;
        }
        Ok(result) => result.error_text(),
        Err(err) => err.message,
    };

    let message = format!("Error updating WP-CLI itself: {}", error);
    tracing::warn!("{}", message);
    notifier.notify(Severity::Warning, &message, task);
    false
}

fn parse_skips(kind: &str, tokens: &[String], notifier: &dyn Notifier, task: &str) -> Vec<SkipSpec> {
    let (specs, rejected) = skip::parse_specs(tokens);
    for invalid in rejected {
        let message = format!("Ignoring --skip-{} {}", kind, invalid);
        tracing::warn!("{}", message);
        notifier.notify(Severity::Warning, &message, task);
    }
    specs
}
