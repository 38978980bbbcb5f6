use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use wpkeeper::apache::ApacheParser;
use wpkeeper::defaults::{self, Defaults};
use wpkeeper::discovery::Sources;
use wpkeeper::gate::{self, DropletMetadata};
use wpkeeper::maintenance::{Collaborators, Maintainer, RunRequest, Selection, WpCliStatus};
use wpkeeper::notify::{HumeNotifier, NoopNotifier, Notifier, Severity};
use wpkeeper::probe::Installation;
use wpkeeper::process::SystemRunner;
use wpkeeper::settings::{self, Settings, SettingsOverrides};
use wpkeeper::OperationReport;

use super::CmdResult;

#[derive(Args, Debug)]
pub struct MaintainArgs {
    /// Apache2 configuration files to scan for DocumentRoots
    #[arg(
        value_name = "APACHE_CONF",
        required_unless_present = "explicit_path",
        conflicts_with = "explicit_path"
    )]
    pub files: Vec<PathBuf>,

    /// Use this directory as the only content root instead of parsing Apache config
    #[arg(long, value_name = "DIR")]
    pub explicit_path: Option<PathBuf>,

    /// Required droplet tags, comma separated (repeatable)
    #[arg(short = 't', long = "tags", value_name = "TAG[,TAG...]")]
    pub tags: Vec<String>,

    /// Allow running as root (also passes --allow-root to WP-CLI)
    #[arg(long)]
    pub allow_root: bool,

    /// Only list discovered installations
    #[arg(short = 'l', long)]
    pub list_only: bool,

    /// Update WordPress core
    #[arg(short = 'C', long)]
    pub update_core: bool,

    /// Update the WordPress database schema
    #[arg(short = 'D', long)]
    pub update_db: bool,

    /// Update plugins
    #[arg(short = 'P', long)]
    pub update_plugins: bool,

    /// Update themes
    #[arg(short = 'T', long)]
    pub update_themes: bool,

    /// Same as -C -D -P -T
    #[arg(short = 'A', long)]
    pub update_all: bool,

    /// Delete expired transients
    #[arg(short = 'E', long)]
    pub delete_expired_transients: bool,

    /// Optimize the database
    #[arg(short = 'O', long)]
    pub optimize_database: bool,

    /// Same as -A -E (does not optimize)
    #[arg(long)]
    pub full: bool,

    /// Run a WP-CLI command on every installation (repeatable)
    #[arg(long = "run", value_name = "COMMAND")]
    pub run: Vec<String>,

    /// Send warnings and errors to humed
    #[arg(long)]
    pub hume: bool,

    /// Do not self-update WP-CLI before running
    #[arg(short = 'W', long)]
    pub skip_wpcli_update: bool,

    /// Path to the wp binary (default: PATH lookup)
    #[arg(long = "path-to-wpcli", value_name = "PATH")]
    pub wp_cli_path: Option<String>,

    /// Skip a plugin: NAME, or PATH:NAME for one installation (repeatable)
    #[arg(long = "skip-plugin", value_name = "[PATH:]NAME")]
    pub skip_plugins: Vec<String>,

    /// Skip a theme: NAME, or PATH:NAME for one installation (repeatable)
    #[arg(long = "skip-theme", value_name = "[PATH:]NAME")]
    pub skip_themes: Vec<String>,

    /// Timeout for each WP-CLI invocation, in seconds
    #[arg(long = "exec-timeout", value_name = "SECS")]
    pub exec_timeout: Option<u64>,
}

impl MaintainArgs {
    fn selection(&self) -> Selection {
        let all = self.update_all || self.full;
        Selection {
            core: self.update_core || all,
            db: self.update_db || all,
            plugins: self.update_plugins || all,
            themes: self.update_themes || all,
            transients: self.delete_expired_transients || self.full,
            optimize: self.optimize_database,
            custom: self.run.clone(),
        }
    }

    fn sources(&self) -> Sources {
        match &self.explicit_path {
            Some(path) => Sources::ExplicitPath(path.clone()),
            None => Sources::ConfigFiles(self.files.clone()),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintainOutput {
    pub started_at: String,
    pub finished_at: String,
    pub wp_cli: WpCliStatus,
    pub installations: Vec<Installation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub operations: Vec<OperationReport>,
}

pub fn run(args: MaintainArgs) -> CmdResult<MaintainOutput> {
    run_as(args, settings::running_as_root())
}

fn run_as(args: MaintainArgs, running_as_root: bool) -> CmdResult<MaintainOutput> {
    // Before the hume lookup and tool resolution, so a refused root run touches nothing.
    settings::ensure_privileges(args.allow_root, running_as_root).map_err(|err| {
        tracing::error!("{}", err);
        err
    })?;

    let started_at = chrono::Local::now().to_rfc3339();
    let defaults = defaults::load_defaults();
    let operations = if args.list_only {
        Vec::new()
    } else {
        args.selection().operations()?
    };

    let notifier = notifier(args.hume, &defaults)?;
    let settings = Settings::resolve(
        SettingsOverrides {
            allow_root: args.allow_root,
            exec_timeout_secs: args.exec_timeout,
            wp_cli_path: args.wp_cli_path.clone(),
        },
        &defaults,
    )
    .map_err(|err| {
        notifier.notify(Severity::Error, &err.message, &defaults.notify.task);
        err
    })?;

    let collaborators = Collaborators {
        runner: Box::new(SystemRunner::new()),
        parser: Box::new(ApacheParser::new()),
        metadata: Box::new(DropletMetadata::new(settings.metadata_url.clone())),
        notifier,
    };
    let request = RunRequest {
        sources: args.sources(),
        required_tags: gate::required_tags((!args.tags.is_empty()).then(|| args.tags.clone())),
        skip_plugins: args.skip_plugins.clone(),
        skip_themes: args.skip_themes.clone(),
        update_wpcli: !args.skip_wpcli_update,
    };

    let maintainer = Maintainer::start(settings, collaborators, request)?;
    let reports = maintainer.run(&operations);

    Ok((
        MaintainOutput {
            started_at,
            finished_at: chrono::Local::now().to_rfc3339(),
            wp_cli: maintainer.wpcli().clone(),
            installations: maintainer.installations().to_vec(),
            operations: reports,
        },
        0,
    ))
}

fn notifier(enabled: bool, defaults: &Defaults) -> wpkeeper::Result<Box<dyn Notifier>> {
    if !enabled {
        return Ok(Box::new(NoopNotifier));
    }
    let hume = HumeNotifier::locate(&defaults.notify.command)?;
    Ok(Box::new(hume))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use wpkeeper::maintenance::Operation;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: MaintainArgs,
    }

    fn parse(argv: &[&str]) -> MaintainArgs {
        TestCli::parse_from(std::iter::once("wpkeeper").chain(argv.iter().copied())).args
    }

    #[test]
    fn root_is_refused_before_hume_or_wp_cli_lookup() {
        let args = parse(&[
            "--hume",
            "--path-to-wpcli",
            "/nonexistent/wp",
            "/nonexistent/apache2.conf",
        ]);
        let err = match run_as(args, true) {
            Err(err) => err,
            Ok(_) => panic!("root should be refused"),
        };
        assert_eq!(err.code.as_str(), "privilege.root_not_allowed");
    }

    #[test]
    fn full_implies_everything_but_optimize() {
        let ops = parse(&["--full", "/etc/apache2/apache2.conf"])
            .selection()
            .operations()
            .unwrap();
        assert_eq!(
            ops,
            vec![
                Operation::UpdateCore,
                Operation::UpdateDb,
                Operation::UpdatePlugins,
                Operation::UpdateThemes,
                Operation::DeleteExpiredTransients,
            ]
        );
    }

    #[test]
    fn tags_and_skips_are_repeatable() {
        let args = parse(&[
            "-t",
            "prod,wp",
            "-t",
            "db",
            "--skip-plugin",
            "akismet",
            "--skip-plugin",
            "/var/www/a:jetpack",
            "a.conf",
            "b.conf",
        ]);
        assert_eq!(args.tags, vec!["prod,wp", "db"]);
        assert_eq!(args.skip_plugins.len(), 2);
        assert_eq!(args.files.len(), 2);
    }

    #[test]
    fn explicit_path_replaces_config_files() {
        let args = parse(&["--explicit-path", "/srv/site", "-l"]);
        assert!(args.list_only);
        assert_eq!(args.sources(), Sources::ExplicitPath(PathBuf::from("/srv/site")));
        assert!(TestCli::try_parse_from(["wpkeeper", "--explicit-path", "/srv", "a.conf"]).is_err());
        assert!(TestCli::try_parse_from(["wpkeeper", "-C"]).is_err());
    }
}
