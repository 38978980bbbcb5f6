use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod output;

use commands::maintain;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "wpkeeper")]
#[command(version = VERSION)]
#[command(about = "Discover WordPress sites from Apache2 config and keep them updated with WP-CLI")]
struct Cli {
    #[command(flatten)]
    args: maintain::MaintainArgs,

    /// Show probing, skip and operation decisions
    #[arg(short, long)]
    verbose: bool,

    /// Also trace every WP-CLI invocation
    #[arg(short, long)]
    debug: bool,

    /// Only report errors
    #[arg(short, long, conflicts_with_all = ["verbose", "debug"])]
    quiet: bool,
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.debug, cli.quiet);

    let (json_result, exit_code) = output::map_cmd_result_to_json(maintain::run(cli.args));
    if let Err(err) = output::print_json_result(json_result) {
        tracing::error!("{}", err);
    }

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

/// Diagnostics go to stderr; stdout is reserved for the JSON envelope.
fn init_tracing(verbose: bool, debug: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if debug {
        EnvFilter::new("warn,wpkeeper=trace")
    } else if verbose {
        EnvFilter::new("warn,wpkeeper=debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
