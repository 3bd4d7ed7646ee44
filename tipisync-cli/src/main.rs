//! tipisync: keep a curated Runtipi app store fork in step with upstream.
//!
//! # Usage
//!
//! ```text
//! tipisync [--root <dir>] [-v|-vv] <command>
//!
//! tipisync sync [--dry-run] [--no-publish] [--json]
//! tipisync plan [--upstream <dir>] [--json]
//! tipisync diff <app> [--upstream <dir>]
//! tipisync filter [--dry-run] [--commit] [--json]
//! tipisync mirror [--dry-run] [--no-publish] [--json]
//! tipisync setup-custom [--dry-run] [--no-publish]
//! ```
//!
//! Exit status: `0` nothing changed, `1` packages were (or would be) added,
//! updated or removed, `2` the run could not complete.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;

use commands::{
    diff::DiffArgs, filter::FilterArgs, mirror::MirrorArgs, plan::PlanArgs,
    setup_custom::SetupCustomArgs, sync::SyncArgs, Outcome,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "tipisync",
    version,
    about = "Sync a curated Runtipi app store fork with upstream",
    long_about = None,
)]
struct Cli {
    /// Repository root. Defaults to the current directory.
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply upstream adds and updates allowed by the sync policy.
    Sync(SyncArgs),

    /// Show what a sync would do without changing anything.
    Plan(PlanArgs),

    /// Show a unified diff of one app against upstream.
    Diff(DiffArgs),

    /// Remove local apps the sync policy does not include.
    Filter(FilterArgs),

    /// Replace the upstream branch with upstream's full app set.
    Mirror(MirrorArgs),

    /// Build the custom branch holding only custom apps.
    SetupCustom(SetupCustomArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli) {
        Ok(outcome) => outcome.exit_code(),
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<Outcome> {
    let root = match cli.root {
        Some(dir) => dir,
        None => std::env::current_dir().context("could not determine current directory")?,
    };
    let root = root
        .canonicalize()
        .with_context(|| format!("repository root {} does not exist", root.display()))?;
    tracing::debug!(root = %root.display(), "resolved repository root");

    match cli.command {
        Commands::Sync(args) => args.run(&root),
        Commands::Plan(args) => args.run(&root),
        Commands::Diff(args) => args.run(&root),
        Commands::Filter(args) => args.run(&root),
        Commands::Mirror(args) => args.run(&root),
        Commands::SetupCustom(args) => args.run(&root),
    }
}

/// Logs go to stderr so `--json` output on stdout stays parseable.
fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
