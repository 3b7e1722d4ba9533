//! diffcov CLI - diff coverage for Go repositories
//!
//! Reports how many of the lines changed since a branch are exercised by
//! tests, using a Go cover profile and `git diff`.

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;

use commands::*;
use output::OutputFormat;

/// Diff coverage for Go repositories.
///
/// diffcov matches the lines changed since a branch against a Go cover
/// profile and reports the changed lines no test exercises.
#[derive(Parser)]
#[command(name = "diffcov")]
#[command(author, version)]
#[command(about = "Diff coverage for Go repositories")]
#[command(propagate_version = true)]
#[command(next_help_heading = "Options")]
#[command(after_help = "Examples:
  go test -coverprofile=coverage.out ./...
  diffcov diff --cover-profile coverage.out
  diffcov diff . --cover-profile coverage.out --compare-branch origin/main --coverage-baseline 80
  diffcov --format json diff --cover-profile coverage.out --diff-file changes.patch")]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format (overrides config default)
    #[arg(long, global = true, value_enum)]
    format: Option<OutputFormat>,

    /// Borderless tables and single-line JSON
    #[arg(long, global = true)]
    compact: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute diff coverage of a repository against a branch
    Diff(diff::DiffArgs),

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: completions::Shell,

        /// Show installation instructions instead of generating completions
        #[arg(long)]
        instructions: bool,
    },
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let command = match cli.command {
        Some(cmd) => cmd,
        None => {
            let _ = Cli::command().print_help();
            println!();
            return Ok(());
        }
    };

    match command {
        Commands::Diff(args) => diff::run(&args, cli.format, cli.compact),
        Commands::Completions {
            shell,
            instructions,
        } => {
            if instructions {
                completions::run(shell, cli.format.unwrap_or_default(), cli.compact);
            } else {
                let mut cmd = Cli::command();
                completions::write_completions(shell, &mut cmd, &mut std::io::stdout());
            }
            Ok(())
        }
    }
}
