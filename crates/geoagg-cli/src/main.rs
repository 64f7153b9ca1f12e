//! geoagg command-line runner.
//!
//! Loads one JSON pipeline configuration, runs it, and prints the run
//! summary as JSON on stdout. Failures print the public error as JSON on
//! stderr and exit non-zero.

use clap::{Parser, Subcommand};
use geoagg::{
    Error,
    core::config::{AggregateConfig, RefactorConfig},
    prelude::{ProgressSink, RunSummary},
};
use serde::Serialize;
use std::{cell::Cell, path::PathBuf, process::ExitCode};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "geoagg", version = geoagg::VERSION, about = "Group-by and aggregate vector layers")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Group features and write one aggregated feature per group.
    Aggregate(RunArgs),

    /// Rewrite every feature through field mapping expressions.
    Refactor(RunArgs),
}

#[derive(Debug, clap::Args)]
struct RunArgs {
    /// Pipeline configuration file (JSON).
    #[arg(long, short)]
    config: PathBuf,

    /// Output layer path; overrides the configured one.
    #[arg(long, short)]
    output: Option<PathBuf>,
}

///
/// LogProgress
///
/// Forwards progress to tracing, once per distinct percentage.
///

#[derive(Default)]
struct LogProgress {
    last: Cell<Option<u8>>,
}

impl ProgressSink for LogProgress {
    fn set_progress(&self, percent: u8) {
        if self.last.replace(Some(percent)) != Some(percent) {
            tracing::debug!(percent, "progress");
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli.command) {
        Ok(summary) => print_json(&summary, false),
        Err(err) => {
            tracing::error!(kind = ?err.kind, origin = %err.origin, "{}", err.message);
            print_json(&err, true);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<RunSummary, Error> {
    let progress = LogProgress::default();

    match command {
        Command::Aggregate(args) => {
            let mut config = AggregateConfig::load(&args.config)?;
            if let Some(output) = args.output {
                config.output = output.display().to_string();
            }
            geoagg::aggregate(&config, &progress)
        }
        Command::Refactor(args) => {
            let mut config = RefactorConfig::load(&args.config)?;
            if let Some(output) = args.output {
                config.output = output.display().to_string();
            }
            geoagg::refactor(&config, &progress)
        }
    }
}

fn print_json<T: Serialize>(value: &T, to_stderr: bool) -> ExitCode {
    let text = match serde_json::to_string_pretty(value) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("cannot encode output: {err}");
            return ExitCode::FAILURE;
        }
    };
    if to_stderr {
        eprintln!("{text}");
    } else {
        println!("{text}");
    }

    ExitCode::SUCCESS
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_aggregate_with_output_override() {
        let cli = Cli::try_parse_from([
            "geoagg",
            "aggregate",
            "--config",
            "run.json",
            "--output",
            "out.json",
        ])
        .expect("arguments should parse");

        let Command::Aggregate(args) = cli.command else {
            panic!("expected aggregate subcommand");
        };
        assert_eq!(args.config, PathBuf::from("run.json"));
        assert_eq!(args.output, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn cli_requires_a_config() {
        assert!(Cli::try_parse_from(["geoagg", "refactor"]).is_err());
    }

    #[test]
    fn log_progress_tracks_last_update() {
        let progress = LogProgress::default();
        progress.set_progress(10);
        progress.set_progress(10);

        assert_eq!(progress.last.get(), Some(10));
    }
}
