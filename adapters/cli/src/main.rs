#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays survival matches against the reference arena.

mod match_file;
mod simulation;

use std::{path::PathBuf, time::Duration};

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use crate::{match_file::MatchDefinition, simulation::SimulationOptions};

const DEFAULT_SEED: u64 = 0;

/// Survival wave spawner driven from the terminal.
#[derive(Debug, Parser)]
#[command(name = "survival-waves", version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Play a match file to completion and print its report
    Run(RunArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Match definition to play (TOML)
    #[arg(long = "match", value_name = "FILE")]
    match_file: PathBuf,

    /// Seed for every random draw; overrides the seed in the match file
    #[arg(long)]
    seed: Option<u64>,

    /// Simulated frame length in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 16)]
    dt_ms: u64,

    /// Stop after this many frames even if the match has not ended
    #[arg(long, value_name = "N", default_value_t = 100_000)]
    max_ticks: u64,

    /// Destroy a random live enemy at this interval
    #[arg(long, value_name = "MS")]
    kill_every_ms: Option<u64>,

    /// Report the player as defeated once this much time has passed
    #[arg(long, value_name = "MS")]
    defeat_at_ms: Option<u64>,
}

/// Entry point for the Survival Waves command-line interface.
fn main() -> Result<()> {
    setup_logging();

    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run(args),
    }
}

fn setup_logging() {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: RunArgs) -> Result<()> {
    if args.dt_ms == 0 {
        bail!("--dt-ms must be at least 1");
    }
    if args.kill_every_ms == Some(0) {
        bail!("--kill-every-ms must be at least 1");
    }

    let definition = MatchDefinition::load(&args.match_file)?;
    let seed = args.seed.or(definition.seed).unwrap_or(DEFAULT_SEED);
    let options = SimulationOptions {
        dt: Duration::from_millis(args.dt_ms),
        max_ticks: args.max_ticks,
        kill_every: args.kill_every_ms.map(Duration::from_millis),
        defeat_at: args.defeat_at_ms.map(Duration::from_millis),
    };

    info!(
        path = %args.match_file.display(),
        seed,
        waves = definition.table.total_waves(),
        "starting match"
    );

    let outcome = simulation::run(definition, seed, options, |at, event| {
        if let Some(line) = simulation::describe(event) {
            println!("[{:>8.2}s] {line}", at.as_secs_f64());
        }
    })?;

    println!("{}", simulation::summarize(&outcome));
    if !outcome.finished() {
        bail!("match did not finish within {} ticks", args.max_ticks);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_arguments_parse_with_defaults() {
        let cli = Cli::try_parse_from(["survival-waves", "run", "--match", "arena.toml"])
            .expect("arguments parse");
        let Command::Run(args) = cli.command;

        assert_eq!(args.match_file, PathBuf::from("arena.toml"));
        assert_eq!(args.seed, None);
        assert_eq!(args.dt_ms, 16);
        assert_eq!(args.max_ticks, 100_000);
        assert_eq!(args.kill_every_ms, None);
        assert_eq!(args.defeat_at_ms, None);
    }

    #[test]
    fn run_requires_a_match_file() {
        assert!(Cli::try_parse_from(["survival-waves", "run"]).is_err());
    }

    #[test]
    fn zero_frame_length_is_rejected() {
        let cli = Cli::try_parse_from([
            "survival-waves",
            "run",
            "--match",
            "arena.toml",
            "--dt-ms",
            "0",
        ])
        .expect("arguments parse");
        let Command::Run(args) = cli.command;

        let error = run(args).expect_err("zero dt is invalid");
        assert!(error.to_string().contains("--dt-ms"));
    }
}
