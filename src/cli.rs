//! CLI definitions for Cadence.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Cadence CLI.
#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Lightweight cron job scheduler with retries and job chaining")]
#[command(version)]
pub(crate) struct Cli {
    /// Settings file (default: <home>/config.toml)
    #[arg(short, long, global = true, env = "CADENCE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run the schedule until interrupted
    Run {
        /// Schedule definition (YAML)
        schedule: PathBuf,

        /// Do not start the inspection API
        #[arg(long)]
        no_server: bool,
    },

    /// Run one job once and exit with its status
    Exec {
        /// Schedule definition (YAML)
        schedule: PathBuf,

        /// Job name
        job: String,
    },

    /// Check a schedule definition and print warnings
    Validate {
        /// Schedule definition (YAML)
        schedule: PathBuf,
    },

    /// Show the most recent recorded runs of a job
    Runs {
        /// Job name
        job: String,

        /// Number of runs to show
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}
