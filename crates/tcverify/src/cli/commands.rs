//! CLI command definitions.
//!
//! This module defines the arguments of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

/// Verify command arguments.
#[derive(Debug, Args)]
pub struct VerifyCommand {
    /// Storm directory with forecast CSV files (at the top level or in one
    /// subdirectory per model)
    pub dir: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,

    /// Add errors per lead time
    #[arg(short, long)]
    pub lead_times: bool,

    /// Record the run summaries in the results database
    #[arg(short, long)]
    pub save: bool,
}

/// Season command arguments.
#[derive(Debug, Args)]
pub struct SeasonCommand {
    /// Directory with one subdirectory per storm
    pub root: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Record the run summaries in the results database
    #[arg(short, long)]
    pub save: bool,
}

/// Best-track command arguments.
#[derive(Debug, Args)]
pub struct BestTrackCommand {
    /// Storm name (case-insensitive)
    pub name: String,

    /// Season year
    pub year: i32,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Distance command arguments.
#[derive(Debug, Args)]
pub struct DistanceCommand {
    /// Latitude of the first point (degrees north)
    #[arg(allow_hyphen_values = true)]
    pub lat1: f64,

    /// Longitude of the first point (degrees east)
    #[arg(allow_hyphen_values = true)]
    pub lon1: f64,

    /// Latitude of the second point (degrees north)
    #[arg(allow_hyphen_values = true)]
    pub lat2: f64,

    /// Longitude of the second point (degrees east)
    #[arg(allow_hyphen_values = true)]
    pub lon2: f64,
}

/// History command arguments.
#[derive(Debug, Args)]
pub struct HistoryCommand {
    /// Only runs of this storm
    #[arg(short, long)]
    pub storm: Option<String>,

    /// Only runs of this model
    #[arg(short, long)]
    pub model: Option<String>,

    /// Maximum number of runs (0 for all)
    #[arg(short, long, default_value = "20")]
    pub limit: usize,

    /// Show per-model averages instead of individual runs
    #[arg(short, long)]
    pub averages: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}
