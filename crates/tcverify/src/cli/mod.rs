//! Command-line interface for tcverify.
//!
//! This module provides the CLI structure for the `tcverify` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    BestTrackCommand, ConfigCommand, DistanceCommand, HistoryCommand, OutputFormat,
    SeasonCommand, VerifyCommand,
};

use crate::logging::Verbosity;

/// tcverify - Verify tropical-cyclone track and intensity forecasts
///
/// Matches forecast positions to HURDAT2 best-track fixes and reports
/// great-circle track errors and central pressure errors per model.
#[derive(Debug, Parser)]
#[command(name = "tcverify")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// HURDAT2 best-track file (overrides the configuration)
    #[arg(long, global = true, value_name = "FILE")]
    pub hurdat2: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Verify the forecasts of one storm
    Verify(VerifyCommand),

    /// Verify every storm below a directory
    Season(SeasonCommand),

    /// Show a storm's best track
    BestTrack(BestTrackCommand),

    /// Great-circle distance between two points in km
    Distance(DistanceCommand),

    /// Show recorded verifications
    History(HistoryCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}
