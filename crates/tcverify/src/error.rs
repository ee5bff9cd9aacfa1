//! Error types for tcverify.
//!
//! This module defines all error types used throughout the tcverify crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for tcverify operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the results database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Input Errors ===
    /// A line of an input file could not be parsed.
    #[error("{source_name}:{line}: {message}")]
    Parse {
        /// File name (or other label) of the input.
        source_name: String,
        /// 1-based line number.
        line: u64,
        /// Description of the problem.
        message: String,
    },

    /// A forecast file name does not follow `<Name>-YYYY-MM-DD-HH.csv`.
    #[error("unrecognised forecast file name: {path}")]
    InvalidFileName {
        /// Offending path.
        path: PathBuf,
    },

    /// CSV decoding failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A storm directory contained no usable forecast files.
    #[error("no forecast files found in {path}")]
    NoForecastFiles {
        /// Directory that was scanned.
        path: PathBuf,
    },

    // === Lookup Errors ===
    /// The storm is not present in the best-track database.
    #[error("storm {name} ({year}) not found in best-track database")]
    StormNotFound {
        /// Storm name as searched.
        name: String,
        /// Season year.
        year: i32,
    },

    /// A best track has no fixes.
    #[error("best track for {name} ({year}) is empty")]
    EmptyBestTrack {
        /// Storm name.
        name: String,
        /// Season year.
        year: i32,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to read an input file.
    #[error("failed to read {path}: {source}")]
    FileRead {
        /// Path that couldn't be read.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for tcverify operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new parse error.
    #[must_use]
    pub fn parse(source_name: impl Into<String>, line: u64, message: impl Into<String>) -> Self {
        Self::Parse {
            source_name: source_name.into(),
            line,
            message: message.into(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a storm-not-found error.
    #[must_use]
    pub fn storm_not_found(name: impl Into<String>, year: i32) -> Self {
        Self::StormNotFound {
            name: name.into(),
            year,
        }
    }

    /// Check if this error is an input problem that a batch run should skip.
    #[must_use]
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            Self::Parse { .. }
                | Self::InvalidFileName { .. }
                | Self::Csv(_)
                | Self::NoForecastFiles { .. }
                | Self::StormNotFound { .. }
                | Self::EmptyBestTrack { .. }
                | Self::FileRead { .. }
        )
    }
}
