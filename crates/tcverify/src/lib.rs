//! `tcverify` - Tropical-cyclone forecast track and intensity verification
//!
//! Forecast positions are matched by time to HURDAT2 best-track fixes. Each
//! match yields a great-circle track error, a central pressure error and a
//! maximum wind error. Errors are averaged per forecast run, per model and
//! per cyclone.
//!
//! The object graph is `Cyclone` → `Model` → `Run` → `Forecast` →
//! `Position`, built by [`CycloneLoader`] from a directory of forecast files.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod cyclone;
pub mod ensemble;
pub mod error;
pub mod geo;
pub mod io;
pub mod logging;
pub mod model;
pub mod position;
pub mod report;
pub mod storage;
pub mod track;

pub use config::Config;
pub use cyclone::{Cyclone, CycloneLoader, VerifyOptions};
pub use error::{Error, Result};
pub use io::Hurdat2;
pub use logging::init_logging;
pub use model::Model;
pub use position::{Forecast, Position};
pub use storage::{Storage, StorageStats};
pub use track::{ErrorSummary, MatchOptions, Run, Track, TrackKind};
