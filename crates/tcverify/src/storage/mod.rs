//! Storage layer for verification results.
//!
//! This module provides `SQLite`-based persistence of per-run error
//! summaries so that verification history can be compared across storms
//! and seasons.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cyclone::Cyclone;
use crate::error::{Error, Result};
use crate::track::{ErrorSummary, Run};

/// Columns selected for [`RunRecord`]s, in `row_to_record` order.
const RECORD_COLUMNS: &str = "id, storm, year, model, tech, is_member, init_time, fixes, \
     dropped, mean_track_error, mean_intensity_error, mean_wind_error, along_track_bias, \
     cross_track_bias, recorded_at";

/// A stored run verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Row ID, `None` before insertion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Storm name (upper case).
    pub storm: String,
    /// Season year.
    pub year: i32,
    /// Model name.
    pub model: String,
    /// Technique identifier.
    pub tech: String,
    /// Whether the technique is an ensemble member.
    pub is_member: bool,
    /// Initialization time.
    pub init_time: Option<DateTime<Utc>>,
    /// Forecast fixes that could not be verified.
    pub dropped: usize,
    /// Error statistics of the run.
    pub summary: ErrorSummary,
    /// When the run was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl RunRecord {
    /// Build a record for a verified run.
    #[must_use]
    pub fn from_run(storm: &str, year: i32, model: &str, run: &Run) -> Self {
        Self {
            id: None,
            storm: storm.to_uppercase(),
            year,
            model: model.to_uppercase(),
            tech: run.tech.clone(),
            is_member: run.kind.is_member(),
            init_time: run.init_time,
            dropped: run.dropped,
            summary: run.summary,
            recorded_at: Utc::now(),
        }
    }
}

/// Filters for [`Storage::history`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    /// Only runs of this storm (case-insensitive).
    pub storm: Option<String>,
    /// Only runs of this model (case-insensitive).
    pub model: Option<String>,
    /// Maximum number of records; 0 for unlimited.
    pub limit: usize,
}

/// Fix-weighted averages of the stored runs of one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelAverage {
    /// Model name.
    pub model: String,
    /// Number of stored runs.
    pub runs: i64,
    /// Total verified fixes.
    pub fixes: i64,
    /// Mean track error (km), weighted by fixes.
    pub mean_track_error: f64,
    /// Mean central pressure error (hPa), weighted by fixes.
    pub mean_intensity_error: f64,
    /// Mean maximum wind error (kt), weighted by fixes.
    pub mean_wind_error: f64,
}

/// Storage engine for verification results.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a results database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store a run verification, replacing an earlier record of the same
    /// storm, model, technique and initialization time.
    ///
    /// Returns the row ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn record_run(&self, record: &RunRecord) -> Result<i64> {
        insert_record(&self.conn, record)
    }

    /// Store every run of a cyclone in one transaction.
    ///
    /// Returns the number of runs recorded.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails; nothing is stored
    /// in that case.
    pub fn record_cyclone(&mut self, cyclone: &Cyclone) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut recorded = 0;
        for (name, model) in &cyclone.models {
            for run in &model.runs {
                insert_record(&tx, &RunRecord::from_run(&cyclone.name, cyclone.year, name, run))?;
                recorded += 1;
            }
        }
        tx.commit()?;

        info!(storm = %cyclone.name, year = cyclone.year, runs = recorded, "Recorded verification");
        Ok(recorded)
    }

    /// Stored runs, most recent initialization first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn history(&self, filter: &HistoryFilter) -> Result<Vec<RunRecord>> {
        let sql = format!(
            r"
            SELECT {RECORD_COLUMNS}
            FROM run_verifications
            WHERE (?1 IS NULL OR storm = ?1 COLLATE NOCASE)
              AND (?2 IS NULL OR model = ?2 COLLATE NOCASE)
            ORDER BY init_time DESC, storm, model, tech
            LIMIT ?3
            "
        );
        let mut stmt = self.conn.prepare(&sql)?;

        let limit = if filter.limit == 0 {
            -1
        } else {
            i64::try_from(filter.limit).unwrap_or(i64::MAX)
        };
        let records = stmt
            .query_map(
                params![filter.storm, filter.model, limit],
                Self::row_to_record,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Per-model averages over stored runs, weighted by verified fixes.
    ///
    /// Runs without verified fixes do not contribute to the means.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn model_averages(&self, storm: Option<&str>) -> Result<Vec<ModelAverage>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT model,
                   COUNT(*),
                   SUM(fixes),
                   COALESCE(SUM(mean_track_error * fixes) / NULLIF(SUM(fixes), 0), 0.0),
                   COALESCE(SUM(mean_intensity_error * fixes) / NULLIF(SUM(fixes), 0), 0.0),
                   COALESCE(SUM(mean_wind_error * fixes) / NULLIF(SUM(fixes), 0), 0.0)
            FROM run_verifications
            WHERE (?1 IS NULL OR storm = ?1 COLLATE NOCASE)
            GROUP BY model
            ORDER BY model
            ",
        )?;

        let averages = stmt
            .query_map([storm], |row| {
                Ok(ModelAverage {
                    model: row.get(0)?,
                    runs: row.get(1)?,
                    fixes: row.get(2)?,
                    mean_track_error: row.get(3)?,
                    mean_intensity_error: row.get(4)?,
                    mean_wind_error: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(averages)
    }

    /// Count stored runs.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM run_verifications", [], |row| {
                    row.get(0)
                })?;
        Ok(count)
    }

    /// Delete every stored run of a storm.
    ///
    /// Returns the number of runs deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_storm(&self, storm: &str, year: i32) -> Result<usize> {
        let affected = self.conn.execute(
            "DELETE FROM run_verifications WHERE storm = ?1 COLLATE NOCASE AND year = ?2",
            params![storm, year],
        )?;
        if affected > 0 {
            info!("Deleted {} runs of {} {}", affected, storm, year);
        }
        Ok(affected)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let total_runs = self.count()?;

        let (storms, models): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(DISTINCT storm || '-' || year), COUNT(DISTINCT model) FROM run_verifications",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let (oldest, newest): (Option<String>, Option<String>) = self
            .conn
            .query_row(
                "SELECT MIN(init_time), MAX(init_time) FROM run_verifications WHERE init_time != ''",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
            .unwrap_or((None, None));

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            total_runs,
            storms,
            models,
            oldest_init: oldest.as_deref().and_then(parse_time),
            newest_init: newest.as_deref().and_then(parse_time),
            db_size_bytes,
        })
    }

    /// Convert a database row to a `RunRecord`.
    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<RunRecord> {
        let init_time: String = row.get(6)?;
        let recorded_at: String = row.get(14)?;

        Ok(RunRecord {
            id: Some(row.get(0)?),
            storm: row.get(1)?,
            year: row.get(2)?,
            model: row.get(3)?,
            tech: row.get(4)?,
            is_member: row.get(5)?,
            init_time: parse_time(&init_time),
            dropped: to_count(row.get(8)?),
            summary: ErrorSummary {
                fixes: to_count(row.get(7)?),
                mean_track_error: row.get(9)?,
                mean_intensity_error: row.get(10)?,
                mean_wind_error: row.get(11)?,
                along_track_bias: row.get(12)?,
                cross_track_bias: row.get(13)?,
            },
            recorded_at: parse_time(&recorded_at).unwrap_or_else(Utc::now),
        })
    }
}

/// Statistics about the results store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageStats {
    /// Total number of stored runs.
    pub total_runs: i64,
    /// Number of distinct storms.
    pub storms: i64,
    /// Number of distinct models.
    pub models: i64,
    /// Earliest stored initialization time.
    pub oldest_init: Option<DateTime<Utc>>,
    /// Latest stored initialization time.
    pub newest_init: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

fn insert_record(conn: &Connection, record: &RunRecord) -> Result<i64> {
    let summary = &record.summary;
    conn.execute(
        r"
        INSERT INTO run_verifications (
            storm, year, model, tech, is_member, init_time, fixes, dropped,
            mean_track_error, mean_intensity_error, mean_wind_error,
            along_track_bias, cross_track_bias, recorded_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        ON CONFLICT (storm, year, model, tech, init_time) DO UPDATE SET
            is_member = excluded.is_member,
            fixes = excluded.fixes,
            dropped = excluded.dropped,
            mean_track_error = excluded.mean_track_error,
            mean_intensity_error = excluded.mean_intensity_error,
            mean_wind_error = excluded.mean_wind_error,
            along_track_bias = excluded.along_track_bias,
            cross_track_bias = excluded.cross_track_bias,
            recorded_at = excluded.recorded_at
        ",
        params![
            record.storm,
            record.year,
            record.model,
            record.tech,
            record.is_member,
            record.init_time.map(format_time).unwrap_or_default(),
            i64::try_from(summary.fixes).unwrap_or(i64::MAX),
            i64::try_from(record.dropped).unwrap_or(i64::MAX),
            summary.mean_track_error,
            summary.mean_intensity_error,
            summary.mean_wind_error,
            summary.along_track_bias,
            summary.cross_track_bias,
            format_time(record.recorded_at),
        ],
    )?;

    let id: i64 = conn.query_row(
        r"
        SELECT id FROM run_verifications
        WHERE storm = ?1 AND year = ?2 AND model = ?3 AND tech = ?4 AND init_time = ?5
        ",
        params![
            record.storm,
            record.year,
            record.model,
            record.tech,
            record.init_time.map(format_time).unwrap_or_default(),
        ],
        |row| row.get(0),
    )?;
    debug!("Stored run {} {} as id {}", record.model, record.tech, id);
    Ok(id)
}

/// RFC 3339 with whole seconds, so text order is time order.
fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_time(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn to_count(value: i64) -> usize {
    usize::try_from(value).unwrap_or(0)
}
