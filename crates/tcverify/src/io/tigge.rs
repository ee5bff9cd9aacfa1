//! TIGGE-derived forecast CSV reader.
//!
//! Each file holds every forecast track of one storm for one
//! initialization and is named `<Name>-YYYY-MM-DD-HH.csv`. Rows are
//!
//! ```text
//! basin, number, init (YYYYMMDDHH), tnum, tech, forecastHr, lat, lon, vmax, mslp[, type]
//! AL, 09, 2012082100, 03, EE01,  12, 15.9, -53.1,  41, 1003, XX
//! ```
//!
//! Header rows (first field `basin`) may appear anywhere, since files are
//! built by appending and sorting.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{known, parse_coordinate};
use crate::error::{Error, Result};
use crate::position::Position;
use crate::track::Track;

/// Default file-name convention for forecast files.
pub const DEFAULT_FILE_PATTERN: &str =
    r"^(?P<name>[A-Za-z][A-Za-z_]*)-(?P<year>\d{4})-(?P<month>\d{2})-(?P<day>\d{2})-(?P<hour>\d{2})\.csv$";

/// Capture groups a file-name pattern must define.
const REQUIRED_GROUPS: [&str; 5] = ["name", "year", "month", "day", "hour"];

/// Minimum number of columns in a data row.
const MIN_COLUMNS: usize = 10;

/// Storm and initialization time encoded in a forecast file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastFileName {
    /// Storm name as written in the file name.
    pub storm: String,
    /// Season year.
    pub year: i32,
    /// Initialization time.
    pub init_time: DateTime<Utc>,
}

/// A compiled forecast file-name convention.
#[derive(Debug, Clone)]
pub struct FileNamePattern {
    regex: Regex,
}

impl FileNamePattern {
    /// Compile a file-name pattern.
    ///
    /// The pattern must define the named groups `name`, `year`, `month`,
    /// `day` and `hour`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] for invalid regexes or missing groups.
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| Error::ConfigValidation {
            message: format!("invalid file pattern {pattern}: {e}"),
        })?;
        let names: Vec<&str> = regex.capture_names().flatten().collect();
        if let Some(missing) = REQUIRED_GROUPS.iter().find(|g| !names.contains(*g)) {
            return Err(Error::ConfigValidation {
                message: format!("file pattern {pattern} lacks the named group '{missing}'"),
            });
        }
        Ok(Self { regex })
    }

    /// Extract storm and initialization time from a file path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFileName`] if the file name does not match.
    pub fn parse(&self, path: &Path) -> Result<ForecastFileName> {
        let invalid = || Error::InvalidFileName {
            path: path.to_path_buf(),
        };
        let file_name = path.file_name().and_then(|n| n.to_str()).ok_or_else(invalid)?;
        let caps = self.regex.captures(file_name).ok_or_else(invalid)?;
        let number = |group: &str| caps[group].parse::<u32>().map_err(|_| invalid());

        let year = caps["year"].parse::<i32>().map_err(|_| invalid())?;
        let init_time = NaiveDate::from_ymd_opt(year, number("month")?, number("day")?)
            .and_then(|d| d.and_hms_opt(number("hour").ok()?, 0, 0))
            .ok_or_else(invalid)?
            .and_utc();

        Ok(ForecastFileName {
            storm: caps["name"].to_string(),
            year,
            init_time,
        })
    }

    /// Check if a path looks like a forecast file.
    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| self.regex.is_match(n))
    }
}

impl Default for FileNamePattern {
    fn default() -> Self {
        Self::new(DEFAULT_FILE_PATTERN).expect("default file pattern is valid")
    }
}

/// The tracks read from one forecast file.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastFile {
    /// Storm and initialization from the file name.
    pub name: ForecastFileName,
    /// One track per technique and initialization time.
    pub tracks: Vec<Track>,
    /// Rows skipped for missing coordinates.
    pub skipped_rows: usize,
}

impl ForecastFile {
    /// Read a forecast file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file name does not follow `pattern`, the file
    /// cannot be read, or a row is malformed.
    pub fn read(path: &Path, pattern: &FileNamePattern) -> Result<Self> {
        let name = pattern.parse(path)?;
        let file = File::open(path).map_err(|source| Error::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let source_name = path.display().to_string();
        let (tracks, skipped_rows) = read_tracks(file, &source_name)?;
        debug!(
            file = %source_name,
            tracks = tracks.len(),
            skipped_rows,
            "Read forecast file"
        );
        Ok(Self {
            name,
            tracks,
            skipped_rows,
        })
    }
}

/// Read forecast rows and group them into tracks.
///
/// Returns the tracks ordered by (technique, initialization) and the number
/// of rows skipped for missing coordinates. Duplicate valid times within a
/// track keep the first row.
///
/// # Errors
///
/// Returns an error for undecodable CSV or malformed rows.
pub fn read_tracks<R: Read>(reader: R, source_name: &str) -> Result<(Vec<Track>, usize)> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut grouped: BTreeMap<(String, DateTime<Utc>), BTreeMap<DateTime<Utc>, Position>> =
        BTreeMap::new();
    let mut skipped = 0;

    for record in csv_reader.records() {
        let record = record?;
        let line = record.position().map_or(0, csv::Position::line);
        let first = record.get(0).unwrap_or_default();
        if record.iter().all(str::is_empty) || first.eq_ignore_ascii_case("basin") {
            continue;
        }

        let row = parse_row(&record).map_err(|message| Error::parse(source_name, line, message))?;
        let Some(row) = row else {
            trace!(line, "Skipping row without a usable position");
            skipped += 1;
            continue;
        };

        grouped
            .entry((row.tech, row.init_time))
            .or_default()
            .entry(row.position.time)
            .or_insert(row.position);
    }

    let tracks = grouped
        .into_iter()
        .map(|((tech, init), positions)| Track::new(tech, Some(init), positions.into_values().collect()))
        .collect();
    Ok((tracks, skipped))
}

struct Row {
    tech: String,
    init_time: DateTime<Utc>,
    position: Position,
}

/// Parse one data row; `Ok(None)` when the position is missing.
fn parse_row(record: &csv::StringRecord) -> std::result::Result<Option<Row>, String> {
    if record.len() < MIN_COLUMNS {
        return Err(format!(
            "row has {} columns, expected at least {MIN_COLUMNS}",
            record.len()
        ));
    }
    let field = |i: usize| record.get(i).unwrap_or_default();

    let init_time = NaiveDateTime::parse_from_str(&format!("{}00", field(2)), "%Y%m%d%H%M")
        .map_err(|_| format!("invalid initialization time: {:?}", field(2)))?
        .and_utc();
    let tech = field(4).to_ascii_uppercase();
    if tech.is_empty() {
        return Err("missing technique".to_string());
    }
    let valid_time = field(5)
        .parse::<i64>()
        .ok()
        .filter(|lead| *lead >= 0)
        .and_then(TimeDelta::try_hours)
        .and_then(|lead| init_time.checked_add_signed(lead))
        .ok_or_else(|| format!("invalid forecast hour: {:?}", field(5)))?;

    let lat = parse_coordinate(field(6)).ok_or_else(|| format!("invalid latitude: {:?}", field(6)))?;
    let lon =
        parse_coordinate(field(7)).ok_or_else(|| format!("invalid longitude: {:?}", field(7)))?;
    if !(-90.0..=90.0).contains(&lat) || !(-360.0..=360.0).contains(&lon) || (lat == 0.0 && lon == 0.0)
    {
        return Ok(None);
    }

    let vmax = optional_value(field(8)).map_err(|_| format!("invalid maximum wind: {:?}", field(8)))?;
    let mslp = optional_value(field(9)).map_err(|_| format!("invalid pressure: {:?}", field(9)))?;

    Ok(Some(Row {
        position: Position::new(valid_time, lat, lon)
            .with_intensity(mslp, vmax),
        tech,
        init_time,
    }))
}

fn optional_value(text: &str) -> std::result::Result<Option<f64>, std::num::ParseFloatError> {
    if text.is_empty() {
        return Ok(None);
    }
    Ok(known(text.parse()?))
}
