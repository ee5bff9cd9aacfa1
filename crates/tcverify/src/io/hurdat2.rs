//! HURDAT2 best-track database reader.
//!
//! HURDAT2 is a comma-separated text file made of storm blocks. Each block
//! starts with a header line
//!
//! ```text
//! AL092012,              ISAAC,     63,
//! ```
//!
//! (basin, storm number and year; name; number of entries) followed by that
//! many data lines:
//!
//! ```text
//! 20120821, 0000,  , TS, 15.4N,  52.0W,  40, 1005, ...
//! ```
//!
//! (date, time, record identifier, status, latitude, longitude, maximum
//! wind in knots, minimum pressure in hPa, wind radii...). Missing values
//! are `-99` or `-999`.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{known, parse_coordinate};
use crate::error::{Error, Result};
use crate::position::Position;
use crate::track::Track;

/// One best-track data line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestTrackEntry {
    /// Position and intensity.
    pub position: Position,
    /// Record identifier (`L` landfall, `I` intensity peak, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<char>,
    /// System status (`TD`, `TS`, `HU`, `EX`, ...).
    pub status: String,
}

/// One storm of the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StormRecord {
    /// ATCF identifier, e.g. `AL092012`.
    pub id: String,
    /// Basin code, e.g. `AL`.
    pub basin: String,
    /// Storm number within the season.
    pub number: u32,
    /// Season year.
    pub year: i32,
    /// Storm name (`UNNAMED` for unnamed systems).
    pub name: String,
    /// Data lines in file order.
    pub entries: Vec<BestTrackEntry>,
}

impl StormRecord {
    /// The best track of this storm.
    #[must_use]
    pub fn track(&self) -> Track {
        Track::best_track(self.entries.iter().map(|e| e.position.clone()).collect())
    }

    /// Entries flagged as landfalls.
    pub fn landfalls(&self) -> impl Iterator<Item = &BestTrackEntry> {
        self.entries.iter().filter(|e| e.record_id == Some('L'))
    }
}

/// An in-memory HURDAT2 database.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hurdat2 {
    storms: Vec<StormRecord>,
}

impl Hurdat2 {
    /// Read a HURDAT2 file from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is malformed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| Error::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let source_name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        let db = Self::parse(BufReader::new(file), &source_name)?;
        info!("Loaded {} storms from {}", db.len(), path.display());
        Ok(db)
    }

    /// Parse HURDAT2 text.
    ///
    /// # Errors
    ///
    /// Returns a [`Error::Parse`] naming `source_name` and the line number
    /// for malformed lines or blocks whose entry count does not match the
    /// header.
    pub fn parse<R: BufRead>(reader: R, source_name: &str) -> Result<Self> {
        let mut storms = Vec::new();
        let mut current: Option<(StormRecord, usize, u64)> = None;

        for (idx, line) in reader.lines().enumerate() {
            let line_no = idx as u64 + 1;
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();

            if is_header(&fields) {
                if let Some(block) = current.take() {
                    storms.push(finish_block(block, source_name)?);
                }
                let (record, expected) = parse_header(&fields)
                    .map_err(|message| Error::parse(source_name, line_no, message))?;
                current = Some((record, expected, line_no));
                continue;
            }

            let Some((record, _, _)) = current.as_mut() else {
                return Err(Error::parse(
                    source_name,
                    line_no,
                    "data line before first storm header",
                ));
            };
            let entry =
                parse_entry(&fields).map_err(|message| Error::parse(source_name, line_no, message))?;
            record.entries.push(entry);
        }

        if let Some(block) = current.take() {
            storms.push(finish_block(block, source_name)?);
        }

        debug!("Parsed {} storms from {}", storms.len(), source_name);
        Ok(Self { storms })
    }

    /// All storms in file order.
    #[must_use]
    pub fn storms(&self) -> &[StormRecord] {
        &self.storms
    }

    /// Number of storms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.storms.len()
    }

    /// Check if the database has no storms.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.storms.is_empty()
    }

    /// Find a storm by name and season (case-insensitive).
    ///
    /// If several storms share the name in one season (e.g. `UNNAMED`), the
    /// first is returned.
    #[must_use]
    pub fn find(&self, name: &str, year: i32) -> Option<&StormRecord> {
        self.storms
            .iter()
            .find(|s| s.year == year && s.name.eq_ignore_ascii_case(name))
    }

    /// Find a storm by its ATCF identifier, e.g. `AL092012`.
    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<&StormRecord> {
        self.storms.iter().find(|s| s.id.eq_ignore_ascii_case(id))
    }

    /// Storms of one season.
    pub fn season(&self, year: i32) -> impl Iterator<Item = &StormRecord> {
        self.storms.iter().filter(move |s| s.year == year)
    }
}

fn is_header(fields: &[&str]) -> bool {
    fields.first().is_some_and(|id| {
        id.len() == 8
            && id.as_bytes()[..2].iter().all(u8::is_ascii_alphabetic)
            && id.as_bytes()[2..].iter().all(u8::is_ascii_digit)
    })
}

fn parse_header(fields: &[&str]) -> std::result::Result<(StormRecord, usize), String> {
    if fields.len() < 3 {
        return Err(format!("storm header has {} fields, expected 3", fields.len()));
    }
    let id = fields[0].to_ascii_uppercase();
    let number = id[2..4]
        .parse::<u32>()
        .map_err(|_| format!("invalid storm number in {id}"))?;
    let year = id[4..8]
        .parse::<i32>()
        .map_err(|_| format!("invalid year in {id}"))?;
    let expected = fields[2]
        .parse::<usize>()
        .map_err(|_| format!("invalid entry count: {:?}", fields[2]))?;

    Ok((
        StormRecord {
            basin: id[..2].to_string(),
            id,
            number,
            year,
            name: fields[1].to_string(),
            entries: Vec::new(),
        },
        expected,
    ))
}

fn parse_entry(fields: &[&str]) -> std::result::Result<BestTrackEntry, String> {
    if fields.len() < 8 {
        return Err(format!("data line has {} fields, expected at least 8", fields.len()));
    }

    let stamp = format!("{}{:0>4}", fields[0], fields[1]);
    let time = NaiveDateTime::parse_from_str(&stamp, "%Y%m%d%H%M")
        .map_err(|e| format!("invalid date/time {:?} {:?}: {e}", fields[0], fields[1]))?
        .and_utc();
    let lat = parse_coordinate(fields[4]).ok_or_else(|| format!("invalid latitude: {:?}", fields[4]))?;
    let lon =
        parse_coordinate(fields[5]).ok_or_else(|| format!("invalid longitude: {:?}", fields[5]))?;
    let vmax: f64 = fields[6]
        .parse()
        .map_err(|_| format!("invalid maximum wind: {:?}", fields[6]))?;
    let mslp: f64 = fields[7]
        .parse()
        .map_err(|_| format!("invalid pressure: {:?}", fields[7]))?;

    Ok(BestTrackEntry {
        position: Position::new(time, lat, lon)
            .with_intensity(known(mslp), known(vmax)),
        record_id: fields[2].chars().next(),
        status: fields[3].to_string(),
    })
}

fn finish_block(
    (record, expected, header_line): (StormRecord, usize, u64),
    source_name: &str,
) -> Result<StormRecord> {
    if record.entries.len() != expected {
        return Err(Error::parse(
            source_name,
            header_line,
            format!(
                "storm {} declares {} entries but has {}",
                record.id,
                expected,
                record.entries.len()
            ),
        ));
    }
    Ok(record)
}
