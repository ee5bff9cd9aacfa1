//! Tracks, time matching and per-run error statistics.
//!
//! A [`Track`] is an ordered sequence of fixes: either the best track or one
//! forecast run (a technique initialised at a given time). Verifying a
//! forecast track against the best track produces a [`Run`] holding the
//! matched [`Forecast`]s and their [`ErrorSummary`].

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::position::{Forecast, Position};

/// Technique label used for best tracks.
pub const BEST_TRACK_TECH: &str = "BEST";

/// Whether a track is a deterministic forecast or an ensemble member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    /// A single deterministic forecast (or the best track).
    Deterministic,
    /// Ensemble member with its member number.
    Member(u8),
}

impl TrackKind {
    /// Classify a technique identifier.
    ///
    /// Ensemble techniques are two letters followed by a two-digit member
    /// number (`EE01`, `AP05`, `AC00`).
    #[must_use]
    pub fn from_tech(tech: &str) -> Self {
        let bytes = tech.as_bytes();
        if bytes.len() == 4
            && bytes[..2].iter().all(u8::is_ascii_alphabetic)
            && bytes[2..].iter().all(u8::is_ascii_digit)
        {
            if let Ok(member) = tech[2..].parse() {
                return Self::Member(member);
            }
        }
        Self::Deterministic
    }

    /// Check if this is an ensemble member.
    #[must_use]
    pub fn is_member(&self) -> bool {
        matches!(self, Self::Member(_))
    }
}

/// Options controlling how forecast fixes are matched to the best track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOptions {
    /// Largest allowed time difference between a forecast fix and its
    /// verifying best-track fix. Zero means exact matches only.
    pub tolerance: Duration,

    /// Forecast fixes beyond this lead time are ignored. `None` keeps
    /// every lead time.
    pub max_lead_hours: Option<i64>,
}

/// Default lead-time cap in hours.
pub const DEFAULT_MAX_LEAD_HOURS: i64 = 144;

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            tolerance: Duration::zero(),
            max_lead_hours: Some(DEFAULT_MAX_LEAD_HOURS),
        }
    }
}

/// An ordered sequence of cyclone fixes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Technique identifier (`BEST` for best tracks).
    pub tech: String,

    /// Initialization time of a forecast run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub init_time: Option<DateTime<Utc>>,

    positions: Vec<Position>,
}

impl Track {
    /// Create a track; fixes are sorted by valid time.
    #[must_use]
    pub fn new(
        tech: impl Into<String>,
        init_time: Option<DateTime<Utc>>,
        mut positions: Vec<Position>,
    ) -> Self {
        positions.sort_by_key(|p| p.time);
        Self {
            tech: tech.into(),
            init_time,
            positions,
        }
    }

    /// Create a best track.
    #[must_use]
    pub fn best_track(positions: Vec<Position>) -> Self {
        Self::new(BEST_TRACK_TECH, None, positions)
    }

    /// The fixes, ordered by time.
    #[must_use]
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    /// Number of fixes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Check if the track has no fixes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Deterministic or ensemble member.
    #[must_use]
    pub fn kind(&self) -> TrackKind {
        TrackKind::from_tech(&self.tech)
    }

    /// Time of the first fix.
    #[must_use]
    pub fn formation(&self) -> Option<DateTime<Utc>> {
        self.positions.first().map(|p| p.time)
    }

    /// Time of the last fix.
    #[must_use]
    pub fn dissipation(&self) -> Option<DateTime<Utc>> {
        self.positions.last().map(|p| p.time)
    }

    /// Lead time of a fix in whole hours relative to the initialization time.
    #[must_use]
    pub fn lead_hours(&self, position: &Position) -> i64 {
        self.init_time
            .map_or(0, |init| (position.time - init).num_hours())
    }

    /// Index of the fix closest to `time`, if within `tolerance`.
    ///
    /// Ties resolve to the earlier fix.
    #[must_use]
    pub fn find_match(&self, time: DateTime<Utc>, tolerance: Duration) -> Option<usize> {
        let idx = self.positions.partition_point(|p| p.time < time);
        let before = idx.checked_sub(1);
        let after = (idx < self.positions.len()).then_some(idx);

        let gap = |i: usize| (self.positions[i].time - time).abs();
        let best = match (before, after) {
            (Some(b), Some(a)) => {
                if gap(a) < gap(b) {
                    a
                } else {
                    b
                }
            }
            (Some(b), None) => b,
            (None, Some(a)) => a,
            (None, None) => return None,
        };

        (gap(best) <= tolerance).then_some(best)
    }

    /// Direction of motion at a fix, from the neighbouring fixes.
    ///
    /// Uses the previous and next fix where both exist and one-sided
    /// differences at the ends. `None` for single-fix tracks or when the
    /// neighbouring fixes coincide.
    #[must_use]
    pub fn heading_at(&self, idx: usize) -> Option<f64> {
        let n = self.positions.len();
        if n < 2 || idx >= n {
            return None;
        }
        let from = &self.positions[idx.saturating_sub(1)];
        let to = &self.positions[(idx + 1).min(n - 1)];
        if from.great_circle(to) == 0.0 {
            return None;
        }
        Some(from.bearing_to(to))
    }

    /// Verify this forecast track against a best track.
    ///
    /// Fixes without a best-track fix inside the matching tolerance, or
    /// beyond the maximum lead time, are dropped and counted.
    #[must_use]
    pub fn verify(&self, best_track: &Track, options: &MatchOptions) -> Run {
        let mut forecasts = Vec::with_capacity(self.positions.len());
        let mut dropped = 0;

        for position in &self.positions {
            let lead_hours = self.lead_hours(position);
            if options.max_lead_hours.is_some_and(|max| lead_hours > max) {
                dropped += 1;
                continue;
            }
            let Some(idx) = best_track.find_match(position.time, options.tolerance) else {
                trace!(tech = %self.tech, time = %position.time, "No best-track fix for forecast");
                dropped += 1;
                continue;
            };
            forecasts.push(Forecast::verify(
                position.clone(),
                lead_hours,
                &best_track.positions[idx],
                best_track.heading_at(idx),
            ));
        }

        let summary = ErrorSummary::from_forecasts(&forecasts);
        Run {
            tech: self.tech.clone(),
            init_time: self.init_time,
            kind: self.kind(),
            forecasts,
            dropped,
            summary,
        }
    }
}

/// Mean error statistics over a set of verified forecasts.
///
/// Every mean is 0 when no forecast contributes to it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ErrorSummary {
    /// Number of verified forecasts.
    pub fixes: usize,
    /// Mean great-circle track error (km).
    pub mean_track_error: f64,
    /// Mean central pressure error (hPa).
    pub mean_intensity_error: f64,
    /// Mean maximum wind error (kt).
    pub mean_wind_error: f64,
    /// Mean along-track error (km).
    pub along_track_bias: f64,
    /// Mean cross-track error (km).
    pub cross_track_bias: f64,
}

impl ErrorSummary {
    /// Summarise forecasts by arithmetic mean.
    pub fn from_forecasts<'a, I>(forecasts: I) -> Self
    where
        I: IntoIterator<Item = &'a Forecast>,
    {
        let mut track = Mean::default();
        let mut intensity = Mean::default();
        let mut wind = Mean::default();
        let mut along = Mean::default();
        let mut cross = Mean::default();

        for forecast in forecasts {
            track.push(Some(forecast.track_error));
            intensity.push(forecast.intensity_error);
            wind.push(forecast.wind_error);
            along.push(forecast.along_track_error);
            cross.push(forecast.cross_track_error);
        }

        Self {
            fixes: track.count,
            mean_track_error: track.value(),
            mean_intensity_error: intensity.value(),
            mean_wind_error: wind.value(),
            along_track_bias: along.value(),
            cross_track_bias: cross.value(),
        }
    }
}

#[derive(Default)]
struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    fn push(&mut self, value: Option<f64>) {
        if let Some(value) = value {
            self.sum += value;
            self.count += 1;
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn value(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// A forecast track verified against the best track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    /// Technique identifier.
    pub tech: String,

    /// Initialization time.
    pub init_time: Option<DateTime<Utc>>,

    /// Deterministic or ensemble member.
    pub kind: TrackKind,

    /// Matched forecasts, ordered by valid time.
    pub forecasts: Vec<Forecast>,

    /// Forecast fixes that could not be verified.
    pub dropped: usize,

    /// Mean errors over `forecasts`.
    pub summary: ErrorSummary,
}
