//! Per-model collections of verified runs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ensemble::{self, SpreadPoint};
use crate::track::{ErrorSummary, MatchOptions, Run, Track};

/// All runs of one forecast source for a cyclone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// Model name (e.g. `ECMF`, `GEFS`).
    pub name: String,

    /// Verified runs ordered by initialization time, then technique.
    pub runs: Vec<Run>,

    /// Errors pooled over every verified forecast of every run.
    pub summary: ErrorSummary,

    /// Ensemble spread per initialization and valid time.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spread: Vec<SpreadPoint>,
}

impl Model {
    /// Verify forecast tracks against a best track.
    ///
    /// `min_members` is the smallest ensemble size for which a spread
    /// ellipse is computed.
    #[must_use]
    pub fn from_tracks(
        name: impl Into<String>,
        tracks: &[Track],
        best_track: &Track,
        options: &MatchOptions,
        min_members: usize,
    ) -> Self {
        let name = name.into();
        let mut runs: Vec<Run> = tracks
            .iter()
            .map(|track| track.verify(best_track, options))
            .collect();
        runs.sort_by(|a, b| a.init_time.cmp(&b.init_time).then_with(|| a.tech.cmp(&b.tech)));

        let summary = ErrorSummary::from_forecasts(runs.iter().flat_map(|run| &run.forecasts));
        let spread = ensemble::spread(tracks, min_members);

        debug!(
            model = %name,
            runs = runs.len(),
            fixes = summary.fixes,
            mean_track_error = summary.mean_track_error,
            "Verified model"
        );

        Self {
            name,
            runs,
            summary,
            spread,
        }
    }

    /// Error statistics per lead time.
    #[must_use]
    pub fn by_lead_time(&self) -> BTreeMap<i64, ErrorSummary> {
        let mut grouped: BTreeMap<i64, Vec<_>> = BTreeMap::new();
        for forecast in self.runs.iter().flat_map(|run| &run.forecasts) {
            grouped.entry(forecast.lead_hours).or_default().push(forecast);
        }
        grouped
            .into_iter()
            .map(|(lead, forecasts)| (lead, ErrorSummary::from_forecasts(forecasts)))
            .collect()
    }

    /// Runs whose technique is an ensemble member.
    pub fn members(&self) -> impl Iterator<Item = &Run> {
        self.runs.iter().filter(|run| run.kind.is_member())
    }

    /// Runs whose technique is deterministic.
    pub fn deterministic(&self) -> impl Iterator<Item = &Run> {
        self.runs.iter().filter(|run| !run.kind.is_member())
    }

    /// Number of forecast fixes that could not be verified.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.runs.iter().map(|run| run.dropped).sum()
    }
}
