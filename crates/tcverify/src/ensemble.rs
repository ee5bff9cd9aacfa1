//! Ensemble mean position and track spread.
//!
//! Member tracks sharing an initialization time are grouped per valid time.
//! For each group the ensemble mean position, the absolute track spread
//! (mean distance of members from the ensemble mean) and a spread ellipse
//! from the member latitude/longitude covariance are computed.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo;
use crate::position::Position;
use crate::track::Track;

/// Variances at or below this (deg²) give no meaningful ellipse.
const MIN_VARIANCE: f64 = 0.01;

/// Principal axes of the member scatter at one valid time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadEllipse {
    /// Semi-major axis in degrees.
    pub major: f64,
    /// Semi-minor axis in degrees.
    pub minor: f64,
    /// Orientation of the major axis as a compass bearing, clockwise from
    /// north and folded into `[0, 180)`: 0 runs north-south, 90 east-west.
    ///
    /// This differs from the `180 - atan2(..)` math-angle form that some
    /// ensemble tools report, which spans `(0, 360]` and measures from a
    /// different reference axis. Convert before comparing the two.
    pub angle_deg: f64,
}

/// Ensemble statistics at one initialization and valid time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadPoint {
    /// Ensemble initialization time.
    pub init_time: DateTime<Utc>,
    /// Valid time of the member fixes.
    pub valid_time: DateTime<Utc>,
    /// Lead time in hours.
    pub lead_hours: i64,
    /// Number of members with a fix at this time.
    pub members: usize,
    /// Ensemble mean latitude.
    pub mean_lat: f64,
    /// Ensemble mean longitude.
    pub mean_lon: f64,
    /// Mean great-circle distance of members from the ensemble mean (km).
    pub absolute_spread_km: f64,
    /// Spread ellipse, when there are enough members.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ellipse: Option<SpreadEllipse>,
}

/// Compute spread statistics for the ensemble members among `tracks`.
///
/// Deterministic tracks and tracks without an initialization time are
/// ignored. Valid times with fewer than two members are skipped; an
/// ellipse needs at least `min_members`.
#[must_use]
pub fn spread(tracks: &[Track], min_members: usize) -> Vec<SpreadPoint> {
    let mut groups: BTreeMap<(DateTime<Utc>, DateTime<Utc>), Vec<&Position>> = BTreeMap::new();
    for track in tracks.iter().filter(|t| t.kind().is_member()) {
        let Some(init) = track.init_time else {
            continue;
        };
        for position in track.positions() {
            groups.entry((init, position.time)).or_default().push(position);
        }
    }

    groups
        .into_iter()
        .filter(|(_, members)| members.len() >= 2)
        .map(|((init_time, valid_time), members)| {
            let (mean_lat, mean_lon) = mean_position(&members);
            #[allow(clippy::cast_precision_loss)]
            let absolute_spread_km = members
                .iter()
                .map(|p| geo::haversine_km(p.lat, p.lon, mean_lat, mean_lon))
                .sum::<f64>()
                / members.len() as f64;
            let ellipse = if members.len() >= min_members {
                spread_ellipse(&members)
            } else {
                None
            };
            SpreadPoint {
                init_time,
                valid_time,
                lead_hours: (valid_time - init_time).num_hours(),
                members: members.len(),
                mean_lat,
                mean_lon,
                absolute_spread_km,
                ellipse,
            }
        })
        .collect()
}

/// Arithmetic mean latitude and longitude.
#[allow(clippy::cast_precision_loss)]
fn mean_position(members: &[&Position]) -> (f64, f64) {
    let n = members.len() as f64;
    let lat = members.iter().map(|p| p.lat).sum::<f64>() / n;
    let lon = members.iter().map(|p| p.lon).sum::<f64>() / n;
    (lat, lon)
}

/// Eigen-decomposition of the sample covariance of member positions.
#[allow(clippy::cast_precision_loss)]
fn spread_ellipse(members: &[&Position]) -> Option<SpreadEllipse> {
    if members.len() < 2 {
        return None;
    }
    let (mean_lat, mean_lon) = mean_position(members);
    let dof = (members.len() - 1) as f64;
    let var_lat = members.iter().map(|p| (p.lat - mean_lat).powi(2)).sum::<f64>() / dof;
    let var_lon = members.iter().map(|p| (p.lon - mean_lon).powi(2)).sum::<f64>() / dof;
    let cov = members
        .iter()
        .map(|p| (p.lat - mean_lat) * (p.lon - mean_lon))
        .sum::<f64>()
        / dof;

    if var_lat <= MIN_VARIANCE || var_lon <= MIN_VARIANCE {
        return None;
    }

    let half_trace = (var_lat + var_lon) / 2.0;
    let disc = (((var_lat - var_lon) / 2.0).powi(2) + cov.powi(2)).sqrt();
    let (major_eig, minor_eig) = (half_trace + disc, half_trace - disc);

    // Eigenvector of the larger eigenvalue as (lat, lon) components.
    let (v_lat, v_lon) = if cov.abs() > f64::EPSILON {
        (cov, major_eig - var_lat)
    } else if var_lat >= var_lon {
        (1.0, 0.0)
    } else {
        (0.0, 1.0)
    };

    Some(SpreadEllipse {
        major: major_eig.abs().sqrt(),
        minor: minor_eig.abs().sqrt(),
        angle_deg: v_lon.atan2(v_lat).to_degrees().rem_euclid(180.0),
    })
}
