//! Cyclone fixes and per-fix forecast errors.
//!
//! A [`Position`] is a single observed or forecast fix. A [`Forecast`] is a
//! forecast fix that has been matched against a best-track fix and carries
//! the resulting errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo;

/// One observed or forecast cyclone fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Valid time of the fix.
    pub time: DateTime<Utc>,

    /// Latitude of the cyclone centre (degrees, north positive).
    pub lat: f64,

    /// Longitude of the cyclone centre (degrees, east positive).
    pub lon: f64,

    /// Minimum central pressure in hPa, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mslp: Option<f64>,

    /// Maximum sustained wind in knots, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vmax: Option<f64>,
}

impl Position {
    /// Create a fix with unknown intensity.
    #[must_use]
    pub fn new(time: DateTime<Utc>, lat: f64, lon: f64) -> Self {
        Self {
            time,
            lat,
            lon,
            mslp: None,
            vmax: None,
        }
    }

    /// Attach intensity information.
    #[must_use]
    pub fn with_intensity(mut self, mslp: Option<f64>, vmax: Option<f64>) -> Self {
        self.mslp = mslp;
        self.vmax = vmax;
        self
    }

    /// Great-circle distance to another fix in kilometres.
    #[must_use]
    pub fn great_circle(&self, other: &Position) -> f64 {
        geo::haversine_km(self.lat, self.lon, other.lat, other.lon)
    }

    /// Compass bearing from this fix towards another.
    #[must_use]
    pub fn bearing_to(&self, other: &Position) -> f64 {
        geo::initial_bearing_deg(self.lat, self.lon, other.lat, other.lon)
    }

    /// Central pressure difference `self - other` in hPa.
    ///
    /// `None` when either pressure is unknown.
    #[must_use]
    pub fn intensity_error(&self, other: &Position) -> Option<f64> {
        Some(self.mslp? - other.mslp?)
    }

    /// Maximum wind difference `self - other` in knots.
    #[must_use]
    pub fn wind_error(&self, other: &Position) -> Option<f64> {
        Some(self.vmax? - other.vmax?)
    }
}

/// A forecast fix verified against the best track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    /// The forecast fix.
    pub position: Position,

    /// Hours since the forecast was initialised.
    pub lead_hours: i64,

    /// Great-circle distance to the verifying best-track fix (km).
    pub track_error: f64,

    /// Forecast minus best-track central pressure (hPa).
    pub intensity_error: Option<f64>,

    /// Forecast minus best-track maximum wind (kt).
    pub wind_error: Option<f64>,

    /// Along-track component of the position error (km, positive ahead).
    pub along_track_error: Option<f64>,

    /// Cross-track component of the position error (km, positive right).
    pub cross_track_error: Option<f64>,
}

impl Forecast {
    /// Verify a forecast fix against the matched best-track fix.
    ///
    /// `heading` is the best-track direction of motion at `truth`; without it
    /// the along/cross decomposition is left empty.
    #[must_use]
    pub fn verify(
        position: Position,
        lead_hours: i64,
        truth: &Position,
        heading: Option<f64>,
    ) -> Self {
        let track_error = position.great_circle(truth);
        let (along_track_error, cross_track_error) = match heading {
            Some(heading) if track_error > 0.0 => {
                let (along, cross) =
                    geo::along_cross(track_error, truth.bearing_to(&position), heading);
                (Some(along), Some(cross))
            }
            Some(_) => (Some(0.0), Some(0.0)),
            None => (None, None),
        };

        Self {
            intensity_error: position.intensity_error(truth),
            wind_error: position.wind_error(truth),
            track_error,
            along_track_error,
            cross_track_error,
            lead_hours,
            position,
        }
    }

    /// Valid time of the forecast fix.
    #[must_use]
    pub fn time(&self) -> DateTime<Utc> {
        self.position.time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2012, 8, 25, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_great_circle_same_position_is_zero() {
        let p = Position::new(at(0), 20.0, -70.0);
        assert!(p.great_circle(&p).abs() < 1e-9);
    }

    #[test]
    fn test_great_circle_symmetric() {
        let a = Position::new(at(0), 20.0, -70.0);
        let b = Position::new(at(6), 21.3, -72.4);
        assert!((a.great_circle(&b) - b.great_circle(&a)).abs() < 1e-9);
    }

    #[test]
    fn test_intensity_error() {
        let forecast = Position::new(at(0), 20.0, -70.0).with_intensity(Some(990.0), Some(60.0));
        let truth = Position::new(at(0), 20.0, -70.0).with_intensity(Some(1000.0), Some(45.0));
        assert_eq!(forecast.intensity_error(&truth), Some(-10.0));
        assert_eq!(forecast.wind_error(&truth), Some(15.0));
    }

    #[test]
    fn test_intensity_error_unknown() {
        let forecast = Position::new(at(0), 20.0, -70.0).with_intensity(None, Some(60.0));
        let truth = Position::new(at(0), 20.0, -70.0).with_intensity(Some(1000.0), None);
        assert_eq!(forecast.intensity_error(&truth), None);
        assert_eq!(forecast.wind_error(&truth), None);
    }

    #[test]
    fn test_forecast_verify_perfect() {
        let truth = Position::new(at(12), 25.0, -75.0).with_intensity(Some(985.0), Some(70.0));
        let forecast = Forecast::verify(truth.clone(), 12, &truth, Some(300.0));
        assert!(forecast.track_error.abs() < 1e-9);
        assert_eq!(forecast.intensity_error, Some(0.0));
        assert_eq!(forecast.along_track_error, Some(0.0));
        assert_eq!(forecast.cross_track_error, Some(0.0));
        assert_eq!(forecast.time(), at(12));
    }

    #[test]
    fn test_forecast_verify_ahead_of_track() {
        // Storm heading north; forecast one degree further north.
        let truth = Position::new(at(12), 25.0, -75.0);
        let ahead = Position::new(at(12), 26.0, -75.0);
        let forecast = Forecast::verify(ahead, 24, &truth, Some(0.0));
        let along = forecast.along_track_error.unwrap();
        let cross = forecast.cross_track_error.unwrap();
        assert!((along - forecast.track_error).abs() < 1e-6);
        assert!(cross.abs() < 1e-6);
    }

    #[test]
    fn test_forecast_verify_without_heading() {
        let truth = Position::new(at(12), 25.0, -75.0);
        let off = Position::new(at(12), 25.5, -76.0);
        let forecast = Forecast::verify(off, 6, &truth, None);
        assert!(forecast.track_error > 0.0);
        assert!(forecast.along_track_error.is_none());
        assert!(forecast.cross_track_error.is_none());
    }

    #[test]
    fn test_position_serialization_skips_unknown_intensity() {
        let p = Position::new(at(0), 10.0, -30.0);
        let json = serde_json::to_string(&p).unwrap();
        assert!(!json.contains("mslp"));
        let back: Position = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }
}
