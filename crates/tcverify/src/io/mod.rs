//! Readers for the best-track and forecast input formats.
//!
//! - [`hurdat2`]: the NHC HURDAT2 best-track database.
//! - [`tigge`]: TIGGE-derived forecast CSV files, one file per storm and
//!   initialization.

pub mod hurdat2;
pub mod tigge;

pub use hurdat2::{BestTrackEntry, Hurdat2, StormRecord};
pub use tigge::{ForecastFile, ForecastFileName};

/// Values at or below this are the `-99`/`-999` missing-data sentinels.
const MISSING_THRESHOLD: f64 = -99.0;

/// Map missing-data sentinels to `None`.
pub(crate) fn known(value: f64) -> Option<f64> {
    (value > MISSING_THRESHOLD).then_some(value)
}

/// Parse a latitude or longitude.
///
/// Accepts signed decimal degrees (`-45.2`), decimal degrees with a
/// hemisphere suffix (`45.2W`) and ATCF tenths of a degree (`452W`).
pub(crate) fn parse_coordinate(text: &str) -> Option<f64> {
    let text = text.trim();
    let sign = match text.chars().last()? {
        'N' | 'n' | 'E' | 'e' => 1.0,
        'S' | 's' | 'W' | 'w' => -1.0,
        _ => return text.parse().ok(),
    };
    let digits = &text[..text.len() - 1];
    let value: f64 = digits.trim().parse().ok()?;
    let value = if digits.contains('.') {
        value
    } else {
        value / 10.0
    };
    Some(sign * value)
}
