//! Spherical geometry used for track verification.
//!
//! All angles are in decimal degrees, north and east positive. Distances are
//! in kilometres on a sphere of radius [`EARTH_RADIUS_KM`].

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points using the haversine formula.
#[must_use]
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    // Rounding can push h marginally above 1 for antipodal points.
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Initial compass bearing from the first point towards the second, in `[0, 360)`.
///
/// Returns 0 for coincident points.
#[must_use]
pub fn initial_bearing_deg(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let dlambda = (lon2 - lon1).to_radians();
    let y = dlambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * dlambda.cos();
    normalize_deg(y.atan2(x).to_degrees())
}

/// Split a displacement into along-track and cross-track components.
///
/// `distance_km` and `bearing_deg` describe the displacement from the
/// verifying position to the forecast position; `heading_deg` is the
/// direction of motion at the verifying position. Along-track is positive
/// when the forecast is ahead of the storm, cross-track is positive when it
/// lies to the right of the motion.
#[must_use]
pub fn along_cross(distance_km: f64, bearing_deg: f64, heading_deg: f64) -> (f64, f64) {
    let delta = (bearing_deg - heading_deg).to_radians();
    (distance_km * delta.cos(), distance_km * delta.sin())
}

/// Wrap an angle into `[0, 360)`.
#[must_use]
pub fn normalize_deg(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    #[test]
    fn test_haversine_zero_for_same_point() {
        assert!(haversine_km(25.3, -71.2, 25.3, -71.2).abs() < EPS);
    }

    #[test]
    fn test_haversine_symmetric() {
        let a = haversine_km(15.0, -45.0, 27.5, -80.1);
        let b = haversine_km(27.5, -80.1, 15.0, -45.0);
        assert!((a - b).abs() < EPS);
    }

    #[test]
    fn test_haversine_one_degree_of_latitude() {
        let d = haversine_km(0.0, 0.0, 1.0, 0.0);
        let expected = EARTH_RADIUS_KM * 1f64.to_radians();
        assert!((d - expected).abs() < 1e-9);
        assert!((d - 111.195).abs() < 0.01);
    }

    #[test]
    fn test_haversine_antipodal() {
        let d = haversine_km(0.0, 0.0, 0.0, 180.0);
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn test_haversine_across_dateline() {
        let d = haversine_km(10.0, 179.5, 10.0, -179.5);
        assert!(d < 120.0);
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        assert!(initial_bearing_deg(0.0, 0.0, 1.0, 0.0).abs() < EPS);
        assert!((initial_bearing_deg(0.0, 0.0, 0.0, 1.0) - 90.0).abs() < EPS);
        assert!((initial_bearing_deg(0.0, 0.0, -1.0, 0.0) - 180.0).abs() < EPS);
        assert!((initial_bearing_deg(0.0, 0.0, 0.0, -1.0) - 270.0).abs() < EPS);
    }

    #[test]
    fn test_along_cross_ahead_and_right() {
        let (along, cross) = along_cross(100.0, 0.0, 0.0);
        assert!((along - 100.0).abs() < EPS);
        assert!(cross.abs() < EPS);

        // Storm moving north, forecast due east: entirely right of track.
        let (along, cross) = along_cross(100.0, 90.0, 0.0);
        assert!(along.abs() < EPS);
        assert!((cross - 100.0).abs() < EPS);

        // Storm moving west, forecast due east: behind.
        let (along, _) = along_cross(50.0, 90.0, 270.0);
        assert!((along + 50.0).abs() < EPS);
    }

    #[test]
    fn test_along_cross_preserves_magnitude() {
        let (along, cross) = along_cross(237.0, 133.0, 301.0);
        assert!((along.hypot(cross) - 237.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_deg() {
        assert!((normalize_deg(-90.0) - 270.0).abs() < EPS);
        assert!((normalize_deg(720.5) - 0.5).abs() < EPS);
        assert!(normalize_deg(360.0).abs() < EPS);
    }
}
