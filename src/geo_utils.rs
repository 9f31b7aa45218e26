//! # Geographic Utilities
//!
//! Small geographic and numeric helpers shared by the trajectory and
//! alignment code.
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_m`] | Great-circle distance between two lat/lng pairs in meters |
//! | [`haversine_km`] | Same, in kilometers (the unit the alignment objective uses) |
//! | [`lerp`] | Linear interpolation between two scalars |
//! | [`lerp_opt`] | `lerp` lifted over optional scalars |
//! | [`is_valid_position`] | WGS84 range check for a lat/lng pair |
//!
//! All coordinates are WGS84 latitude/longitude in degrees, as produced by
//! GPS receivers after fixed-point decoding.

use geo::{Distance, Haversine, Point};

/// Great-circle distance between two lat/lng pairs, in meters.
///
/// Uses the haversine formula over a spherical Earth (radius 6,371 km),
/// accurate to within ~0.3% — plenty for comparing two noisy GPS fixes.
pub fn haversine_m(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let p1 = Point::new(lng1, lat1);
    let p2 = Point::new(lng2, lat2);
    Haversine::distance(p1, p2)
}

/// Great-circle distance in kilometers.
///
/// The outlier filter and the alignment objective both work in kilometers.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    haversine_m(lat1, lng1, lat2, lng2) / 1000.0
}

/// Linear interpolation: `a` at `weight_b == 0`, `b` at `weight_b == 1`.
pub fn lerp(a: f64, b: f64, weight_b: f64) -> f64 {
    a * (1.0 - weight_b) + b * weight_b
}

/// `lerp` over optional scalars: `None` if either side is absent.
pub fn lerp_opt(a: Option<f64>, b: Option<f64>, weight_b: f64) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(lerp(a, b, weight_b)),
        _ => None,
    }
}

/// Check that a lat/lng pair is finite and within WGS84 bounds.
pub fn is_valid_position(latitude: f64, longitude: f64) -> bool {
    latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_haversine_same_point() {
        assert_eq!(haversine_m(51.5074, -0.1278, 51.5074, -0.1278), 0.0);
    }

    #[test]
    fn test_haversine_known_value() {
        // London to Paris is approximately 344 km
        let km = haversine_km(51.5074, -0.1278, 48.8566, 2.3522);
        assert!((km - 343.5).abs() < 5.0);
    }

    #[test]
    fn test_lerp_endpoints() {
        assert_relative_eq!(lerp(2.0, 4.0, 0.0), 2.0);
        assert_relative_eq!(lerp(2.0, 4.0, 1.0), 4.0);
        assert_relative_eq!(lerp(2.0, 4.0, 0.5), 3.0);
    }

    #[test]
    fn test_lerp_opt_absent_side() {
        assert_eq!(lerp_opt(Some(1.0), None, 0.5), None);
        assert_eq!(lerp_opt(None, Some(1.0), 0.5), None);
        assert_eq!(lerp_opt(Some(1.0), Some(3.0), 0.5), Some(2.0));
    }

    #[test]
    fn test_is_valid_position() {
        assert!(is_valid_position(51.5074, -0.1278));
        assert!(!is_valid_position(91.0, 0.0));
        assert!(!is_valid_position(0.0, 181.0));
        assert!(!is_valid_position(f64::NAN, 0.0));
    }
}
