//! Great-circle and local planar distance
//!
//! Haversine gives the exact spherical-earth distance and is used wherever
//! listener-to-centroid distances matter (crossfade weighting). Edge
//! distances inside a transition buffer are at most a few hundred meters,
//! where a local equirectangular approximation is cheaper and accurate
//! enough.

use crate::model::LatLng;

// ============================================================================
// Constants
// ============================================================================

/// Mean earth radius in meters (spherical approximation)
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Degrees-to-meters scale for the local equirectangular approximation
pub const METERS_PER_DEGREE: f64 = 111_000.0;

// ============================================================================
// Distance Functions
// ============================================================================

/// Haversine great-circle distance between two points, in meters
///
/// Symmetric; zero iff the points are equal.
pub fn haversine_distance(a: &LatLng, b: &LatLng) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Planar distance between two points in a local equirectangular frame,
/// scaled by 111,000 m/degree
///
/// Valid for the short spans inside a transition buffer; not suitable for
/// continental distances.
pub fn local_distance_m(a: &LatLng, b: &LatLng) -> f64 {
    let dlat = (a.lat - b.lat) * METERS_PER_DEGREE;
    let dlng = (a.lng - b.lng) * METERS_PER_DEGREE;
    (dlat * dlat + dlng * dlng).sqrt()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn p(lat: f64, lng: f64) -> LatLng {
        LatLng { lat, lng }
    }

    #[test]
    fn test_haversine_zero_for_equal_points() {
        let a = p(52.52, 13.405);
        assert_eq!(haversine_distance(&a, &a), 0.0);
    }

    #[test]
    fn test_haversine_symmetric() {
        let a = p(52.52, 13.405);
        let b = p(48.8566, 2.3522);
        assert_relative_eq!(
            haversine_distance(&a, &b),
            haversine_distance(&b, &a),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_haversine_known_distance() {
        // Berlin to Paris, roughly 878 km
        let berlin = p(52.52, 13.405);
        let paris = p(48.8566, 2.3522);
        let d = haversine_distance(&berlin, &paris);
        assert!((d - 878_000.0).abs() < 5_000.0, "got {d}");
    }

    #[test]
    fn test_haversine_one_degree_latitude() {
        // One degree of latitude is ~111.19 km on a 6371 km sphere
        let d = haversine_distance(&p(0.0, 0.0), &p(1.0, 0.0));
        assert_relative_eq!(d, 111_195.0, epsilon = 50.0);
    }

    #[test]
    fn test_local_distance_matches_haversine_at_small_scale() {
        // Within a few hundred meters at the equator, the two metrics
        // should agree to well under a percent.
        let a = p(0.0, 0.0);
        let b = p(0.001, 0.001);
        let local = local_distance_m(&a, &b);
        let great = haversine_distance(&a, &b);
        assert!((local - great).abs() / great < 0.01, "local {local} vs haversine {great}");
    }
}
