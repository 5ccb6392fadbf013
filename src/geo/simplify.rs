//! Douglas–Peucker polyline simplification
//!
//! Used at authoring time to thin dense hand-drawn or GPS-traced boundary
//! outlines before they enter a composition. Output always keeps the first
//! and last input point, is a subset of the input, and is idempotent for a
//! fixed tolerance.

use crate::geo::distance::METERS_PER_DEGREE;
use crate::model::LatLng;

/// Simplify a polyline with the Douglas–Peucker algorithm
///
/// `tolerance_m` is the maximum perpendicular deviation, in meters, a
/// removed point may have had from the simplified line.
pub fn simplify(points: &[LatLng], tolerance_m: f64) -> Vec<LatLng> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;
    simplify_segment(points, 0, points.len() - 1, tolerance_m, &mut keep);

    points
        .iter()
        .zip(keep.iter())
        .filter_map(|(point, &kept)| kept.then(|| point.clone()))
        .collect()
}

fn simplify_segment(points: &[LatLng], first: usize, last: usize, tolerance_m: f64, keep: &mut [bool]) {
    if last <= first + 1 {
        return;
    }

    let mut max_dist = 0.0;
    let mut max_index = first;
    for i in (first + 1)..last {
        let d = perpendicular_distance_m(&points[i], &points[first], &points[last]);
        if d > max_dist {
            max_dist = d;
            max_index = i;
        }
    }

    if max_dist > tolerance_m {
        keep[max_index] = true;
        simplify_segment(points, first, max_index, tolerance_m, keep);
        simplify_segment(points, max_index, last, tolerance_m, keep);
    }
}

/// Perpendicular distance from a point to the infinite line through a and b,
/// in local meters
fn perpendicular_distance_m(p: &LatLng, a: &LatLng, b: &LatLng) -> f64 {
    let px = p.lng * METERS_PER_DEGREE;
    let py = p.lat * METERS_PER_DEGREE;
    let ax = a.lng * METERS_PER_DEGREE;
    let ay = a.lat * METERS_PER_DEGREE;
    let bx = b.lng * METERS_PER_DEGREE;
    let by = b.lat * METERS_PER_DEGREE;

    let dx = bx - ax;
    let dy = by - ay;
    let len = (dx * dx + dy * dy).sqrt();
    if len == 0.0 {
        return ((px - ax).powi(2) + (py - ay).powi(2)).sqrt();
    }
    ((py - ay) * dx - (px - ax) * dy).abs() / len
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn p(lat: f64, lng: f64) -> LatLng {
        LatLng { lat, lng }
    }

    fn zigzag() -> Vec<LatLng> {
        vec![
            p(0.0, 0.0),
            p(0.0001, 0.001),
            p(-0.0001, 0.002),
            p(0.0001, 0.003),
            p(0.0, 0.004),
        ]
    }

    #[test]
    fn test_retains_endpoints() {
        let pts = zigzag();
        let simplified = simplify(&pts, 1_000.0);
        assert_eq!(simplified.first().unwrap(), &pts[0]);
        assert_eq!(simplified.last().unwrap(), &pts[4]);
    }

    #[test]
    fn test_collapses_small_deviations() {
        // Zigzag amplitude is 0.0001 degrees ~= 11.1 m; a 50 m tolerance
        // should flatten it to the two endpoints.
        let simplified = simplify(&zigzag(), 50.0);
        assert_eq!(simplified.len(), 2);
    }

    #[test]
    fn test_keeps_large_deviations() {
        // 1 m tolerance keeps every zigzag extreme
        let simplified = simplify(&zigzag(), 1.0);
        assert_eq!(simplified.len(), 5);
    }

    #[test]
    fn test_output_is_subset_of_input() {
        let pts = zigzag();
        let simplified = simplify(&pts, 5.0);
        for sp in &simplified {
            assert!(pts.iter().any(|op| op == sp));
        }
    }

    #[test_case(1.0)]
    #[test_case(15.0)]
    #[test_case(50.0)]
    fn test_idempotent(tolerance_m: f64) {
        let once = simplify(&zigzag(), tolerance_m);
        let twice = simplify(&once, tolerance_m);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_short_input_unchanged() {
        let pts = vec![p(0.0, 0.0), p(1.0, 1.0)];
        assert_eq!(simplify(&pts, 100.0), pts);
    }
}
