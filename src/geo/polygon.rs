//! Polygon containment, signed edge distance, centroid, expansion
//!
//! The signed edge distance (negative inside) is the single quantity the
//! transition state machine consumes, so containment and nearest-edge
//! distance are computed together here.

use crate::geo::distance::METERS_PER_DEGREE;
use crate::model::LatLng;

/// Ray-casting parity test for point-in-polygon
///
/// Defined for all non-self-intersecting polygons; membership exactly on a
/// boundary edge is implementation-defined but consistent from call to
/// call.
pub fn point_in_polygon(point: &LatLng, vertices: &[LatLng]) -> bool {
    let mut inside = false;
    let n = vertices.len();
    let mut j = n - 1;
    for i in 0..n {
        let vi = &vertices[i];
        let vj = &vertices[j];
        let crosses = (vi.lat > point.lat) != (vj.lat > point.lat);
        if crosses {
            let x = (vj.lng - vi.lng) * (point.lat - vi.lat) / (vj.lat - vi.lat) + vi.lng;
            if point.lng < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Signed distance from a point to the nearest polygon edge, in meters
///
/// Magnitude is the minimum over all edges of the point-to-segment
/// distance in a local equirectangular frame; the sign is negative when
/// the point is inside the polygon.
pub fn signed_distance_to_edge(point: &LatLng, vertices: &[LatLng]) -> f64 {
    let mut min_dist = f64::INFINITY;
    let n = vertices.len();
    for i in 0..n {
        let a = &vertices[i];
        let b = &vertices[(i + 1) % n];
        let d = point_to_segment_m(point, a, b);
        if d < min_dist {
            min_dist = d;
        }
    }

    if point_in_polygon(point, vertices) {
        -min_dist
    } else {
        min_dist
    }
}

/// Centroid as the vertex average
pub fn centroid(vertices: &[LatLng]) -> LatLng {
    let n = vertices.len() as f64;
    let (lat, lng) = vertices
        .iter()
        .fold((0.0, 0.0), |(la, ln), v| (la + v.lat, ln + v.lng));
    LatLng {
        lat: lat / n,
        lng: lng / n,
    }
}

/// Expand a polygon outward by `distance_m` meters
///
/// Each vertex moves along the centroid-to-vertex direction by the given
/// distance converted to degrees. Used to materialize the outer edge of a
/// transition buffer zone. Callers must reject polygons with a vertex at
/// the centroid at load time; such input has no defined outward direction.
pub fn expand(vertices: &[LatLng], distance_m: f64) -> Vec<LatLng> {
    let c = centroid(vertices);
    let offset_deg = distance_m / METERS_PER_DEGREE;

    vertices
        .iter()
        .map(|v| {
            let dlat = v.lat - c.lat;
            let dlng = v.lng - c.lng;
            let len = (dlat * dlat + dlng * dlng).sqrt();
            LatLng {
                lat: v.lat + dlat / len * offset_deg,
                lng: v.lng + dlng / len * offset_deg,
            }
        })
        .collect()
}

/// Distance from a point to a line segment in local meters
fn point_to_segment_m(p: &LatLng, a: &LatLng, b: &LatLng) -> f64 {
    // Work in a planar frame of (lat, lng) scaled to meters.
    let px = p.lng * METERS_PER_DEGREE;
    let py = p.lat * METERS_PER_DEGREE;
    let ax = a.lng * METERS_PER_DEGREE;
    let ay = a.lat * METERS_PER_DEGREE;
    let bx = b.lng * METERS_PER_DEGREE;
    let by = b.lat * METERS_PER_DEGREE;

    let abx = bx - ax;
    let aby = by - ay;
    let len_sq = abx * abx + aby * aby;

    let t = if len_sq == 0.0 {
        // Zero-length edge, fall back to vertex distance
        0.0
    } else {
        (((px - ax) * abx + (py - ay) * aby) / len_sq).clamp(0.0, 1.0)
    };

    let cx = ax + t * abx;
    let cy = ay + t * aby;
    ((px - cx).powi(2) + (py - cy).powi(2)).sqrt()
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

    /// Unit square (in degrees) at the origin
    fn square() -> Vec<LatLng> {
        vec![p(0.0, 0.0), p(0.0, 1.0), p(1.0, 1.0), p(1.0, 0.0)]
    }

    #[test]
    fn test_point_in_polygon_inside() {
        assert!(point_in_polygon(&p(0.5, 0.5), &square()));
        assert!(point_in_polygon(&p(0.01, 0.01), &square()));
    }

    #[test]
    fn test_point_in_polygon_outside() {
        assert!(!point_in_polygon(&p(1.5, 0.5), &square()));
        assert!(!point_in_polygon(&p(-0.1, 0.5), &square()));
        assert!(!point_in_polygon(&p(0.5, 2.0), &square()));
    }

    #[test]
    fn test_point_in_concave_polygon() {
        // L-shape: the notch at the top right is outside
        let l_shape = vec![
            p(0.0, 0.0),
            p(0.0, 2.0),
            p(1.0, 2.0),
            p(1.0, 1.0),
            p(2.0, 1.0),
            p(2.0, 0.0),
        ];
        assert!(point_in_polygon(&p(0.5, 1.5), &l_shape));
        assert!(point_in_polygon(&p(1.5, 0.5), &l_shape));
        assert!(!point_in_polygon(&p(1.5, 1.5), &l_shape));
    }

    #[test]
    fn test_signed_distance_negative_inside() {
        let d = signed_distance_to_edge(&p(0.5, 0.5), &square());
        assert!(d < 0.0);
        // Center of a 1-degree square is 0.5 degrees from every edge
        assert_relative_eq!(d, -0.5 * METERS_PER_DEGREE, epsilon = 1.0);
    }

    #[test]
    fn test_signed_distance_positive_outside() {
        // 0.5 degrees east of the eastern edge
        let d = signed_distance_to_edge(&p(0.5, 1.5), &square());
        assert_relative_eq!(d, 0.5 * METERS_PER_DEGREE, epsilon = 1.0);
    }

    #[test]
    fn test_signed_distance_nearest_edge_wins() {
        // Close to the southern edge, far from the others
        let d = signed_distance_to_edge(&p(0.1, 0.5), &square());
        assert_relative_eq!(d, -0.1 * METERS_PER_DEGREE, epsilon = 1.0);
    }

    #[test]
    fn test_signed_distance_far_outside_is_true_distance() {
        // Directly east of the square by more than its diameter; nearest
        // point is the midpoint of the eastern edge.
        let d = signed_distance_to_edge(&p(0.5, 5.0), &square());
        assert_relative_eq!(d, 4.0 * METERS_PER_DEGREE, epsilon = 1.0);
    }

    #[test]
    fn test_centroid_of_square() {
        let c = centroid(&square());
        assert_relative_eq!(c.lat, 0.5, epsilon = 1e-12);
        assert_relative_eq!(c.lng, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_expand_moves_vertices_outward() {
        let expanded = expand(&square(), 111.0); // 0.001 degrees
        let c = centroid(&square());
        for (orig, exp) in square().iter().zip(expanded.iter()) {
            let before = ((orig.lat - c.lat).powi(2) + (orig.lng - c.lng).powi(2)).sqrt();
            let after = ((exp.lat - c.lat).powi(2) + (exp.lng - c.lng).powi(2)).sqrt();
            assert!(after > before);
            // Displacement magnitude is 0.001 degrees
            let moved = ((exp.lat - orig.lat).powi(2) + (exp.lng - orig.lng).powi(2)).sqrt();
            assert_relative_eq!(moved, 0.001, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_expanded_polygon_contains_original() {
        let expanded = expand(&square(), 1000.0);
        for v in square() {
            assert!(point_in_polygon(&p(v.lat.max(1e-9), v.lng.max(1e-9)), &expanded));
        }
    }
}
