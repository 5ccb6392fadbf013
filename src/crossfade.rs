//! Crossfade coordinator
//!
//! Relative volume weighting across simultaneously active boundaries,
//! driven by listener-to-centroid distances. Each pair contributes a
//! factor `0.7 + 0.3 × ratio`, keeping a floor of 70% of base volume per
//! pair even at maximal imbalance, so naive proportional blending never
//! collapses a region to silence.
//!
//! With three or more overlapping boundaries the per-pair factors
//! accumulate multiplicatively; the weighting is deliberately not
//! normalized globally (open product question, see DESIGN.md).

use std::collections::HashMap;

use crate::geo;
use crate::model::LatLng;

/// One boundary participating in the blend
#[derive(Debug, Clone)]
pub struct CrossfadeMember {
    pub boundary_id: String,
    pub centroid: LatLng,
    /// Volume the boundary's own transition curve asked for
    pub base_volume: f64,
}

/// Compute the applied volume per boundary after pairwise blending
///
/// Members are the currently audible boundaries with `crossfadeOverlap`
/// enabled. A single member passes through at its base volume. Two
/// members equidistant from the listener each land at `0.85 × base`.
pub fn blend(listener: &LatLng, members: &[CrossfadeMember]) -> HashMap<String, f64> {
    let distances: Vec<f64> = members
        .iter()
        .map(|m| geo::haversine_distance(listener, &m.centroid))
        .collect();

    let mut applied: HashMap<String, f64> = members
        .iter()
        .map(|m| (m.boundary_id.clone(), m.base_volume))
        .collect();

    for i in 0..members.len() {
        for j in (i + 1)..members.len() {
            let (di, dj) = (distances[i], distances[j]);
            let total = di + dj;
            // Both centroids under the listener: split evenly
            let ratio_i = if total == 0.0 { 0.5 } else { 1.0 - di / total };
            let ratio_j = 1.0 - ratio_i;

            *applied.get_mut(&members[i].boundary_id).unwrap() *= 0.7 + 0.3 * ratio_i;
            *applied.get_mut(&members[j].boundary_id).unwrap() *= 0.7 + 0.3 * ratio_j;
        }
    }

    applied
}

// ============================================================================
// Tests
// ============================================================================
