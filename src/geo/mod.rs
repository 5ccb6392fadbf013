//! Geometry Engine
//!
//! Pure functions over geographic points and polygons. Everything here is
//! stateless and freely reentrant; the orchestrator calls into it once per
//! boundary per position update.

mod distance;
mod polygon;
mod simplify;

pub use distance::{haversine_distance, local_distance_m, EARTH_RADIUS_M, METERS_PER_DEGREE};
pub use polygon::{centroid, expand, point_in_polygon, signed_distance_to_edge};
pub use simplify::simplify;
