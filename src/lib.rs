//! Soundwalk - Spatial Audio Transition Engine
//!
//! Drives an audio installation in which sound sources fade, filter, and
//! blend as a listener moves through GPS-defined boundaries.
//!
//! # Architecture
//!
//! Position updates flow through a fixed pipeline:
//! geometry (signed distance per boundary) → per-boundary phase machine →
//! transition curves (parameter values) → crossfade weighting → audio
//! graph commands. Geometry and curves are stateless; all per-session
//! state lives in the orchestrator and the audio graph.
//!
//! Position acquisition, boundary storage, and the rendering backend are
//! external collaborators behind interfaces.

pub mod audio;
pub mod crossfade;
pub mod engine;
pub mod error;
pub mod geo;
pub mod model;
pub mod transition;

pub use error::{Result, SoundwalkError};
