//! Data model for compositions, boundaries, and positions
//!
//! Boundary definitions are authored externally and loaded once per
//! session. Validation happens here, at load time: a boundary that fails
//! is excluded from the active set and reported, never crashing playback.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, SoundwalkError};
use crate::geo;
use crate::transition::TransitionType;

// ============================================================================
// Constants
// ============================================================================

/// Maximum audible filter cutoff in Hz
const MAX_CUTOFF_HZ: f64 = 24_000.0;

/// Maximum pitch-shift magnitude in semitones
const MAX_PITCH_SEMITONES: f64 = 24.0;

/// Two vertices closer than this (degrees) are treated as coincident
const DEGENERATE_EPSILON_DEG: f64 = 1e-9;

// ============================================================================
// Geographic Points
// ============================================================================

/// A geographic coordinate in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// A timestamped position event from the external location provider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

impl Position {
    /// Validate the coordinate, returning it as a [`LatLng`]
    ///
    /// NaN or out-of-range coordinates are malformed; the caller drops the
    /// event and keeps the last valid state.
    pub fn validate(&self) -> Result<LatLng> {
        let in_range = self.lat.is_finite()
            && self.lng.is_finite()
            && self.lat.abs() <= 90.0
            && self.lng.abs() <= 180.0;
        if in_range {
            Ok(LatLng {
                lat: self.lat,
                lng: self.lng,
            })
        } else {
            Err(SoundwalkError::InvalidPosition {
                lat: self.lat,
                lng: self.lng,
            })
        }
    }
}

// ============================================================================
// Transition Settings
// ============================================================================

/// A `start`/`end` pair for one automated effect parameter
///
/// `end` is the value at the outer edge of the transition buffer
/// (progress 0), `start` the value once fully inside (progress 1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterRange {
    pub start: f64,
    pub end: f64,
}

impl ParameterRange {
    pub const fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Linear interpolation at `progress`, mapping 0 → `end`, 1 → `start`
    pub fn at(&self, progress: f64) -> f64 {
        self.end + (self.start - self.end) * progress
    }

    fn check(&self, name: &str, min: f64, max: f64) -> Result<()> {
        for (label, v) in [("start", self.start), ("end", self.end)] {
            if !v.is_finite() || v < min || v > max {
                return Err(SoundwalkError::Configuration {
                    reason: format!("{name}.{label} = {v} outside valid range [{min}, {max}]"),
                });
            }
        }
        Ok(())
    }
}

/// Named parameter ranges, one per automatable effect parameter
///
/// Absent ranges fall back to installation defaults chosen to be audible
/// but not extreme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParameterRanges {
    pub lowpass_cutoff_hz: ParameterRange,
    pub highpass_cutoff_hz: ParameterRange,
    pub reverb_mix: ParameterRange,
    pub reverb_decay_secs: ParameterRange,
    pub delay_feedback: ParameterRange,
    pub delay_time_secs: ParameterRange,
    pub pitch_semitones: ParameterRange,
    pub pan: ParameterRange,
}

impl Default for ParameterRanges {
    fn default() -> Self {
        Self {
            // start = fully inside (open), end = at the outer buffer edge
            lowpass_cutoff_hz: ParameterRange::new(20_000.0, 300.0),
            highpass_cutoff_hz: ParameterRange::new(20.0, 1_200.0),
            reverb_mix: ParameterRange::new(0.2, 0.8),
            reverb_decay_secs: ParameterRange::new(1.5, 4.0),
            delay_feedback: ParameterRange::new(0.1, 0.6),
            delay_time_secs: ParameterRange::new(0.25, 0.5),
            pitch_semitones: ParameterRange::new(0.0, -5.0),
            pan: ParameterRange::new(0.8, -0.8),
        }
    }
}

impl ParameterRanges {
    /// Check every range against the physical limits of its parameter
    pub fn validate(&self) -> Result<()> {
        self.lowpass_cutoff_hz
            .check("lowpassCutoffHz", f64::MIN_POSITIVE, MAX_CUTOFF_HZ)?;
        self.highpass_cutoff_hz
            .check("highpassCutoffHz", f64::MIN_POSITIVE, MAX_CUTOFF_HZ)?;
        self.reverb_mix.check("reverbMix", 0.0, 1.0)?;
        self.reverb_decay_secs
            .check("reverbDecaySecs", f64::MIN_POSITIVE, 60.0)?;
        self.delay_feedback.check("delayFeedback", 0.0, 1.0)?;
        self.delay_time_secs
            .check("delayTimeSecs", f64::MIN_POSITIVE, 10.0)?;
        self.pitch_semitones
            .check("pitchSemitones", -MAX_PITCH_SEMITONES, MAX_PITCH_SEMITONES)?;
        self.pan.check("pan", -1.0, 1.0)?;
        Ok(())
    }
}

/// Per-boundary transition behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionSettings {
    /// Buffer distance around the boundary edge, meters
    pub transition_radius: f64,
    /// Entry fade duration, seconds
    #[serde(rename = "fadeInLength")]
    pub fade_in_secs: f64,
    /// Exit fade duration, seconds
    #[serde(rename = "fadeOutLength")]
    pub fade_out_secs: f64,
    pub fade_in_type: TransitionType,
    pub fade_out_type: TransitionType,
    /// Target volume once fully inside, linear gain in (0, 1]
    #[serde(default = "default_base_volume")]
    pub base_volume: f64,
    pub blending_enabled: bool,
    pub crossfade_overlap: bool,
    #[serde(default)]
    pub ranges: ParameterRanges,
}

fn default_base_volume() -> f64 {
    1.0
}

impl Default for TransitionSettings {
    fn default() -> Self {
        Self {
            transition_radius: 10.0,
            fade_in_secs: 2.0,
            fade_out_secs: 2.0,
            fade_in_type: TransitionType::VolumeFade,
            fade_out_type: TransitionType::VolumeFade,
            base_volume: 1.0,
            blending_enabled: true,
            crossfade_overlap: true,
            ranges: ParameterRanges::default(),
        }
    }
}

impl TransitionSettings {
    pub fn validate(&self) -> Result<()> {
        if !(self.transition_radius.is_finite() && self.transition_radius > 0.0) {
            return Err(SoundwalkError::Configuration {
                reason: format!("transitionRadius must be > 0, got {}", self.transition_radius),
            });
        }
        for (name, v) in [
            ("fadeInLength", self.fade_in_secs),
            ("fadeOutLength", self.fade_out_secs),
        ] {
            if !(v.is_finite() && v >= 0.0) {
                return Err(SoundwalkError::Configuration {
                    reason: format!("{name} must be >= 0, got {v}"),
                });
            }
        }
        if !(self.base_volume.is_finite() && self.base_volume > 0.0 && self.base_volume <= 1.0) {
            return Err(SoundwalkError::Configuration {
                reason: format!("baseVolume must be in (0, 1], got {}", self.base_volume),
            });
        }
        self.ranges.validate()
    }
}

// ============================================================================
// Boundaries and Compositions
// ============================================================================

/// A polygonal geographic region bound to one audio source
///
/// Immutable for the lifetime of a playback session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Boundary {
    pub id: String,
    /// Polygon vertices in order; at least 3, not required to be convex
    pub vertices: Vec<LatLng>,
    /// Opaque reference to the audio asset, resolved by the backend
    pub audio_ref: String,
    #[serde(default)]
    pub settings: TransitionSettings,
}

impl Boundary {
    /// Validate the boundary for use in a session
    ///
    /// Rejects polygons with fewer than 3 vertices, non-finite
    /// coordinates, a vertex coincident with the centroid (which would
    /// make [`geo::expand`] undefined), and out-of-range settings.
    pub fn validate(&self) -> Result<()> {
        if self.vertices.len() < 3 {
            return Err(SoundwalkError::Configuration {
                reason: format!(
                    "boundary '{}' has {} vertices, need at least 3",
                    self.id,
                    self.vertices.len()
                ),
            });
        }
        for v in &self.vertices {
            if !(v.lat.is_finite() && v.lng.is_finite()) {
                return Err(SoundwalkError::Configuration {
                    reason: format!("boundary '{}' has a non-finite vertex", self.id),
                });
            }
        }

        let c = geo::centroid(&self.vertices);
        for v in &self.vertices {
            let dlat = v.lat - c.lat;
            let dlng = v.lng - c.lng;
            if (dlat * dlat + dlng * dlng).sqrt() < DEGENERATE_EPSILON_DEG {
                return Err(SoundwalkError::DegeneratePolygon {
                    boundary_id: self.id.clone(),
                    reason: "vertex coincides with polygon centroid".to_string(),
                });
            }
        }

        self.settings.validate()
    }

    /// Polygon centroid (vertex average)
    pub fn centroid(&self) -> LatLng {
        geo::centroid(&self.vertices)
    }
}

/// A full set of boundary definitions for one installation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Composition {
    pub boundaries: Vec<Boundary>,
}

/// Result of loading a composition: the usable boundaries plus a report of
/// everything that was excluded
#[derive(Debug)]
pub struct LoadedComposition {
    pub boundaries: Vec<Boundary>,
    pub rejected: Vec<(String, SoundwalkError)>,
}

impl Composition {
    /// Parse a composition from JSON and validate every boundary
    ///
    /// Invalid boundaries are excluded from the active set and returned in
    /// `rejected`; the session runs with whatever passed.
    pub fn load_str(json: &str) -> Result<LoadedComposition> {
        let composition: Composition = serde_json::from_str(json)?;
        Ok(composition.into_validated())
    }

    /// Load a composition from a JSON file on disk
    pub fn load_file(path: &std::path::Path) -> Result<LoadedComposition> {
        let json = std::fs::read_to_string(path)?;
        Self::load_str(&json)
    }

    fn into_validated(self) -> LoadedComposition {
        let mut boundaries = Vec::with_capacity(self.boundaries.len());
        let mut rejected = Vec::new();
        let mut seen_ids = std::collections::HashSet::new();
        for boundary in self.boundaries {
            // Source bookkeeping keys on the id string, so a duplicate
            // would conflate two boundaries' sources.
            if !seen_ids.insert(boundary.id.clone()) {
                let err = SoundwalkError::Configuration {
                    reason: format!("duplicate boundary id '{}'", boundary.id),
                };
                warn!(boundary_id = %boundary.id, error = %err, "excluding invalid boundary");
                rejected.push((boundary.id, err));
                continue;
            }
            match boundary.validate() {
                Ok(()) => boundaries.push(boundary),
                Err(err) => {
                    warn!(boundary_id = %boundary.id, error = %err, "excluding invalid boundary");
                    rejected.push((boundary.id, err));
                }
            }
        }
        LoadedComposition {
            boundaries,
            rejected,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
