//! Transition curve library
//!
//! Pure mapping from (transition type, progress, direction, settings) to a
//! gain value and effect-stage parameters. A tagged union dispatched by
//! `match` keeps the parameter contract type-checked and the library
//! stateless; there is no runtime registry of curve factories.

use serde::{Deserialize, Deserializer, Serialize};
use std::f64::consts::PI;

use crate::audio::EffectStage;
use crate::model::TransitionSettings;

/// Enumerated transition kinds
///
/// Unknown strings in authored settings deserialize to `VolumeFade`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionType {
    VolumeFade,
    LowpassFilter,
    HighpassFilter,
    ReverbTail,
    PitchShift,
    DelayFeedback,
    Doppler,
    SpatialBlend,
}

impl<'de> Deserialize<'de> for TransitionType {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "VOLUME_FADE" => TransitionType::VolumeFade,
            "LOWPASS_FILTER" => TransitionType::LowpassFilter,
            "HIGHPASS_FILTER" => TransitionType::HighpassFilter,
            "REVERB_TAIL" => TransitionType::ReverbTail,
            "PITCH_SHIFT" => TransitionType::PitchShift,
            "DELAY_FEEDBACK" => TransitionType::DelayFeedback,
            "DOPPLER" => TransitionType::Doppler,
            "SPATIAL_BLEND" => TransitionType::SpatialBlend,
            // Out-of-range or unknown kinds fall back to a plain fade
            _ => TransitionType::VolumeFade,
        })
    }
}

impl TransitionType {
    /// Fade-tail length multiplier applied at teardown
    ///
    /// Reverb and delay keep ringing after the dry signal stops, so their
    /// stop ramps are stretched to let the natural decay complete.
    pub fn tail_multiplier(&self) -> f64 {
        match self {
            TransitionType::ReverbTail => 2.0,
            TransitionType::DelayFeedback => 1.5,
            _ => 1.0,
        }
    }
}

/// Whether the listener is moving into or out of the boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeDirection {
    In,
    Out,
}

/// Evaluated curve values at one progress point
#[derive(Debug, Clone, PartialEq)]
pub struct CurveOutput {
    /// Linear gain for the source, already scaled by the base volume
    pub gain: f64,
    /// Target values for the type's effect stages, in chain order
    pub stages: Vec<EffectStage>,
}

/// Evaluate a transition curve
///
/// `progress` is 0 at the outer edge of the transition buffer and 1 at the
/// boundary edge, for both directions; exit evaluation passes the decaying
/// exit progress. Gain is linear in progress for every type, so a source
/// started mid-buffer begins at exactly the current progress volume.
pub fn evaluate(
    kind: TransitionType,
    progress: f64,
    direction: FadeDirection,
    settings: &TransitionSettings,
) -> CurveOutput {
    let progress = progress.clamp(0.0, 1.0);
    let gain = progress * settings.base_volume;
    let ranges = &settings.ranges;

    let stages = match kind {
        TransitionType::VolumeFade => Vec::new(),
        TransitionType::LowpassFilter => vec![EffectStage::Lowpass {
            cutoff_hz: ranges.lowpass_cutoff_hz.at(progress),
        }],
        TransitionType::HighpassFilter => vec![EffectStage::Highpass {
            cutoff_hz: ranges.highpass_cutoff_hz.at(progress),
        }],
        TransitionType::ReverbTail => vec![EffectStage::Reverb {
            wet: ranges.reverb_mix.at(progress),
            decay_secs: ranges.reverb_decay_secs.at(progress),
        }],
        TransitionType::PitchShift => vec![EffectStage::PitchShift {
            semitones: ranges.pitch_semitones.at(progress),
        }],
        TransitionType::DelayFeedback => vec![EffectStage::Delay {
            feedback: ranges.delay_feedback.at(progress),
            time_secs: ranges.delay_time_secs.at(progress),
        }],
        TransitionType::Doppler => {
            // Symmetric transient bump peaking at mid-transition, 10%
            // magnitude, rising in pitch on approach and falling on exit.
            let sign = match direction {
                FadeDirection::In => 1.0,
                FadeDirection::Out => -1.0,
            };
            vec![EffectStage::Doppler {
                pitch_ratio: 1.0 + sign * 0.1 * (progress * PI).sin(),
            }]
        }
        TransitionType::SpatialBlend => vec![EffectStage::Pan {
            position: (progress * PI).cos() * 0.8,
        }],
    };

    CurveOutput { gain, stages }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use test_case::test_case;

    fn settings() -> TransitionSettings {
        TransitionSettings::default()
    }

    fn single_stage(kind: TransitionType, progress: f64) -> EffectStage {
        let out = evaluate(kind, progress, FadeDirection::In, &settings());
        assert_eq!(out.stages.len(), 1);
        out.stages[0]
    }

    #[test_case(TransitionType::VolumeFade)]
    #[test_case(TransitionType::LowpassFilter)]
    #[test_case(TransitionType::ReverbTail)]
    #[test_case(TransitionType::SpatialBlend)]
    fn test_gain_linear_in_progress(kind: TransitionType) {
        let s = settings();
        assert_eq!(evaluate(kind, 0.0, FadeDirection::In, &s).gain, 0.0);
        assert_relative_eq!(evaluate(kind, 0.5, FadeDirection::In, &s).gain, 0.5);
        assert_relative_eq!(evaluate(kind, 1.0, FadeDirection::In, &s).gain, 1.0);
    }

    #[test]
    fn test_gain_scaled_by_base_volume() {
        let mut s = settings();
        s.base_volume = 0.6;
        let out = evaluate(TransitionType::VolumeFade, 0.5, FadeDirection::In, &s);
        assert_relative_eq!(out.gain, 0.3);
    }

    #[test]
    fn test_lowpass_opens_as_entering() {
        // Muffled (end) at progress 0, open (start) at progress 1
        let at_edge = single_stage(TransitionType::LowpassFilter, 0.0);
        let inside = single_stage(TransitionType::LowpassFilter, 1.0);
        assert_eq!(at_edge, EffectStage::Lowpass { cutoff_hz: 300.0 });
        assert_eq!(inside, EffectStage::Lowpass { cutoff_hz: 20_000.0 });
    }

    #[test]
    fn test_reverb_wet_high_at_buffer_edge() {
        let EffectStage::Reverb { wet: wet_edge, .. } = single_stage(TransitionType::ReverbTail, 0.0)
        else {
            panic!("expected reverb stage");
        };
        let EffectStage::Reverb { wet: wet_in, .. } = single_stage(TransitionType::ReverbTail, 1.0)
        else {
            panic!("expected reverb stage");
        };
        assert!(wet_edge > wet_in);
    }

    #[test]
    fn test_doppler_peaks_at_mid_transition() {
        let EffectStage::Doppler { pitch_ratio } = single_stage(TransitionType::Doppler, 0.5)
        else {
            panic!("expected doppler stage");
        };
        assert_relative_eq!(pitch_ratio, 1.1, epsilon = 1e-12);

        // Unity at both ends
        let EffectStage::Doppler { pitch_ratio } = single_stage(TransitionType::Doppler, 0.0)
        else {
            panic!("expected doppler stage");
        };
        assert_relative_eq!(pitch_ratio, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_doppler_sign_flips_on_exit() {
        let out = evaluate(TransitionType::Doppler, 0.5, FadeDirection::Out, &settings());
        let EffectStage::Doppler { pitch_ratio } = out.stages[0] else {
            panic!("expected doppler stage");
        };
        assert_relative_eq!(pitch_ratio, 0.9, epsilon = 1e-12);
    }

    #[test_case(0.0, 0.8)]
    #[test_case(0.5, 0.0)]
    #[test_case(1.0, -0.8)]
    fn test_spatial_blend_sweep(progress: f64, expected_pan: f64) {
        let EffectStage::Pan { position } = single_stage(TransitionType::SpatialBlend, progress)
        else {
            panic!("expected pan stage");
        };
        assert_relative_eq!(position, expected_pan, epsilon = 1e-12);
    }

    #[test]
    fn test_progress_clamped() {
        let out = evaluate(TransitionType::VolumeFade, 1.7, FadeDirection::In, &settings());
        assert_eq!(out.gain, 1.0);
        let out = evaluate(TransitionType::VolumeFade, -0.2, FadeDirection::In, &settings());
        assert_eq!(out.gain, 0.0);
    }

    #[test]
    fn test_tail_multipliers() {
        assert_eq!(TransitionType::ReverbTail.tail_multiplier(), 2.0);
        assert_eq!(TransitionType::DelayFeedback.tail_multiplier(), 1.5);
        assert_eq!(TransitionType::VolumeFade.tail_multiplier(), 1.0);
    }
}
