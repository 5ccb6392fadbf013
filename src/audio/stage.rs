//! Declarative effect stages
//!
//! A source's signal chain is an ordered list of stages, each strongly
//! typed by its parameter schema. The chain is described once at `start`
//! and torn down once at release; position updates only re-ramp parameter
//! values on existing stages.

use serde::{Deserialize, Serialize};

/// One stage in a source's signal chain, with its current target values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EffectStage {
    Lowpass { cutoff_hz: f64 },
    Highpass { cutoff_hz: f64 },
    Reverb { wet: f64, decay_secs: f64 },
    Delay { feedback: f64, time_secs: f64 },
    PitchShift { semitones: f64 },
    Doppler { pitch_ratio: f64 },
    Pan { position: f64 },
}

/// Stage kinds, used to address a stage within a chain when re-ramping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StageKind {
    Lowpass,
    Highpass,
    Reverb,
    Delay,
    PitchShift,
    Doppler,
    Pan,
}

impl EffectStage {
    pub fn kind(&self) -> StageKind {
        match self {
            EffectStage::Lowpass { .. } => StageKind::Lowpass,
            EffectStage::Highpass { .. } => StageKind::Highpass,
            EffectStage::Reverb { .. } => StageKind::Reverb,
            EffectStage::Delay { .. } => StageKind::Delay,
            EffectStage::PitchShift { .. } => StageKind::PitchShift,
            EffectStage::Doppler { .. } => StageKind::Doppler,
            EffectStage::Pan { .. } => StageKind::Pan,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_addressing() {
        let stage = EffectStage::Reverb {
            wet: 0.4,
            decay_secs: 2.0,
        };
        assert_eq!(stage.kind(), StageKind::Reverb);
    }

    #[test]
    fn test_stage_serialization_is_tagged() {
        let stage = EffectStage::Lowpass { cutoff_hz: 800.0 };
        let json = serde_json::to_value(&stage).unwrap();
        assert_eq!(json["type"], "lowpass");
        assert_eq!(json["cutoffHz"], 800.0);
    }
}
