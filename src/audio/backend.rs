//! Rendering backend interface
//!
//! The engine never touches devices or decoders; it issues commands to an
//! [`AudioBackend`] and the backend schedules the actual ramps
//! asynchronously. Two implementations ship with the crate: a tracing
//! logger for the CLI and a recording backend for tests.

use std::collections::HashSet;

use tracing::debug;
use uuid::Uuid;

use crate::audio::stage::EffectStage;
use crate::error::{Result, SoundwalkError};

/// Commands the engine issues to the rendering backend
///
/// Gain and parameter changes always carry an explicit ramp duration;
/// instantaneous value assignment would produce audible discontinuities.
pub trait AudioBackend: Send {
    /// Allocate a voice for `audio_ref` with the given signal chain,
    /// starting silent
    ///
    /// Fails (e.g. the underlying asset cannot be decoded) with
    /// [`SoundwalkError::SourceUnavailable`]-compatible reasons; the
    /// graph layer attaches the boundary id.
    fn create_source(&mut self, source_id: Uuid, audio_ref: &str, chain: &[EffectStage])
        -> Result<()>;

    /// Ramp the source gain to `target` over `ramp_secs`
    fn ramp_gain(&mut self, source_id: Uuid, target: f64, ramp_secs: f64);

    /// Ramp one stage's parameters to the values carried in `stage`
    fn ramp_stage(&mut self, source_id: Uuid, stage: EffectStage, ramp_secs: f64);

    /// Tear down the voice and free its resources
    ///
    /// Only called after the stop ramp duration has elapsed.
    fn release_source(&mut self, source_id: Uuid);
}

// ============================================================================
// Log Backend
// ============================================================================

/// Backend that traces every command and renders nothing
///
/// Used by the CLI simulator and useful as a stand-in while the real
/// renderer is unavailable.
#[derive(Debug, Default)]
pub struct LogBackend;

impl AudioBackend for LogBackend {
    fn create_source(&mut self, source_id: Uuid, audio_ref: &str, chain: &[EffectStage]) -> Result<()> {
        debug!(%source_id, audio_ref, ?chain, "create source");
        Ok(())
    }

    fn ramp_gain(&mut self, source_id: Uuid, target: f64, ramp_secs: f64) {
        debug!(%source_id, target, ramp_secs, "ramp gain");
    }

    fn ramp_stage(&mut self, source_id: Uuid, stage: EffectStage, ramp_secs: f64) {
        debug!(%source_id, ?stage, ramp_secs, "ramp stage");
    }

    fn release_source(&mut self, source_id: Uuid) {
        debug!(%source_id, "release source");
    }
}

// ============================================================================
// Recording Backend
// ============================================================================

/// One recorded backend command
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCommand {
    Create {
        source_id: Uuid,
        audio_ref: String,
        chain: Vec<EffectStage>,
    },
    RampGain {
        source_id: Uuid,
        target: f64,
        ramp_secs: f64,
    },
    RampStage {
        source_id: Uuid,
        stage: EffectStage,
        ramp_secs: f64,
    },
    Release {
        source_id: Uuid,
    },
}

/// Backend that records every command for later inspection
///
/// `fail_refs` simulates undecodable assets: any `create_source` whose
/// `audio_ref` is listed fails.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub commands: Vec<BackendCommand>,
    pub fail_refs: HashSet<String>,
    /// Number of `create_source` calls rejected via `fail_refs`
    pub failed_creates: usize,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// All gain ramp targets issued for one source, in order
    pub fn gain_targets(&self, source_id: Uuid) -> Vec<f64> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                BackendCommand::RampGain {
                    source_id: id,
                    target,
                    ..
                } if *id == source_id => Some(*target),
                _ => None,
            })
            .collect()
    }
}

impl AudioBackend for RecordingBackend {
    fn create_source(&mut self, source_id: Uuid, audio_ref: &str, chain: &[EffectStage]) -> Result<()> {
        if self.fail_refs.contains(audio_ref) {
            self.failed_creates += 1;
            return Err(SoundwalkError::SourceUnavailable {
                boundary_id: String::new(),
                reason: format!("cannot decode '{audio_ref}'"),
            });
        }
        self.commands.push(BackendCommand::Create {
            source_id,
            audio_ref: audio_ref.to_string(),
            chain: chain.to_vec(),
        });
        Ok(())
    }

    fn ramp_gain(&mut self, source_id: Uuid, target: f64, ramp_secs: f64) {
        self.commands.push(BackendCommand::RampGain {
            source_id,
            target,
            ramp_secs,
        });
    }

    fn ramp_stage(&mut self, source_id: Uuid, stage: EffectStage, ramp_secs: f64) {
        self.commands.push(BackendCommand::RampStage {
            source_id,
            stage,
            ramp_secs,
        });
    }

    fn release_source(&mut self, source_id: Uuid) {
        self.commands.push(BackendCommand::Release { source_id });
    }
}
