//! Audio graph manager
//!
//! Owns the live sources and their declarative signal chains, enforces the
//! one-source-per-boundary invariant, and defers resource release until a
//! stop ramp's deadline has elapsed. Release deadlines are explicit
//! scheduled events checked against position-stream time, so cancelling a
//! pending stop on rapid re-entry is a state flip, not a race against a
//! timer.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::audio::backend::AudioBackend;
use crate::audio::stage::EffectStage;
use crate::error::{Result, SoundwalkError};

/// Handle to one live audio source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SourceId(pub Uuid);

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle state of a live source
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceState {
    Active,
    /// Stop ramp issued; the voice is released once `complete_at` passes.
    /// The id stays reserved until then.
    Releasing { complete_at: DateTime<Utc> },
}

#[derive(Debug, Clone)]
struct ActiveAudioSource {
    boundary_id: String,
    audio_ref: String,
    volume: f64,
    chain: Vec<EffectStage>,
    state: SourceState,
}

/// Status snapshot of one live source
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSnapshot {
    pub source_id: SourceId,
    pub boundary_id: String,
    pub volume: f64,
    pub effects: Vec<EffectStage>,
}

/// Owns live sources and translates engine intents into backend ramps
pub struct AudioGraphManager<B: AudioBackend> {
    backend: B,
    sources: HashMap<SourceId, ActiveAudioSource>,
}

impl<B: AudioBackend> AudioGraphManager<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            sources: HashMap::new(),
        }
    }

    /// Start a source for a boundary, fading in to `initial_volume`
    ///
    /// The signal chain is constructed once here and lives until release.
    /// Starting while the boundary already owns a source, active or still
    /// releasing, is rejected with `AlreadyActive` so voices never leak;
    /// callers reuse the existing source via [`cancel_stop`] instead.
    ///
    /// [`cancel_stop`]: AudioGraphManager::cancel_stop
    pub fn start(
        &mut self,
        boundary_id: &str,
        audio_ref: &str,
        initial_volume: f64,
        fade_in_secs: f64,
        chain: Vec<EffectStage>,
    ) -> Result<SourceId> {
        if let Some((id, _)) = self.source_for_boundary(boundary_id) {
            return Err(SoundwalkError::AlreadyActive {
                source_id: id.to_string(),
            });
        }

        let id = SourceId(Uuid::new_v4());
        self.backend
            .create_source(id.0, audio_ref, &chain)
            .map_err(|err| SoundwalkError::SourceUnavailable {
                boundary_id: boundary_id.to_string(),
                reason: err.to_string(),
            })?;
        self.backend.ramp_gain(id.0, initial_volume, fade_in_secs);

        debug!(source_id = %id, boundary_id, initial_volume, fade_in_secs, "source started");
        self.sources.insert(
            id,
            ActiveAudioSource {
                boundary_id: boundary_id.to_string(),
                audio_ref: audio_ref.to_string(),
                volume: initial_volume,
                chain,
                state: SourceState::Active,
            },
        );
        Ok(id)
    }

    /// Ramp a source to silence and schedule its release
    ///
    /// The voice is only freed by [`collect_released`] once `now +
    /// fade_out_secs` has passed; until then the id remains reserved.
    ///
    /// [`collect_released`]: AudioGraphManager::collect_released
    pub fn stop(&mut self, id: SourceId, fade_out_secs: f64, now: DateTime<Utc>) -> Result<()> {
        let source = self.source_mut(id)?;
        source.volume = 0.0;
        source.state = SourceState::Releasing {
            complete_at: now + Duration::milliseconds((fade_out_secs * 1000.0) as i64),
        };
        let boundary_id = source.boundary_id.clone();
        self.backend.ramp_gain(id.0, 0.0, fade_out_secs);
        debug!(source_id = %id, boundary_id, fade_out_secs, "stop scheduled");
        Ok(())
    }

    /// Cancel a pending stop and ramp back up to `target_volume`
    ///
    /// Rapid boundary re-crossing reuses the fading voice rather than
    /// letting it die and restarting from silence.
    pub fn cancel_stop(&mut self, id: SourceId, target_volume: f64, ramp_secs: f64) -> Result<()> {
        let source = self.source_mut(id)?;
        source.state = SourceState::Active;
        source.volume = target_volume;
        self.backend.ramp_gain(id.0, target_volume, ramp_secs);
        debug!(source_id = %id, target_volume, "stop cancelled, resuming");
        Ok(())
    }

    /// Ramp a source's gain to `volume` over `ramp_secs`
    pub fn set_volume(&mut self, id: SourceId, volume: f64, ramp_secs: f64) -> Result<()> {
        let source = self.source_mut(id)?;
        source.volume = volume;
        self.backend.ramp_gain(id.0, volume, ramp_secs);
        Ok(())
    }

    /// Ramp one effect stage to the target values carried in `stage`
    ///
    /// Updates the matching stage of the source's chain; a stage kind the
    /// chain was not built with is appended (the chain covers the
    /// boundary's entry and exit types, so this indicates a settings
    /// mismatch and is logged).
    pub fn set_effect(&mut self, id: SourceId, stage: EffectStage, ramp_secs: f64) -> Result<()> {
        let source = self.source_mut(id)?;
        match source.chain.iter_mut().find(|s| s.kind() == stage.kind()) {
            Some(existing) => *existing = stage,
            None => {
                warn!(source_id = %id, ?stage, "stage missing from declared chain, appending");
                source.chain.push(stage);
            }
        }
        self.backend.ramp_stage(id.0, stage, ramp_secs);
        Ok(())
    }

    /// Free every source whose stop ramp has finished by `now`
    ///
    /// Returns the released ids so the orchestrator can drop its handles.
    pub fn collect_released(&mut self, now: DateTime<Utc>) -> Vec<SourceId> {
        let due: Vec<SourceId> = self
            .sources
            .iter()
            .filter_map(|(id, s)| match s.state {
                SourceState::Releasing { complete_at } if complete_at <= now => Some(*id),
                _ => None,
            })
            .collect();

        for id in &due {
            if let Some(source) = self.sources.remove(id) {
                self.backend.release_source(id.0);
                debug!(source_id = %id, audio_ref = %source.audio_ref, "source released");
            }
        }
        due
    }

    /// The source currently bound to a boundary, if any
    pub fn source_for_boundary(&self, boundary_id: &str) -> Option<(SourceId, SourceState)> {
        self.sources
            .iter()
            .find(|(_, s)| s.boundary_id == boundary_id)
            .map(|(id, s)| (*id, s.state))
    }

    /// Snapshot of all live sources (including those still releasing)
    pub fn active(&self) -> Vec<SourceSnapshot> {
        let mut snapshots: Vec<SourceSnapshot> = self
            .sources
            .iter()
            .map(|(id, s)| SourceSnapshot {
                source_id: *id,
                boundary_id: s.boundary_id.clone(),
                volume: s.volume,
                effects: s.chain.clone(),
            })
            .collect();
        snapshots.sort_by(|a, b| a.boundary_id.cmp(&b.boundary_id));
        snapshots
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn source_mut(&mut self, id: SourceId) -> Result<&mut ActiveAudioSource> {
        self.sources
            .get_mut(&id)
            .ok_or_else(|| SoundwalkError::NotFound {
                source_id: id.to_string(),
            })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::backend::{BackendCommand, RecordingBackend};
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn graph() -> AudioGraphManager<RecordingBackend> {
        AudioGraphManager::new(RecordingBackend::new())
    }

    fn lowpass_chain() -> Vec<EffectStage> {
        vec![EffectStage::Lowpass { cutoff_hz: 300.0 }]
    }

    #[test]
    fn test_start_creates_then_ramps() {
        let mut g = graph();
        let id = g.start("b1", "assets/a.ogg", 0.4, 2.0, lowpass_chain()).unwrap();

        let cmds = &g.backend().commands;
        assert!(matches!(&cmds[0], BackendCommand::Create { source_id, .. } if *source_id == id.0));
        assert_eq!(
            cmds[1],
            BackendCommand::RampGain {
                source_id: id.0,
                target: 0.4,
                ramp_secs: 2.0
            }
        );
    }

    #[test]
    fn test_start_twice_rejected() {
        let mut g = graph();
        g.start("b1", "assets/a.ogg", 0.4, 2.0, vec![]).unwrap();
        let err = g.start("b1", "assets/a.ogg", 0.4, 2.0, vec![]).unwrap_err();
        assert_eq!(err.error_code(), "ALREADY_ACTIVE");
    }

    #[test]
    fn test_start_rejected_while_releasing() {
        let mut g = graph();
        let id = g.start("b1", "assets/a.ogg", 1.0, 2.0, vec![]).unwrap();
        g.stop(id, 2.0, t(0)).unwrap();

        // Before the ramp deadline the id is still reserved
        let err = g.start("b1", "assets/a.ogg", 0.2, 2.0, vec![]).unwrap_err();
        assert_eq!(err.error_code(), "ALREADY_ACTIVE");

        // After the deadline elapses the boundary is free again
        assert_eq!(g.collect_released(t(3)), vec![id]);
        assert!(g.start("b1", "assets/a.ogg", 0.2, 2.0, vec![]).is_ok());
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let mut g = graph();
        let ghost = SourceId(Uuid::new_v4());
        assert_eq!(g.stop(ghost, 1.0, t(0)).unwrap_err().error_code(), "NOT_FOUND");
        assert_eq!(
            g.set_volume(ghost, 0.5, 0.25).unwrap_err().error_code(),
            "NOT_FOUND"
        );
        assert_eq!(
            g.set_effect(ghost, EffectStage::Pan { position: 0.0 }, 0.25)
                .unwrap_err()
                .error_code(),
            "NOT_FOUND"
        );
    }

    #[test]
    fn test_release_waits_for_ramp_deadline() {
        let mut g = graph();
        let id = g.start("b1", "assets/a.ogg", 1.0, 1.0, vec![]).unwrap();
        g.stop(id, 4.0, t(0)).unwrap();

        assert!(g.collect_released(t(3)).is_empty());
        assert_eq!(g.collect_released(t(4)), vec![id]);
        assert!(matches!(
            g.backend().commands.last(),
            Some(BackendCommand::Release { source_id }) if *source_id == id.0
        ));
    }

    #[test]
    fn test_cancel_stop_resumes_without_silence() {
        let mut g = graph();
        let id = g.start("b1", "assets/a.ogg", 1.0, 1.0, vec![]).unwrap();
        g.stop(id, 4.0, t(0)).unwrap();
        g.cancel_stop(id, 0.6, 1.0).unwrap();

        // The stop never completes, even long after its old deadline
        assert!(g.collect_released(t(100)).is_empty());
        assert_eq!(g.backend().gain_targets(id.0), vec![1.0, 0.0, 0.6]);
    }

    #[test]
    fn test_set_effect_updates_declared_chain() {
        let mut g = graph();
        let id = g.start("b1", "assets/a.ogg", 1.0, 1.0, lowpass_chain()).unwrap();
        g.set_effect(id, EffectStage::Lowpass { cutoff_hz: 8_000.0 }, 0.25)
            .unwrap();

        let snapshot = g.active();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(
            snapshot[0].effects,
            vec![EffectStage::Lowpass { cutoff_hz: 8_000.0 }]
        );
    }

    #[test]
    fn test_failed_create_surfaces_boundary() {
        let mut backend = RecordingBackend::new();
        backend.fail_refs.insert("assets/broken.ogg".to_string());
        let mut g = AudioGraphManager::new(backend);

        let err = g
            .start("b1", "assets/broken.ogg", 0.5, 2.0, vec![])
            .unwrap_err();
        assert_eq!(err.error_code(), "SOURCE_UNAVAILABLE");
        // Nothing was registered, a later retry is allowed
        assert!(g.source_for_boundary("b1").is_none());
        assert!(g.active().is_empty());
    }

    #[test]
    fn test_active_snapshot_reports_volume_and_boundary() {
        let mut g = graph();
        let id = g.start("b2", "assets/b.ogg", 0.3, 1.0, vec![]).unwrap();
        g.set_volume(id, 0.9, 0.25).unwrap();

        let snapshot = g.active();
        assert_eq!(snapshot[0].boundary_id, "b2");
        assert_eq!(snapshot[0].volume, 0.9);
    }
}
