//! Transition engine orchestrator
//!
//! Consumes the ordered position stream and drives everything else: per
//! boundary it computes the signed edge distance, advances the phase
//! machine, evaluates the active transition curve, blends overlapping
//! boundaries, and issues ramp commands to the audio graph. One position
//! update is processed to completion before the next is accepted; the
//! runtime map is owned here and never shared.
//!
//! All scheduling is measured against position timestamps, so replaying a
//! recorded track reproduces the exact command sequence.

use serde::Serialize;
use tracing::{info, warn};

use crate::audio::{AudioBackend, AudioGraphManager, EffectStage, SourceId, SourceState};
use crate::crossfade::{self, CrossfadeMember};
use crate::error::Result;
use crate::geo;
use crate::model::{Boundary, LoadedComposition, Position};
use crate::transition::{
    evaluate, BoundaryPhase, BoundaryStateMachine, FadeDirection, PhaseEvent,
};

/// Ramp duration for mid-transition parameter updates, seconds
///
/// Short enough to track a walking listener at the nominal 1 Hz position
/// rate, long enough that consecutive ramps overlap without zipper noise.
const PARAM_RAMP_SECS: f64 = 0.25;

/// Per-boundary status reported after each processed position event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryStatus {
    pub boundary_id: String,
    pub phase: BoundaryPhase,
    pub progress: f64,
}

/// Per-boundary runtime state, owned exclusively by the engine
struct BoundaryRuntime {
    boundary: Boundary,
    machine: BoundaryStateMachine,
    source: Option<SourceId>,
}

/// What one boundary wants applied after this update, before crossfade
/// weighting
struct PendingUpdate {
    runtime_index: usize,
    source_id: SourceId,
    gain: f64,
    stages: Vec<EffectStage>,
    /// Ramp duration for this update's gain and stage targets: the
    /// boundary's fade-in length on entry, [`PARAM_RAMP_SECS`] for
    /// mid-transition tracking
    ramp_secs: f64,
}

/// The orchestrator: position stream in, audio graph commands out
pub struct TransitionEngine<B: AudioBackend> {
    runtimes: Vec<BoundaryRuntime>,
    graph: AudioGraphManager<B>,
}

impl<B: AudioBackend> TransitionEngine<B> {
    pub fn new(boundaries: Vec<Boundary>, backend: B) -> Self {
        let runtimes = boundaries
            .into_iter()
            .map(|boundary| BoundaryRuntime {
                machine: BoundaryStateMachine::new(&boundary.settings),
                boundary,
                source: None,
            })
            .collect();
        Self {
            runtimes,
            graph: AudioGraphManager::new(backend),
        }
    }

    /// Build an engine from a loaded composition, using only the
    /// boundaries that passed validation
    pub fn from_composition(loaded: LoadedComposition, backend: B) -> Self {
        if !loaded.rejected.is_empty() {
            info!(
                rejected = loaded.rejected.len(),
                "running without invalid boundaries"
            );
        }
        Self::new(loaded.boundaries, backend)
    }

    /// Process one position event end to end
    ///
    /// Malformed positions are dropped with an error; the previous state
    /// is retained and the next event is processed normally. A processed
    /// event returns the per-boundary status snapshot.
    pub fn process_position(&mut self, position: &Position) -> Result<Vec<BoundaryStatus>> {
        let listener = match position.validate() {
            Ok(p) => p,
            Err(err) => {
                warn!(error = %err, "dropping malformed position");
                return Err(err);
            }
        };
        let now = position.timestamp;

        // Finalize stops whose ramp deadline has passed; their boundaries
        // become free to start again.
        for released in self.graph.collect_released(now) {
            for runtime in &mut self.runtimes {
                if runtime.source == Some(released) {
                    runtime.source = None;
                }
            }
        }

        let mut pending: Vec<PendingUpdate> = Vec::new();
        let mut gains = vec![0.0; self.runtimes.len()];

        for index in 0..self.runtimes.len() {
            let runtime = &mut self.runtimes[index];
            let distance = geo::signed_distance_to_edge(&listener, &runtime.boundary.vertices);
            let step = runtime.machine.step(distance);
            let settings = &runtime.boundary.settings;
            let (kind, direction) = runtime.machine.active_fade();
            let progress = effective_progress(step.progress, step.phase, settings.blending_enabled);
            let curve = evaluate(kind, progress, direction, settings);
            gains[index] = curve.gain;

            match step.event {
                PhaseEvent::None => {}

                PhaseEvent::Entered => {
                    match self.graph.source_for_boundary(&runtime.boundary.id) {
                        // Mid-teardown re-entry: cancel the pending stop
                        // and resume ramping upward, never from silence.
                        Some((id, SourceState::Releasing { .. })) => {
                            self.graph
                                .cancel_stop(id, curve.gain, settings.fade_in_secs)?;
                            runtime.source = Some(id);
                            pending.push(PendingUpdate {
                                runtime_index: index,
                                source_id: id,
                                gain: curve.gain,
                                stages: curve.stages,
                                ramp_secs: settings.fade_in_secs,
                            });
                        }
                        // Entered is also emitted when a source survived a
                        // full Exiting→Entering flip while still active.
                        Some((id, SourceState::Active)) => {
                            runtime.source = Some(id);
                            pending.push(PendingUpdate {
                                runtime_index: index,
                                source_id: id,
                                gain: curve.gain,
                                stages: curve.stages,
                                ramp_secs: settings.fade_in_secs,
                            });
                        }
                        None => {
                            let chain = declared_chain(&runtime.boundary, progress);
                            match self.graph.start(
                                &runtime.boundary.id,
                                &runtime.boundary.audio_ref,
                                curve.gain,
                                settings.fade_in_secs,
                                chain,
                            ) {
                                Ok(id) => {
                                    runtime.source = Some(id);
                                    pending.push(PendingUpdate {
                                        runtime_index: index,
                                        source_id: id,
                                        gain: curve.gain,
                                        stages: curve.stages,
                                        ramp_secs: settings.fade_in_secs,
                                    });
                                }
                                // The boundary stays geometrically
                                // tracked; the start is retried on its
                                // next Entered event.
                                Err(err) => {
                                    warn!(
                                        boundary_id = %runtime.boundary.id,
                                        error = %err,
                                        "source failed to start"
                                    );
                                }
                            }
                        }
                    }
                }

                PhaseEvent::Progressed => {
                    // A source mid-teardown keeps its stop ramp; only
                    // active sources get parameter pushes.
                    if let (Some(id), Some((_, SourceState::Active))) = (
                        runtime.source,
                        self.graph.source_for_boundary(&runtime.boundary.id),
                    ) {
                        pending.push(PendingUpdate {
                            runtime_index: index,
                            source_id: id,
                            gain: curve.gain,
                            stages: curve.stages,
                            ramp_secs: PARAM_RAMP_SECS,
                        });
                    }
                }

                PhaseEvent::TeardownDue { tail_secs } => {
                    if let Some(id) = runtime.source {
                        self.graph.stop(id, tail_secs, now)?;
                    }
                }

                PhaseEvent::Left => {
                    if let Some(id) = runtime.source {
                        if let Some((_, SourceState::Active)) =
                            self.graph.source_for_boundary(&runtime.boundary.id)
                        {
                            // Teardown should have been scheduled while
                            // Exiting; a position jump can skip the band.
                            warn!(
                                boundary_id = %runtime.boundary.id,
                                "reached Outside with a live source, forcing stop"
                            );
                            self.graph.stop(
                                id,
                                settings.fade_out_secs * settings.fade_out_type.tail_multiplier(),
                                now,
                            )?;
                        }
                    }
                }
            }
        }

        self.apply_with_crossfade(&listener, pending, &gains)?;
        Ok(self.status())
    }

    /// Current per-boundary status snapshot
    pub fn status(&self) -> Vec<BoundaryStatus> {
        self.runtimes
            .iter()
            .map(|r| BoundaryStatus {
                boundary_id: r.boundary.id.clone(),
                phase: r.machine.phase(),
                progress: r.machine.progress(),
            })
            .collect()
    }

    /// The audio graph, for telemetry and tests
    pub fn graph(&self) -> &AudioGraphManager<B> {
        &self.graph
    }

    /// Weight the pending updates across overlapping boundaries, then
    /// issue the volume and stage ramps
    ///
    /// The member set is every non-`Outside` boundary with crossfade
    /// enabled, not just the boundaries ramped this update: a partner
    /// still fading out keeps weighting its neighbors until it reaches
    /// `Outside`, so its neighbors never jump to full volume over a
    /// still-audible exit tail.
    fn apply_with_crossfade(
        &mut self,
        listener: &crate::model::LatLng,
        pending: Vec<PendingUpdate>,
        gains: &[f64],
    ) -> Result<()> {
        let members: Vec<CrossfadeMember> = self
            .runtimes
            .iter()
            .enumerate()
            .filter(|(_, r)| {
                r.machine.phase() != BoundaryPhase::Outside && r.boundary.settings.crossfade_overlap
            })
            .map(|(index, r)| CrossfadeMember {
                boundary_id: r.boundary.id.clone(),
                centroid: r.boundary.centroid(),
                base_volume: gains[index],
            })
            .collect();
        let weighted = crossfade::blend(listener, &members);

        for update in pending {
            let boundary_id = &self.runtimes[update.runtime_index].boundary.id;
            let gain = weighted.get(boundary_id).copied().unwrap_or(update.gain);
            self.graph
                .set_volume(update.source_id, gain, update.ramp_secs)?;
            for stage in update.stages {
                self.graph
                    .set_effect(update.source_id, stage, update.ramp_secs)?;
            }
        }
        Ok(())
    }
}

/// Quantize progress when blending is disabled: the boundary is binary,
/// audible at full level only once actually inside
fn effective_progress(progress: f64, phase: BoundaryPhase, blending_enabled: bool) -> f64 {
    if blending_enabled {
        progress
    } else if phase == BoundaryPhase::Inside {
        1.0
    } else {
        0.0
    }
}

/// The declarative signal chain for a boundary's source
///
/// Built once per start, covering the stages of both the entry and exit
/// transition types so exit automation never has to mutate the chain
/// shape.
fn declared_chain(boundary: &Boundary, progress: f64) -> Vec<EffectStage> {
    let settings = &boundary.settings;
    let mut chain = evaluate(settings.fade_in_type, progress, FadeDirection::In, settings).stages;
    let exit = evaluate(settings.fade_out_type, progress, FadeDirection::Out, settings).stages;
    for stage in exit {
        if !chain.iter().any(|s| s.kind() == stage.kind()) {
            chain.push(stage);
        }
    }
    chain
}

// ============================================================================
// Tests
// ============================================================================
