//! Boundary transition state machine
//!
//! One instance per boundary per session. Each position update feeds the
//! signed edge distance in; the machine advances its phase, recomputes the
//! transition progress, and reports what the orchestrator should do to the
//! audio graph.

use std::fmt;
use tracing::debug;

use crate::model::TransitionSettings;
use crate::transition::curve::{FadeDirection, TransitionType};

/// Exit progress at or below which teardown is triggered
const TEARDOWN_PROGRESS: f64 = 0.05;

/// Listener phase relative to one boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BoundaryPhase {
    /// Beyond the transition buffer (default state)
    #[default]
    Outside,
    /// Within the buffer, approaching the edge
    Entering,
    /// Past the edge, fully inside the polygon
    Inside,
    /// Within the buffer, moving away from the edge
    Exiting,
}

impl fmt::Display for BoundaryPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryPhase::Outside => write!(f, "Outside"),
            BoundaryPhase::Entering => write!(f, "Entering"),
            BoundaryPhase::Inside => write!(f, "Inside"),
            BoundaryPhase::Exiting => write!(f, "Exiting"),
        }
    }
}

/// What the orchestrator must do after one step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhaseEvent {
    /// Nothing audible changed (steady `Outside`)
    None,
    /// Became audible: start a source, or cancel a pending stop on rapid
    /// re-entry
    Entered,
    /// Active phase advanced: push current curve values
    Progressed,
    /// Exit progress crossed the teardown threshold: schedule a stop with
    /// this fade tail
    TeardownDue { tail_secs: f64 },
    /// Crossed out of the transition buffer entirely
    Left,
}

/// Outcome of one position update for one boundary
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepResult {
    pub phase: BoundaryPhase,
    pub progress: f64,
    pub event: PhaseEvent,
}

/// Per-boundary phase machine
///
/// Phases cycle `Outside → Entering → Inside → Exiting → Outside`;
/// `Exiting → Entering` is legal directly (re-approach) and never passes
/// through `Outside`.
#[derive(Debug, Clone)]
pub struct BoundaryStateMachine {
    phase: BoundaryPhase,
    progress: f64,
    last_distance: Option<f64>,
    teardown_scheduled: bool,
    transition_radius: f64,
    fade_in_type: TransitionType,
    fade_out_type: TransitionType,
    fade_out_secs: f64,
}

impl BoundaryStateMachine {
    pub fn new(settings: &TransitionSettings) -> Self {
        Self {
            phase: BoundaryPhase::Outside,
            progress: 0.0,
            last_distance: None,
            teardown_scheduled: false,
            transition_radius: settings.transition_radius,
            fade_in_type: settings.fade_in_type,
            fade_out_type: settings.fade_out_type,
            fade_out_secs: settings.fade_out_secs,
        }
    }

    pub fn phase(&self) -> BoundaryPhase {
        self.phase
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// The transition type and direction currently shaping the audio
    pub fn active_fade(&self) -> (TransitionType, FadeDirection) {
        match self.phase {
            BoundaryPhase::Exiting => (self.fade_out_type, FadeDirection::Out),
            _ => (self.fade_in_type, FadeDirection::In),
        }
    }

    /// Advance the machine with a freshly computed signed edge distance
    /// (negative inside the polygon)
    pub fn step(&mut self, signed_distance: f64) -> StepResult {
        let r = self.transition_radius;
        let prev_phase = self.phase;
        let prev_distance = self.last_distance;
        self.last_distance = Some(signed_distance);

        let phase = if signed_distance > r {
            BoundaryPhase::Outside
        } else if signed_distance <= 0.0 {
            BoundaryPhase::Inside
        } else {
            // Within the buffer band: direction depends on history. A
            // shrinking distance flips Exiting back to Entering
            // (re-approach); a growing one flips Entering to Exiting
            // (retreat before ever going inside).
            match prev_phase {
                BoundaryPhase::Outside => BoundaryPhase::Entering,
                BoundaryPhase::Inside => BoundaryPhase::Exiting,
                BoundaryPhase::Entering => {
                    let retreating = prev_distance.is_some_and(|d| signed_distance > d);
                    if retreating {
                        BoundaryPhase::Exiting
                    } else {
                        BoundaryPhase::Entering
                    }
                }
                BoundaryPhase::Exiting => {
                    let approaching = prev_distance.is_some_and(|d| signed_distance < d);
                    if approaching {
                        BoundaryPhase::Entering
                    } else {
                        BoundaryPhase::Exiting
                    }
                }
            }
        };

        // Progress is 1 at the edge and 0 at the outer buffer limit, for
        // entry and exit alike.
        let progress = ((r - signed_distance) / r).clamp(0.0, 1.0);

        let event = match phase {
            BoundaryPhase::Outside => {
                self.teardown_scheduled = false;
                if prev_phase == BoundaryPhase::Outside {
                    PhaseEvent::None
                } else {
                    PhaseEvent::Left
                }
            }
            BoundaryPhase::Entering => {
                let was_audible = matches!(
                    prev_phase,
                    BoundaryPhase::Entering | BoundaryPhase::Inside
                );
                self.teardown_scheduled = false;
                if was_audible {
                    PhaseEvent::Progressed
                } else {
                    PhaseEvent::Entered
                }
            }
            BoundaryPhase::Inside => {
                self.teardown_scheduled = false;
                if prev_phase == BoundaryPhase::Outside {
                    // A large position jump can land deep inside in one
                    // step; the source still has to start.
                    PhaseEvent::Entered
                } else {
                    PhaseEvent::Progressed
                }
            }
            BoundaryPhase::Exiting => {
                if progress <= TEARDOWN_PROGRESS && !self.teardown_scheduled {
                    self.teardown_scheduled = true;
                    PhaseEvent::TeardownDue {
                        tail_secs: self.fade_out_secs * self.fade_out_type.tail_multiplier(),
                    }
                } else {
                    PhaseEvent::Progressed
                }
            }
        };

        if phase != prev_phase {
            debug!(%prev_phase, %phase, progress, signed_distance, "boundary phase change");
        }

        self.phase = phase;
        self.progress = progress;
        StepResult {
            phase,
            progress,
            event,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
