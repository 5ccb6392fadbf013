//! Transition curves and the per-boundary phase machine

mod curve;
mod state;

pub use curve::{evaluate, CurveOutput, FadeDirection, TransitionType};
pub use state::{BoundaryPhase, BoundaryStateMachine, PhaseEvent, StepResult};
