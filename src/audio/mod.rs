//! Audio graph: declarative source chains over an external rendering
//! backend

mod backend;
mod graph;
mod stage;

pub use backend::{AudioBackend, BackendCommand, LogBackend, RecordingBackend};
pub use graph::{AudioGraphManager, SourceId, SourceSnapshot, SourceState};
pub use stage::{EffectStage, StageKind};
