pub mod error;
pub mod event;
pub mod machine;
pub mod model;

pub use error::{EngineResult, ModeError};
pub use event::{Effects, EngineEvent, EventKind, ModeUpdate, PhaseTransition};
pub use machine::ResolutionEngine;
pub use model::{EngineSettings, Phase};
