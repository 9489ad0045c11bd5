use std::fmt;

use super::model::Phase;
use crate::mode::Mode;
use crate::storage::StorageEvent;

/// A setter argument: a literal mode, or a function of the previous mode
/// evaluated inside the engine's single mutation path.
pub enum ModeUpdate {
    Literal(Mode),
    Updater(Box<dyn FnOnce(&Mode) -> Mode>),
}

impl ModeUpdate {
    pub fn with(updater: impl FnOnce(&Mode) -> Mode + 'static) -> Self {
        ModeUpdate::Updater(Box::new(updater))
    }

    pub(crate) fn resolve(self, previous: &Mode) -> Mode {
        match self {
            ModeUpdate::Literal(mode) => mode,
            ModeUpdate::Updater(updater) => updater(previous),
        }
    }
}

impl fmt::Debug for ModeUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModeUpdate::Literal(mode) => f.debug_tuple("Literal").field(mode).finish(),
            ModeUpdate::Updater(_) => f.write_str("Updater(..)"),
        }
    }
}

impl From<Mode> for ModeUpdate {
    fn from(mode: Mode) -> Self {
        ModeUpdate::Literal(mode)
    }
}

impl From<&str> for ModeUpdate {
    fn from(mode: &str) -> Self {
        ModeUpdate::Literal(Mode::new(mode))
    }
}

impl From<String> for ModeUpdate {
    fn from(mode: String) -> Self {
        ModeUpdate::Literal(Mode::new(mode))
    }
}

#[derive(Debug)]
pub enum EngineEvent {
    /// First resolution from the persisted value and the current OS value.
    Init {
        persisted: Option<String>,
        system: Mode,
    },
    /// The application called the setter.
    SetMode(ModeUpdate),
    /// The OS preference changed.
    SystemChanged(Mode),
    /// Another context mutated the storage area.
    StorageChanged(StorageEvent),
    /// The page-level override was set, changed or lifted.
    OverrideChanged(Option<Mode>),
}

impl EngineEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            EngineEvent::Init { .. } => EventKind::Init,
            EngineEvent::SetMode(_) => EventKind::SetMode,
            EngineEvent::SystemChanged(_) => EventKind::SystemChanged,
            EngineEvent::StorageChanged(_) => EventKind::StorageChanged,
            EngineEvent::OverrideChanged(_) => EventKind::OverrideChanged,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Init,
    SetMode,
    SystemChanged,
    StorageChanged,
    OverrideChanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseTransition {
    pub from: Phase,
    pub event: EventKind,
    pub to: Phase,
}

impl PhaseTransition {
    pub fn new(from: Phase, event: EventKind, to: Phase) -> Self {
        Self { from, event, to }
    }
}

/// What the host must do after an event.
///
/// `apply` carries the unresolved target (possibly `"system"`); the host
/// resolves it against the live system preference at apply time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Effects {
    pub persist: Option<Mode>,
    pub apply: Option<Mode>,
}

impl Effects {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn apply(mode: Mode) -> Self {
        Self {
            persist: None,
            apply: Some(mode),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.persist.is_none() && self.apply.is_none()
    }
}
