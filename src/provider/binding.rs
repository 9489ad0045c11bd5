use std::rc::{Rc, Weak};

use super::Shared;
use crate::config::ValidatedConfig;
use crate::engine::{EngineEvent, EngineResult, ModeError, ModeUpdate};
use crate::mode::Mode;
use crate::subscription::Subscription;

/// What a UI should show as the current choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayMode {
    Chosen(Mode),
    /// The page forces `forced`; the user's own choice stays `chosen`.
    Forced { forced: Mode, chosen: Mode },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeSnapshot {
    pub display: DisplayMode,
    pub mode: Mode,
    pub forced: Option<Mode>,
    pub resolved: Mode,
    /// `None` unless system tracking is enabled.
    pub system: Option<Mode>,
    pub modes: Vec<Mode>,
}

impl ModeSnapshot {
    /// The mode the user effectively sees, ignoring the substitution of `"system"`.
    pub fn effective(&self) -> &Mode {
        self.forced.as_ref().unwrap_or(&self.mode)
    }
}

/// Setter handle with a stable identity for the provider's lifetime.
#[derive(Clone)]
pub struct ModeSetter {
    target: Rc<Weak<Shared>>,
}

impl ModeSetter {
    pub(super) fn new(shared: Weak<Shared>) -> Self {
        Self {
            target: Rc::new(shared),
        }
    }

    pub fn set(&self, update: impl Into<ModeUpdate>) -> EngineResult<()> {
        let shared = self
            .target
            .upgrade()
            .filter(|shared| shared.is_mounted())
            .ok_or(ModeError::ProviderDropped)?;
        shared.dispatch(EngineEvent::SetMode(update.into()))
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.target, &other.target)
    }
}

impl std::fmt::Debug for ModeSetter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeSetter")
            .field("attached", &(self.target.strong_count() > 0))
            .finish()
    }
}

/// Read and write access to one provider's state.
#[derive(Clone)]
pub struct ModeBinding {
    shared: Rc<Shared>,
}

impl ModeBinding {
    pub(super) fn new(shared: Rc<Shared>) -> Self {
        Self { shared }
    }

    pub fn snapshot(&self) -> ModeSnapshot {
        self.shared.snapshot()
    }

    pub fn setter(&self) -> ModeSetter {
        self.shared.setter.clone()
    }

    pub fn set_mode(&self, update: impl Into<ModeUpdate>) -> EngineResult<()> {
        self.shared.setter.set(update)
    }

    /// Sets or lifts the page-level override.
    pub fn set_forced(&self, forced: Option<Mode>) -> EngineResult<()> {
        if !self.shared.is_mounted() {
            return Err(ModeError::ProviderDropped);
        }
        self.shared.dispatch(EngineEvent::OverrideChanged(forced))
    }

    /// `listener` runs after every event that changed the snapshot.
    pub fn subscribe(&self, listener: impl Fn(&ModeSnapshot) + 'static) -> Subscription {
        self.shared.listeners.add(Rc::new(listener))
    }

    pub fn config(&self) -> &ValidatedConfig {
        &self.shared.config
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }
}

impl std::fmt::Debug for ModeBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeBinding")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}
