use crate::config::ValidatedConfig;
use crate::mode::Mode;

/// Lifecycle of one axis inside the engine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    /// Before the first resolution (pre-mount, server render).
    #[default]
    Uninitialized,
    /// Steady state: the chosen mode is known and applied (or overridden).
    Resolved,
    /// A cross-tab update arrived while an override was active; applied
    /// once the override is lifted.
    PendingExternalUpdate(Mode),
}

/// The slice of configuration the state machine needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub storage_key: String,
    pub default_mode: Mode,
    pub enable_system: bool,
    pub allowed: Vec<Mode>,
    pub system_fallback: Mode,
}

impl EngineSettings {
    pub fn from_config(config: &ValidatedConfig) -> Self {
        Self {
            storage_key: config.storage_key.clone(),
            default_mode: config.default_mode.clone(),
            enable_system: config.enable_system,
            allowed: config.allowed_modes(),
            system_fallback: config.system_fallback(),
        }
    }

    pub fn is_allowed(&self, name: &str) -> bool {
        self.allowed.iter().any(|mode| mode == name)
    }

    pub fn resolve(&self, mode: &Mode, system: &Mode) -> Mode {
        if self.enable_system && mode.is_system() {
            system.clone()
        } else {
            mode.clone()
        }
    }
}
