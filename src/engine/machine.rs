use std::collections::VecDeque;

use super::error::{EngineResult, ModeError};
use super::event::{Effects, EngineEvent, EventKind, ModeUpdate, PhaseTransition};
use super::model::{EngineSettings, Phase};
use crate::mode::Mode;
use crate::storage::StorageEvent;

const HISTORY_LIMIT: usize = 32;

/// Decides the effective mode and which writes follow from each event.
///
/// The engine never touches storage or the DOM itself; every call returns
/// the [`Effects`] the host must carry out.
#[derive(Debug)]
pub struct ResolutionEngine {
    settings: EngineSettings,
    phase: Phase,
    mode: Option<Mode>,
    forced: Option<Mode>,
    system: Option<Mode>,
    transition_history: VecDeque<PhaseTransition>,
}

impl ResolutionEngine {
    pub fn new(settings: EngineSettings, forced: Option<Mode>) -> Self {
        Self {
            settings,
            phase: Phase::Uninitialized,
            mode: None,
            forced,
            system: None,
            transition_history: VecDeque::new(),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// The user's chosen mode, which may be `"system"`.
    pub fn mode(&self) -> Option<&Mode> {
        self.mode.as_ref()
    }

    pub fn forced(&self) -> Option<&Mode> {
        self.forced.as_ref()
    }

    /// Last observed OS value, tracked even when the mode is not `"system"`.
    pub fn system(&self) -> Option<&Mode> {
        self.system.as_ref()
    }

    pub fn pending(&self) -> Option<&Mode> {
        match &self.phase {
            Phase::PendingExternalUpdate(mode) => Some(mode),
            _ => None,
        }
    }

    /// The concrete mode on display: the override when active, otherwise the
    /// chosen mode, with `"system"` substituted.
    pub fn resolved(&self) -> Option<Mode> {
        let target = self.forced.as_ref().or(self.mode.as_ref())?;
        let system = self.system.as_ref().unwrap_or(&self.settings.system_fallback);
        Some(self.settings.resolve(target, system))
    }

    pub fn history(&self) -> impl Iterator<Item = &PhaseTransition> {
        self.transition_history.iter()
    }

    /// Records a fresh OS reading taken at apply time without producing effects.
    pub(crate) fn observe_system(&mut self, system: Mode) {
        self.system = Some(system);
    }

    pub fn handle(&mut self, event: EngineEvent) -> EngineResult<Effects> {
        let kind = event.kind();
        let from = self.phase.clone();
        tracing::debug!(from = ?from, event = ?event, "engine event");

        if from == Phase::Uninitialized && kind != EventKind::Init {
            if let EngineEvent::SystemChanged(system) = event {
                self.system = Some(system);
            }
            tracing::debug!(event = ?kind, "ignoring event before initialization");
            return Ok(Effects::none());
        }

        let effects = match event {
            EngineEvent::Init { persisted, system } => self.init(persisted, system),
            EngineEvent::SetMode(update) => self.set_mode(update)?,
            EngineEvent::SystemChanged(system) => self.system_changed(system),
            EngineEvent::StorageChanged(change) => self.storage_changed(change),
            EngineEvent::OverrideChanged(forced) => self.override_changed(forced)?,
        };

        let record = PhaseTransition::new(from, kind, self.phase.clone());
        tracing::debug!(
            from = ?record.from,
            to = ?record.to,
            persist = ?effects.persist,
            apply = ?effects.apply,
            "engine transition"
        );
        if self.transition_history.len() == HISTORY_LIMIT {
            self.transition_history.pop_front();
        }
        self.transition_history.push_back(record);

        Ok(effects)
    }

    fn init(&mut self, persisted: Option<String>, system: Mode) -> Effects {
        if self.phase != Phase::Uninitialized {
            tracing::debug!("engine already initialized");
            return Effects::none();
        }
        self.system = Some(system);

        let mode = match persisted.filter(|value| !value.is_empty()) {
            Some(value) if self.settings.is_allowed(&value) => Mode::new(value),
            Some(value) => {
                tracing::warn!(
                    value = %value,
                    key = %self.settings.storage_key,
                    "ignoring undeclared persisted mode"
                );
                self.settings.default_mode.clone()
            }
            None => self.settings.default_mode.clone(),
        };
        self.mode = Some(mode.clone());
        self.phase = Phase::Resolved;

        Effects::apply(self.forced.clone().unwrap_or(mode))
    }

    fn set_mode(&mut self, update: ModeUpdate) -> EngineResult<Effects> {
        let previous = self
            .mode
            .clone()
            .unwrap_or_else(|| self.settings.default_mode.clone());
        let next = update.resolve(&previous);
        if !self.settings.is_allowed(next.as_str()) {
            tracing::warn!(mode = %next, "rejecting undeclared mode");
            return Err(ModeError::Undeclared(next));
        }

        if let Phase::PendingExternalUpdate(pending) = &self.phase {
            tracing::debug!(discarded = %pending, chosen = %next, "user choice supersedes pending update");
        }
        self.phase = Phase::Resolved;
        self.mode = Some(next.clone());

        let apply = self.forced.is_none().then(|| next.clone());
        Ok(Effects {
            persist: Some(next),
            apply,
        })
    }

    fn system_changed(&mut self, system: Mode) -> Effects {
        self.system = Some(system);
        if !self.settings.enable_system {
            return Effects::none();
        }
        let target = self.forced.as_ref().or(self.mode.as_ref());
        match target {
            Some(target) if target.is_system() => Effects::apply(Mode::system()),
            _ => Effects::none(),
        }
    }

    fn storage_changed(&mut self, change: StorageEvent) -> Effects {
        if let Some(key) = change.key.as_deref() {
            if key != self.settings.storage_key {
                return Effects::none();
            }
        }

        let next = match change.new_value.filter(|value| !value.is_empty()) {
            None => self.settings.default_mode.clone(),
            Some(value) if self.settings.is_allowed(&value) => Mode::new(value),
            Some(value) => {
                tracing::warn!(value = %value, "ignoring undeclared mode from another context");
                return Effects::none();
            }
        };

        if self.forced.is_some() {
            tracing::debug!(mode = %next, "override active; queueing external update");
            self.phase = Phase::PendingExternalUpdate(next);
            return Effects::none();
        }

        self.mode = Some(next.clone());
        self.phase = Phase::Resolved;
        Effects::apply(next)
    }

    fn override_changed(&mut self, forced: Option<Mode>) -> EngineResult<Effects> {
        if let Some(mode) = &forced {
            if !self.settings.is_allowed(mode.as_str()) {
                return Err(ModeError::Undeclared(mode.clone()));
            }
        }
        if forced == self.forced {
            return Ok(Effects::none());
        }
        let previous = std::mem::replace(&mut self.forced, forced);

        if let Some(forced) = &self.forced {
            return Ok(Effects::apply(forced.clone()));
        }

        debug_assert!(previous.is_some());
        match std::mem::replace(&mut self.phase, Phase::Resolved) {
            Phase::PendingExternalUpdate(pending) => {
                self.mode = Some(pending.clone());
                Ok(Effects {
                    persist: Some(pending.clone()),
                    apply: Some(pending),
                })
            }
            _ => Ok(self.mode.clone().map(Effects::apply).unwrap_or_default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;

    fn engine_with(config: ProviderConfig) -> ResolutionEngine {
        let config = config.validate().expect("config should validate");
        ResolutionEngine::new(EngineSettings::from_config(&config), config.forced_mode)
    }

    fn initialized(config: ProviderConfig, persisted: Option<&str>, system: &str) -> ResolutionEngine {
        let mut engine = engine_with(config);
        engine
            .handle(EngineEvent::Init {
                persisted: persisted.map(str::to_string),
                system: Mode::from(system),
            })
            .expect("init never fails");
        engine
    }

    fn storage_event(key: &str, value: Option<&str>) -> EngineEvent {
        EngineEvent::StorageChanged(StorageEvent {
            key: Some(key.to_string()),
            new_value: value.map(str::to_string),
        })
    }

    #[test]
    fn init_without_persisted_value_uses_system_default() {
        let mut engine = engine_with(ProviderConfig::new());
        let effects = engine
            .handle(EngineEvent::Init {
                persisted: None,
                system: Mode::from("light"),
            })
            .unwrap();

        assert_eq!(effects, Effects::apply(Mode::system()));
        assert_eq!(engine.mode(), Some(&Mode::system()));
        assert_eq!(engine.resolved(), Some(Mode::from("light")));
        assert_eq!(engine.phase(), &Phase::Resolved);
    }

    #[test]
    fn init_never_persists_the_default() {
        let mut engine = engine_with(ProviderConfig::new().with_system(false));
        let effects = engine
            .handle(EngineEvent::Init {
                persisted: None,
                system: Mode::from("dark"),
            })
            .unwrap();
        assert_eq!(effects.persist, None);
        assert_eq!(effects.apply, Some(Mode::from("light")));
    }

    #[test]
    fn init_replaces_undeclared_persisted_value_with_default() {
        let engine = initialized(
            ProviderConfig::new().with_default_mode("dark"),
            Some("neon"),
            "light",
        );
        assert_eq!(engine.mode(), Some(&Mode::from("dark")));
    }

    #[test]
    fn persisted_system_is_literal_when_tracking_is_off() {
        let engine = initialized(ProviderConfig::new().with_system(false), Some("system"), "dark");
        assert_eq!(engine.mode(), Some(&Mode::from("light")));
        assert_eq!(engine.resolved(), Some(Mode::from("light")));
    }

    #[test]
    fn init_with_override_applies_override_but_keeps_persisted_mode() {
        let mut engine = engine_with(ProviderConfig::new().with_forced_mode("light"));
        let effects = engine
            .handle(EngineEvent::Init {
                persisted: Some("dark".into()),
                system: Mode::from("dark"),
            })
            .unwrap();

        assert_eq!(effects, Effects::apply(Mode::from("light")));
        assert_eq!(engine.mode(), Some(&Mode::from("dark")));
        assert_eq!(engine.resolved(), Some(Mode::from("light")));
    }

    #[test]
    fn set_mode_persists_and_applies() {
        let mut engine = initialized(ProviderConfig::new(), None, "light");
        let effects = engine.handle(EngineEvent::SetMode("dark".into())).unwrap();
        assert_eq!(
            effects,
            Effects {
                persist: Some(Mode::from("dark")),
                apply: Some(Mode::from("dark")),
            }
        );
        assert_eq!(engine.mode(), Some(&Mode::from("dark")));
    }

    #[test]
    fn updater_sees_previous_mode() {
        let mut engine = initialized(ProviderConfig::new(), Some("light"), "light");
        let toggle = ModeUpdate::with(|previous| {
            if previous == &"dark" {
                Mode::from("light")
            } else {
                Mode::from("dark")
            }
        });
        engine.handle(EngineEvent::SetMode(toggle)).unwrap();
        assert_eq!(engine.mode(), Some(&Mode::from("dark")));
    }

    #[test]
    fn set_mode_rejects_undeclared_modes_without_state_change() {
        let mut engine = initialized(ProviderConfig::new(), Some("dark"), "light");
        let err = engine
            .handle(EngineEvent::SetMode("neon".into()))
            .unwrap_err();
        assert_eq!(err, ModeError::Undeclared(Mode::from("neon")));
        assert_eq!(engine.mode(), Some(&Mode::from("dark")));
    }

    #[test]
    fn set_mode_during_override_only_persists() {
        let mut engine = initialized(
            ProviderConfig::new().with_forced_mode("light"),
            Some("dark"),
            "light",
        );
        let effects = engine.handle(EngineEvent::SetMode("dark".into())).unwrap();
        assert_eq!(effects.persist, Some(Mode::from("dark")));
        assert_eq!(effects.apply, None);
    }

    #[test]
    fn system_change_is_tracked_but_only_applied_in_system_mode() {
        let mut engine = initialized(ProviderConfig::new(), Some("light"), "light");
        let effects = engine
            .handle(EngineEvent::SystemChanged(Mode::from("dark")))
            .unwrap();
        assert!(effects.is_empty());
        assert_eq!(engine.system(), Some(&Mode::from("dark")));

        engine.handle(EngineEvent::SetMode("system".into())).unwrap();
        let effects = engine
            .handle(EngineEvent::SystemChanged(Mode::from("light")))
            .unwrap();
        assert_eq!(effects, Effects::apply(Mode::system()));
        assert_eq!(engine.resolved(), Some(Mode::from("light")));
    }

    #[test]
    fn system_change_is_not_applied_while_overridden() {
        let mut engine = initialized(
            ProviderConfig::new().with_forced_mode("dark"),
            Some("system"),
            "light",
        );
        let effects = engine
            .handle(EngineEvent::SystemChanged(Mode::from("dark")))
            .unwrap();
        assert!(effects.is_empty());
        assert_eq!(engine.system(), Some(&Mode::from("dark")));
    }

    #[test]
    fn storage_events_for_other_keys_are_ignored() {
        let mut engine = initialized(ProviderConfig::new(), Some("light"), "light");
        let effects = engine.handle(storage_event("contrast", Some("more"))).unwrap();
        assert!(effects.is_empty());
        assert_eq!(engine.mode(), Some(&Mode::from("light")));
    }

    #[test]
    fn storage_event_is_adopted_without_writing_back() {
        let mut engine = initialized(ProviderConfig::new(), Some("light"), "light");
        let effects = engine.handle(storage_event("theme", Some("dark"))).unwrap();
        assert_eq!(effects, Effects::apply(Mode::from("dark")));
        assert_eq!(engine.mode(), Some(&Mode::from("dark")));
    }

    #[test]
    fn cleared_storage_falls_back_to_default() {
        let mut engine = initialized(
            ProviderConfig::new().with_default_mode("dark"),
            Some("light"),
            "light",
        );
        let effects = engine.handle(storage_event("theme", None)).unwrap();
        assert_eq!(effects, Effects::apply(Mode::from("dark")));

        engine.handle(storage_event("theme", Some("light"))).unwrap();
        let effects = engine
            .handle(EngineEvent::StorageChanged(StorageEvent {
                key: None,
                new_value: None,
            }))
            .unwrap();
        assert_eq!(effects, Effects::apply(Mode::from("dark")));
    }

    #[test]
    fn undeclared_storage_value_is_ignored() {
        let mut engine = initialized(ProviderConfig::new(), Some("light"), "light");
        let effects = engine.handle(storage_event("theme", Some("neon"))).unwrap();
        assert!(effects.is_empty());
        assert_eq!(engine.mode(), Some(&Mode::from("light")));
    }

    #[test]
    fn storage_event_during_override_is_queued_then_applied() {
        let mut engine = initialized(
            ProviderConfig::new().with_forced_mode("light"),
            Some("light"),
            "light",
        );
        let effects = engine.handle(storage_event("theme", Some("dark"))).unwrap();
        assert!(effects.is_empty());
        assert_eq!(engine.pending(), Some(&Mode::from("dark")));
        assert_eq!(engine.mode(), Some(&Mode::from("light")));

        let effects = engine.handle(EngineEvent::OverrideChanged(None)).unwrap();
        assert_eq!(
            effects,
            Effects {
                persist: Some(Mode::from("dark")),
                apply: Some(Mode::from("dark")),
            }
        );
        assert_eq!(engine.pending(), None);
        assert_eq!(engine.phase(), &Phase::Resolved);
        assert_eq!(engine.mode(), Some(&Mode::from("dark")));
    }

    #[test]
    fn user_choice_supersedes_pending_update() {
        let mut engine = initialized(
            ProviderConfig::new().with_forced_mode("light"),
            Some("light"),
            "light",
        );
        engine.handle(storage_event("theme", Some("dark"))).unwrap();
        engine.handle(EngineEvent::SetMode("system".into())).unwrap();
        assert_eq!(engine.pending(), None);

        let effects = engine.handle(EngineEvent::OverrideChanged(None)).unwrap();
        assert_eq!(effects, Effects::apply(Mode::system()));
    }

    #[test]
    fn lifting_override_reapplies_persisted_mode() {
        let mut engine = initialized(
            ProviderConfig::new().with_forced_mode("light"),
            Some("dark"),
            "light",
        );
        let effects = engine.handle(EngineEvent::OverrideChanged(None)).unwrap();
        assert_eq!(effects, Effects::apply(Mode::from("dark")));
        assert_eq!(engine.resolved(), Some(Mode::from("dark")));
    }

    #[test]
    fn setting_same_override_is_a_no_op() {
        let mut engine = initialized(ProviderConfig::new(), Some("dark"), "light");
        let effects = engine
            .handle(EngineEvent::OverrideChanged(Some(Mode::from("light"))))
            .unwrap();
        assert_eq!(effects, Effects::apply(Mode::from("light")));
        let effects = engine
            .handle(EngineEvent::OverrideChanged(Some(Mode::from("light"))))
            .unwrap();
        assert!(effects.is_empty());
    }

    #[test]
    fn events_before_init_are_ignored() {
        let mut engine = engine_with(ProviderConfig::new());
        let effects = engine.handle(EngineEvent::SetMode("dark".into())).unwrap();
        assert!(effects.is_empty());
        assert_eq!(engine.mode(), None);
        assert_eq!(engine.resolved(), None);
        assert_eq!(engine.history().count(), 0);
    }

    #[test]
    fn transitions_are_recorded_in_order() {
        let mut engine = initialized(
            ProviderConfig::new().with_forced_mode("light"),
            None,
            "light",
        );
        engine.handle(storage_event("theme", Some("dark"))).unwrap();
        engine.handle(EngineEvent::OverrideChanged(None)).unwrap();

        let history: Vec<_> = engine.history().cloned().collect();
        assert_eq!(
            history,
            vec![
                PhaseTransition::new(Phase::Uninitialized, EventKind::Init, Phase::Resolved),
                PhaseTransition::new(
                    Phase::Resolved,
                    EventKind::StorageChanged,
                    Phase::PendingExternalUpdate(Mode::from("dark"))
                ),
                PhaseTransition::new(
                    Phase::PendingExternalUpdate(Mode::from("dark")),
                    EventKind::OverrideChanged,
                    Phase::Resolved
                ),
            ]
        );
    }
}
