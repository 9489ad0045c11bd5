mod binding;
mod host;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub use binding::{DisplayMode, ModeBinding, ModeSetter, ModeSnapshot};
pub use host::Host;

use self::host::Registry;
use crate::config::{ConfigResult, ProviderConfig, ValidatedConfig};
use crate::dom::{Document, DomApplier, Scheduler};
use crate::engine::{EngineEvent, EngineResult, EngineSettings, ResolutionEngine};
use crate::mode::Mode;
use crate::script::BootstrapScript;
use crate::storage::{PreferenceStore, StorageEvent};
use crate::subscription::{ListenerSet, Subscription};
use crate::system::SystemPreference;

/// State behind one active provider. Only the engine and the last published
/// snapshot are mutable; everything else is fixed at mount.
struct Shared {
    config: ValidatedConfig,
    engine: RefCell<ResolutionEngine>,
    published: RefCell<Option<ModeSnapshot>>,
    store: PreferenceStore,
    system: SystemPreference,
    applier: DomApplier,
    document: Option<Rc<dyn Document>>,
    scheduler: Rc<dyn Scheduler>,
    listeners: ListenerSet<ModeSnapshot>,
    setter: ModeSetter,
    mounted: Cell<bool>,
}

impl Shared {
    fn is_mounted(&self) -> bool {
        self.mounted.get()
    }

    fn snapshot(&self) -> ModeSnapshot {
        let config = &self.config;
        let engine = self.engine.borrow();
        let mode = engine
            .mode()
            .cloned()
            .unwrap_or_else(|| config.default_mode.clone());
        let forced = engine.forced().cloned();
        let resolved = engine
            .resolved()
            .unwrap_or_else(|| config.resolve(&mode, self.system.fallback()));
        let display = match &forced {
            Some(forced) => DisplayMode::Forced {
                forced: forced.clone(),
                chosen: mode.clone(),
            },
            None => DisplayMode::Chosen(mode.clone()),
        };
        ModeSnapshot {
            display,
            mode,
            forced,
            resolved,
            system: if config.enable_system {
                engine.system().cloned()
            } else {
                None
            },
            modes: config.allowed_modes(),
        }
    }

    /// Runs one event through the engine and carries out its effects. No
    /// borrow is held while storage is written or listeners run.
    fn dispatch(&self, event: EngineEvent) -> EngineResult<()> {
        let effects = self.engine.borrow_mut().handle(event)?;

        if let Some(mode) = &effects.persist {
            self.store.set(&self.config.storage_key, mode.as_str());
        }
        if let Some(target) = effects.apply {
            self.apply(target);
        }

        let snapshot = self.snapshot();
        let changed = {
            let mut published = self.published.borrow_mut();
            if published.as_ref() == Some(&snapshot) {
                false
            } else {
                *published = Some(snapshot.clone());
                true
            }
        };
        if changed {
            self.listeners.emit(&snapshot);
        }
        Ok(())
    }

    /// Host-originated events cannot be refused by the caller, so failures
    /// are only logged.
    fn forward(&self, event: EngineEvent) {
        if !self.is_mounted() {
            return;
        }
        if let Err(err) = self.dispatch(event) {
            tracing::warn!(%err, "host event rejected");
        }
    }

    fn apply(&self, target: Mode) {
        let resolved = if self.config.enable_system && target.is_system() {
            let live = self.system.current();
            self.engine.borrow_mut().observe_system(live.clone());
            live
        } else {
            target
        };
        match &self.document {
            Some(document) => self
                .applier
                .apply(document, self.scheduler.as_ref(), &resolved),
            None => tracing::debug!(mode = %resolved, "no document attached; skipping apply"),
        }
    }
}

enum ProviderKind {
    Active {
        shared: Rc<Shared>,
        registry: Registry,
        subscriptions: Vec<Subscription>,
    },
    PassThrough(ModeBinding),
}

/// A mounted appearance provider for one axis.
///
/// The first provider of an axis on a [`Host`] owns the document writes and
/// the storage and media subscriptions. Later ones on the same host are
/// pass-throughs exposing the outer binding. Dropping the active provider
/// releases its subscriptions and frees the axis.
pub struct ModeProvider {
    kind: ProviderKind,
}

impl ModeProvider {
    pub fn mount(config: ProviderConfig, host: &Host) -> ConfigResult<Self> {
        let config = config.validate()?;
        let axis = config.axis;

        if let Some(outer) = host.active(axis) {
            tracing::debug!(?axis, "axis already provided; mounting as pass-through");
            return Ok(Self {
                kind: ProviderKind::PassThrough(ModeBinding::new(outer)),
            });
        }

        let store = host.backends.select(config.storage);
        let system = SystemPreference::new(axis, host.media.clone(), config.system_fallback());
        let engine = ResolutionEngine::new(
            EngineSettings::from_config(&config),
            config.forced_mode.clone(),
        );
        let persisted = store.get(&config.storage_key);
        let initial_system = system.current();

        let shared = Rc::new_cyclic(|weak| Shared {
            engine: RefCell::new(engine),
            published: RefCell::new(None),
            store: store.clone(),
            system: system.clone(),
            applier: DomApplier::new(&config),
            document: host.document.clone(),
            scheduler: Rc::clone(&host.scheduler),
            listeners: ListenerSet::new(),
            setter: ModeSetter::new(weak.clone()),
            mounted: Cell::new(true),
            config,
        });

        shared.forward(EngineEvent::Init {
            persisted,
            system: initial_system,
        });

        let mut subscriptions = Vec::new();
        let weak = Rc::downgrade(&shared);
        let on_system: Rc<dyn Fn(Mode)> = Rc::new(move |value| {
            if let Some(shared) = weak.upgrade() {
                shared.forward(EngineEvent::SystemChanged(value));
            }
        });
        subscriptions.extend(system.subscribe(on_system));

        let weak = Rc::downgrade(&shared);
        subscriptions.extend(store.subscribe(Rc::new(move |event: &StorageEvent| {
            if let Some(shared) = weak.upgrade() {
                shared.forward(EngineEvent::StorageChanged(event.clone()));
            }
        })));

        host.register(axis, &shared);
        tracing::info!(
            ?axis,
            key = %shared.config.storage_key,
            live_system = system.is_supported(),
            subscriptions = subscriptions.len(),
            "mode provider mounted"
        );

        Ok(Self {
            kind: ProviderKind::Active {
                shared,
                registry: Rc::clone(&host.registry),
                subscriptions,
            },
        })
    }

    pub fn binding(&self) -> ModeBinding {
        match &self.kind {
            ProviderKind::Active { shared, .. } => ModeBinding::new(Rc::clone(shared)),
            ProviderKind::PassThrough(binding) => binding.clone(),
        }
    }

    pub fn is_passthrough(&self) -> bool {
        matches!(self.kind, ProviderKind::PassThrough(_))
    }

    /// Pre-paint script for this provider's configuration. Pass-throughs
    /// render none; the outer provider already does.
    pub fn bootstrap_script(&self) -> Option<BootstrapScript> {
        match &self.kind {
            ProviderKind::Active { shared, .. } => Some(BootstrapScript::new(&shared.config)),
            ProviderKind::PassThrough(_) => None,
        }
    }
}

impl Drop for ModeProvider {
    fn drop(&mut self) {
        let ProviderKind::Active {
            shared,
            registry,
            subscriptions,
        } = &mut self.kind
        else {
            return;
        };
        shared.mounted.set(false);
        subscriptions.clear();

        let axis = shared.config.axis;
        let mut registry = registry.borrow_mut();
        let owned = registry
            .get(&axis)
            .is_some_and(|entry| std::ptr::eq(entry.as_ptr(), Rc::as_ptr(shared)));
        if owned {
            registry.remove(&axis);
        }
        tracing::debug!(?axis, "mode provider unmounted");
    }
}

impl std::fmt::Debug for ModeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeProvider")
            .field("passthrough", &self.is_passthrough())
            .field("binding", &self.binding())
            .finish()
    }
}
