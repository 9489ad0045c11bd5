use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use super::Shared;
use crate::dom::{Document, ImmediateScheduler, Scheduler};
use crate::mode::Axis;
use crate::storage::{Backends, StorageBackend};
use crate::system::MediaQueries;

pub(super) type Registry = Rc<RefCell<HashMap<Axis, Weak<Shared>>>>;

/// The environment a provider runs in: storage areas, media queries, the
/// document and a macrotask scheduler.
///
/// Anything left out behaves like a server render: no storage, no media
/// support, nothing to write to. Clones share the active-provider registry.
///
/// The default scheduler is [`ImmediateScheduler`], so the transition blocker
/// is removed before [`ModeSetter::set`](super::ModeSetter::set) returns. A host
/// driving a real event loop must inject a scheduler that runs tasks on the
/// next macrotask, or a [`ManualScheduler`](crate::dom::ManualScheduler)
/// drained once per turn.
#[derive(Clone)]
pub struct Host {
    pub(super) backends: Backends,
    pub(super) media: Option<Rc<dyn MediaQueries>>,
    pub(super) document: Option<Rc<dyn Document>>,
    pub(super) scheduler: Rc<dyn Scheduler>,
    pub(super) registry: Registry,
}

impl Host {
    pub fn new() -> Self {
        Self {
            backends: Backends::new(),
            media: None,
            document: None,
            scheduler: Rc::new(ImmediateScheduler),
            registry: Registry::default(),
        }
    }

    pub fn with_backends(mut self, backends: Backends) -> Self {
        self.backends = backends;
        self
    }

    pub fn with_local_storage(mut self, backend: impl StorageBackend + 'static) -> Self {
        self.backends = self.backends.with_local(backend);
        self
    }

    pub fn with_session_storage(mut self, backend: impl StorageBackend + 'static) -> Self {
        self.backends = self.backends.with_session(backend);
        self
    }

    pub fn with_cookie_storage(mut self, backend: impl StorageBackend + 'static) -> Self {
        self.backends = self.backends.with_cookie(backend);
        self
    }

    pub fn with_media(mut self, media: impl MediaQueries + 'static) -> Self {
        self.media = Some(Rc::new(media));
        self
    }

    pub fn with_document(mut self, document: impl Document + 'static) -> Self {
        self.document = Some(Rc::new(document));
        self
    }

    pub fn with_scheduler(mut self, scheduler: impl Scheduler + 'static) -> Self {
        self.scheduler = Rc::new(scheduler);
        self
    }

    pub fn backends(&self) -> &Backends {
        &self.backends
    }

    pub fn media(&self) -> Option<&dyn MediaQueries> {
        self.media.as_deref()
    }

    pub(super) fn active(&self, axis: Axis) -> Option<Rc<Shared>> {
        self.registry
            .borrow()
            .get(&axis)
            .and_then(Weak::upgrade)
            .filter(|shared| shared.is_mounted())
    }

    pub(super) fn register(&self, axis: Axis, shared: &Rc<Shared>) {
        self.registry
            .borrow_mut()
            .insert(axis, Rc::downgrade(shared));
    }
}

impl Default for Host {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("media", &self.media.is_some())
            .field("document", &self.document.is_some())
            .field("active_axes", &self.registry.borrow().len())
            .finish()
    }
}
