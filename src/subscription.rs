use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Guard returned by every `subscribe`/`add_listener` call.
///
/// Dropping the guard unregisters the listener.
#[must_use = "dropping a Subscription immediately unsubscribes"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Bundles several guards into one; all of them are released together.
    pub fn combine(subscriptions: Vec<Subscription>) -> Self {
        Self::new(move || drop(subscriptions))
    }

    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

type Listener<E> = Rc<dyn Fn(&E)>;

struct Registry<E: ?Sized> {
    next_id: u64,
    entries: Vec<(u64, Listener<E>)>,
}

/// Single-threaded listener registry shared by the in-memory hosts and the binding.
pub(crate) struct ListenerSet<E: ?Sized> {
    registry: Rc<RefCell<Registry<E>>>,
}

impl<E: ?Sized> Clone for ListenerSet<E> {
    fn clone(&self) -> Self {
        Self {
            registry: Rc::clone(&self.registry),
        }
    }
}

/// Non-owning handle to a [`ListenerSet`].
pub(crate) struct WeakListenerSet<E: ?Sized> {
    registry: Weak<RefCell<Registry<E>>>,
}

impl<E: ?Sized> WeakListenerSet<E> {
    pub(crate) fn upgrade(&self) -> Option<ListenerSet<E>> {
        self.registry
            .upgrade()
            .map(|registry| ListenerSet { registry })
    }
}

impl<E: ?Sized + 'static> ListenerSet<E> {
    pub(crate) fn downgrade(&self) -> WeakListenerSet<E> {
        WeakListenerSet {
            registry: Rc::downgrade(&self.registry),
        }
    }

    pub(crate) fn new() -> Self {
        Self {
            registry: Rc::new(RefCell::new(Registry {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    pub(crate) fn add(&self, listener: Listener<E>) -> Subscription {
        let id = {
            let mut registry = self.registry.borrow_mut();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.entries.push((id, listener));
            id
        };
        let weak = Rc::downgrade(&self.registry);
        Subscription::new(move || {
            if let Some(registry) = weak.upgrade() {
                registry
                    .borrow_mut()
                    .entries
                    .retain(|(entry_id, _)| *entry_id != id);
            }
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.registry.borrow().entries.len()
    }

    /// Invokes every listener registered at call time.
    ///
    /// The registry is not borrowed while listeners run, so a listener may
    /// subscribe, unsubscribe or trigger another emit.
    pub(crate) fn emit(&self, event: &E) {
        let listeners: Vec<Listener<E>> = self
            .registry
            .borrow()
            .entries
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener(event);
        }
    }
}

impl<E: ?Sized + 'static> Default for ListenerSet<E> {
    fn default() -> Self {
        Self::new()
    }
}
