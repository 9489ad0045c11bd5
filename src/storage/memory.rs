use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use super::{BackendError, BackendResult, StorageBackend, StorageEvent, StorageListener};
use crate::subscription::{ListenerSet, Subscription, WeakListenerSet};

struct Area {
    items: BTreeMap<String, String>,
    available: bool,
    next_context: usize,
    /// Contexts drop out once every handle to them is gone.
    contexts: Vec<(usize, WeakListenerSet<StorageEvent>)>,
}

impl Area {
    fn live_contexts(&mut self) -> Vec<(usize, ListenerSet<StorageEvent>)> {
        let mut live = Vec::with_capacity(self.contexts.len());
        self.contexts.retain(|(context, listeners)| match listeners.upgrade() {
            Some(listeners) => {
                live.push((*context, listeners));
                true
            }
            None => false,
        });
        live
    }
}

/// In-memory storage area.
///
/// Each value returned by [`MemoryStorage::new`] or [`MemoryStorage::context`]
/// is one browsing context (a tab). Contexts created from the same area share
/// items, and a mutation in one is delivered as a [`StorageEvent`] to every
/// other context, never to the one that made it.
#[derive(Clone)]
pub struct MemoryStorage {
    area: Rc<RefCell<Area>>,
    context: usize,
    listeners: ListenerSet<StorageEvent>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        let listeners = ListenerSet::new();
        let area = Area {
            items: BTreeMap::new(),
            available: true,
            next_context: 1,
            contexts: vec![(0, listeners.downgrade())],
        };
        Self {
            area: Rc::new(RefCell::new(area)),
            context: 0,
            listeners,
        }
    }

    pub fn with_items<K, V>(items: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let storage = Self::new();
        storage
            .area
            .borrow_mut()
            .items
            .extend(items.into_iter().map(|(k, v)| (k.into(), v.into())));
        storage
    }

    /// Opens another browsing context onto the same area.
    pub fn context(&self) -> Self {
        let listeners = ListenerSet::new();
        let context = {
            let mut area = self.area.borrow_mut();
            let context = area.next_context;
            area.next_context += 1;
            area.live_contexts();
            area.contexts.push((context, listeners.downgrade()));
            context
        };
        Self {
            area: Rc::clone(&self.area),
            context,
            listeners,
        }
    }

    /// Simulates private browsing or disabled storage: every call fails.
    pub fn set_available(&self, available: bool) {
        self.area.borrow_mut().available = available;
    }

    pub fn item(&self, key: &str) -> Option<String> {
        self.area.borrow().items.get(key).cloned()
    }

    pub fn clear(&self) -> BackendResult<()> {
        self.ensure_available()?;
        self.area.borrow_mut().items.clear();
        self.broadcast(StorageEvent {
            key: None,
            new_value: None,
        });
        Ok(())
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Browsing contexts on this area that still have a live handle.
    pub fn context_count(&self) -> usize {
        self.area.borrow_mut().live_contexts().len()
    }

    fn ensure_available(&self) -> BackendResult<()> {
        if self.area.borrow().available {
            Ok(())
        } else {
            Err(BackendError::Unavailable)
        }
    }

    fn broadcast(&self, event: StorageEvent) {
        let others: Vec<ListenerSet<StorageEvent>> = self
            .area
            .borrow_mut()
            .live_contexts()
            .into_iter()
            .filter(|(context, _)| *context != self.context)
            .map(|(_, listeners)| listeners)
            .collect();
        for listeners in others {
            listeners.emit(&event);
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageBackend for MemoryStorage {
    fn get_item(&self, key: &str) -> BackendResult<Option<String>> {
        self.ensure_available()?;
        Ok(self.item(key))
    }

    fn set_item(&self, key: &str, value: &str) -> BackendResult<()> {
        self.ensure_available()?;
        let previous = self
            .area
            .borrow_mut()
            .items
            .insert(key.to_string(), value.to_string());
        if previous.as_deref() != Some(value) {
            self.broadcast(StorageEvent {
                key: Some(key.to_string()),
                new_value: Some(value.to_string()),
            });
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> BackendResult<()> {
        self.ensure_available()?;
        let previous = self.area.borrow_mut().items.remove(key);
        if previous.is_some() {
            self.broadcast(StorageEvent {
                key: Some(key.to_string()),
                new_value: None,
            });
        }
        Ok(())
    }

    fn subscribe(&self, listener: StorageListener) -> Option<Subscription> {
        Some(self.listeners.add(listener))
    }
}
