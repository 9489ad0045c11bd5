use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use super::MediaQueries;
use crate::subscription::{ListenerSet, Subscription};

#[derive(Default)]
struct MediaState {
    unsupported: bool,
    matching: BTreeSet<String>,
    listeners: BTreeMap<String, ListenerSet<()>>,
}

/// Scriptable stand-in for `window.matchMedia`.
///
/// Clones share state, so a test can keep one handle and flip preferences
/// while the provider holds another.
#[derive(Clone, Default)]
pub struct SimulatedMedia {
    state: Rc<RefCell<MediaState>>,
}

impl SimulatedMedia {
    pub fn new() -> Self {
        Self::default()
    }

    /// An environment without media-query support.
    pub fn unsupported() -> Self {
        let media = Self::new();
        media.state.borrow_mut().unsupported = true;
        media
    }

    pub fn prefers_dark(dark: bool) -> Self {
        let media = Self::new();
        media.set_matches("(prefers-color-scheme: dark)", dark);
        media
    }

    /// Changes a query result and fires its listeners when the result flips.
    pub fn set_matches(&self, query: &str, matches: bool) {
        let listeners = {
            let mut state = self.state.borrow_mut();
            if state.unsupported {
                return;
            }
            let changed = if matches {
                state.matching.insert(query.to_string())
            } else {
                state.matching.remove(query)
            };
            if !changed {
                return;
            }
            state.listeners.get(query).cloned()
        };
        if let Some(listeners) = listeners {
            listeners.emit(&());
        }
    }

    pub fn listener_count(&self, query: &str) -> usize {
        self.state
            .borrow()
            .listeners
            .get(query)
            .map_or(0, ListenerSet::len)
    }
}

impl MediaQueries for SimulatedMedia {
    fn matches(&self, query: &str) -> Option<bool> {
        let state = self.state.borrow();
        if state.unsupported {
            return None;
        }
        Some(state.matching.contains(query))
    }

    fn add_listener(&self, query: &str, listener: Rc<dyn Fn()>) -> Option<Subscription> {
        let listeners = {
            let mut state = self.state.borrow_mut();
            if state.unsupported {
                return None;
            }
            state
                .listeners
                .entry(query.to_string())
                .or_default()
                .clone()
        };
        Some(listeners.add(Rc::new(move |_: &()| listener())))
    }
}
