mod simulated;

use std::rc::Rc;

use crate::mode::{Axis, Mode};
use crate::subscription::Subscription;

pub use simulated::SimulatedMedia;

/// Access to boolean feature media queries (`window.matchMedia`).
pub trait MediaQueries {
    /// `None` when the environment has no media-query support.
    fn matches(&self, query: &str) -> Option<bool>;

    /// Calls `listener` whenever the query's result flips.
    fn add_listener(&self, query: &str, listener: Rc<dyn Fn()>) -> Option<Subscription>;
}

/// Reads the OS value for `axis` right now.
///
/// Queries are tried in order and the first match wins; when none match the
/// axis' no-match value is reported. Without media support `fallback` is
/// returned unchanged.
pub fn read_system(axis: Axis, media: Option<&dyn MediaQueries>, fallback: &Mode) -> Mode {
    let Some(media) = media else {
        return fallback.clone();
    };
    for query in axis.queries() {
        match media.matches(query.query) {
            Some(true) => return Mode::new(query.value),
            Some(false) => {}
            None => return fallback.clone(),
        }
    }
    Mode::new(axis.no_match_value())
}

/// Live system preference for one axis.
#[derive(Clone)]
pub struct SystemPreference {
    axis: Axis,
    media: Option<Rc<dyn MediaQueries>>,
    fallback: Mode,
}

impl SystemPreference {
    pub fn new(axis: Axis, media: Option<Rc<dyn MediaQueries>>, fallback: Mode) -> Self {
        Self {
            axis,
            media,
            fallback,
        }
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn fallback(&self) -> &Mode {
        &self.fallback
    }

    pub fn is_supported(&self) -> bool {
        let Some(media) = self.media.as_deref() else {
            return false;
        };
        self.axis
            .queries()
            .iter()
            .all(|query| media.matches(query.query).is_some())
    }

    /// Never cached: every call re-evaluates the underlying queries.
    pub fn current(&self) -> Mode {
        read_system(self.axis, self.media.as_deref(), &self.fallback)
    }

    /// Subscribes to every query of the axis; `callback` receives the freshly
    /// re-read value. Returns `None` when nothing could be observed.
    pub fn subscribe(&self, callback: Rc<dyn Fn(Mode)>) -> Option<Subscription> {
        let media = self.media.as_ref()?;
        let mut subscriptions = Vec::new();
        for query in self.axis.queries() {
            let observer = self.clone();
            let callback = Rc::clone(&callback);
            let listener: Rc<dyn Fn()> = Rc::new(move || callback(observer.current()));
            if let Some(subscription) = media.add_listener(query.query, listener) {
                subscriptions.push(subscription);
            }
        }
        if subscriptions.is_empty() {
            tracing::debug!(axis = ?self.axis, "media queries unsupported; no live system updates");
            return None;
        }
        Some(Subscription::combine(subscriptions))
    }
}

impl std::fmt::Debug for SystemPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemPreference")
            .field("axis", &self.axis)
            .field("supported", &self.is_supported())
            .field("fallback", &self.fallback)
            .finish()
    }
}
