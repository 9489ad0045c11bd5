mod cookie;
mod memory;

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::subscription::Subscription;

pub use cookie::{CookieJar, CookieStorage, MemoryCookieJar};
pub use memory::MemoryStorage;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("storage backend is unavailable")]
    Unavailable,
    #[error("value {0:?} cannot be stored by this backend")]
    InvalidValue(String),
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Which persistence area a provider reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Survives browser restarts.
    #[default]
    Local,
    /// Survives reloads only.
    Session,
    /// Travels with every request, written with `path=/`.
    Cookie,
}

/// Cross-context mutation notice, shaped like the browser `storage` event.
///
/// `key: None` means the whole area was cleared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: Option<String>,
    pub new_value: Option<String>,
}

pub type StorageListener = Rc<dyn Fn(&StorageEvent)>;

pub trait StorageBackend {
    fn get_item(&self, key: &str) -> BackendResult<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> BackendResult<()>;
    fn remove_item(&self, key: &str) -> BackendResult<()>;

    /// Registers for mutations made by *other* contexts sharing this area.
    fn subscribe(&self, _listener: StorageListener) -> Option<Subscription> {
        None
    }
}

/// Infallible facade over an optional backend.
///
/// Every backend failure is logged and degraded: reads become "absent",
/// writes become no-ops. A store without a backend behaves like a
/// non-browser render context.
#[derive(Clone, Default)]
pub struct PreferenceStore {
    backend: Option<Rc<dyn StorageBackend>>,
}

impl PreferenceStore {
    pub fn new(backend: Option<Rc<dyn StorageBackend>>) -> Self {
        Self { backend }
    }

    pub fn detached() -> Self {
        Self { backend: None }
    }

    pub fn is_attached(&self) -> bool {
        self.backend.is_some()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match self.try_get(key) {
            Ok(value) => value,
            Err(BackendError::Unavailable) if self.backend.is_none() => None,
            Err(err) => {
                tracing::warn!(%err, key, "failed to read preference; treating as absent");
                None
            }
        }
    }

    /// Like [`PreferenceStore::get`] but keeps the failure visible, for callers
    /// that must distinguish "nothing stored" from "could not read".
    pub fn try_get(&self, key: &str) -> BackendResult<Option<String>> {
        let backend = self.backend.as_ref().ok_or(BackendError::Unavailable)?;
        Ok(backend.get_item(key)?.filter(|value| !value.is_empty()))
    }

    pub fn set(&self, key: &str, value: &str) -> bool {
        let Some(backend) = self.backend.as_ref() else {
            return false;
        };
        match backend.set_item(key, value) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(%err, key, value, "failed to persist preference");
                false
            }
        }
    }

    pub fn remove(&self, key: &str) -> bool {
        let Some(backend) = self.backend.as_ref() else {
            return false;
        };
        match backend.remove_item(key) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(%err, key, "failed to remove preference");
                false
            }
        }
    }

    pub fn subscribe(&self, listener: StorageListener) -> Option<Subscription> {
        self.backend.as_ref()?.subscribe(listener)
    }
}

impl std::fmt::Debug for PreferenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferenceStore")
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// The persistence areas a host can offer, one optional backend per kind.
#[derive(Clone, Default)]
pub struct Backends {
    local: Option<Rc<dyn StorageBackend>>,
    session: Option<Rc<dyn StorageBackend>>,
    cookie: Option<Rc<dyn StorageBackend>>,
}

impl Backends {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_local(mut self, backend: impl StorageBackend + 'static) -> Self {
        self.local = Some(Rc::new(backend));
        self
    }

    pub fn with_session(mut self, backend: impl StorageBackend + 'static) -> Self {
        self.session = Some(Rc::new(backend));
        self
    }

    pub fn with_cookie(mut self, backend: impl StorageBackend + 'static) -> Self {
        self.cookie = Some(Rc::new(backend));
        self
    }

    pub fn select(&self, kind: StorageKind) -> PreferenceStore {
        let backend = match kind {
            StorageKind::Local => self.local.clone(),
            StorageKind::Session => self.session.clone(),
            StorageKind::Cookie => self.cookie.clone(),
        };
        PreferenceStore::new(backend)
    }
}
