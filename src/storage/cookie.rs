use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use super::{BackendError, BackendResult, StorageBackend};

const COOKIE_PATH: &str = "path=/";
const EXPIRED: &str = "expires=Thu, 01 Jan 1970 00:00:01 GMT";

/// A `document.cookie`-style jar: reads return `"a=1; b=2"`, writes take one
/// `name=value; attr; attr` assignment.
pub trait CookieJar {
    fn read(&self) -> String;
    fn write(&self, assignment: &str);
}

/// Preference backend stored in a site-wide cookie.
#[derive(Debug, Clone)]
pub struct CookieStorage<J> {
    jar: J,
}

impl<J: CookieJar> CookieStorage<J> {
    pub fn new(jar: J) -> Self {
        Self { jar }
    }

    pub fn jar(&self) -> &J {
        &self.jar
    }
}

fn is_cookie_safe(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| !c.is_whitespace() && !c.is_control() && c != ';' && c != '=' && c != ',')
}

fn find_cookie<'a>(cookies: &'a str, key: &str) -> Option<&'a str> {
    cookies
        .split(';')
        .map(str::trim_start)
        .find_map(|pair| pair.strip_prefix(key)?.strip_prefix('='))
}

impl<J: CookieJar> StorageBackend for CookieStorage<J> {
    fn get_item(&self, key: &str) -> BackendResult<Option<String>> {
        let cookies = self.jar.read();
        Ok(find_cookie(&cookies, key).map(str::to_string))
    }

    fn set_item(&self, key: &str, value: &str) -> BackendResult<()> {
        if !is_cookie_safe(key) {
            return Err(BackendError::InvalidValue(key.to_string()));
        }
        if !is_cookie_safe(value) {
            return Err(BackendError::InvalidValue(value.to_string()));
        }
        self.jar.write(&format!("{key}={value}; {COOKIE_PATH}"));
        Ok(())
    }

    fn remove_item(&self, key: &str) -> BackendResult<()> {
        if !is_cookie_safe(key) {
            return Err(BackendError::InvalidValue(key.to_string()));
        }
        self.jar.write(&format!("{key}=; {COOKIE_PATH}; {EXPIRED}"));
        Ok(())
    }
}

/// Jar with browser-like assignment semantics for tests and server rendering.
#[derive(Debug, Clone, Default)]
pub struct MemoryCookieJar {
    cookies: Rc<RefCell<BTreeMap<String, Cookie>>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Cookie {
    value: String,
    path: Option<String>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the jar from a `Cookie:` request header.
    pub fn from_header(header: &str) -> Self {
        let jar = Self::new();
        for pair in header.split(';') {
            if let Some((name, value)) = pair.trim().split_once('=') {
                jar.cookies.borrow_mut().insert(
                    name.to_string(),
                    Cookie {
                        value: value.to_string(),
                        path: None,
                    },
                );
            }
        }
        jar
    }

    pub fn path_of(&self, name: &str) -> Option<String> {
        self.cookies.borrow().get(name)?.path.clone()
    }
}

impl CookieJar for MemoryCookieJar {
    fn read(&self) -> String {
        self.cookies
            .borrow()
            .iter()
            .map(|(name, cookie)| format!("{name}={}", cookie.value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn write(&self, assignment: &str) {
        let mut parts = assignment.split(';').map(str::trim);
        let Some((name, value)) = parts.next().and_then(|pair| pair.split_once('=')) else {
            tracing::debug!(assignment, "ignoring malformed cookie assignment");
            return;
        };
        let mut path = None;
        let mut expired = false;
        for attribute in parts {
            let (attr, attr_value) = attribute.split_once('=').unwrap_or((attribute, ""));
            match attr.to_ascii_lowercase().as_str() {
                "path" => path = Some(attr_value.to_string()),
                "expires" => expired = attr_value.contains("1970"),
                "max-age" => expired = attr_value.parse::<i64>().is_ok_and(|age| age <= 0),
                _ => {}
            }
        }
        let mut cookies = self.cookies.borrow_mut();
        if expired {
            cookies.remove(name);
        } else {
            cookies.insert(
                name.to_string(),
                Cookie {
                    value: value.to_string(),
                    path,
                },
            );
        }
    }
}
