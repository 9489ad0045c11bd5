use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use super::{Document, StyleHandle};

/// Observable part of a document, comparable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomState {
    pub attributes: BTreeMap<String, String>,
    pub classes: Vec<String>,
    pub color_scheme: Option<String>,
    pub theme_color: Option<String>,
}

#[derive(Debug, Default)]
struct Inner {
    state: DomState,
    styles: BTreeMap<StyleHandle, (String, Option<String>)>,
    next_style: u64,
    restyles: usize,
    writes: usize,
}

/// In-memory root element for tests and non-browser hosts.
///
/// Clones share the same element.
#[derive(Debug, Default, Clone)]
pub struct VirtualDocument {
    inner: Rc<RefCell<Inner>>,
}

impl VirtualDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.inner.borrow().state.attributes.get(name).cloned()
    }

    pub fn classes(&self) -> Vec<String> {
        self.inner.borrow().state.classes.clone()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.inner.borrow().state.classes.iter().any(|c| c == class)
    }

    pub fn color_scheme(&self) -> Option<String> {
        self.inner.borrow().state.color_scheme.clone()
    }

    pub fn theme_color(&self) -> Option<String> {
        self.inner.borrow().state.theme_color.clone()
    }

    /// CSS text and nonce of every live `<style>` element, in insertion order.
    pub fn styles(&self) -> Vec<(String, Option<String>)> {
        self.inner.borrow().styles.values().cloned().collect()
    }

    pub fn style_count(&self) -> usize {
        self.inner.borrow().styles.len()
    }

    pub fn restyle_count(&self) -> usize {
        self.inner.borrow().restyles
    }

    /// Number of mutating calls received, including no-op ones.
    pub fn write_count(&self) -> usize {
        self.inner.borrow().writes
    }

    pub fn state(&self) -> DomState {
        self.inner.borrow().state.clone()
    }

    fn write(&self, f: impl FnOnce(&mut DomState)) {
        let mut inner = self.inner.borrow_mut();
        inner.writes += 1;
        f(&mut inner.state);
    }
}

impl Document for VirtualDocument {
    fn set_attribute(&self, name: &str, value: &str) {
        self.write(|state| {
            state.attributes.insert(name.to_string(), value.to_string());
        });
    }

    fn remove_attribute(&self, name: &str) {
        self.write(|state| {
            state.attributes.remove(name);
        });
    }

    fn add_class(&self, class: &str) {
        self.write(|state| {
            if !state.classes.iter().any(|c| c == class) {
                state.classes.push(class.to_string());
            }
        });
    }

    fn remove_classes(&self, classes: &[String]) {
        self.write(|state| state.classes.retain(|c| !classes.contains(c)));
    }

    fn set_color_scheme(&self, scheme: Option<&str>) {
        self.write(|state| state.color_scheme = scheme.map(str::to_string));
    }

    fn set_theme_color(&self, color: Option<&str>) {
        self.write(|state| state.theme_color = color.map(str::to_string));
    }

    fn insert_style(&self, css: &str, nonce: Option<&str>) -> StyleHandle {
        let mut inner = self.inner.borrow_mut();
        let handle = StyleHandle(inner.next_style);
        inner.next_style += 1;
        inner
            .styles
            .insert(handle, (css.to_string(), nonce.map(str::to_string)));
        handle
    }

    fn remove_style(&self, handle: StyleHandle) {
        self.inner.borrow_mut().styles.remove(&handle);
    }

    fn force_restyle(&self) {
        self.inner.borrow_mut().restyles += 1;
    }
}
