mod applier;
mod document;
mod scheduler;

pub use applier::DomApplier;
pub use document::{DomState, VirtualDocument};
pub use scheduler::{ImmediateScheduler, ManualScheduler, Scheduler, Task};

/// Blanket rule inserted while a mode switch is applied so nothing animates.
pub const DISABLE_TRANSITIONS_CSS: &str = "*,*::before,*::after{-webkit-transition:none!important;-moz-transition:none!important;-o-transition:none!important;-ms-transition:none!important;transition:none!important}";

/// Opaque reference to an inserted `<style>` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StyleHandle(pub u64);

/// The root element plus the few document-level nodes the applier touches.
///
/// Only the active provider (or the bootstrap procedure before it) writes
/// through this trait.
pub trait Document {
    fn set_attribute(&self, name: &str, value: &str);
    fn remove_attribute(&self, name: &str);
    fn add_class(&self, class: &str);
    fn remove_classes(&self, classes: &[String]);
    /// Inline `color-scheme` on the root element; `None` clears it.
    fn set_color_scheme(&self, scheme: Option<&str>);
    /// Content of `<meta name="theme-color">`; `None` removes the tag.
    fn set_theme_color(&self, color: Option<&str>);
    fn insert_style(&self, css: &str, nonce: Option<&str>) -> StyleHandle;
    fn remove_style(&self, handle: StyleHandle);
    /// Reads computed style so queued style changes are flushed.
    fn force_restyle(&self);
}
