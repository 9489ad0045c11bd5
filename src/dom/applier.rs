use std::rc::Rc;

use super::{Document, Scheduler, DISABLE_TRANSITIONS_CSS};
use crate::config::{Attribute, ValidatedConfig};
use crate::mode::Mode;

/// Writes a resolved mode to the root element.
#[derive(Debug, Clone)]
pub struct DomApplier {
    config: ValidatedConfig,
    class_tokens: Vec<String>,
}

impl DomApplier {
    pub fn new(config: &ValidatedConfig) -> Self {
        Self {
            config: config.clone(),
            class_tokens: config.class_tokens(),
        }
    }

    /// The plain writes for `resolved`, with no transition handling.
    ///
    /// Running it twice leaves the document unchanged.
    pub fn write(&self, document: &dyn Document, resolved: &Mode) {
        let token = self.config.token_for(resolved);
        for attribute in &self.config.attributes {
            match attribute {
                Attribute::Class => {
                    document.remove_classes(&self.class_tokens);
                    if let Some(token) = &token {
                        document.add_class(token);
                    }
                }
                Attribute::Data(name) => match &token {
                    Some(token) => document.set_attribute(name, token),
                    None => document.remove_attribute(name),
                },
            }
        }

        if self.config.enable_color_scheme {
            let scheme = if resolved.is_color_scheme() {
                Some(resolved.as_str())
            } else {
                self.config.color_scheme_fallback()
            };
            document.set_color_scheme(scheme);
        }

        if let Some(theme_color) = &self.config.theme_color {
            document.set_theme_color(theme_color.for_mode(resolved).filter(|color| !color.is_empty()));
        }
    }

    /// Applies `resolved`, wrapping the writes in a transition blocker when
    /// configured. The blocker is removed on the next scheduler turn.
    pub fn apply(&self, document: &Rc<dyn Document>, scheduler: &dyn Scheduler, resolved: &Mode) {
        tracing::debug!(
            mode = %resolved,
            suppress_transitions = self.config.disable_transition_on_change,
            "applying mode to document"
        );
        if !self.config.disable_transition_on_change {
            self.write(document.as_ref(), resolved);
            return;
        }

        let handle = document.insert_style(DISABLE_TRANSITIONS_CSS, self.config.nonce.as_deref());
        self.write(document.as_ref(), resolved);
        document.force_restyle();
        let document = Rc::clone(document);
        scheduler.defer(Box::new(move || document.remove_style(handle)));
    }
}
