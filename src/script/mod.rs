use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::config::{ThemeColor, ValidatedConfig};
use crate::dom::{Document, DomApplier};
use crate::mode::{MediaQuery, Mode};
use crate::storage::{Backends, StorageKind};
use crate::system::{read_system, MediaQueries};

const TEMPLATE: &str = include_str!("bootstrap.js");

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to serialize bootstrap parameters")]
    Serialize(#[from] serde_json::Error),
}

pub type ScriptResult<T> = std::result::Result<T, ScriptError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColorSchemeParams {
    /// Scheme used when the resolved mode is neither `light` nor `dark`.
    pub fallback: Option<String>,
}

/// Everything the pre-paint procedure needs, passed to the fixed template
/// as one JSON argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapParams {
    pub attributes: Vec<String>,
    pub storage_key: String,
    pub storage: StorageKind,
    pub default_mode: Mode,
    pub forced_mode: Option<Mode>,
    /// Values accepted from storage.
    pub modes: Vec<Mode>,
    pub class_tokens: Vec<String>,
    pub value: Option<BTreeMap<Mode, String>>,
    pub enable_system: bool,
    pub queries: Vec<MediaQuery>,
    pub system_fallback: Mode,
    pub no_match: String,
    pub color_scheme: Option<ColorSchemeParams>,
    pub theme_color: Option<ThemeColor>,
}

impl BootstrapParams {
    pub fn from_config(config: &ValidatedConfig) -> Self {
        Self {
            attributes: config
                .attributes
                .iter()
                .map(|attribute| attribute.name().to_string())
                .collect(),
            storage_key: config.storage_key.clone(),
            storage: config.storage,
            default_mode: config.default_mode.clone(),
            forced_mode: config.forced_mode.clone(),
            modes: config.allowed_modes(),
            class_tokens: config.class_tokens(),
            value: config.value.clone(),
            enable_system: config.enable_system,
            queries: config.axis.queries().to_vec(),
            system_fallback: config.system_fallback(),
            no_match: config.axis.no_match_value().to_string(),
            color_scheme: config.enable_color_scheme.then(|| ColorSchemeParams {
                fallback: config.color_scheme_fallback().map(str::to_string),
            }),
            theme_color: config.theme_color.clone(),
        }
    }
}

/// Inline script that applies the stored mode before first paint.
///
/// The procedure, shared by the JS template and [`BootstrapScript::simulate`]:
/// 1. an override wins outright and storage is not read;
/// 2. otherwise the stored value is read; if reading fails nothing is written;
/// 3. an empty or undeclared value becomes the default mode;
/// 4. `"system"` (with tracking on) is replaced by the media query result;
/// 5. the resolved mode is written without transition suppression.
#[derive(Debug, Clone)]
pub struct BootstrapScript {
    config: ValidatedConfig,
    params: BootstrapParams,
}

impl BootstrapScript {
    pub fn new(config: &ValidatedConfig) -> Self {
        Self {
            config: config.clone(),
            params: BootstrapParams::from_config(config),
        }
    }

    pub fn params(&self) -> &BootstrapParams {
        &self.params
    }

    /// Script body: the template invoked with the serialized parameters.
    pub fn to_js(&self) -> ScriptResult<String> {
        let params = serde_json::to_string(&self.params)?;
        Ok(format!(
            "({})({})",
            TEMPLATE.trim_end(),
            escape_for_script(&params)
        ))
    }

    /// Complete `<script>` element, carrying the nonce and any extra
    /// attributes.
    pub fn to_html(&self) -> ScriptResult<String> {
        let mut html = String::from("<script");
        if let Some(nonce) = &self.config.nonce {
            push_attribute(&mut html, "nonce", nonce);
        }
        for (name, value) in &self.config.script_attributes {
            push_attribute(&mut html, name, value);
        }
        html.push('>');
        html.push_str(&self.to_js()?);
        html.push_str("</script>");
        Ok(html)
    }

    /// Runs the bootstrap procedure against in-process hosts. Returns the
    /// resolved mode written, or `None` when the document was left untouched.
    pub fn simulate(
        &self,
        backends: &Backends,
        media: Option<&dyn MediaQueries>,
        document: &dyn Document,
    ) -> Option<Mode> {
        let config = &self.config;
        let mode = match &config.forced_mode {
            Some(forced) => forced.clone(),
            None => {
                let store = backends.select(config.storage);
                let stored = match store.try_get(&config.storage_key) {
                    Ok(stored) => stored,
                    Err(err) => {
                        tracing::debug!(%err, "bootstrap could not read storage; document untouched");
                        return None;
                    }
                };
                match stored {
                    Some(value) if config.is_allowed(&value) => Mode::new(value),
                    _ => config.default_mode.clone(),
                }
            }
        };

        let resolved = if config.enable_system && mode.is_system() {
            read_system(config.axis, media, &config.system_fallback())
        } else {
            mode
        };
        DomApplier::new(config).write(document, &resolved);
        Some(resolved)
    }
}

/// Escapes the characters that could end the surrounding `<script>` element
/// or break a JS string literal. They only occur inside JSON strings, where
/// the `\uXXXX` form is equivalent.
fn escape_for_script(json: &str) -> String {
    let mut escaped = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => escaped.push_str("\\u003c"),
            '>' => escaped.push_str("\\u003e"),
            '&' => escaped.push_str("\\u0026"),
            '\u{2028}' => escaped.push_str("\\u2028"),
            '\u{2029}' => escaped.push_str("\\u2029"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn push_attribute(html: &mut String, name: &str, value: &str) {
    html.push(' ');
    html.push_str(name);
    html.push_str("=\"");
    for c in value.chars() {
        match c {
            '&' => html.push_str("&amp;"),
            '"' => html.push_str("&quot;"),
            '\'' => html.push_str("&#39;"),
            '<' => html.push_str("&lt;"),
            '>' => html.push_str("&gt;"),
            c => html.push(c),
        }
    }
    html.push('"');
}
