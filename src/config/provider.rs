use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};
use crate::mode::{Axis, Mode, SYSTEM};
use crate::storage::StorageKind;

const CLASS_ATTRIBUTE: &str = "class";
const DATA_PREFIX: &str = "data-";
const RESERVED_SCRIPT_ATTRIBUTES: [&str; 3] = ["nonce", "src", "type"];

/// Where the resolved token is written on the root element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// Toggle one class among the possible tokens.
    Class,
    /// Set a `data-*` attribute to the token.
    Data(String),
}

impl Attribute {
    pub fn name(&self) -> &str {
        match self {
            Attribute::Class => CLASS_ATTRIBUTE,
            Attribute::Data(name) => name,
        }
    }
}

impl FromStr for Attribute {
    type Err = ConfigError;

    fn from_str(raw: &str) -> ConfigResult<Self> {
        if raw == CLASS_ATTRIBUTE {
            return Ok(Attribute::Class);
        }
        let valid = raw
            .strip_prefix(DATA_PREFIX)
            .filter(|suffix| !suffix.is_empty())
            .is_some_and(|suffix| {
                suffix.chars().all(|c| {
                    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.')
                })
            });
        if valid {
            Ok(Attribute::Data(raw.to_string()))
        } else {
            Err(ConfigError::InvalidAttribute(raw.to_string()))
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Attribute {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// One attribute name or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeSpec {
    One(String),
    Many(Vec<String>),
}

impl AttributeSpec {
    fn names(&self) -> Vec<&str> {
        match self {
            AttributeSpec::One(name) => vec![name.as_str()],
            AttributeSpec::Many(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

/// Value for the `theme-color` meta tag: one color, or one per resolved mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThemeColor {
    Single(String),
    PerMode(BTreeMap<String, String>),
}

impl ThemeColor {
    pub fn for_mode(&self, mode: &Mode) -> Option<&str> {
        match self {
            ThemeColor::Single(color) => Some(color.as_str()),
            ThemeColor::PerMode(colors) => colors.get(mode.as_str()).map(String::as_str),
        }
    }
}

/// Provider options as written by the integrating application.
///
/// Every field is optional; [`ProviderConfig::validate`] fills the defaults
/// for the configured axis and rejects contradictory settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    pub axis: Axis,
    pub storage_key: Option<String>,
    pub storage: StorageKind,
    pub modes: Option<Vec<String>>,
    pub default_mode: Option<String>,
    pub enable_system: Option<bool>,
    pub enable_color_scheme: Option<bool>,
    pub disable_transition_on_change: bool,
    pub attribute: Option<AttributeSpec>,
    pub value: Option<BTreeMap<String, String>>,
    pub forced_mode: Option<String>,
    pub nonce: Option<String>,
    pub theme_color: Option<ThemeColor>,
    pub script_attributes: BTreeMap<String, String>,
}

impl ProviderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset for the contrast axis: `more` / `less` / `no-preference`
    /// stored under `contrast` and written to `data-contrast`.
    pub fn contrast() -> Self {
        Self {
            axis: Axis::Contrast,
            ..Self::default()
        }
    }

    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = Some(key.into());
        self
    }

    pub fn with_storage(mut self, storage: StorageKind) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_modes<I, S>(mut self, modes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modes = Some(modes.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_default_mode(mut self, mode: impl Into<String>) -> Self {
        self.default_mode = Some(mode.into());
        self
    }

    pub fn with_system(mut self, enabled: bool) -> Self {
        self.enable_system = Some(enabled);
        self
    }

    pub fn with_color_scheme(mut self, enabled: bool) -> Self {
        self.enable_color_scheme = Some(enabled);
        self
    }

    pub fn with_transition_suppression(mut self, enabled: bool) -> Self {
        self.disable_transition_on_change = enabled;
        self
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(AttributeSpec::One(attribute.into()));
        self
    }

    pub fn with_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attribute = Some(AttributeSpec::Many(
            attributes.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn with_value<I, K, V>(mut self, mapping: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.value = Some(
            mapping
                .into_iter()
                .map(|(mode, token)| (mode.into(), token.into()))
                .collect(),
        );
        self
    }

    pub fn with_forced_mode(mut self, mode: impl Into<String>) -> Self {
        self.forced_mode = Some(mode.into());
        self
    }

    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    pub fn with_theme_color(mut self, color: ThemeColor) -> Self {
        self.theme_color = Some(color);
        self
    }

    pub fn with_script_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.script_attributes.insert(name.into(), value.into());
        self
    }

    pub fn validate(&self) -> ConfigResult<ValidatedConfig> {
        let axis = self.axis;
        let enable_system = self.enable_system.unwrap_or(true);
        let enable_color_scheme = self
            .enable_color_scheme
            .unwrap_or(axis == Axis::ColorScheme);

        let storage_key = self
            .storage_key
            .clone()
            .unwrap_or_else(|| axis.default_storage_key().to_string());
        if storage_key.is_empty() {
            return Err(ConfigError::EmptyStorageKey);
        }

        let modes = match &self.modes {
            Some(modes) => validate_modes(modes.iter().map(String::as_str))?,
            None => validate_modes(axis.default_modes().iter().copied())?,
        };
        let attributes = match &self.attribute {
            Some(spec) => validate_attributes(&spec.names())?,
            None => validate_attributes(&[axis.default_attribute()])?,
        };
        let value = self.value.as_ref().map(validate_value).transpose()?;

        let is_allowed =
            |name: &str| modes.iter().any(|m| m == name) || (enable_system && name == SYSTEM);

        let default_mode = match &self.default_mode {
            Some(name) if is_allowed(name) => Mode::new(name.as_str()),
            Some(name) => return Err(ConfigError::UnknownDefault(name.clone())),
            None if enable_system => Mode::system(),
            None => modes[0].clone(),
        };

        let forced_mode = match &self.forced_mode {
            Some(name) if name.is_empty() => None,
            Some(name) if is_allowed(name) => Some(Mode::new(name.as_str())),
            Some(name) => return Err(ConfigError::UnknownForced(name.clone())),
            None => None,
        };

        for name in self.script_attributes.keys() {
            validate_script_attribute(name)?;
        }

        Ok(ValidatedConfig {
            axis,
            storage_key,
            storage: self.storage,
            modes,
            default_mode,
            enable_system,
            enable_color_scheme,
            disable_transition_on_change: self.disable_transition_on_change,
            attributes,
            value,
            forced_mode,
            nonce: self.nonce.clone().filter(|nonce| !nonce.is_empty()),
            theme_color: self.theme_color.clone(),
            script_attributes: self.script_attributes.clone(),
        })
    }
}

fn validate_modes<'a>(names: impl Iterator<Item = &'a str>) -> ConfigResult<Vec<Mode>> {
    let mut modes: Vec<Mode> = Vec::new();
    for name in names {
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidMode(name.to_string()));
        }
        if name == SYSTEM {
            return Err(ConfigError::SystemInModes);
        }
        if modes.iter().any(|m| m == name) {
            return Err(ConfigError::DuplicateMode(name.to_string()));
        }
        modes.push(Mode::new(name));
    }
    if modes.is_empty() {
        return Err(ConfigError::NoModes);
    }
    Ok(modes)
}

fn validate_attributes(names: &[&str]) -> ConfigResult<Vec<Attribute>> {
    let mut attributes: Vec<Attribute> = Vec::new();
    for name in names {
        let attribute: Attribute = name.parse()?;
        if attributes.contains(&attribute) {
            return Err(ConfigError::DuplicateAttribute(name.to_string()));
        }
        attributes.push(attribute);
    }
    if attributes.is_empty() {
        return Err(ConfigError::NoAttributes);
    }
    Ok(attributes)
}

fn validate_value(mapping: &BTreeMap<String, String>) -> ConfigResult<BTreeMap<Mode, String>> {
    mapping
        .iter()
        .map(|(mode, token)| {
            if token.chars().any(char::is_whitespace) {
                return Err(ConfigError::InvalidToken {
                    mode: mode.clone(),
                    token: token.clone(),
                });
            }
            Ok((Mode::new(mode.as_str()), token.clone()))
        })
        .collect()
}

fn validate_script_attribute(name: &str) -> ConfigResult<()> {
    let well_formed = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':'));
    if !well_formed || RESERVED_SCRIPT_ATTRIBUTES.contains(&name.to_ascii_lowercase().as_str()) {
        return Err(ConfigError::InvalidScriptAttribute(name.to_string()));
    }
    Ok(())
}

/// Configuration with every default filled in and every rule checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedConfig {
    pub axis: Axis,
    pub storage_key: String,
    pub storage: StorageKind,
    pub modes: Vec<Mode>,
    pub default_mode: Mode,
    pub enable_system: bool,
    pub enable_color_scheme: bool,
    pub disable_transition_on_change: bool,
    pub attributes: Vec<Attribute>,
    pub value: Option<BTreeMap<Mode, String>>,
    pub forced_mode: Option<Mode>,
    pub nonce: Option<String>,
    pub theme_color: Option<ThemeColor>,
    pub script_attributes: BTreeMap<String, String>,
}

impl ValidatedConfig {
    /// Declared modes followed by `"system"` when system tracking is on.
    pub fn allowed_modes(&self) -> Vec<Mode> {
        let mut modes = self.modes.clone();
        if self.enable_system {
            modes.push(Mode::system());
        }
        modes
    }

    pub fn is_allowed(&self, name: &str) -> bool {
        self.modes.iter().any(|m| m == name) || (self.enable_system && name == SYSTEM)
    }

    /// What the system preference reports when media queries are unsupported.
    pub fn system_fallback(&self) -> Mode {
        if self.default_mode.is_system() {
            Mode::new(self.axis.no_match_value())
        } else {
            self.default_mode.clone()
        }
    }

    /// Replaces `"system"` by `system` when tracking is on.
    pub fn resolve(&self, mode: &Mode, system: &Mode) -> Mode {
        if self.enable_system && mode.is_system() {
            system.clone()
        } else {
            mode.clone()
        }
    }

    /// DOM token for a resolved mode. `None` means "write no token".
    pub fn token_for(&self, resolved: &Mode) -> Option<String> {
        match &self.value {
            Some(mapping) => mapping
                .get(resolved)
                .filter(|token| !token.is_empty())
                .cloned(),
            None => Some(resolved.as_str().to_string()),
        }
    }

    /// Every class the applier may have added, removed before each swap.
    pub fn class_tokens(&self) -> Vec<String> {
        let mut tokens: Vec<String> = Vec::new();
        let mut push = |token: &str| {
            if !token.is_empty() && !tokens.iter().any(|t| t == token) {
                tokens.push(token.to_string());
            }
        };
        match &self.value {
            Some(mapping) => mapping.values().for_each(|token| push(token)),
            None => {
                self.modes.iter().for_each(|mode| push(mode.as_str()));
                if self.enable_system {
                    self.axis.system_values().into_iter().for_each(&mut push);
                }
            }
        }
        tokens
    }

    /// `color-scheme` used when the resolved mode is not `light`/`dark`.
    pub fn color_scheme_fallback(&self) -> Option<&str> {
        self.default_mode
            .is_color_scheme()
            .then(|| self.default_mode.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_color_scheme_axis() {
        let config = ProviderConfig::new().validate().unwrap();
        assert_eq!(config.storage_key, "theme");
        assert_eq!(config.storage, StorageKind::Local);
        assert_eq!(config.modes, vec![Mode::from("light"), Mode::from("dark")]);
        assert!(config.default_mode.is_system());
        assert!(config.enable_system);
        assert!(config.enable_color_scheme);
        assert!(!config.disable_transition_on_change);
        assert_eq!(config.attributes, vec![Attribute::Data("data-theme".into())]);
        assert!(config.value.is_none());
        assert!(config.forced_mode.is_none());
    }

    #[test]
    fn default_mode_is_first_declared_without_system_tracking() {
        let config = ProviderConfig::new()
            .with_modes(["pink", "blue"])
            .with_system(false)
            .validate()
            .unwrap();
        assert_eq!(config.default_mode, "pink");
        assert_eq!(config.allowed_modes(), vec![Mode::from("pink"), Mode::from("blue")]);
    }

    #[test]
    fn contrast_preset_uses_contrast_vocabulary() {
        let config = ProviderConfig::contrast().validate().unwrap();
        assert_eq!(config.storage_key, "contrast");
        assert_eq!(config.attributes, vec![Attribute::Data("data-contrast".into())]);
        assert_eq!(config.modes.len(), 3);
        assert!(!config.enable_color_scheme);
        assert_eq!(config.system_fallback(), "no-preference");
    }

    #[test]
    fn declaring_system_is_rejected() {
        let err = ProviderConfig::new()
            .with_modes(["light", "system"])
            .validate()
            .unwrap_err();
        assert_eq!(err, ConfigError::SystemInModes);
    }

    #[test]
    fn invalid_attributes_are_rejected() {
        for raw in ["theme", "data-", "Data-theme", "data-Theme", "classes"] {
            let err = ProviderConfig::new()
                .with_attribute(raw)
                .validate()
                .unwrap_err();
            assert_eq!(err, ConfigError::InvalidAttribute(raw.to_string()));
        }
        let err = ProviderConfig::new()
            .with_attributes(Vec::<String>::new())
            .validate()
            .unwrap_err();
        assert_eq!(err, ConfigError::NoAttributes);
    }

    #[test]
    fn multiple_attributes_keep_their_order() {
        let config = ProviderConfig::new()
            .with_attributes(["class", "data-theme", "data-mode"])
            .validate()
            .unwrap();
        assert_eq!(
            config.attributes,
            vec![
                Attribute::Class,
                Attribute::Data("data-theme".into()),
                Attribute::Data("data-mode".into()),
            ]
        );
    }

    #[test]
    fn default_and_forced_must_be_declared() {
        let err = ProviderConfig::new()
            .with_default_mode("pink")
            .validate()
            .unwrap_err();
        assert_eq!(err, ConfigError::UnknownDefault("pink".into()));

        let err = ProviderConfig::new()
            .with_forced_mode("pink")
            .validate()
            .unwrap_err();
        assert_eq!(err, ConfigError::UnknownForced("pink".into()));

        let err = ProviderConfig::new()
            .with_system(false)
            .with_default_mode("system")
            .validate()
            .unwrap_err();
        assert_eq!(err, ConfigError::UnknownDefault("system".into()));
    }

    #[test]
    fn duplicate_and_blank_modes_are_rejected() {
        assert_eq!(
            ProviderConfig::new().with_modes(["dark", "dark"]).validate(),
            Err(ConfigError::DuplicateMode("dark".into()))
        );
        assert_eq!(
            ProviderConfig::new().with_modes(["dark", "very dark"]).validate(),
            Err(ConfigError::InvalidMode("very dark".into()))
        );
        assert_eq!(
            ProviderConfig::new().with_modes(Vec::<String>::new()).validate(),
            Err(ConfigError::NoModes)
        );
    }

    #[test]
    fn mapped_tokens_omit_unmapped_modes() {
        let config = ProviderConfig::new()
            .with_modes(["light", "dark", "pink"])
            .with_value([("pink", "my-pink-theme"), ("dark", "")])
            .validate()
            .unwrap();
        assert_eq!(
            config.token_for(&Mode::from("pink")).as_deref(),
            Some("my-pink-theme")
        );
        assert_eq!(config.token_for(&Mode::from("light")), None);
        assert_eq!(config.token_for(&Mode::from("dark")), None);
        assert_eq!(config.class_tokens(), vec!["my-pink-theme".to_string()]);
    }

    #[test]
    fn class_tokens_include_system_vocabulary() {
        let config = ProviderConfig::new()
            .with_modes(["pink", "dark"])
            .validate()
            .unwrap();
        assert_eq!(config.class_tokens(), vec!["pink", "dark", "light"]);
    }

    #[test]
    fn color_scheme_fallback_only_uses_canonical_default() {
        let light = ProviderConfig::new().with_default_mode("light").validate().unwrap();
        assert_eq!(light.color_scheme_fallback(), Some("light"));

        let system = ProviderConfig::new().validate().unwrap();
        assert_eq!(system.color_scheme_fallback(), None);
    }

    #[test]
    fn reserved_script_attributes_are_rejected() {
        assert_eq!(
            ProviderConfig::new()
                .with_script_attribute("nonce", "x")
                .validate(),
            Err(ConfigError::InvalidScriptAttribute("nonce".into()))
        );
        assert!(ProviderConfig::new()
            .with_script_attribute("data-cfasync", "false")
            .validate()
            .is_ok());
    }

    #[test]
    fn parses_camel_case_json() {
        let config: ProviderConfig = serde_json::from_str(
            r##"{
                "storageKey": "appearance",
                "storage": "cookie",
                "modes": ["light", "dark", "pink"],
                "attribute": ["class", "data-mode"],
                "value": { "pink": "my-pink-theme" },
                "forcedMode": "dark",
                "themeColor": { "light": "#ffffff", "dark": "#000000" },
                "disableTransitionOnChange": true
            }"##,
        )
        .unwrap();
        let validated = config.validate().unwrap();
        assert_eq!(validated.storage_key, "appearance");
        assert_eq!(validated.storage, StorageKind::Cookie);
        assert_eq!(validated.attributes.len(), 2);
        assert_eq!(validated.forced_mode, Some(Mode::from("dark")));
        assert!(validated.disable_transition_on_change);
        assert_eq!(
            validated
                .theme_color
                .as_ref()
                .and_then(|c| c.for_mode(&Mode::from("dark"))),
            Some("#000000")
        );
    }
}
