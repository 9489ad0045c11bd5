use std::fmt;

use serde::{Deserialize, Serialize};

/// Pseudo-mode meaning "follow the operating system".
pub const SYSTEM: &str = "system";

/// The two values the native `color-scheme` property understands.
pub const COLOR_SCHEMES: [&str; 2] = ["light", "dark"];

const COLOR_SCHEME_QUERIES: &[MediaQuery] = &[MediaQuery {
    query: "(prefers-color-scheme: dark)",
    value: "dark",
}];

const CONTRAST_QUERIES: &[MediaQuery] = &[
    MediaQuery {
        query: "(prefers-contrast: more)",
        value: "more",
    },
    MediaQuery {
        query: "(prefers-contrast: less)",
        value: "less",
    },
];

/// An application-declared appearance identifier such as `"dark"` or `"more"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mode(String);

impl Mode {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn system() -> Self {
        Self(SYSTEM.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_system(&self) -> bool {
        self.0 == SYSTEM
    }

    pub fn is_color_scheme(&self) -> bool {
        COLOR_SCHEMES.contains(&self.0.as_str())
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Mode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Mode {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Mode {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl PartialEq<str> for Mode {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Mode {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// One boolean feature query and the system value it stands for when it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MediaQuery {
    pub query: &'static str,
    pub value: &'static str,
}

/// An independent appearance dimension the OS reports a preference for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Axis {
    #[default]
    ColorScheme,
    Contrast,
}

impl Axis {
    /// Queries evaluated in order; the first match decides the system value.
    pub fn queries(self) -> &'static [MediaQuery] {
        match self {
            Axis::ColorScheme => COLOR_SCHEME_QUERIES,
            Axis::Contrast => CONTRAST_QUERIES,
        }
    }

    /// System value reported when no query matches.
    pub fn no_match_value(self) -> &'static str {
        match self {
            Axis::ColorScheme => "light",
            Axis::Contrast => "no-preference",
        }
    }

    /// Every value the OS can report on this axis.
    pub fn system_values(self) -> Vec<&'static str> {
        let mut values: Vec<&'static str> = self.queries().iter().map(|q| q.value).collect();
        values.push(self.no_match_value());
        values
    }

    pub fn default_storage_key(self) -> &'static str {
        match self {
            Axis::ColorScheme => "theme",
            Axis::Contrast => "contrast",
        }
    }

    pub fn default_attribute(self) -> &'static str {
        match self {
            Axis::ColorScheme => "data-theme",
            Axis::Contrast => "data-contrast",
        }
    }

    pub fn default_modes(self) -> &'static [&'static str] {
        match self {
            Axis::ColorScheme => &["light", "dark"],
            Axis::Contrast => &["more", "less", "no-preference"],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_mode_is_recognized_by_name() {
        assert!(Mode::system().is_system());
        assert!(Mode::from("system").is_system());
        assert!(!Mode::from("dark").is_system());
    }

    #[test]
    fn color_scheme_detection_only_accepts_canonical_values() {
        assert!(Mode::from("light").is_color_scheme());
        assert!(Mode::from("dark").is_color_scheme());
        assert!(!Mode::from("pink").is_color_scheme());
        assert!(!Mode::system().is_color_scheme());
    }

    #[test]
    fn contrast_axis_lists_queries_before_fallback() {
        assert_eq!(
            Axis::Contrast.system_values(),
            vec!["more", "less", "no-preference"]
        );
        assert_eq!(Axis::ColorScheme.system_values(), vec!["dark", "light"]);
    }

    #[test]
    fn mode_serializes_as_plain_string() {
        let json = serde_json::to_string(&Mode::from("dark")).unwrap();
        assert_eq!(json, "\"dark\"");
        let axis: Axis = serde_json::from_str("\"colorScheme\"").unwrap();
        assert_eq!(axis, Axis::ColorScheme);
    }
}
