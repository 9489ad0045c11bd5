use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Programming mistakes in a provider configuration; surfaced at construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("at least one mode must be declared")]
    NoModes,
    #[error("mode {0:?} is not a valid identifier")]
    InvalidMode(String),
    #[error("\"system\" is reserved and cannot be declared as a mode")]
    SystemInModes,
    #[error("mode {0:?} is declared more than once")]
    DuplicateMode(String),
    #[error("storage key must not be empty")]
    EmptyStorageKey,
    #[error("at least one target attribute is required")]
    NoAttributes,
    #[error("invalid target attribute {0:?}: expected \"class\" or \"data-*\"")]
    InvalidAttribute(String),
    #[error("target attribute {0:?} is listed more than once")]
    DuplicateAttribute(String),
    #[error("value mapping token {token:?} for mode {mode:?} contains whitespace")]
    InvalidToken { mode: String, token: String },
    #[error("default mode {0:?} is not declared")]
    UnknownDefault(String),
    #[error("forced mode {0:?} is not declared")]
    UnknownForced(String),
    #[error("invalid script attribute name {0:?}")]
    InvalidScriptAttribute(String),
}

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("missing HOME environment variable")]
    MissingHomeDirectory,
    #[error("failed to read provider config: {path}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse provider config")]
    Parse(#[from] serde_json::Error),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
pub type ConfigFileResult<T> = std::result::Result<T, ConfigFileError>;
