mod error;
mod provider;

use std::path::{Path, PathBuf};

pub use error::{ConfigError, ConfigFileError, ConfigFileResult, ConfigResult};
pub use provider::{Attribute, AttributeSpec, ProviderConfig, ThemeColor, ValidatedConfig};

const APP_DIR: &str = "themekeeper";
const APP_CONFIG_FILE: &str = "config.json";

/// Loads the provider config from `$XDG_CONFIG_HOME/themekeeper/config.json`
/// (or `~/.config/...`). A missing file yields the defaults.
pub fn load_provider_config() -> ConfigFileResult<ProviderConfig> {
    let (xdg_config_home, home) = config_env_dirs();
    load_provider_config_with(xdg_config_home.as_deref(), home.as_deref())
}

fn load_provider_config_with(
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> ConfigFileResult<ProviderConfig> {
    let path = app_config_path(APP_DIR, APP_CONFIG_FILE, xdg_config_home, home).map_err(
        |error| match error {
            ConfigPathError::MissingHomeDirectory => ConfigFileError::MissingHomeDirectory,
        },
    )?;
    if !path.exists() {
        tracing::debug!(?path, "no provider config found; using defaults");
        return Ok(ProviderConfig::default());
    }
    load_provider_config_from(&path)
}

pub fn load_provider_config_from(path: &Path) -> ConfigFileResult<ProviderConfig> {
    let serialized = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = serde_json::from_str(&serialized)?;
    tracing::debug!(?path, "loaded provider config");
    Ok(config)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConfigPathError {
    MissingHomeDirectory,
}

pub(crate) fn config_env_dirs() -> (Option<PathBuf>, Option<PathBuf>) {
    (
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

pub(crate) fn app_config_path(
    app_dir: &str,
    file_name: &str,
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    let mut path = config_root(xdg_config_home, home)?;
    path.push(app_dir);
    path.push(file_name);
    Ok(path)
}

fn config_root(
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    if let Some(xdg) = xdg_config_home.filter(|path| !path.as_os_str().is_empty()) {
        return Ok(xdg.to_path_buf());
    }

    let home = home.ok_or(ConfigPathError::MissingHomeDirectory)?;
    Ok(home.join(".config"))
}
