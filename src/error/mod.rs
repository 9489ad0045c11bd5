use crate::config::{ConfigError, ConfigFileError};
use crate::engine::ModeError;
use crate::script::ScriptError;
use thiserror::Error;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    ConfigFile(#[from] ConfigFileError),
    #[error(transparent)]
    Mode(#[from] ModeError),
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error("failed to write output")]
    Output(#[from] std::io::Error),
}
