use thiserror::Error;

use crate::mode::Mode;

pub type EngineResult<T> = std::result::Result<T, ModeError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModeError {
    #[error("mode {0:?} is not declared by this provider")]
    Undeclared(Mode),
    #[error("the provider owning this setter has been dropped")]
    ProviderDropped,
}
