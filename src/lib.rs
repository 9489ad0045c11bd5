pub mod cli;
pub mod config;
pub mod dom;
pub mod engine;
pub mod error;
pub mod logging;
pub mod mode;
pub mod provider;
pub mod script;
pub mod storage;
pub mod subscription;
pub mod system;

use clap::Parser;

pub use config::{ProviderConfig, ValidatedConfig};
pub use error::{AppError, AppResult};
pub use mode::{Axis, Mode};
pub use provider::{Host, ModeBinding, ModeProvider, ModeSnapshot};

/// Entrypoint used by the `themekeeper` binary.
pub fn run() -> AppResult<()> {
    logging::init();
    tracing::info!("starting themekeeper");

    let args = cli::Cli::parse();
    let stdout = std::io::stdout();
    cli::run_with(&args, &mut stdout.lock())?;

    tracing::debug!("bootstrap script written");
    Ok(())
}
