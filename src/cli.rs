use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Parser;

use crate::config::{load_provider_config, load_provider_config_from};
use crate::error::AppResult;
use crate::script::BootstrapScript;

/// Prints the pre-paint bootstrap <script> for a provider config
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "themekeeper")]
#[command(version)]
#[command(
    after_help = "Without CONFIG, $XDG_CONFIG_HOME/themekeeper/config.json is used when present."
)]
pub struct Cli {
    /// Provider config (JSON)
    #[arg(value_name = "CONFIG")]
    pub config: Option<PathBuf>,

    /// Print only the script body, without the <script> element
    #[arg(long)]
    pub js: bool,
}

impl Cli {
    pub fn output(&self) -> Output {
        if self.js {
            Output::Js
        } else {
            Output::Html
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Output {
    #[default]
    Html,
    Js,
}

pub fn render(config_path: Option<&Path>, output: Output) -> AppResult<String> {
    let config = match config_path {
        Some(path) => load_provider_config_from(path)?,
        None => load_provider_config()?,
    };
    let validated = config.validate()?;
    tracing::debug!(axis = ?validated.axis, key = %validated.storage_key, ?output, "rendering bootstrap script");

    let script = BootstrapScript::new(&validated);
    let rendered = match output {
        Output::Html => script.to_html()?,
        Output::Js => script.to_js()?,
    };
    Ok(rendered)
}

pub fn run_with<W: Write>(cli: &Cli, out: &mut W) -> AppResult<()> {
    let rendered = render(cli.config.as_deref(), cli.output())?;
    writeln!(out, "{rendered}")?;
    Ok(())
}
