//! `rw prefs` subcommand group.

mod check;
mod defaults;
mod payload;

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use rw_config::{CliSettings, Config};
use rw_prefs::{CompiledPage, OptionSetCatalog, PageCompiler};

use check::CheckArgs;
use defaults::DefaultsArgs;
use payload::PayloadArgs;

use crate::error::CliError;

/// Content preference commands.
#[derive(Subcommand)]
pub(crate) enum PrefsCommand {
    /// Validate preference declarations of every page.
    Check(CheckArgs),
    /// Print the default selection of a page.
    Defaults(DefaultsArgs),
    /// Emit the chooser container and client payload of a page.
    Payload(PayloadArgs),
}

impl PrefsCommand {
    /// Execute the prefs subcommand.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        match self {
            Self::Check(args) => args.execute(),
            Self::Defaults(args) => args.execute(),
            Self::Payload(args) => args.execute(),
        }
    }
}

/// Arguments shared by every prefs command.
#[derive(Args)]
pub(crate) struct SourceArgs {
    /// Path to configuration file (default: auto-discover rw.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Option-set directory (overrides config).
    #[arg(long)]
    options_dir: Option<PathBuf>,

    /// Content directory (overrides config).
    #[arg(long)]
    content_dir: Option<PathBuf>,
}

impl SourceArgs {
    /// Load configuration and the option-set catalog.
    pub(crate) fn load(&self) -> Result<(Config, OptionSetCatalog), CliError> {
        let cli_settings = CliSettings {
            options_dir: self.options_dir.clone(),
            content_dir: self.content_dir.clone(),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let catalog = OptionSetCatalog::load_dir(&config.preferences_resolved.options_dir)?;
        Ok((config, catalog))
    }
}

/// Read and compile a single page.
pub(crate) fn compile_page(catalog: &OptionSetCatalog, path: &Path) -> Result<CompiledPage, CliError> {
    let markdown = std::fs::read_to_string(path)?;
    Ok(PageCompiler::new(catalog).compile_markdown(path, &markdown)?)
}
