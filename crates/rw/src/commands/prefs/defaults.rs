//! `rw prefs defaults` command implementation.

use std::path::PathBuf;

use clap::Args;

use super::{SourceArgs, compile_page};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the defaults command.
#[derive(Args)]
pub(crate) struct DefaultsArgs {
    /// Page to resolve.
    page: PathBuf,

    #[command(flatten)]
    source: SourceArgs,
}

impl DefaultsArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let (_config, catalog) = self.source.load()?;
        let page = compile_page(&catalog, &self.page)?;

        if page.resolved_prefs().is_empty() {
            output.warning(&format!(
                "{} declares no page preferences",
                self.page.display()
            ));
            return Ok(());
        }

        output.highlight(&self.page.display().to_string());
        for pref in page.resolved_prefs() {
            output.data(&format!("{}={}", pref.identifier, pref.current_value))?;
        }
        Ok(())
    }
}
