//! `rw prefs check` command implementation.

use std::path::PathBuf;

use clap::Args;
use rw_config::PreferencesConfig;
use rw_prefs::OptionSetCatalog;

use super::{SourceArgs, compile_page};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the check command.
#[derive(Args)]
pub(crate) struct CheckArgs {
    #[command(flatten)]
    source: SourceArgs,
}

impl CheckArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let (config, catalog) = self.source.load()?;
        let prefs = &config.preferences_resolved;

        output.info(&format!("Options: {}", prefs.options_dir.display()));
        output.info(&format!("Content: {}", prefs.content_dir.display()));

        let pages = find_pages(prefs)?;
        if pages.is_empty() {
            output.warning("No pages found");
            return Ok(());
        }

        let report = check_pages(&catalog, &pages);
        for failure in &report.failures {
            output.error(&failure.to_string());
        }

        if report.failures.is_empty() {
            output.success(&format!(
                "{} pages checked against {} options sets",
                report.checked,
                catalog.len()
            ));
            Ok(())
        } else {
            Err(CliError::Validation(format!(
                "{} of {} pages have invalid preferences",
                report.failures.len(),
                report.checked
            )))
        }
    }
}

/// Outcome of checking a set of pages.
#[derive(Debug)]
pub(crate) struct CheckReport {
    pub(crate) checked: usize,
    pub(crate) failures: Vec<CliError>,
}

/// Every page under the content directory, sorted and deduplicated.
pub(crate) fn find_pages(prefs: &PreferencesConfig) -> Result<Vec<PathBuf>, CliError> {
    let mut pages = Vec::new();
    for pattern in prefs.page_patterns() {
        pages.extend(
            glob::glob(&pattern)?
                .filter_map(Result::ok)
                .filter(|p| p.is_file()),
        );
    }
    pages.sort();
    pages.dedup();
    tracing::debug!(
        content_dir = %prefs.content_dir.display(),
        pages = pages.len(),
        "Found pages"
    );
    Ok(pages)
}

/// Compile every page, collecting failures instead of stopping at the first.
pub(crate) fn check_pages(catalog: &OptionSetCatalog, pages: &[PathBuf]) -> CheckReport {
    let failures: Vec<CliError> = pages
        .iter()
        .filter_map(|path| compile_page(catalog, path).err())
        .collect();
    tracing::debug!(
        checked = pages.len(),
        failed = failures.len(),
        "Checked page preferences"
    );
    CheckReport {
        checked: pages.len(),
        failures,
    }
}
