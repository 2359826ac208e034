//! CLI error types.

use rw_config::ConfigError;
use rw_prefs::{PageError, PrefsError};

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Prefs(#[from] PrefsError),

    #[error("{0}")]
    Page(#[from] PageError),

    #[error("Invalid page pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("{0}")]
    Validation(String),
}
