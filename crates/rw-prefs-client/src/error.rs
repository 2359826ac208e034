//! Error types for client reconciliation.

use rw_prefs::PrefsError;

/// Error raised while reconciling a page.
///
/// Region and reference errors mean the embedded payload and the page
/// markup are out of sync. Malformed interaction targets are not errors; they are ignored.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A required region is missing from the page.
    #[error("Cannot find region with id \"{0}\"")]
    MissingRegion(String),

    /// A toggleable block has no conditional reference attribute.
    #[error("Toggleable block #{index} has no data-if attribute")]
    MissingConditionalRef {
        /// Position of the block among the toggleable blocks of the content region.
        index: usize,
    },

    /// A toggleable block references a function the payload does not carry.
    #[error("Toggleable block references unknown conditional function '{0}'")]
    UnknownConditionalRef(String),

    /// The embedded payload cannot be decoded.
    #[error("Cannot decode embedded payload: {0}")]
    Payload(#[source] PrefsError),

    /// Preference resolution failed during a cascade.
    #[error(transparent)]
    Prefs(#[from] PrefsError),
}
