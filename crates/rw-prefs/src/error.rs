//! Error types for preference resolution.

use std::path::PathBuf;

/// Error raised while loading option sets or resolving page preferences.
///
/// Every variant is an authoring mistake or a malformed input. None of them
/// are recovered from: the page being compiled is rejected.
#[derive(Debug, thiserror::Error)]
pub enum PrefsError {
    /// Two option-set sources define the same options set ID.
    #[error("Duplicate options set ID '{id}' found in {origin}")]
    DuplicateOptionSet {
        /// The options set ID defined more than once.
        id: String,
        /// The source that introduced the duplicate (usually a file path).
        origin: String,
    },

    /// Decoded data does not match the option-set or declaration schema.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A placeholder refers to a preference that is not declared earlier on the page.
    #[error(
        "Placeholder <{placeholder}> in options_source '{options_source}' (page preference #{index}) does not refer to a valid page preference identifier. Make sure that '{}' is spelled correctly, and that it is defined in the page_preferences list before it is referenced.",
        placeholder.to_lowercase()
    )]
    UnresolvedPlaceholder {
        /// The placeholder identifier as written by the author.
        placeholder: String,
        /// The options source containing the placeholder.
        options_source: String,
        /// Zero-based position of the declaration in `page_preferences`.
        index: usize,
    },

    /// A segment mixes literal text with a `<...>` token.
    #[error("Invalid placeholder segment '{segment}' in options_source '{options_source}'")]
    MalformedPlaceholder {
        /// The offending segment.
        segment: String,
        /// The options source containing the segment.
        options_source: String,
    },

    /// An options source names (or can expand to) a set that does not exist.
    #[error("{}", invalid_source_message(options_source, candidate))]
    InvalidOptionsSource {
        /// The options source as authored.
        options_source: String,
        /// The concrete options set ID that could not be found.
        candidate: String,
    },

    /// A preference has neither a stored, explicit, nor flagged default.
    #[error(
        "No default value available for page preference '{identifier}': options set '{options_set}' has no option flagged as default and no default_value applies"
    )]
    NoDefaultAvailable {
        /// The preference identifier.
        identifier: String,
        /// The options set that was resolved for the preference.
        options_set: String,
    },

    /// YAML decoding error.
    #[error("Invalid YAML in {origin}: {source}")]
    Yaml {
        /// The source being decoded.
        origin: String,
        /// Underlying parser error.
        #[source]
        source: serde_yaml::Error,
    },

    /// A conditional expression cannot be parsed.
    #[error("Invalid condition '{expression}': {source}")]
    InvalidCondition {
        /// The expression as authored.
        expression: String,
        /// Parser error.
        #[source]
        source: crate::condition::ConditionParseError,
    },

    /// The embedded client payload cannot be encoded or decoded.
    #[error("Invalid client payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// I/O error while reading option-set files.
    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        /// Path being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

fn invalid_source_message(options_source: &str, candidate: &str) -> String {
    if options_source == candidate {
        format!("Invalid options_source found in page_preferences: {options_source}")
    } else {
        format!(
            "Invalid options_source could be populated by the placeholders in {options_source}: An options source with the ID '{candidate}' does not exist."
        )
    }
}

/// A [`PrefsError`] attributed to the page that caused it.
#[derive(Debug, thiserror::Error)]
#[error("{}: {source}", path.display())]
pub struct PageError {
    /// Path of the page being compiled.
    pub path: PathBuf,
    /// The underlying resolution error.
    #[source]
    pub source: PrefsError,
}

impl PageError {
    /// Attach a page path to a resolution error.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, source: PrefsError) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}
