//! Page preference declarations and frontmatter.
//!
//! Pages declare their preferences in a leading YAML frontmatter block:
//!
//! ```markdown
//! ---
//! title: Painting a wall
//! page_preferences:
//!   - identifier: color
//!     options_source: color_options
//!   - identifier: finish
//!     options_source: <COLOR>_finish_options
//!     default_value: matte
//! ---
//! ```
//!
//! Declaration order matters: a placeholder may only reference preferences
//! declared before it.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::PrefsError;

/// Mapping from preference identifier to the selected option identifier.
///
/// Sorted by preference identifier, which is also the order used when the
/// selection is written to the URL.
pub type SelectionMap = BTreeMap<String, String>;

/// One entry of a page's `page_preferences` list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrefDeclaration {
    /// Preference identifier (the selection map key).
    pub identifier: String,
    /// Options set ID, possibly containing `<PLACEHOLDER>` segments.
    pub options_source: String,
    /// Label shown in the chooser (falls back to the identifier).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Explicit default overriding the set's flagged default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl PrefDeclaration {
    /// Create a declaration without display name or explicit default.
    #[must_use]
    pub fn new(identifier: impl Into<String>, options_source: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            options_source: options_source.into(),
            display_name: None,
            default_value: None,
        }
    }

    /// Set an explicit default value.
    #[must_use]
    pub fn with_default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Set the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Label shown in the chooser.
    #[must_use]
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.identifier)
    }
}

/// Check identifiers are non-empty and unique (case-insensitively, since
/// placeholders match case-insensitively).
pub(crate) fn validate_declarations(declarations: &[PrefDeclaration]) -> Result<(), PrefsError> {
    let mut seen = HashSet::with_capacity(declarations.len());
    for (index, declaration) in declarations.iter().enumerate() {
        if declaration.identifier.is_empty() {
            return Err(PrefsError::Validation(format!(
                "page preference #{index} has an empty identifier"
            )));
        }
        if declaration.options_source.is_empty() {
            return Err(PrefsError::Validation(format!(
                "page preference '{}' has an empty options_source",
                declaration.identifier
            )));
        }
        if !seen.insert(declaration.identifier.to_lowercase()) {
            return Err(PrefsError::Validation(format!(
                "page preference '{}' is declared more than once",
                declaration.identifier
            )));
        }
    }
    Ok(())
}

/// Frontmatter fields relevant to preference resolution.
///
/// Unknown keys are ignored; other tooling owns them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageFrontmatter {
    /// Page title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Ordered preference declarations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub page_preferences: Vec<PrefDeclaration>,
}

impl PageFrontmatter {
    /// Parse frontmatter YAML.
    ///
    /// Empty content returns a default instance.
    ///
    /// # Errors
    ///
    /// Returns [`PrefsError::Yaml`] for malformed YAML and
    /// [`PrefsError::Validation`] when `page_preferences` has the wrong shape.
    pub fn from_yaml(origin: &str, content: &str) -> Result<Self, PrefsError> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }

        let value: serde_yaml::Value =
            serde_yaml::from_str(trimmed).map_err(|source| PrefsError::Yaml {
                origin: origin.to_owned(),
                source,
            })?;
        serde_yaml::from_value(value).map_err(|e| PrefsError::Validation(format!("{origin}: {e}")))
    }

    /// Extract and parse the frontmatter block of a markdown document.
    ///
    /// Documents without a frontmatter block have no preferences.
    ///
    /// # Errors
    ///
    /// Same as [`from_yaml`](Self::from_yaml).
    pub fn from_markdown(origin: &str, markdown: &str) -> Result<Self, PrefsError> {
        match split_frontmatter(markdown) {
            Some((yaml, _body)) => Self::from_yaml(origin, yaml),
            None => Ok(Self::default()),
        }
    }
}

/// Split a document into `(frontmatter, body)`.
///
/// The frontmatter block must start on the first line with `---` and end
/// with a line containing only `---`.
#[must_use]
pub fn split_frontmatter(markdown: &str) -> Option<(&str, &str)> {
    let rest = markdown
        .strip_prefix("---\n")
        .or_else(|| markdown.strip_prefix("---\r\n"))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == "---" {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Some((yaml, body));
        }
        offset += line.len();
    }
    None
}
