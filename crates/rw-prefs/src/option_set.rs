//! Option-set catalog.
//!
//! Option sets are loaded from YAML files mapping an options set ID to an
//! ordered list of options:
//!
//! ```yaml
//! color_options:
//!   - identifier: red
//!     display_name: Red
//!     default: true
//!   - identifier: blue
//!     display_name: Blue
//! ```
//!
//! All sources are merged into one [`OptionSetCatalog`]. Defining the same
//! options set ID in two sources is an error.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::PrefsError;

/// A single selectable value in an options set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrefOption {
    /// Value stored in the selection map when this option is chosen.
    pub identifier: String,
    /// Human-readable label (falls back to the identifier).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Whether this option is the set's default.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub default: bool,
}

impl PrefOption {
    /// Create a non-default option without a display name.
    #[must_use]
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            display_name: None,
            default: false,
        }
    }

    /// Mark the option as the set's default.
    #[must_use]
    pub fn with_default(mut self) -> Self {
        self.default = true;
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

/// Ordered list of options for one axis of content variation.
pub type OptionSet = Vec<PrefOption>;

/// Raw option-set source, typically the contents of one YAML file.
#[derive(Debug, Clone)]
pub struct OptionSource {
    /// Where the content came from (used in error messages).
    pub origin: String,
    /// YAML content.
    pub content: String,
}

impl OptionSource {
    /// Create a source from an origin label and YAML content.
    #[must_use]
    pub fn new(origin: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            content: content.into(),
        }
    }
}

/// Mapping from options set ID to its ordered options.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionSetCatalog {
    sets: BTreeMap<String, OptionSet>,
}

impl OptionSetCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and merge every source into one catalog.
    ///
    /// # Errors
    ///
    /// Returns [`PrefsError::Yaml`] if a source cannot be decoded,
    /// [`PrefsError::Validation`] if a set breaks the schema, and
    /// [`PrefsError::DuplicateOptionSet`] if two sources share a set ID.
    pub fn load_all<'a>(
        sources: impl IntoIterator<Item = &'a OptionSource>,
    ) -> Result<Self, PrefsError> {
        let mut catalog = Self::new();
        for source in sources {
            let decoded = Self::from_yaml(&source.origin, &source.content)?;
            tracing::debug!(origin = %source.origin, sets = decoded.len(), "Loaded options sets");
            for (id, options) in decoded.sets {
                if catalog.sets.contains_key(&id) {
                    return Err(PrefsError::DuplicateOptionSet {
                        id,
                        origin: source.origin.clone(),
                    });
                }
                catalog.sets.insert(id, options);
            }
        }
        Ok(catalog)
    }

    /// Load every `*.yaml` / `*.yml` file under `dir` (recursively).
    ///
    /// Files are read in sorted path order so duplicate errors are reported
    /// deterministically.
    ///
    /// # Errors
    ///
    /// Returns [`PrefsError::Io`] if a file cannot be read, plus any error
    /// from [`load_all`](Self::load_all).
    pub fn load_dir(dir: &Path) -> Result<Self, PrefsError> {
        let mut paths = yaml_files(dir);
        paths.sort();

        let mut sources = Vec::with_capacity(paths.len());
        for path in paths {
            let content = std::fs::read_to_string(&path).map_err(|source| PrefsError::Io {
                path: path.clone(),
                source,
            })?;
            sources.push(OptionSource::new(path.display().to_string(), content));
        }

        let catalog = Self::load_all(&sources)?;
        tracing::info!(
            dir = %dir.display(),
            files = sources.len(),
            sets = catalog.len(),
            "Loaded preference options"
        );
        Ok(catalog)
    }

    /// Decode and validate a single YAML source.
    ///
    /// # Errors
    ///
    /// Returns [`PrefsError::Yaml`] or [`PrefsError::Validation`].
    pub fn from_yaml(origin: &str, content: &str) -> Result<Self, PrefsError> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Ok(Self::new());
        }

        // Syntax errors and schema mismatches are reported separately.
        let value: serde_yaml::Value =
            serde_yaml::from_str(trimmed).map_err(|source| PrefsError::Yaml {
                origin: origin.to_owned(),
                source,
            })?;
        let sets: BTreeMap<String, OptionSet> = serde_yaml::from_value(value)
            .map_err(|e| PrefsError::Validation(format!("{origin}: {e}")))?;

        for (id, options) in &sets {
            validate_set(id, options)?;
        }

        Ok(Self { sets })
    }

    /// Insert a set, replacing any previous set with the same ID.
    ///
    /// # Errors
    ///
    /// Returns [`PrefsError::Validation`] if the set breaks the schema.
    pub fn insert(&mut self, id: impl Into<String>, options: OptionSet) -> Result<(), PrefsError> {
        let id = id.into();
        validate_set(&id, &options)?;
        self.sets.insert(id, options);
        Ok(())
    }

    /// Copy a set that already passed validation in another catalog.
    pub(crate) fn copy_set_from(&mut self, other: &Self, id: &str) {
        if let Some(options) = other.sets.get(id) {
            self.sets.insert(id.to_owned(), options.clone());
        }
    }

    /// Builder-style [`insert`](Self::insert).
    ///
    /// # Errors
    ///
    /// Returns [`PrefsError::Validation`] if the set breaks the schema.
    pub fn with_set(mut self, id: impl Into<String>, options: OptionSet) -> Result<Self, PrefsError> {
        self.insert(id, options)?;
        Ok(self)
    }

    /// Look up a set by ID.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&OptionSet> {
        self.sets.get(id)
    }

    /// Check whether a set exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.sets.contains_key(id)
    }

    /// Number of sets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Check whether the catalog holds no sets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Iterate over `(id, options)` pairs in ID order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionSet)> {
        self.sets.iter().map(|(id, options)| (id.as_str(), options))
    }
}

/// Default option of a set, if one is flagged.
#[must_use]
pub fn flagged_default(options: &OptionSet) -> Option<&PrefOption> {
    options.iter().find(|option| option.default)
}

fn validate_set(id: &str, options: &OptionSet) -> Result<(), PrefsError> {
    if id.is_empty() {
        return Err(PrefsError::Validation(
            "options set ID cannot be empty".to_owned(),
        ));
    }
    if options.is_empty() {
        return Err(PrefsError::Validation(format!(
            "options set '{id}' must contain at least one option"
        )));
    }

    let mut seen = HashSet::with_capacity(options.len());
    for option in options {
        if option.identifier.is_empty() {
            return Err(PrefsError::Validation(format!(
                "options set '{id}' contains an option with an empty identifier"
            )));
        }
        if !seen.insert(option.identifier.as_str()) {
            return Err(PrefsError::Validation(format!(
                "options set '{id}' contains duplicate option identifier '{}'",
                option.identifier
            )));
        }
    }

    let defaults = options.iter().filter(|option| option.default).count();
    if defaults > 1 {
        return Err(PrefsError::Validation(format!(
            "options set '{id}' flags {defaults} options as default (at most one allowed)"
        )));
    }

    Ok(())
}

/// Collect YAML files under a directory.
///
/// Returns an empty list if the directory doesn't exist.
fn yaml_files(dir: &Path) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for ext in ["yaml", "yml"] {
        let pattern = dir.join("**").join(format!("*.{ext}"));
        let Ok(entries) = glob::glob(&pattern.to_string_lossy()) else {
            continue;
        };
        paths.extend(entries.filter_map(Result::ok).filter(|p| p.is_file()));
    }
    paths
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const COLORS: &str = r"
color_options:
  - identifier: red
    display_name: Red
    default: true
  - identifier: blue
    display_name: Blue
";

    const FINISHES: &str = r"
red_finish_options:
  - identifier: gloss
    default: true
  - identifier: matte
blue_finish_options:
  - identifier: matte
    default: true
";

    #[test]
    fn test_from_yaml_preserves_option_order() {
        let catalog = OptionSetCatalog::from_yaml("colors.yaml", COLORS).unwrap();
        let colors = catalog.get("color_options").unwrap();
        let ids: Vec<&str> = colors.iter().map(|o| o.identifier.as_str()).collect();
        assert_eq!(ids, vec!["red", "blue"]);
        assert!(colors[0].default);
        assert!(!colors[1].default);
        assert_eq!(colors[1].label(), "Blue");
    }

    #[test]
    fn test_label_falls_back_to_identifier() {
        let option = PrefOption::new("gloss");
        assert_eq!(option.label(), "gloss");
    }

    #[test]
    fn test_from_yaml_empty_content() {
        let catalog = OptionSetCatalog::from_yaml("empty.yaml", "  \n").unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_from_yaml_rejects_unknown_fields() {
        let yaml = "colors:\n  - identifier: red\n    colour: red\n";
        let err = OptionSetCatalog::from_yaml("colors.yaml", yaml).unwrap_err();
        assert!(matches!(err, PrefsError::Validation(_)), "got {err:?}");
    }

    #[test]
    fn test_from_yaml_reports_syntax_errors() {
        let err = OptionSetCatalog::from_yaml("colors.yaml", "colors: [red").unwrap_err();
        assert!(matches!(err, PrefsError::Yaml { .. }), "got {err:?}");
    }

    #[test]
    fn test_from_yaml_rejects_duplicate_option_identifiers() {
        let yaml = "colors:\n  - identifier: red\n  - identifier: red\n";
        let err = OptionSetCatalog::from_yaml("colors.yaml", yaml).unwrap_err();
        assert!(matches!(err, PrefsError::Validation(_)), "got {err:?}");
        assert!(err.to_string().contains("duplicate option identifier 'red'"));
    }

    #[test]
    fn test_from_yaml_rejects_multiple_defaults() {
        let yaml = "colors:\n  - identifier: red\n    default: true\n  - identifier: blue\n    default: true\n";
        let err = OptionSetCatalog::from_yaml("colors.yaml", yaml).unwrap_err();
        assert!(matches!(err, PrefsError::Validation(_)), "got {err:?}");
    }

    #[test]
    fn test_from_yaml_rejects_empty_set() {
        let err = OptionSetCatalog::from_yaml("colors.yaml", "colors: []\n").unwrap_err();
        assert!(matches!(err, PrefsError::Validation(_)), "got {err:?}");
    }

    #[test]
    fn test_set_without_default_is_valid() {
        let yaml = "colors:\n  - identifier: red\n  - identifier: blue\n";
        let catalog = OptionSetCatalog::from_yaml("colors.yaml", yaml).unwrap();
        assert!(flagged_default(catalog.get("colors").unwrap()).is_none());
    }

    #[test]
    fn test_load_all_merges_sources() {
        let sources = [
            OptionSource::new("colors.yaml", COLORS),
            OptionSource::new("finishes.yaml", FINISHES),
        ];
        let catalog = OptionSetCatalog::load_all(&sources).unwrap();
        assert_eq!(catalog.len(), 3);
        assert!(catalog.contains("color_options"));
        assert!(catalog.contains("red_finish_options"));
        assert!(catalog.contains("blue_finish_options"));
    }

    #[test]
    fn test_load_all_rejects_duplicate_set_ids() {
        let sources = [
            OptionSource::new("a.yaml", COLORS),
            OptionSource::new("b.yaml", COLORS),
        ];
        let err = OptionSetCatalog::load_all(&sources).unwrap_err();
        match err {
            PrefsError::DuplicateOptionSet { id, origin } => {
                assert_eq!(id, "color_options");
                assert_eq!(origin, "b.yaml");
            }
            other => panic!("expected DuplicateOptionSet, got {other:?}"),
        }
    }

    #[test]
    fn test_load_dir_reads_nested_yaml_files() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("colors.yaml"), COLORS).unwrap();
        std::fs::create_dir(temp.path().join("paint")).unwrap();
        std::fs::write(temp.path().join("paint/finishes.yml"), FINISHES).unwrap();
        std::fs::write(temp.path().join("notes.txt"), "not yaml").unwrap();

        let catalog = OptionSetCatalog::load_dir(temp.path()).unwrap();
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn test_load_dir_missing_directory_is_empty() {
        let temp = tempfile::tempdir().unwrap();
        let catalog = OptionSetCatalog::load_dir(&temp.path().join("missing")).unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_serialized_option_omits_unset_fields() {
        let json = serde_json::to_string(&PrefOption::new("red")).unwrap();
        assert_eq!(json, r#"{"identifier":"red"}"#);
    }
}
