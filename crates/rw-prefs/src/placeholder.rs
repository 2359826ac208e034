//! Placeholder expansion and page option narrowing.
//!
//! An `options_source` is a sequence of segments joined by `_`. Each segment
//! is either a literal or a `<IDENTIFIER>` placeholder referring to a
//! preference declared earlier on the same page:
//!
//! ```text
//! <COLOR>_<FINISH>_paint
//! ```
//!
//! At build time every placeholder is substituted with every valid value of
//! the referenced preference, and each resulting options set ID must exist
//! in the catalog. At read time the same substitution runs with the current
//! selection to pick exactly one set.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::declaration::{PrefDeclaration, SelectionMap, validate_declarations};
use crate::error::PrefsError;
use crate::option_set::{OptionSetCatalog, flagged_default};

/// Separator joining options set ID segments.
pub const SEGMENT_SEPARATOR: char = '_';

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<([A-Za-z0-9_-]+)>$").unwrap());

/// One `_`-separated piece of an options source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Literal text copied into the options set ID.
    Literal(&'a str),
    /// Placeholder identifier as written (without angle brackets).
    Placeholder(&'a str),
}

/// Split an options source into segments.
///
/// Underscores inside `<...>` do not split, so `<PROG_LANG>_options` has two
/// segments.
///
/// # Errors
///
/// Returns [`PrefsError::MalformedPlaceholder`] when a segment contains angle
/// brackets but is not exactly one placeholder.
pub fn parse_segments(options_source: &str) -> Result<Vec<Segment<'_>>, PrefsError> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (idx, c) in options_source.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            SEGMENT_SEPARATOR if depth == 0 => {
                segments.push(classify(&options_source[start..idx], options_source)?);
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }
    segments.push(classify(&options_source[start..], options_source)?);

    Ok(segments)
}

fn classify<'a>(segment: &'a str, options_source: &str) -> Result<Segment<'a>, PrefsError> {
    if let Some(caps) = PLACEHOLDER_RE.captures(segment) {
        let id = caps.get(1).map_or("", |m| m.as_str());
        return Ok(Segment::Placeholder(id));
    }
    if segment.contains(['<', '>']) {
        return Err(PrefsError::MalformedPlaceholder {
            segment: segment.to_owned(),
            options_source: options_source.to_owned(),
        });
    }
    Ok(Segment::Literal(segment))
}

/// Check whether an options source contains any placeholder.
///
/// # Errors
///
/// Same as [`parse_segments`].
pub fn has_placeholders(options_source: &str) -> Result<bool, PrefsError> {
    Ok(parse_segments(options_source)?
        .iter()
        .any(|s| matches!(s, Segment::Placeholder(_))))
}

/// Build every `_`-joined combination of segment values.
///
/// Segments vary left to right, with the first segment outermost:
///
/// ```
/// use rw_prefs::build_combinations;
///
/// let segments = vec![
///     vec!["red", "blue"],
///     vec!["gloss", "matte"],
///     vec!["paint"],
/// ];
/// assert_eq!(
///     build_combinations(&segments),
///     vec!["red_gloss_paint", "red_matte_paint", "blue_gloss_paint", "blue_matte_paint"],
/// );
/// ```
#[must_use]
pub fn build_combinations<S: AsRef<str>>(segments: &[Vec<S>]) -> Vec<String> {
    let Some((first, rest)) = segments.split_first() else {
        return Vec::new();
    };

    let seed: Vec<String> = first.iter().map(|v| v.as_ref().to_owned()).collect();
    rest.iter().fold(seed, |prefixes, values| {
        prefixes
            .iter()
            .flat_map(|prefix| {
                values
                    .iter()
                    .map(move |v| format!("{prefix}{SEGMENT_SEPARATOR}{}", v.as_ref()))
            })
            .collect()
    })
}

/// Options sets applicable to one declaration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationOptions {
    /// Preference identifier.
    pub identifier: String,
    /// Every options set ID the declaration can resolve to.
    pub options_set_ids: Vec<String>,
}

/// Result of validating and narrowing a page's preferences.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageOptions {
    /// Catalog restricted to the sets reachable from this page.
    pub catalog: OptionSetCatalog,
    /// Applicable sets per declaration, in declaration order.
    pub declarations: Vec<DeclarationOptions>,
}

impl PageOptions {
    /// Applicable options set IDs for a preference.
    #[must_use]
    pub fn options_set_ids(&self, identifier: &str) -> Option<&[String]> {
        self.declarations
            .iter()
            .find(|d| d.identifier == identifier)
            .map(|d| d.options_set_ids.as_slice())
    }
}

/// Validate a page's declarations and narrow the catalog to reachable sets.
///
/// Walks the declarations in order. Each placeholder must name a preference
/// declared earlier; each possible substitution must name an existing set;
/// and every reachable set must have a usable default.
///
/// # Errors
///
/// Returns [`PrefsError::UnresolvedPlaceholder`],
/// [`PrefsError::InvalidOptionsSource`], [`PrefsError::NoDefaultAvailable`],
/// [`PrefsError::MalformedPlaceholder`] or [`PrefsError::Validation`].
pub fn resolve_page_options(
    declarations: &[PrefDeclaration],
    catalog: &OptionSetCatalog,
) -> Result<PageOptions, PrefsError> {
    validate_declarations(declarations)?;

    // Lowercased identifier -> every value the preference can take.
    let mut valid_values: HashMap<String, Vec<String>> = HashMap::new();
    let mut page = PageOptions::default();

    for (index, declaration) in declarations.iter().enumerate() {
        let segments = parse_segments(&declaration.options_source)?;

        let mut segment_values: Vec<Vec<String>> = Vec::with_capacity(segments.len());
        for segment in &segments {
            match segment {
                Segment::Literal(text) => segment_values.push(vec![(*text).to_owned()]),
                Segment::Placeholder(id) => {
                    let values = valid_values.get(&id.to_lowercase()).ok_or_else(|| {
                        PrefsError::UnresolvedPlaceholder {
                            placeholder: (*id).to_owned(),
                            options_source: declaration.options_source.clone(),
                            index,
                        }
                    })?;
                    segment_values.push(values.clone());
                }
            }
        }

        let candidates = build_combinations(&segment_values);
        let mut values: Vec<String> = Vec::new();

        for candidate in &candidates {
            let Some(options) = catalog.get(candidate) else {
                return Err(PrefsError::InvalidOptionsSource {
                    options_source: declaration.options_source.clone(),
                    candidate: candidate.clone(),
                });
            };

            let explicit_default = declaration
                .default_value
                .as_deref()
                .filter(|value| options.iter().any(|o| o.identifier == *value));
            if explicit_default.is_none() && flagged_default(options).is_none() {
                return Err(PrefsError::NoDefaultAvailable {
                    identifier: declaration.identifier.clone(),
                    options_set: candidate.clone(),
                });
            }

            for option in options {
                if !values.contains(&option.identifier) {
                    values.push(option.identifier.clone());
                }
            }
            page.catalog.copy_set_from(catalog, candidate);
        }

        if let Some(default_value) = &declaration.default_value
            && !values.contains(default_value)
        {
            return Err(PrefsError::Validation(format!(
                "default_value '{default_value}' of page preference '{}' is not an option of {}",
                declaration.identifier, declaration.options_source
            )));
        }

        valid_values.insert(declaration.identifier.to_lowercase(), values);
        page.declarations.push(DeclarationOptions {
            identifier: declaration.identifier.clone(),
            options_set_ids: candidates,
        });
    }

    Ok(page)
}

/// Substitute placeholders with the current selection.
///
/// `declarations` are the declarations preceding the one being resolved; a
/// placeholder is matched against their identifiers case-insensitively and
/// replaced with the selected value.
///
/// # Errors
///
/// Returns [`PrefsError::UnresolvedPlaceholder`] if a placeholder names an
/// unknown preference or one without a selected value.
pub fn substitute_selection(
    options_source: &str,
    index: usize,
    declarations: &[PrefDeclaration],
    selections: &SelectionMap,
) -> Result<String, PrefsError> {
    let segments = parse_segments(options_source)?;
    let mut parts: Vec<&str> = Vec::with_capacity(segments.len());

    for segment in segments {
        match segment {
            Segment::Literal(text) => parts.push(text),
            Segment::Placeholder(id) => {
                let value = declarations
                    .iter()
                    .find(|d| d.identifier.eq_ignore_ascii_case(id))
                    .and_then(|d| selections.get(&d.identifier))
                    .ok_or_else(|| PrefsError::UnresolvedPlaceholder {
                        placeholder: id.to_owned(),
                        options_source: options_source.to_owned(),
                        index,
                    })?;
                parts.push(value);
            }
        }
    }

    let separator = SEGMENT_SEPARATOR.to_string();
    Ok(parts.join(separator.as_str()))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::option_set::PrefOption;

    fn set(ids: &[&str]) -> Vec<PrefOption> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| {
                let option = PrefOption::new(*id);
                if i == 0 { option.with_default() } else { option }
            })
            .collect()
    }

    fn paint_catalog() -> OptionSetCatalog {
        OptionSetCatalog::new()
            .with_set("color_options", set(&["red", "blue"]))
            .unwrap()
            .with_set("finish_options", set(&["gloss", "matte"]))
            .unwrap()
            .with_set("red_gloss_paint", set(&["p1"]))
            .unwrap()
            .with_set("red_matte_paint", set(&["p2"]))
            .unwrap()
            .with_set("blue_gloss_paint", set(&["p3"]))
            .unwrap()
            .with_set("blue_matte_paint", set(&["p4"]))
            .unwrap()
            .with_set("unrelated_options", set(&["x"]))
            .unwrap()
    }

    #[test]
    fn test_parse_segments_literal_only() {
        assert_eq!(
            parse_segments("color_options").unwrap(),
            vec![Segment::Literal("color"), Segment::Literal("options")]
        );
    }

    #[test]
    fn test_parse_segments_placeholder_keeps_inner_underscores() {
        assert_eq!(
            parse_segments("<PROG_LANG>_options").unwrap(),
            vec![Segment::Placeholder("PROG_LANG"), Segment::Literal("options")]
        );
    }

    #[test]
    fn test_parse_segments_rejects_mixed_segment() {
        let err = parse_segments("x<COLOR>_options").unwrap_err();
        assert!(
            matches!(err, PrefsError::MalformedPlaceholder { ref segment, .. } if segment == "x<COLOR>"),
            "got {err:?}"
        );
    }

    #[test]
    fn test_has_placeholders() {
        assert!(!has_placeholders("color_options").unwrap());
        assert!(has_placeholders("<COLOR>_options").unwrap());
    }

    #[test]
    fn test_build_combinations_matches_expected_set() {
        let segments = vec![
            vec!["red".to_owned(), "blue".to_owned()],
            vec!["gloss".to_owned(), "matte".to_owned()],
            vec!["paint".to_owned()],
        ];
        let result: BTreeSet<String> = build_combinations(&segments).into_iter().collect();
        let expected: BTreeSet<String> = [
            "red_gloss_paint",
            "red_matte_paint",
            "blue_gloss_paint",
            "blue_matte_paint",
        ]
        .into_iter()
        .map(str::to_owned)
        .collect();
        assert_eq!(result, expected);
    }

    #[test]
    fn test_build_combinations_single_segment() {
        assert_eq!(build_combinations(&[vec!["only"]]), vec!["only"]);
        assert!(build_combinations::<&str>(&[]).is_empty());
    }

    #[test]
    fn test_literal_source_resolves_to_itself() {
        let declarations = vec![PrefDeclaration::new("color", "color_options")];
        let page = resolve_page_options(&declarations, &paint_catalog()).unwrap();
        assert_eq!(
            page.options_set_ids("color"),
            Some(&["color_options".to_owned()][..])
        );
        assert_eq!(page.catalog.len(), 1);
    }

    #[test]
    fn test_single_placeholder_yields_one_candidate_per_value() {
        let catalog = OptionSetCatalog::new()
            .with_set("os_options", set(&["mac", "linux", "windows"]))
            .unwrap()
            .with_set("mac_install", set(&["brew"]))
            .unwrap()
            .with_set("linux_install", set(&["apt", "dnf"]))
            .unwrap()
            .with_set("windows_install", set(&["winget"]))
            .unwrap();
        let declarations = vec![
            PrefDeclaration::new("os", "os_options"),
            PrefDeclaration::new("installer", "<OS>_install"),
        ];
        let page = resolve_page_options(&declarations, &catalog).unwrap();
        assert_eq!(
            page.options_set_ids("installer").unwrap(),
            &["mac_install", "linux_install", "windows_install"]
        );
    }

    #[test]
    fn test_multiple_placeholders_narrow_catalog() {
        let declarations = vec![
            PrefDeclaration::new("color", "color_options"),
            PrefDeclaration::new("finish", "finish_options"),
            PrefDeclaration::new("paint", "<COLOR>_<FINISH>_paint"),
        ];
        let page = resolve_page_options(&declarations, &paint_catalog()).unwrap();
        assert_eq!(page.options_set_ids("paint").unwrap().len(), 4);
        assert_eq!(page.catalog.len(), 6);
        assert!(!page.catalog.contains("unrelated_options"));
    }

    #[test]
    fn test_placeholder_is_case_insensitive() {
        let declarations = vec![
            PrefDeclaration::new("color", "color_options"),
            PrefDeclaration::new("finish", "finish_options"),
            PrefDeclaration::new("paint", "<Color>_<finish>_paint"),
        ];
        assert!(resolve_page_options(&declarations, &paint_catalog()).is_ok());
    }

    #[test]
    fn test_forward_reference_is_unresolved() {
        let declarations = vec![
            PrefDeclaration::new("paint", "<COLOR>_<FINISH>_paint"),
            PrefDeclaration::new("color", "color_options"),
            PrefDeclaration::new("finish", "finish_options"),
        ];
        let err = resolve_page_options(&declarations, &paint_catalog()).unwrap_err();
        match err {
            PrefsError::UnresolvedPlaceholder {
                placeholder, index, ..
            } => {
                assert_eq!(placeholder, "COLOR");
                assert_eq!(index, 0);
            }
            other => panic!("expected UnresolvedPlaceholder, got {other:?}"),
        }
    }

    #[test]
    fn test_misspelled_reference_is_unresolved() {
        let declarations = vec![
            PrefDeclaration::new("color", "color_options"),
            PrefDeclaration::new("finish", "finish_options"),
            PrefDeclaration::new("paint", "<COLOUR>_<FINISH>_paint"),
        ];
        let err = resolve_page_options(&declarations, &paint_catalog()).unwrap_err();
        assert!(
            matches!(err, PrefsError::UnresolvedPlaceholder { .. }),
            "got {err:?}"
        );
    }

    #[test]
    fn test_self_reference_is_unresolved() {
        let declarations = vec![PrefDeclaration::new("color", "<COLOR>_options")];
        let err = resolve_page_options(&declarations, &paint_catalog()).unwrap_err();
        assert!(
            matches!(err, PrefsError::UnresolvedPlaceholder { .. }),
            "got {err:?}"
        );
    }

    #[test]
    fn test_missing_literal_source_is_invalid() {
        let declarations = vec![PrefDeclaration::new("color", "colour_options")];
        let err = resolve_page_options(&declarations, &paint_catalog()).unwrap_err();
        assert!(
            matches!(err, PrefsError::InvalidOptionsSource { ref candidate, .. } if candidate == "colour_options"),
            "got {err:?}"
        );
    }

    #[test]
    fn test_missing_expanded_candidate_is_invalid() {
        let catalog = OptionSetCatalog::new()
            .with_set("color_options", set(&["red", "blue"]))
            .unwrap()
            .with_set("red_paint", set(&["p1"]))
            .unwrap();
        let declarations = vec![
            PrefDeclaration::new("color", "color_options"),
            PrefDeclaration::new("paint", "<COLOR>_paint"),
        ];
        let err = resolve_page_options(&declarations, &catalog).unwrap_err();
        assert!(
            matches!(err, PrefsError::InvalidOptionsSource { ref candidate, .. } if candidate == "blue_paint"),
            "got {err:?}"
        );
    }

    #[test]
    fn test_chained_placeholder_uses_union_of_values() {
        let catalog = OptionSetCatalog::new()
            .with_set("os_options", set(&["mac", "linux"]))
            .unwrap()
            .with_set("mac_shell", set(&["zsh", "bash"]))
            .unwrap()
            .with_set("linux_shell", set(&["bash", "fish"]))
            .unwrap()
            .with_set("zsh_config", set(&["zshrc"]))
            .unwrap()
            .with_set("bash_config", set(&["bashrc"]))
            .unwrap()
            .with_set("fish_config", set(&["config_fish"]))
            .unwrap();
        let declarations = vec![
            PrefDeclaration::new("os", "os_options"),
            PrefDeclaration::new("shell", "<OS>_shell"),
            PrefDeclaration::new("config", "<SHELL>_config"),
        ];
        let page = resolve_page_options(&declarations, &catalog).unwrap();
        assert_eq!(
            page.options_set_ids("config").unwrap(),
            &["zsh_config", "bash_config", "fish_config"]
        );
    }

    #[test]
    fn test_set_without_any_default_is_rejected() {
        let catalog = OptionSetCatalog::new()
            .with_set("color_options", vec![PrefOption::new("red"), PrefOption::new("blue")])
            .unwrap();
        let declarations = vec![PrefDeclaration::new("color", "color_options")];
        let err = resolve_page_options(&declarations, &catalog).unwrap_err();
        assert!(
            matches!(err, PrefsError::NoDefaultAvailable { .. }),
            "got {err:?}"
        );
    }

    #[test]
    fn test_explicit_default_covers_set_without_flag() {
        let catalog = OptionSetCatalog::new()
            .with_set("color_options", vec![PrefOption::new("red"), PrefOption::new("blue")])
            .unwrap();
        let declarations =
            vec![PrefDeclaration::new("color", "color_options").with_default_value("blue")];
        assert!(resolve_page_options(&declarations, &catalog).is_ok());
    }

    #[test]
    fn test_unknown_explicit_default_is_rejected() {
        let declarations =
            vec![PrefDeclaration::new("color", "color_options").with_default_value("green")];
        let err = resolve_page_options(&declarations, &paint_catalog()).unwrap_err();
        assert!(matches!(err, PrefsError::Validation(_)), "got {err:?}");
    }

    #[test]
    fn test_substitute_selection_uses_current_values() {
        let declarations = vec![
            PrefDeclaration::new("color", "color_options"),
            PrefDeclaration::new("finish", "finish_options"),
        ];
        let selections: SelectionMap = [
            ("color".to_owned(), "blue".to_owned()),
            ("finish".to_owned(), "matte".to_owned()),
        ]
        .into_iter()
        .collect();
        let resolved =
            substitute_selection("<COLOR>_<FINISH>_paint", 2, &declarations, &selections).unwrap();
        assert_eq!(resolved, "blue_matte_paint");
    }

    #[test]
    fn test_substitute_selection_without_placeholders() {
        let resolved =
            substitute_selection("color_options", 0, &[], &SelectionMap::new()).unwrap();
        assert_eq!(resolved, "color_options");
    }
}
