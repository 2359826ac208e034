//! Page preference resolution against a selection.
//!
//! Given the current selection (possibly empty), picks the concrete options
//! set for every declaration and fixes each preference's current value.
//! Declarations are processed in order and each resolved value is written
//! back before the next declaration, so a change to an early preference
//! cascades into the options sets of later ones.

use serde::{Deserialize, Serialize};

use crate::declaration::{PrefDeclaration, SelectionMap};
use crate::error::PrefsError;
use crate::option_set::{OptionSet, OptionSetCatalog, PrefOption, flagged_default};
use crate::placeholder::substitute_selection;

/// A preference narrowed to one options set with a current value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPref {
    /// Preference identifier.
    pub identifier: String,
    /// Label shown in the chooser.
    pub display_name: String,
    /// Options set selected by the current values of earlier preferences.
    pub options_set_id: String,
    /// Options available for this preference right now.
    pub options: Vec<PrefOption>,
    /// Currently selected option identifier.
    pub current_value: String,
}

/// Resolve every declaration against `selections`, updating it in place.
///
/// A selected value is kept when it exists in the resolved options set.
/// Otherwise the preference falls back to the declaration's `default_value`
/// (when it is a member of the set), then to the set's flagged default.
/// Selection keys that are not page preferences are left untouched.
///
/// Resolution is a fixed point: running it again on its own output changes
/// nothing.
///
/// # Errors
///
/// Returns [`PrefsError::InvalidOptionsSource`] if the substituted options
/// set is missing from `catalog`, and [`PrefsError::NoDefaultAvailable`] if
/// a fallback is needed but no default exists.
pub fn resolve_page_prefs(
    declarations: &[PrefDeclaration],
    catalog: &OptionSetCatalog,
    selections: &mut SelectionMap,
) -> Result<Vec<ResolvedPref>, PrefsError> {
    let mut resolved = Vec::with_capacity(declarations.len());

    for (index, declaration) in declarations.iter().enumerate() {
        let options_set_id = substitute_selection(
            &declaration.options_source,
            index,
            &declarations[..index],
            selections,
        )?;

        let options = catalog
            .get(&options_set_id)
            .ok_or_else(|| PrefsError::InvalidOptionsSource {
                options_source: declaration.options_source.clone(),
                candidate: options_set_id.clone(),
            })?;

        let current_value = match selections.get(&declaration.identifier) {
            Some(value) if contains_option(options, value) => value.clone(),
            previous => {
                let fallback = fallback_value(declaration, &options_set_id, options)?;
                if let Some(previous) = previous {
                    tracing::debug!(
                        preference = %declaration.identifier,
                        previous = %previous,
                        fallback = %fallback,
                        options_set = %options_set_id,
                        "Selected value not valid for options set, falling back to default"
                    );
                }
                fallback
            }
        };

        selections.insert(declaration.identifier.clone(), current_value.clone());
        resolved.push(ResolvedPref {
            identifier: declaration.identifier.clone(),
            display_name: declaration.label().to_owned(),
            options_set_id,
            options: options.clone(),
            current_value,
        });
    }

    Ok(resolved)
}

/// Default selection for a page: resolution against an empty selection.
///
/// # Errors
///
/// Same as [`resolve_page_prefs`].
pub fn default_selections(
    declarations: &[PrefDeclaration],
    catalog: &OptionSetCatalog,
) -> Result<SelectionMap, PrefsError> {
    let mut selections = SelectionMap::new();
    resolve_page_prefs(declarations, catalog, &mut selections)?;
    Ok(selections)
}

fn contains_option(options: &OptionSet, value: &str) -> bool {
    options.iter().any(|o| o.identifier == value)
}

fn fallback_value(
    declaration: &PrefDeclaration,
    options_set_id: &str,
    options: &OptionSet,
) -> Result<String, PrefsError> {
    if let Some(value) = declaration
        .default_value
        .as_deref()
        .filter(|v| contains_option(options, v))
    {
        return Ok(value.to_owned());
    }

    flagged_default(options)
        .map(|o| o.identifier.clone())
        .ok_or_else(|| PrefsError::NoDefaultAvailable {
            identifier: declaration.identifier.clone(),
            options_set: options_set_id.to_owned(),
        })
}
