//! Client state reconciliation.
//!
//! A [`Reconciler`] is created once per page load from the embedded payload
//! and owns the page's runtime state: narrowed catalog, declarations,
//! selection, conditional functions and the stored preference record.
//!
//! On construction it applies stored and URL overrides on top of the
//! rendered defaults, reveals the page, and syncs the URL and storage. Each
//! selection change then runs one synchronous reconciliation pass:
//!
//! 1. cascade the selection and re-render the chooser;
//! 2. re-resolve conditional functions and toggle blocks whose value changed;
//! 3. rebuild the navigation index;
//! 4. rewrite the URL query without adding a history entry;
//! 5. merge the selection into storage.

use std::collections::BTreeMap;

use rw_prefs::markup::{
    CONDITIONAL_REF_ATTR, OPTION_ID_ATTR, PREF_ID_ATTR, TOGGLEABLE_CLASS, render_chooser,
};
use rw_prefs::{
    ClientPayload, ConditionalFunction, OptionSetCatalog, PrefDeclaration, SelectionMap,
    resolve_page_prefs,
};

use crate::error::ClientError;
use crate::location::{Location, PageUrl};
use crate::storage::{
    DEFAULT_STORAGE_KEY, KeyValueStore, StoredPrefs, load_stored_prefs, save_stored_prefs,
};
use crate::surface::{NodeId, RenderSurface};
use crate::toc::{render_toc, visible_headings};

/// Region IDs and storage key used by the reconciler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Key of the stored preference record.
    pub storage_key: String,
    /// Region holding the selection control.
    pub chooser_id: String,
    /// Region holding the page content.
    pub content_id: String,
    /// Region holding the navigation index (optional on the page).
    pub toc_id: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_owned(),
            chooser_id: "rw-chooser".to_owned(),
            content_id: "rw-content".to_owned(),
            toc_id: "rw-toc".to_owned(),
        }
    }
}

impl ClientConfig {
    /// Set the chooser region ID.
    #[must_use]
    pub fn with_chooser_id(mut self, id: impl Into<String>) -> Self {
        self.chooser_id = id.into();
        self
    }

    /// Set the content region ID.
    #[must_use]
    pub fn with_content_id(mut self, id: impl Into<String>) -> Self {
        self.content_id = id.into();
        self
    }

    /// Set the storage key.
    #[must_use]
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }
}

/// The element a user interacted with.
///
/// Only its attributes matter: a chooser pill carries the preference and
/// option IDs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InteractionTarget {
    attributes: BTreeMap<String, String>,
}

impl InteractionTarget {
    /// Create a target without attributes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Target for a chooser pill.
    #[must_use]
    pub fn pill(pref_id: impl Into<String>, option_id: impl Into<String>) -> Self {
        Self::new()
            .with_attr(PREF_ID_ATTR, pref_id)
            .with_attr(OPTION_ID_ATTR, option_id)
    }

    /// Set an attribute.
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Attribute value, `None` when missing or empty.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// Per-page runtime state and reconciliation logic.
#[derive(Debug)]
pub struct Reconciler<S, K, L> {
    config: ClientConfig,
    catalog: OptionSetCatalog,
    declarations: Vec<PrefDeclaration>,
    selections: SelectionMap,
    functions: BTreeMap<String, ConditionalFunction>,
    stored: StoredPrefs,
    chooser: NodeId,
    surface: S,
    store: K,
    location: L,
}

impl<S, K, L> Reconciler<S, K, L>
where
    S: RenderSurface,
    K: KeyValueStore,
    L: Location,
{
    /// Decode the embedded payload JSON and initialize.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Payload`] if the JSON cannot be decoded, and
    /// any error of [`initialize`](Self::initialize).
    pub fn from_json(
        json: &str,
        surface: S,
        store: K,
        location: L,
        config: ClientConfig,
    ) -> Result<Self, ClientError> {
        let payload = ClientPayload::from_json(json).map_err(ClientError::Payload)?;
        Self::initialize(payload, surface, store, location, config)
    }

    /// Build the runtime state for a freshly loaded page.
    ///
    /// Overrides are applied lowest to highest: rendered defaults, stored
    /// preferences, URL query parameters. Only keys declared on the page are
    /// considered. The page is re-rendered only if an override changed a
    /// value.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MissingRegion`] if the chooser or content
    /// region is missing, and pass errors if a re-render is needed.
    pub fn initialize(
        payload: ClientPayload,
        surface: S,
        store: K,
        location: L,
        config: ClientConfig,
    ) -> Result<Self, ClientError> {
        let chooser = surface
            .find_region(&config.chooser_id)
            .ok_or_else(|| ClientError::MissingRegion(config.chooser_id.clone()))?;
        let stored = load_stored_prefs(&store, &config.storage_key);

        let mut reconciler = Self {
            config,
            catalog: payload.catalog,
            declarations: payload.declarations,
            selections: payload.selections,
            functions: payload.functions,
            stored,
            chooser,
            surface,
            store,
            location,
        };

        let url_prefs = reconciler.url_prefs();
        let stored_overrides = reconciler.stored.selections();
        let mut changed = reconciler.apply_overrides(&stored_overrides);
        changed |= reconciler.apply_overrides(&url_prefs);

        if changed {
            tracing::debug!("Preference overrides found, re-rendering page");
            reconciler.render()?;
        }

        reconciler.reveal()?;
        reconciler.rebuild_toc()?;
        reconciler.sync_url();
        reconciler.persist();

        Ok(reconciler)
    }

    /// Handle a click on the selection control.
    ///
    /// Returns `false` without doing anything when the target does not
    /// identify a preference and option declared on this page.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] if the page markup is inconsistent with the
    /// payload. The pass is aborted.
    pub fn handle_selection(&mut self, target: &InteractionTarget) -> Result<bool, ClientError> {
        let (Some(pref_id), Some(option_id)) = (
            target.attribute(PREF_ID_ATTR),
            target.attribute(OPTION_ID_ATTR),
        ) else {
            tracing::debug!(?target, "Ignoring interaction without preference data");
            return Ok(false);
        };
        if !self.is_relevant(pref_id) {
            tracing::debug!(pref_id, "Ignoring interaction for undeclared preference");
            return Ok(false);
        }

        tracing::debug!(pref_id, option_id, "Preference selected");
        self.selections.insert(pref_id.to_owned(), option_id.to_owned());

        self.render()?;
        self.rebuild_toc()?;
        self.sync_url();
        self.persist();
        Ok(true)
    }

    /// Current selection.
    #[must_use]
    pub fn selections(&self) -> &SelectionMap {
        &self.selections
    }

    /// Conditional functions with their current values.
    #[must_use]
    pub fn functions(&self) -> &BTreeMap<String, ConditionalFunction> {
        &self.functions
    }

    /// Stored preference record as last persisted.
    #[must_use]
    pub fn stored(&self) -> &StoredPrefs {
        &self.stored
    }

    /// Rendering surface.
    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Key-value store.
    #[must_use]
    pub fn store(&self) -> &K {
        &self.store
    }

    /// Page location.
    #[must_use]
    pub fn location(&self) -> &L {
        &self.location
    }

    /// Tear down, returning the surface, store and location.
    pub fn into_parts(self) -> (S, K, L) {
        (self.surface, self.store, self.location)
    }

    fn is_relevant(&self, pref_id: &str) -> bool {
        self.declarations.iter().any(|d| d.identifier == pref_id)
    }

    fn url_prefs(&self) -> SelectionMap {
        PageUrl::parse(&self.location.href())
            .params()
            .filter(|(key, _)| self.is_relevant(key))
            .map(|(key, value)| (key.to_owned(), value.to_owned()))
            .collect()
    }

    /// Copy relevant overrides into the selection, reporting whether any
    /// value changed.
    fn apply_overrides(&mut self, overrides: &SelectionMap) -> bool {
        let mut changed = false;
        for (pref_id, value) in overrides {
            if !self.is_relevant(pref_id) || self.selections.get(pref_id) == Some(value) {
                continue;
            }
            self.selections.insert(pref_id.clone(), value.clone());
            changed = true;
        }
        changed
    }

    /// Cascade the selection, re-render the chooser, and toggle blocks.
    fn render(&mut self) -> Result<(), ClientError> {
        let content = self.region(&self.config.content_id)?;
        let blocks = self.conditional_blocks(content)?;

        let resolved = resolve_page_prefs(&self.declarations, &self.catalog, &mut self.selections)?;
        self.surface.set_html(self.chooser, &render_chooser(&resolved));

        let mut toggled = 0usize;
        for (reference, function) in &mut self.functions {
            let updated = function.reresolve(&self.selections);
            if updated.value != function.value {
                for (node, block_ref) in &blocks {
                    if block_ref == reference {
                        self.surface.set_visible(*node, updated.value);
                        toggled += 1;
                    }
                }
            }
            *function = updated;
        }

        tracing::debug!(
            preferences = resolved.len(),
            blocks_toggled = toggled,
            "Reconciled page"
        );
        Ok(())
    }

    /// Toggleable blocks of the content region with their references.
    ///
    /// Checked up front so that an inconsistent page aborts the pass before
    /// anything changes.
    fn conditional_blocks(&self, content: NodeId) -> Result<Vec<(NodeId, String)>, ClientError> {
        self.surface
            .elements_with_class(content, TOGGLEABLE_CLASS)
            .into_iter()
            .enumerate()
            .map(|(index, node)| {
                let reference = self
                    .surface
                    .attribute(node, CONDITIONAL_REF_ATTR)
                    .filter(|r| !r.is_empty())
                    .ok_or(ClientError::MissingConditionalRef { index })?;
                if !self.functions.contains_key(&reference) {
                    return Err(ClientError::UnknownConditionalRef(reference));
                }
                Ok((node, reference))
            })
            .collect()
    }

    fn reveal(&mut self) -> Result<(), ClientError> {
        let content = self.region(&self.config.content_id)?;
        self.surface.set_visible(self.chooser, true);
        self.surface.set_visible(content, true);
        Ok(())
    }

    fn rebuild_toc(&mut self) -> Result<(), ClientError> {
        let Some(toc) = self.surface.find_region(&self.config.toc_id) else {
            tracing::debug!(toc_id = %self.config.toc_id, "No navigation index region");
            return Ok(());
        };
        let content = self.region(&self.config.content_id)?;
        let entries = visible_headings(&self.surface, content);
        self.surface.set_html(toc, &render_toc(&entries));
        Ok(())
    }

    fn sync_url(&mut self) {
        let mut url = PageUrl::parse(&self.location.href());
        // BTreeMap iteration is sorted by preference ID.
        for (pref_id, value) in &self.selections {
            url.set(pref_id, value);
        }
        self.location.replace_state(&url.to_string());
    }

    fn persist(&mut self) {
        save_stored_prefs(
            &mut self.store,
            &self.config.storage_key,
            &mut self.stored,
            &self.selections,
        );
    }

    fn region(&self, id: &str) -> Result<NodeId, ClientError> {
        self.surface
            .find_region(id)
            .ok_or_else(|| ClientError::MissingRegion(id.to_owned()))
    }
}
