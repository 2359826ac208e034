//! Per-page compilation.
//!
//! [`PageCompiler`] validates a page's declarations against the catalog,
//! computes the default selection, and collects the page's conditional
//! expressions into a [`CompiledPage`] that can emit the client payload.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::condition::{Condition, ConditionalFunction};
use crate::declaration::{PageFrontmatter, PrefDeclaration, SelectionMap, split_frontmatter};
use crate::error::{PageError, PrefsError};
use crate::markup::{render_chooser, render_conditional_block};
use crate::option_set::OptionSetCatalog;
use crate::payload::ClientPayload;
use crate::placeholder::{PageOptions, resolve_page_options};
use crate::resolve::{ResolvedPref, resolve_page_prefs};

/// Prefix of conditional function references.
pub const CONDITION_REF_PREFIX: &str = "if-";

/// Markdoc-style opening tag of a conditional block: `{% if <expr> %}`.
static IF_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{%\s*if\s+(.+?)\s*%\}").unwrap());

/// Compiles pages against a shared option-set catalog.
#[derive(Debug, Clone, Copy)]
pub struct PageCompiler<'a> {
    catalog: &'a OptionSetCatalog,
}

impl<'a> PageCompiler<'a> {
    /// Create a compiler for a catalog.
    #[must_use]
    pub fn new(catalog: &'a OptionSetCatalog) -> Self {
        Self { catalog }
    }

    /// Compile a markdown page, reading declarations from its frontmatter.
    ///
    /// Every `{% if <expr> %}` tag in the body is registered as a condition
    /// in document order.
    ///
    /// # Errors
    ///
    /// Returns [`PageError`] wrapping the first frontmatter, resolution or
    /// condition failure.
    pub fn compile_markdown(&self, path: &Path, markdown: &str) -> Result<CompiledPage, PageError> {
        let origin = path.display().to_string();
        let frontmatter = PageFrontmatter::from_markdown(&origin, markdown)
            .map_err(|e| PageError::new(path, e))?;
        let body = split_frontmatter(markdown).map_or(markdown, |(_, body)| body);

        let mut page = self.compile(path, frontmatter.page_preferences)?;
        for captures in IF_TAG_RE.captures_iter(body) {
            page.add_condition(&captures[1])?;
        }
        Ok(page)
    }

    /// Compile a page from its declarations.
    ///
    /// # Errors
    ///
    /// Returns [`PageError`] wrapping the first resolution failure.
    pub fn compile(
        &self,
        path: &Path,
        declarations: Vec<PrefDeclaration>,
    ) -> Result<CompiledPage, PageError> {
        let options = resolve_page_options(&declarations, self.catalog)
            .map_err(|e| PageError::new(path, e))?;

        let mut defaults = SelectionMap::new();
        let resolved = resolve_page_prefs(&declarations, &options.catalog, &mut defaults)
            .map_err(|e| PageError::new(path, e))?;

        tracing::info!(
            page = %path.display(),
            preferences = declarations.len(),
            options_sets = options.catalog.len(),
            "Compiled page preferences"
        );

        Ok(CompiledPage {
            path: path.to_path_buf(),
            declarations,
            options,
            defaults,
            resolved,
            functions: BTreeMap::new(),
        })
    }
}

/// A page whose preferences passed validation.
#[derive(Debug, Clone)]
pub struct CompiledPage {
    path: PathBuf,
    declarations: Vec<PrefDeclaration>,
    options: PageOptions,
    defaults: SelectionMap,
    resolved: Vec<ResolvedPref>,
    functions: BTreeMap<String, ConditionalFunction>,
}

impl CompiledPage {
    /// Path of the page.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ordered preference declarations.
    #[must_use]
    pub fn declarations(&self) -> &[PrefDeclaration] {
        &self.declarations
    }

    /// Narrowed catalog and applicable sets per declaration.
    #[must_use]
    pub fn options(&self) -> &PageOptions {
        &self.options
    }

    /// Default selection.
    #[must_use]
    pub fn defaults(&self) -> &SelectionMap {
        &self.defaults
    }

    /// Preferences resolved against the default selection.
    #[must_use]
    pub fn resolved_prefs(&self) -> &[ResolvedPref] {
        &self.resolved
    }

    /// Registered conditional functions keyed by reference.
    #[must_use]
    pub fn functions(&self) -> &BTreeMap<String, ConditionalFunction> {
        &self.functions
    }

    /// Compile a conditional expression and return its reference ID.
    ///
    /// References are assigned in registration order (`if-0`, `if-1`, ...).
    /// The function is resolved against the default selection.
    ///
    /// # Errors
    ///
    /// Returns [`PageError`] if the expression does not parse or references
    /// a preference the page does not declare.
    pub fn add_condition(&mut self, expression: &str) -> Result<String, PageError> {
        let condition = Condition::parse(expression).map_err(|source| {
            self.error(PrefsError::InvalidCondition {
                expression: expression.to_owned(),
                source,
            })
        })?;

        if let Some(unknown) = condition
            .variables()
            .into_iter()
            .find(|name| !self.declarations.iter().any(|d| d.identifier == *name))
        {
            return Err(self.error(PrefsError::Validation(format!(
                "condition '{expression}' references undeclared page preference '{unknown}'"
            ))));
        }

        let reference = format!("{CONDITION_REF_PREFIX}{}", self.functions.len());
        let function = ConditionalFunction::new(reference.clone(), condition, &self.defaults);
        self.functions.insert(reference.clone(), function);
        Ok(reference)
    }

    /// Wrap a content block in the markup for a registered condition.
    ///
    /// Returns `None` for an unknown reference.
    #[must_use]
    pub fn render_block(&self, reference: &str, body: &str) -> Option<String> {
        self.functions
            .get(reference)
            .map(|function| render_conditional_block(function, body))
    }

    /// Selection control HTML for the default selection.
    #[must_use]
    pub fn chooser_html(&self) -> String {
        render_chooser(&self.resolved)
    }

    /// Client payload for the page.
    #[must_use]
    pub fn payload(&self) -> ClientPayload {
        ClientPayload {
            catalog: self.options.catalog.clone(),
            declarations: self.declarations.clone(),
            selections: self.defaults.clone(),
            functions: self.functions.clone(),
        }
    }

    fn error(&self, source: PrefsError) -> PageError {
        PageError::new(&self.path, source)
    }
}
