//! Content preference resolution for RW.
//!
//! Pages can declare *preferences* (operating system, language, package
//! manager, ...) in their frontmatter. Each preference picks its values from
//! an options set, and an options set ID may contain `<PLACEHOLDER>`
//! segments so that later preferences depend on earlier ones:
//!
//! ```yaml
//! page_preferences:
//!   - identifier: os
//!     options_source: os_options
//!   - identifier: installer
//!     options_source: <OS>_installer
//! ```
//!
//! Build-time pipeline:
//!
//! 1. [`OptionSetCatalog::load_dir`] loads every options set.
//! 2. [`resolve_page_options`] validates a page's declarations and narrows
//!    the catalog to the sets the page can reach.
//! 3. [`resolve_page_prefs`] fixes each preference's value for a selection,
//!    cascading changes into later preferences.
//! 4. [`PageCompiler`] ties these together, compiles conditional content
//!    expressions and emits the [`ClientPayload`] embedded in the page.
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//!
//! use rw_prefs::{OptionSetCatalog, OptionSource, PageCompiler};
//!
//! let catalog = OptionSetCatalog::load_all(&[OptionSource::new(
//!     "options.yaml",
//!     "os_options:\n  - identifier: linux\n    default: true\n  - identifier: mac\n",
//! )])
//! .unwrap();
//!
//! let markdown = "---\npage_preferences:\n  - identifier: os\n    options_source: os_options\n---\n";
//! let mut page = PageCompiler::new(&catalog)
//!     .compile_markdown(Path::new("install.md"), markdown)
//!     .unwrap();
//!
//! assert_eq!(page.defaults()["os"], "linux");
//! assert_eq!(page.add_condition(r#"equals($os, "mac")"#).unwrap(), "if-0");
//! ```

mod condition;
mod declaration;
mod error;
mod html;
pub mod markup;
mod option_set;
mod page;
mod payload;
mod placeholder;
mod resolve;

pub use condition::{
    Condition, ConditionParseError, ConditionalFunction, MAX_NESTING_DEPTH, Value,
};
pub use declaration::{PageFrontmatter, PrefDeclaration, SelectionMap, split_frontmatter};
pub use error::{PageError, PrefsError};
pub use html::{escape_html, escape_script_json};
pub use option_set::{OptionSet, OptionSetCatalog, OptionSource, PrefOption, flagged_default};
pub use page::{CONDITION_REF_PREFIX, CompiledPage, PageCompiler};
pub use payload::{ClientPayload, MinifiedPayload};
pub use placeholder::{
    DeclarationOptions, PageOptions, SEGMENT_SEPARATOR, Segment, build_combinations,
    has_placeholders, parse_segments, resolve_page_options, substitute_selection,
};
pub use resolve::{ResolvedPref, default_selections, resolve_page_prefs};
