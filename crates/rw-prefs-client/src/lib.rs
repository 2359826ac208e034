//! Client-side preference reconciliation for RW pages.
//!
//! Pages compiled with `rw-prefs` embed a [`ClientPayload`](rw_prefs::ClientPayload)
//! and render the default variant with the chooser and content hidden. The
//! [`Reconciler`] rehydrates that payload, applies stored and URL
//! preferences, and keeps the selection, visible content, navigation index,
//! URL and storage consistent after every selection change.
//!
//! The document, storage and URL are reached through the [`RenderSurface`],
//! [`KeyValueStore`] and [`Location`] traits. In-memory implementations
//! ([`MemorySurface`], [`MemoryStore`], [`MemoryLocation`]) are provided.

mod error;
mod location;
mod reconciler;
mod storage;
mod surface;
mod toc;

pub use error::ClientError;
pub use location::{Location, MemoryLocation, PageUrl};
pub use reconciler::{ClientConfig, InteractionTarget, Reconciler};
pub use storage::{
    DEFAULT_STORAGE_KEY, KeyValueStore, MemoryStore, StoredPrefs, load_stored_prefs,
    save_stored_prefs,
};
pub use surface::{Element, Heading, MemorySurface, NodeId, RenderSurface};
pub use toc::{TocEntry, render_toc, visible_headings};
