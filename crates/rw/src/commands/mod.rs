//! CLI command implementations.

pub(crate) mod prefs;

pub(crate) use prefs::PrefsCommand;
