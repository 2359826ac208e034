//! Page URL handling.
//!
//! Preferences are mirrored into the query string, one parameter per
//! preference. The URL is rewritten in place so that switching options does
//! not grow the browser history.

use std::fmt;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

/// RFC 3986 unreserved characters: A-Z a-z 0-9 - . _ ~
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Access to the current page URL.
pub trait Location {
    /// Full URL of the page.
    fn href(&self) -> String;

    /// Replace the current history entry's URL.
    fn replace_state(&mut self, href: &str);
}

/// In-memory [`Location`] keeping a history stack.
#[derive(Debug, Clone)]
pub struct MemoryLocation {
    history: Vec<String>,
}

impl MemoryLocation {
    /// Create a location with a single history entry.
    #[must_use]
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            history: vec![href.into()],
        }
    }

    /// Number of history entries.
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

impl Location for MemoryLocation {
    fn href(&self) -> String {
        self.history.last().cloned().unwrap_or_default()
    }

    fn replace_state(&mut self, href: &str) {
        match self.history.last_mut() {
            Some(current) => href.clone_into(current),
            None => self.history.push(href.to_owned()),
        }
    }
}

/// A URL split into path, query parameters and fragment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageUrl {
    base: String,
    params: Vec<(String, String)>,
    fragment: Option<String>,
}

impl PageUrl {
    /// Split a URL. Query parameters are percent-decoded.
    #[must_use]
    pub fn parse(href: &str) -> Self {
        let (rest, fragment) = match href.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment.to_owned())),
            None => (href, None),
        };
        let (base, query) = rest.split_once('?').unwrap_or((rest, ""));

        let params = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (decode_component(key), decode_component(value))
            })
            .collect();

        Self {
            base: base.to_owned(),
            params,
            fragment,
        }
    }

    /// First value of a query parameter.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set a query parameter, replacing every existing value.
    ///
    /// An existing parameter keeps its position; a new one is appended.
    pub fn set(&mut self, key: &str, value: &str) {
        let mut found = false;
        self.params.retain_mut(|(k, v)| {
            if k.as_str() != key {
                return true;
            }
            if found {
                return false;
            }
            found = true;
            value.clone_into(v);
            true
        });
        if !found {
            self.params.push((key.to_owned(), value.to_owned()));
        }
    }

    /// Query parameters in order.
    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for PageUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)?;
        for (idx, (key, value)) in self.params.iter().enumerate() {
            let separator = if idx == 0 { '?' } else { '&' };
            write!(
                f,
                "{separator}{}={}",
                utf8_percent_encode(key, QUERY_ENCODE_SET),
                utf8_percent_encode(value, QUERY_ENCODE_SET)
            )?;
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{fragment}")?;
        }
        Ok(())
    }
}

fn decode_component(component: &str) -> String {
    let spaced = component.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}
