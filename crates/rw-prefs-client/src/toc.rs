//! Navigation index built from visible headings.

use rw_prefs::escape_html;

use crate::surface::{NodeId, RenderSurface};

/// Table of contents entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TocEntry {
    /// Heading level (2 or 3).
    pub level: u8,
    /// Heading text.
    pub title: String,
    /// Anchor ID.
    pub id: String,
}

/// Collect `h2`/`h3` headings of a region that are not hidden directly or
/// through any ancestor.
pub fn visible_headings<S: RenderSurface + ?Sized>(surface: &S, region: NodeId) -> Vec<TocEntry> {
    surface
        .headings(region)
        .into_iter()
        .filter(|heading| !surface.is_hidden(heading.node))
        .map(|heading| TocEntry {
            level: heading.level,
            title: heading.text,
            id: heading.id,
        })
        .collect()
}

/// Render entries as nested lists: `h3` entries nest under the preceding
/// `h2`. Leading `h3` entries stay at the top level.
#[must_use]
pub fn render_toc(entries: &[TocEntry]) -> String {
    let mut html = String::from("<ul>");
    let mut item_open = false;
    let mut nested_open = false;

    for entry in entries {
        let nested = entry.level > 2 && item_open;
        if nested {
            if !nested_open {
                html.push_str("<ul>");
                nested_open = true;
            }
        } else {
            if nested_open {
                html.push_str("</ul>");
                nested_open = false;
            }
            if item_open {
                html.push_str("</li>");
            }
        }

        let link = format!(
            r##"<a href="#{}">{}</a>"##,
            escape_html(&entry.id),
            escape_html(&entry.title)
        );
        if entry.level > 2 {
            html.push_str(&format!("<li>{link}</li>"));
        } else {
            html.push_str(&format!("<li>{link}"));
            item_open = true;
        }
    }

    if nested_open {
        html.push_str("</ul>");
    }
    if item_open {
        html.push_str("</li>");
    }
    html.push_str("</ul>");
    html
}
