//! Client-facing markup.
//!
//! The chooser lists every resolved preference with one pill per option.
//! Pills carry the preference and option IDs so the client can tell which
//! choice was clicked:
//!
//! ```html
//! <div class="rw-prefs">
//!   <div class="rw-pref" data-pref-id="os">
//!     <span class="rw-pref__label">Operating system</span>
//!     <div class="rw-pref__options">
//!       <button type="button" class="rw-pref__pill rw-pref__pill--selected"
//!               data-pref-id="os" data-option-id="linux" aria-pressed="true">Linux</button>
//!       <button type="button" class="rw-pref__pill"
//!               data-pref-id="os" data-option-id="mac" aria-pressed="false">macOS</button>
//!     </div>
//!   </div>
//! </div>
//! ```

use crate::condition::ConditionalFunction;
use crate::html::escape_html;
use crate::resolve::ResolvedPref;

/// Class of a selectable option pill.
pub const PREF_PILL_CLASS: &str = "rw-pref__pill";
/// Modifier class of the pill matching the current value.
pub const PREF_PILL_SELECTED_CLASS: &str = "rw-pref__pill--selected";
/// Attribute holding the preference ID on a pill.
pub const PREF_ID_ATTR: &str = "data-pref-id";
/// Attribute holding the option ID on a pill.
pub const OPTION_ID_ATTR: &str = "data-option-id";
/// Class of content blocks whose visibility depends on a condition.
pub const TOGGLEABLE_CLASS: &str = "rw-toggleable";
/// Marker class of a hidden block.
pub const HIDDEN_CLASS: &str = "rw-hidden";
/// Attribute holding a block's conditional function reference.
pub const CONDITIONAL_REF_ATTR: &str = "data-if";

/// Wrap a conditional content block.
///
/// The block starts hidden when the function is false for the selection it
/// was resolved against.
#[must_use]
pub fn render_conditional_block(function: &ConditionalFunction, body: &str) -> String {
    let class = if function.value {
        TOGGLEABLE_CLASS.to_owned()
    } else {
        format!("{TOGGLEABLE_CLASS} {HIDDEN_CLASS}")
    };
    format!(
        r#"<div class="{class}" {CONDITIONAL_REF_ATTR}="{}">{body}</div>"#,
        escape_html(&function.reference)
    )
}

/// Render the selection control for resolved preferences.
///
/// Pages without preferences render an empty string.
#[must_use]
pub fn render_chooser(prefs: &[ResolvedPref]) -> String {
    if prefs.is_empty() {
        return String::new();
    }

    let mut output = String::with_capacity(prefs.len() * 256);
    output.push_str(r#"<div class="rw-prefs">"#);

    for pref in prefs {
        let pref_id = escape_html(&pref.identifier);
        output.push_str(&format!(
            r#"<div class="rw-pref" {PREF_ID_ATTR}="{pref_id}"><span class="rw-pref__label">{}</span><div class="rw-pref__options">"#,
            escape_html(&pref.display_name)
        ));

        for option in &pref.options {
            let selected = option.identifier == pref.current_value;
            let class = if selected {
                format!("{PREF_PILL_CLASS} {PREF_PILL_SELECTED_CLASS}")
            } else {
                PREF_PILL_CLASS.to_owned()
            };
            output.push_str(&format!(
                r#"<button type="button" class="{class}" {PREF_ID_ATTR}="{pref_id}" {OPTION_ID_ATTR}="{}" aria-pressed="{selected}">{}</button>"#,
                escape_html(&option.identifier),
                escape_html(option.label())
            ));
        }

        output.push_str("</div></div>");
    }

    output.push_str("</div>");
    output
}
