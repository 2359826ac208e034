//! HTML helpers.

/// Escape HTML special characters.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

/// Escape JSON for embedding inside a `<script>` element.
///
/// Only `</` needs rewriting: `<\/` is an equivalent JSON string escape but
/// cannot close the element.
#[must_use]
pub fn escape_script_json(json: &str) -> String {
    json.replace("</", r"<\/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<script>"), "&lt;script&gt;");
        assert_eq!(escape_html("a & b"), "a &amp; b");
        assert_eq!(escape_html(r#""quoted""#), "&quot;quoted&quot;");
        assert_eq!(escape_html("it's"), "it&#x27;s");
    }

    #[test]
    fn test_escape_script_json() {
        assert_eq!(
            escape_script_json(r#"{"n":"</script>"}"#),
            r#"{"n":"<\/script>"}"#
        );
        let parsed: serde_json::Value =
            serde_json::from_str(&escape_script_json(r#"{"n":"</b>"}"#)).unwrap();
        assert_eq!(parsed["n"], "</b>");
    }
}
