//! `rw prefs payload` command implementation.

use std::path::PathBuf;

use clap::Args;
use rw_config::ClientConfig;
use rw_prefs::markup::HIDDEN_CLASS;
use rw_prefs::{CompiledPage, PrefsError, escape_html, escape_script_json};

use super::{SourceArgs, compile_page};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the payload command.
#[derive(Args)]
pub(crate) struct PayloadArgs {
    /// Page to compile.
    page: PathBuf,

    /// Write the fragment to a file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    source: SourceArgs,
}

impl PayloadArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let (config, catalog) = self.source.load()?;
        let page = compile_page(&catalog, &self.page)?;
        let fragment = render_fragment(&page, &config.client)?;

        match &self.output {
            Some(path) => {
                std::fs::write(path, &fragment)?;
                output.success(&format!("Payload written to {}", path.display()));
            }
            None => output.data(&fragment)?,
        }
        Ok(())
    }
}

/// Hidden chooser container followed by the embedded payload script tag.
///
/// The chooser stays hidden until the client applies stored and URL
/// overrides.
pub(crate) fn render_fragment(page: &CompiledPage, client: &ClientConfig) -> Result<String, PrefsError> {
    let json = page.payload().to_json()?;
    let mut html = String::new();
    html.push_str(&format!(
        r#"<div id="{}" class="{HIDDEN_CLASS}">{}</div>"#,
        escape_html(&client.chooser_id),
        page.chooser_html()
    ));
    html.push('\n');
    html.push_str(&format!(
        r#"<script type="application/json" id="{}">{}</script>"#,
        escape_html(&client.payload_id),
        escape_script_json(&json)
    ));
    Ok(html)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use rw_prefs::{ClientPayload, OptionSetCatalog, PageCompiler, PrefOption};

    use super::*;

    const PAGE: &str = "---
page_preferences:
  - identifier: os
    options_source: os_options
---
{% if equals($os, \"mac\") %}
</script>
{% /if %}
";

    fn compiled() -> CompiledPage {
        let catalog = OptionSetCatalog::new()
            .with_set(
                "os_options",
                vec![
                    PrefOption::new("linux").with_default(),
                    PrefOption::new("mac").with_display_name("mac</script>"),
                ],
            )
            .unwrap();
        PageCompiler::new(&catalog)
            .compile_markdown(Path::new("install.md"), PAGE)
            .unwrap()
    }

    #[test]
    fn test_render_fragment_wraps_hidden_chooser() {
        let html = render_fragment(&compiled(), &ClientConfig::default()).unwrap();
        assert!(html.starts_with(r#"<div id="rw-chooser" class="rw-hidden"><div class="rw-prefs">"#));
        assert!(html.contains(r#"<script type="application/json" id="rw-prefs-payload">"#));
    }

    #[test]
    fn test_render_fragment_payload_cannot_close_script() {
        let html = render_fragment(&compiled(), &ClientConfig::default()).unwrap();
        let (_, script) = html.split_once(r#"id="rw-prefs-payload">"#).unwrap();
        let json = script.strip_suffix("</script>").unwrap();
        assert!(!json.contains("</"));

        let payload = ClientPayload::from_json(&json.replace(r"<\/", "</")).unwrap();
        assert_eq!(payload.selections["os"], "linux");
        assert!(payload.functions.contains_key("if-0"));
    }
}
