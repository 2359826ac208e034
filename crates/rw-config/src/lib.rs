//! Configuration management for RW preferences.
//!
//! Parses `rw.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `preferences.options_dir`
//! - `preferences.content_dir`
//! - `client.chooser_id`
//! - `client.payload_id`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override option-set directory.
    pub options_dir: Option<PathBuf>,
    /// Override content directory.
    pub content_dir: Option<PathBuf>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "rw.toml";

const DEFAULT_OPTIONS_DIR: &str = "preferences/options";
const DEFAULT_CONTENT_DIR: &str = "docs";
const DEFAULT_EXTENSIONS: [&str; 2] = ["md", "mdoc"];

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Preference sources (paths are relative strings from TOML).
    preferences: PreferencesConfigRaw,
    /// Client markup configuration.
    pub client: ClientConfig,

    /// Resolved preferences configuration (set after loading).
    #[serde(skip)]
    pub preferences_resolved: PreferencesConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Raw preferences configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct PreferencesConfigRaw {
    options_dir: Option<String>,
    content_dir: Option<String>,
    extensions: Option<Vec<String>>,
}

/// Resolved preferences configuration with absolute paths.
#[derive(Debug, Default)]
pub struct PreferencesConfig {
    /// Directory holding option-set YAML files.
    pub options_dir: PathBuf,
    /// Directory holding pages.
    pub content_dir: PathBuf,
    /// Page file extensions, without the leading dot.
    pub extensions: Vec<String>,
}

impl PreferencesConfig {
    /// Glob patterns matching every page under the content directory.
    #[must_use]
    pub fn page_patterns(&self) -> Vec<String> {
        self.extensions
            .iter()
            .map(|ext| {
                self.content_dir
                    .join("**")
                    .join(format!("*.{ext}"))
                    .to_string_lossy()
                    .into_owned()
            })
            .collect()
    }
}

/// DOM ids of the markup emitted for the client.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Id of the pre-rendered chooser container.
    pub chooser_id: String,
    /// Id of the `<script>` tag carrying the embedded payload.
    pub payload_id: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            chooser_id: "rw-chooser".to_owned(),
            payload_id: "rw-prefs-payload".to_owned(),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`preferences.options_dir`").
        field: String,
        /// Error message (e.g., "${`OPTIONS_DIR`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a DOM id: non-empty, no whitespace.
fn require_dom_id(value: &str, field: &str) -> Result<(), ConfigError> {
    require_non_empty(value, field)?;
    if value.chars().any(char::is_whitespace) {
        return Err(ConfigError::Validation(format!(
            "{field} cannot contain whitespace"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `rw.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(options_dir) = &settings.options_dir {
            self.preferences_resolved.options_dir.clone_from(options_dir);
        }
        if let Some(content_dir) = &settings.content_dir {
            self.preferences_resolved.content_dir.clone_from(content_dir);
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        Self::discover_config_from(&current)
    }

    fn discover_config_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            preferences: PreferencesConfigRaw::default(),
            client: ClientConfig::default(),
            preferences_resolved: PreferencesConfig {
                options_dir: base.join(DEFAULT_OPTIONS_DIR),
                content_dir: base.join(DEFAULT_CONTENT_DIR),
                extensions: DEFAULT_EXTENSIONS.map(str::to_owned).to_vec(),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_preferences()?;
        self.validate_client()?;
        Ok(())
    }

    fn validate_preferences(&self) -> Result<(), ConfigError> {
        let extensions = &self.preferences_resolved.extensions;
        if extensions.is_empty() {
            return Err(ConfigError::Validation(
                "preferences.extensions cannot be empty".to_owned(),
            ));
        }
        for ext in extensions {
            require_non_empty(ext, "preferences.extensions entry")?;
        }
        Ok(())
    }

    fn validate_client(&self) -> Result<(), ConfigError> {
        require_dom_id(&self.client.chooser_id, "client.chooser_id")?;
        require_dom_id(&self.client.payload_id, "client.payload_id")?;
        if self.client.chooser_id == self.client.payload_id {
            return Err(ConfigError::Validation(
                "client.chooser_id and client.payload_id must differ".to_owned(),
            ));
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref dir) = self.preferences.options_dir {
            self.preferences.options_dir =
                Some(expand::expand_env(dir, "preferences.options_dir")?);
        }
        if let Some(ref dir) = self.preferences.content_dir {
            self.preferences.content_dir =
                Some(expand::expand_env(dir, "preferences.content_dir")?);
        }
        self.client.chooser_id = expand::expand_env(&self.client.chooser_id, "client.chooser_id")?;
        self.client.payload_id = expand::expand_env(&self.client.payload_id, "client.payload_id")?;
        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        let extensions = match &self.preferences.extensions {
            Some(extensions) => extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_owned())
                .collect(),
            None => DEFAULT_EXTENSIONS.map(str::to_owned).to_vec(),
        };

        self.preferences_resolved = PreferencesConfig {
            options_dir: resolve(self.preferences.options_dir.as_deref(), DEFAULT_OPTIONS_DIR),
            content_dir: resolve(self.preferences.content_dir.as_deref(), DEFAULT_CONTENT_DIR),
            extensions,
        };
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/test"));
        assert_eq!(
            config.preferences_resolved.options_dir,
            PathBuf::from("/test/preferences/options")
        );
        assert_eq!(
            config.preferences_resolved.content_dir,
            PathBuf::from("/test/docs")
        );
        assert_eq!(config.preferences_resolved.extensions, vec!["md", "mdoc"]);
        assert_eq!(config.client.chooser_id, "rw-chooser");
        assert_eq!(config.client.payload_id, "rw-prefs-payload");
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.client.chooser_id, "rw-chooser");
        assert!(config.preferences.options_dir.is_none());
    }

    #[test]
    fn test_parse_unknown_key_fails() {
        let result: Result<Config, _> = toml::from_str(
            r#"
[preferences]
option_dir = "typo"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_client_config() {
        let toml = r#"
[client]
chooser_id = "prefs"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.client.chooser_id, "prefs");
        assert_eq!(config.client.payload_id, "rw-prefs-payload");
    }

    #[test]
    fn test_resolve_paths() {
        let toml = r#"
[preferences]
options_dir = "shared/options"
content_dir = "content"
extensions = [".md", "markdoc"]
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(
            config.preferences_resolved.options_dir,
            PathBuf::from("/project/shared/options")
        );
        assert_eq!(
            config.preferences_resolved.content_dir,
            PathBuf::from("/project/content")
        );
        assert_eq!(config.preferences_resolved.extensions, vec!["md", "markdoc"]);
    }

    #[test]
    fn test_page_patterns() {
        let config = Config::default_with_base(Path::new("/project"));
        assert_eq!(
            config.preferences_resolved.page_patterns(),
            vec!["/project/docs/**/*.md", "/project/docs/**/*.mdoc"]
        );
    }

    #[test]
    fn test_apply_cli_settings_options_dir() {
        let mut config = Config::default_with_base(Path::new("/test"));
        let overrides = CliSettings {
            options_dir: Some(PathBuf::from("/custom/options")),
            ..Default::default()
        };

        config.apply_cli_settings(&overrides);

        assert_eq!(
            config.preferences_resolved.options_dir,
            PathBuf::from("/custom/options")
        );
        assert_eq!(
            config.preferences_resolved.content_dir,
            PathBuf::from("/test/docs")
        ); // Unchanged
    }

    #[test]
    fn test_apply_cli_settings_content_dir() {
        let mut config = Config::default_with_base(Path::new("/test"));
        let overrides = CliSettings {
            content_dir: Some(PathBuf::from("/custom/docs")),
            ..Default::default()
        };

        config.apply_cli_settings(&overrides);

        assert_eq!(
            config.preferences_resolved.content_dir,
            PathBuf::from("/custom/docs")
        );
    }

    #[test]
    fn test_apply_cli_settings_empty() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.apply_cli_settings(&CliSettings::default());
        assert_eq!(
            config.preferences_resolved.options_dir,
            PathBuf::from("/test/preferences/options")
        );
    }

    #[test]
    fn test_expand_env_vars_preferences() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("TEST_RW_OPTIONS_ROOT", "/srv/options");
            std::env::remove_var("TEST_RW_CONTENT_ROOT");
        }

        let toml = r#"
[preferences]
options_dir = "${TEST_RW_OPTIONS_ROOT}"
content_dir = "${TEST_RW_CONTENT_ROOT:-pages}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.expand_env_vars().unwrap();

        assert_eq!(config.preferences.options_dir.as_deref(), Some("/srv/options"));
        assert_eq!(config.preferences.content_dir.as_deref(), Some("pages"));

        unsafe {
            std::env::remove_var("TEST_RW_OPTIONS_ROOT");
        }
    }

    #[test]
    fn test_expand_env_vars_missing_required_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("MISSING_VAR_CONFIG_TEST");
        }

        let toml = r#"
[client]
payload_id = "${MISSING_VAR_CONFIG_TEST}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        let err = config.expand_env_vars().unwrap_err();

        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("MISSING_VAR_CONFIG_TEST"));
        assert!(err.to_string().contains("client.payload_id"));
    }

    // Validation tests

    /// Assert that validation fails with expected substrings in the error message.
    fn assert_validation_error(config: &Config, expected_substrings: &[&str]) {
        let result = config.validate();
        assert!(result.is_err(), "Expected validation to fail");
        let err = result.unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation(_)),
            "Expected ConfigError::Validation, got {err:?}"
        );
        let msg = err.to_string();
        for s in expected_substrings {
            assert!(
                msg.contains(s),
                "Expected error to contain '{s}', got: {msg}"
            );
        }
    }

    #[test]
    fn test_validate_default_config_passes() {
        let config = Config::default_with_base(Path::new("/test"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_extensions() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.preferences_resolved.extensions.clear();
        assert_validation_error(&config, &["preferences.extensions", "empty"]);
    }

    #[test]
    fn test_validate_chooser_id_empty() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.client.chooser_id = String::new();
        assert_validation_error(&config, &["client.chooser_id", "empty"]);
    }

    #[test]
    fn test_validate_payload_id_whitespace() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.client.payload_id = "rw prefs".to_owned();
        assert_validation_error(&config, &["client.payload_id", "whitespace"]);
    }

    #[test]
    fn test_validate_ids_must_differ() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.client.payload_id = "rw-chooser".to_owned();
        assert_validation_error(&config, &["must differ"]);
    }

    // File loading tests

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rw.toml");
        std::fs::write(
            &path,
            r#"
[preferences]
content_dir = "guides"

[client]
payload_id = "payload"
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path), None).unwrap();
        assert_eq!(
            config.preferences_resolved.content_dir,
            dir.path().join("guides")
        );
        assert_eq!(
            config.preferences_resolved.options_dir,
            dir.path().join("preferences/options")
        );
        assert_eq!(config.client.payload_id, "payload");
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_explicit_path_with_cli_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rw.toml");
        std::fs::write(&path, "").unwrap();

        let settings = CliSettings {
            options_dir: Some(PathBuf::from("/override")),
            ..Default::default()
        };
        let config = Config::load(Some(&path), Some(&settings)).unwrap();
        assert_eq!(
            config.preferences_resolved.options_dir,
            PathBuf::from("/override")
        );
    }

    #[test]
    fn test_load_missing_path() {
        let err = Config::load(Some(Path::new("/nonexistent/rw.toml")), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_invalid_file_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rw.toml");
        std::fs::write(&path, "[preferences]\nextensions = []\n").unwrap();

        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_discover_config_in_parent() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&config_path, "").unwrap();
        let nested = dir.path().join("docs/guides");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(Config::discover_config_from(&nested), Some(config_path));
    }
}
