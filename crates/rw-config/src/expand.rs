//! Environment variable expansion for configuration strings.

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references in a string.
///
/// An unset variable without a default is an error naming `field`. Bare
/// `$VAR` is left as is.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |var| -> Result<Option<String>, UnsetVar> {
        std::env::var(var).map(Some).map_err(|_| UnsetVar {
            name: var.to_owned(),
        })
    })
    .map(std::borrow::Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{}}} not set", e.cause.name),
    })
}

struct UnsetVar {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("RW_PREFS_TEST_DIR", "shared");
        }
        let result = expand_env("${RW_PREFS_TEST_DIR}/options", "preferences.options_dir").unwrap();
        assert_eq!(result, "shared/options");
        unsafe {
            std::env::remove_var("RW_PREFS_TEST_DIR");
        }
    }

    #[test]
    fn test_expand_default_for_unset_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("RW_PREFS_UNSET_TEST");
        }
        let result = expand_env("${RW_PREFS_UNSET_TEST:-docs}", "preferences.content_dir").unwrap();
        assert_eq!(result, "docs");
    }

    #[test]
    fn test_expand_missing_var_names_field() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("RW_PREFS_MISSING_TEST");
        }
        let err = expand_env("${RW_PREFS_MISSING_TEST}", "client.payload_id").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        let message = err.to_string();
        assert!(message.contains("RW_PREFS_MISSING_TEST"));
        assert!(message.contains("client.payload_id"));
    }

    #[test]
    fn test_literal_unchanged() {
        assert_eq!(expand_env("rw-chooser", "client.chooser_id").unwrap(), "rw-chooser");
        assert_eq!(expand_env("$HOME", "client.chooser_id").unwrap(), "$HOME");
    }
}
