//! Environment variable interpolation for config files.
//!
//! - `$VAR` / `${VAR}`: value of VAR, error if unset
//! - `${VAR:-default}`: default if VAR is unset or empty
//! - `${VAR-default}`: default only if VAR is unset
//! - `$$`: a literal `$`

use regex::{Captures, Regex};
use std::env;
use std::sync::LazyLock;

static VAR_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\$\$|\$\{(?P<braced>[A-Za-z_][A-Za-z0-9_]*)(?:(?P<op>:?-)(?P<default>[^}]*))?\}|\$(?P<bare>[A-Za-z_][A-Za-z0-9_]*)",
    )
    .expect("variable reference pattern is valid")
});

/// Output of [`interpolate`].
#[derive(Debug)]
pub struct InterpolationResult {
    pub text: String,
    /// Every problem found, so all missing variables are reported at once.
    pub errors: Vec<String>,
}

impl InterpolationResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Substitute environment variable references in `input`.
pub fn interpolate(input: &str) -> InterpolationResult {
    let mut errors = Vec::new();

    let text = VAR_REFERENCE
        .replace_all(input, |caps: &Captures| {
            let whole = &caps[0];
            if whole == "$$" {
                return "$".to_string();
            }

            let Some(name) = caps.name("braced").or_else(|| caps.name("bare")) else {
                return whole.to_string();
            };
            let name = name.as_str();
            let op = caps.name("op").map(|m| m.as_str());
            let default = caps.name("default").map(|m| m.as_str());

            match (env::var(name), default) {
                (Ok(value), _) if value.contains(['\n', '\r']) => {
                    errors.push(format!("environment variable '{name}' contains a newline"));
                    whole.to_string()
                }
                (Ok(value), Some(default)) if value.is_empty() && op == Some(":-") => {
                    default.to_string()
                }
                (Ok(value), _) => value,
                (Err(_), Some(default)) => default.to_string(),
                (Err(_), None) => {
                    errors.push(format!("environment variable '{name}' is not set"));
                    whole.to_string()
                }
            }
        })
        .into_owned();

    InterpolationResult { text, errors }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_env<R>(key: &str, value: Option<&str>, f: impl FnOnce() -> R) -> R {
        let original = env::var(key).ok();
        // SAFETY: each test uses its own variable name and restores it afterwards
        unsafe {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
        let result = f();
        unsafe {
            match original {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
        result
    }

    #[test]
    fn test_bare_and_braced() {
        with_env("SLOTCAST_TEST_BUCKET", Some("slots"), || {
            let result = interpolate("s3://$SLOTCAST_TEST_BUCKET/${SLOTCAST_TEST_BUCKET}");
            assert!(result.is_ok());
            assert_eq!(result.text, "s3://slots/slots");
        });
    }

    #[test]
    fn test_missing_variable_is_reported() {
        with_env("SLOTCAST_TEST_ROLE", None, || {
            let result = interpolate("role_arn: ${SLOTCAST_TEST_ROLE}");
            assert!(!result.is_ok());
            assert!(result.errors[0].contains("SLOTCAST_TEST_ROLE"));
        });
    }

    #[test]
    fn test_defaults() {
        with_env("SLOTCAST_TEST_EMPTY", Some(""), || {
            assert_eq!(interpolate("${SLOTCAST_TEST_EMPTY:-eu}").text, "eu");
            assert_eq!(interpolate("${SLOTCAST_TEST_EMPTY-eu}").text, "");
        });
        with_env("SLOTCAST_TEST_UNSET", None, || {
            assert_eq!(interpolate("${SLOTCAST_TEST_UNSET-eu}").text, "eu");
        });
    }

    #[test]
    fn test_escape() {
        assert_eq!(interpolate("cost: $$5").text, "cost: $5");
    }
}
