//! Server configuration from the environment

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GENERATED_PDF_TTL_SECS: u64 = 86_400;
/// Request bodies carry whole PDFs as base64, plus signature images
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Deployment mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    pub fn is_development(&self) -> bool {
        *self == Environment::Development
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    pub environment: Environment,
    /// Fillable test report form; reports fall back to the reference sheet
    /// when unset or unreadable
    pub tceq_template_path: Option<PathBuf>,
    /// How long generated reports stay downloadable
    pub generated_pdf_ttl: Duration,
    /// Largest accepted request body
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            environment: Environment::Development,
            tceq_template_path: None,
            generated_pdf_ttl: Duration::from_secs(DEFAULT_GENERATED_PDF_TTL_SECS),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from any variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let port = match get("PORT") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                expected: "a port number",
                value,
            })?,
            None => DEFAULT_PORT,
        };

        let environment = match get("APP_ENV").as_deref().map(str::trim) {
            None | Some("development") | Some("dev") => Environment::Development,
            Some("production") | Some("prod") => Environment::Production,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "APP_ENV",
                    expected: "development or production",
                    value: other.to_string(),
                })
            }
        };

        let ttl_secs = match get("GENERATED_PDF_TTL_SECS") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "GENERATED_PDF_TTL_SECS",
                expected: "a number of seconds",
                value,
            })?,
            None => DEFAULT_GENERATED_PDF_TTL_SECS,
        };

        let max_body_bytes = match get("MAX_REQUEST_BODY_BYTES") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "MAX_REQUEST_BODY_BYTES",
                expected: "a number of bytes",
                value,
            })?,
            None => DEFAULT_MAX_BODY_BYTES,
        };

        Ok(Self {
            port,
            environment,
            tceq_template_path: get("TCEQ_TEMPLATE_PATH").map(PathBuf::from),
            generated_pdf_ttl: Duration::from_secs(ttl_secs),
            max_body_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        assert_eq!(config(&[]).unwrap(), Config::default());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("PORT", "8080"),
            ("APP_ENV", "production"),
            ("TCEQ_TEMPLATE_PATH", "/srv/forms/TCEQ.pdf"),
            ("GENERATED_PDF_TTL_SECS", "60"),
            ("MAX_REQUEST_BODY_BYTES", "1048576"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(
            config.tceq_template_path,
            Some(PathBuf::from("/srv/forms/TCEQ.pdf"))
        );
        assert_eq!(config.generated_pdf_ttl, Duration::from_secs(60));
        assert_eq!(config.max_body_bytes, 1_048_576);
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = config(&[("PORT", " "), ("TCEQ_TEMPLATE_PATH", "")]).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.tceq_template_path, None);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            config(&[("PORT", "eighty")]),
            Err(ConfigError::Invalid { name: "PORT", .. })
        ));
        assert!(matches!(
            config(&[("APP_ENV", "staging")]),
            Err(ConfigError::Invalid { name: "APP_ENV", .. })
        ));
        assert!(matches!(
            config(&[("MAX_REQUEST_BODY_BYTES", "lots")]),
            Err(ConfigError::Invalid {
                name: "MAX_REQUEST_BODY_BYTES",
                ..
            })
        ));
    }
}
