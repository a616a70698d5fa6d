//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::MockProxyConfig;
use crate::config::validation::ValidationError;

/// Error type for configuration loading and startup wiring.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
    Upstream(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
            ConfigError::Upstream(e) => write!(f, "Upstream client error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parse a TOML config file.
///
/// Validation runs later, after command-line overrides are applied.
pub fn load_config(path: &Path) -> Result<MockProxyConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    toml::from_str(&content).map_err(ConfigError::Parse)
}
