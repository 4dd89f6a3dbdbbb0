//! Layered configuration for the search engine.
//!
//! ```rust,no_run
//! use tool_search::config::{EnvConfigSource, FileConfigSource, LayeredConfigSource, SearchConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = LayeredConfigSource::new()
//!     .source(Box::new(EnvConfigSource::new()))
//!     .source(Box::new(FileConfigSource::new("tool-search.json")));
//! let config = SearchConfig::from_source(&source).await?;
//! # Ok(())
//! # }
//! ```

pub mod env;
pub mod file;
pub mod layered;
pub mod memory;
pub mod settings;
pub mod source;

pub use env::EnvConfigSource;
pub use file::FileConfigSource;
pub use layered::LayeredConfigSource;
pub use memory::MemoryConfigSource;
pub use settings::{CacheSettings, SearchConfig};
pub use source::{ConfigSource, ConfigSourceExt};

use thiserror::Error;

/// Errors that can occur while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment error: {0}")]
    Env(#[from] std::env::VarError),

    #[error("{0}")]
    ValidationErrors(ValidationErrors),
}

impl ConfigError {
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug)]
pub struct ValidationErrors(pub Vec<ConfigError>);

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Validation failed: ")?;
        let msgs: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", msgs.join("; "))
    }
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Serde adapter storing a [`std::time::Duration`] as whole milliseconds.
pub mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::invalid("cache.search_ttl_ms", "must be greater than zero");
        assert_eq!(
            err.to_string(),
            "Invalid value for cache.search_ttl_ms: must be greater than zero"
        );
    }

    #[test]
    fn test_validation_errors_display() {
        let err = ConfigError::ValidationErrors(ValidationErrors(vec![
            ConfigError::invalid("a", "bad"),
            ConfigError::invalid("b", "worse"),
        ]));
        assert_eq!(
            err.to_string(),
            "Validation failed: Invalid value for a: bad; Invalid value for b: worse"
        );
    }
}
