//! Environment variable configuration source.
//!
//! `cache.search_ttl_ms` is read from `TOOL_SEARCH_CACHE_SEARCH_TTL_MS`.

use super::source::ConfigSource;
use super::{ConfigError, ConfigResult};

pub const DEFAULT_PREFIX: &str = "TOOL_SEARCH_";

#[derive(Debug, Clone)]
pub struct EnvConfigSource {
    prefix: String,
}

impl EnvConfigSource {
    pub fn new() -> Self {
        Self::prefixed(DEFAULT_PREFIX)
    }

    pub fn prefixed(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn env_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key.to_uppercase().replace('.', "_"))
    }

    /// Reverse of [`Self::env_key`]. Underscores are ambiguous, so every one
    /// maps back to a dot.
    fn key_from_env(&self, env_name: &str) -> Option<String> {
        env_name
            .strip_prefix(&self.prefix)
            .map(|rest| rest.to_lowercase().replace('_', "."))
    }
}

impl Default for EnvConfigSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ConfigSource for EnvConfigSource {
    fn name(&self) -> &str {
        "env"
    }

    async fn get_raw(&self, key: &str) -> ConfigResult<Option<String>> {
        match std::env::var(self.env_key(key)) {
            Ok(value) => Ok(Some(value)),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(ConfigError::Env(e)),
        }
    }

    async fn list_keys(&self, prefix: &str) -> ConfigResult<Vec<String>> {
        let env_prefix = self.env_key(prefix);
        Ok(std::env::vars()
            .filter(|(k, _)| k.starts_with(&env_prefix))
            .filter_map(|(k, _)| self.key_from_env(&k))
            .collect())
    }
}
