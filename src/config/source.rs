//! Configuration source trait.

use serde::de::DeserializeOwned;

use super::{ConfigError, ConfigResult};

/// Read-only key/value configuration source.
///
/// Keys use dot notation (`cache.search_ttl_ms`).
#[async_trait::async_trait]
pub trait ConfigSource: Send + Sync {
    /// Source name for logging.
    fn name(&self) -> &str;

    async fn get_raw(&self, key: &str) -> ConfigResult<Option<String>>;

    /// Keys starting with `prefix`.
    async fn list_keys(&self, prefix: &str) -> ConfigResult<Vec<String>>;
}

/// Typed access on top of [`ConfigSource::get_raw`].
pub trait ConfigSourceExt: ConfigSource {
    /// Parse a value as JSON, falling back to a bare JSON string so
    /// unquoted environment values deserialize into `String`.
    fn get<T: DeserializeOwned + Send>(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = ConfigResult<Option<T>>> + Send
    where
        Self: Sync,
    {
        async move {
            let Some(raw) = self.get_raw(key).await? else {
                return Ok(None);
            };
            let trimmed = raw.trim();
            serde_json::from_str(trimmed)
                .or_else(|_| serde_json::from_value(serde_json::Value::String(trimmed.to_string())))
                .map(Some)
                .map_err(|e| ConfigError::invalid(key, e.to_string()))
        }
    }
}

impl<S: ConfigSource + ?Sized> ConfigSourceExt for S {}
