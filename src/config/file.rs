//! JSON file configuration source.
//!
//! Nested objects are addressed with dot notation, so
//! `{"cache": {"search_ttl_ms": 1000}}` serves `cache.search_ttl_ms`.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::ConfigResult;
use super::source::ConfigSource;

#[derive(Debug)]
pub struct FileConfigSource {
    path: PathBuf,
    data: RwLock<Option<Map<String, Value>>>,
}

impl FileConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            data: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty source.
    async fn load(&self) -> ConfigResult<Map<String, Value>> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(Map::new());
        }
        let content = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn ensure_loaded(&self) -> ConfigResult<()> {
        if self.data.read().await.is_some() {
            return Ok(());
        }
        let mut data = self.data.write().await;
        if data.is_none() {
            *data = Some(self.load().await?);
        }
        Ok(())
    }

    /// Re-read the file on the next access.
    pub async fn reload(&self) -> ConfigResult<()> {
        let loaded = self.load().await?;
        *self.data.write().await = Some(loaded);
        Ok(())
    }
}

fn lookup<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    let mut parts = key.split('.');
    let first = map.get(parts.next()?)?;
    parts.try_fold(first, |current, part| current.get(part))
}

fn collect_keys(prefix: &str, value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                let key = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{prefix}.{k}")
                };
                collect_keys(&key, v, out);
            }
        }
        _ => out.push(prefix.to_string()),
    }
}

#[async_trait::async_trait]
impl ConfigSource for FileConfigSource {
    fn name(&self) -> &str {
        "file"
    }

    async fn get_raw(&self, key: &str) -> ConfigResult<Option<String>> {
        self.ensure_loaded().await?;
        let data = self.data.read().await;
        let value = data.as_ref().and_then(|map| lookup(map, key));
        Ok(match value {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(v) => Some(v.to_string()),
        })
    }

    async fn list_keys(&self, prefix: &str) -> ConfigResult<Vec<String>> {
        self.ensure_loaded().await?;
        let data = self.data.read().await;
        let mut keys = Vec::new();
        if let Some(map) = data.as_ref() {
            collect_keys("", &Value::Object(map.clone()), &mut keys);
        }
        keys.retain(|k| k.starts_with(prefix));
        keys.sort();
        Ok(keys)
    }
}
