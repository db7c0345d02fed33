//! Key-value memory for scripts.
//!
//! Values are [`serde_json::Value`]s so that anything a script stores
//! round-trips through JSON regardless of the backend.
//!
//! | Backend | Type | Persistence |
//! |---------|------|-------------|
//! | `dict` | [`DictMemory`] | process lifetime |
//! | `json` | [`JsonFileMemory`] | file, rewritten on every save |

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use crate::foundation::MemoryResult;

/// A key-value store.
#[async_trait]
pub trait Memory: Send + Sync + 'static {
    /// Backend name, as used in configuration.
    fn name(&self) -> &'static str;

    /// Prepares the backend (opens files, connects, ...).
    async fn setup(&self) -> MemoryResult<()> {
        Ok(())
    }

    /// Stores `value` under `key`.
    async fn save(&self, key: &str, value: Value) -> MemoryResult<()>;

    /// Returns the value under `key`, or `default` when absent.
    async fn get(&self, key: &str, default: Value) -> MemoryResult<Value>;
}

/// Type alias for a shared memory backend.
pub type BoxedMemory = Arc<dyn Memory>;

impl dyn Memory {
    /// Loads a typed value, or `None` when the key is absent.
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> MemoryResult<Option<T>> {
        match self.get(key, Value::Null).await? {
            Value::Null => Ok(None),
            value => Ok(Some(serde_json::from_value(value)?)),
        }
    }

    /// Stores a typed value.
    pub async fn store<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> MemoryResult<()> {
        self.save(key, serde_json::to_value(value)?).await
    }
}

// ─── Dict ─────────────────────────────────────────────────────────────────────

/// In-process memory.
#[derive(Debug, Default)]
pub struct DictMemory {
    values: RwLock<HashMap<String, Value>>,
}

impl DictMemory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Memory for DictMemory {
    fn name(&self) -> &'static str {
        "dict"
    }

    async fn save(&self, key: &str, value: Value) -> MemoryResult<()> {
        debug!(key, "Saving to dict memory");
        self.values.write().insert(key.to_owned(), value);
        Ok(())
    }

    async fn get(&self, key: &str, default: Value) -> MemoryResult<Value> {
        Ok(self.values.read().get(key).cloned().unwrap_or(default))
    }
}

// ─── JSON file ────────────────────────────────────────────────────────────────

/// Memory persisted to a single JSON object file.
///
/// The file is loaded on [`setup`](Memory::setup) and rewritten after every
/// save.
#[derive(Debug)]
pub struct JsonFileMemory {
    path: PathBuf,
    values: RwLock<serde_json::Map<String, Value>>,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonFileMemory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            values: RwLock::new(serde_json::Map::new()),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Memory for JsonFileMemory {
    fn name(&self) -> &'static str {
        "json"
    }

    async fn setup(&self) -> MemoryResult<()> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if !bytes.is_empty() => {
                let loaded: serde_json::Map<String, Value> = serde_json::from_slice(&bytes)?;
                info!(path = %self.path.display(), keys = loaded.len(), "Loaded memory file");
                *self.values.write() = loaded;
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "Memory file not found, starting empty");
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    async fn save(&self, key: &str, value: Value) -> MemoryResult<()> {
        let _guard = self.write_lock.lock().await;

        let bytes = {
            let mut values = self.values.write();
            values.insert(key.to_owned(), value);
            serde_json::to_vec_pretty(&*values)?
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, bytes).await?;
        debug!(key, path = %self.path.display(), "Saved to memory file");
        Ok(())
    }

    async fn get(&self, key: &str, default: Value) -> MemoryResult<Value> {
        Ok(self.values.read().get(key).cloned().unwrap_or(default))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_dict_default_and_overwrite() {
        let memory = DictMemory::new();
        assert_eq!(memory.get("k", json!(0)).await.unwrap(), json!(0));

        memory.save("k", json!(1)).await.unwrap();
        memory.save("k", json!({"n": 2})).await.unwrap();
        assert_eq!(memory.get("k", json!(0)).await.unwrap(), json!({"n": 2}));
    }

    #[tokio::test]
    async fn test_typed_helpers() {
        let memory: BoxedMemory = Arc::new(DictMemory::new());
        assert_eq!(memory.load::<Vec<u32>>("rolls").await.unwrap(), None);

        memory.store("rolls", &vec![3u32, 6]).await.unwrap();
        assert_eq!(memory.load::<Vec<u32>>("rolls").await.unwrap(), Some(vec![3, 6]));
    }

    #[tokio::test]
    async fn test_json_file_persists_across_instances() {
        let path = std::env::temp_dir().join(format!("wren-memory-{}.json", std::process::id()));
        let _ = tokio::fs::remove_file(&path).await;

        let first = JsonFileMemory::new(&path);
        first.setup().await.unwrap();
        first.save("greeting", json!("hi")).await.unwrap();

        let second = JsonFileMemory::new(&path);
        second.setup().await.unwrap();
        assert_eq!(second.get("greeting", Value::Null).await.unwrap(), json!("hi"));

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_json_file_rejects_corrupt_file() {
        let path = std::env::temp_dir().join(format!("wren-corrupt-{}.json", std::process::id()));
        tokio::fs::write(&path, b"not json").await.unwrap();

        let memory = JsonFileMemory::new(&path);
        assert!(memory.setup().await.is_err());

        let _ = tokio::fs::remove_file(&path).await;
    }
}
