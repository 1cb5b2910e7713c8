use std::{collections::HashMap, hash::Hash, path::PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tokio::{fs, sync::RwLock};
use tracing::debug;

use crate::errors::ServiceError;

/// Keyed documents persisted as one JSON object on disk.
///
/// Every mutation rewrites the file while holding the write lock, so writers
/// are serialized and readers never observe a half-applied change. The file is
/// replaced through a temporary sibling and a rename.
pub struct JsonStore<K, V> {
    inner: RwLock<HashMap<K, V>>,
    file_path: PathBuf,
}

fn io_err(e: impl std::fmt::Display) -> ServiceError {
    ServiceError::Db(e.to_string())
}

impl<K, V> JsonStore<K, V>
where
    K: Eq + Hash + Serialize + DeserializeOwned + Clone,
    V: Serialize + DeserializeOwned + Clone,
{
    /// Open the store at `path`, creating an empty file when it does not exist.
    /// A file that exists but does not parse is an error rather than an empty store.
    pub async fn open<P: Into<PathBuf>>(path: P) -> Result<Self, ServiceError> {
        let file_path = path.into();
        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let map: HashMap<K, V> = match fs::read(&file_path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => HashMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| ServiceError::Db(format!("corrupt store {}: {e}", file_path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let empty = HashMap::new();
                write_file(&file_path, &empty).await?;
                empty
            }
            Err(e) => return Err(io_err(e)),
        };
        debug!(path = %file_path.display(), entries = map.len(), "json store opened");

        Ok(Self { inner: RwLock::new(map), file_path })
    }

    /// Clone of every stored value, in no particular order.
    pub async fn values(&self) -> Vec<V> {
        self.inner.read().await.values().cloned().collect()
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        self.inner.read().await.get(key).cloned()
    }

    /// First value satisfying `pred`.
    pub async fn find(&self, pred: impl Fn(&V) -> bool) -> Option<V> {
        self.inner.read().await.values().find(|v| pred(v)).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Insert or replace a value and persist.
    pub async fn insert(&self, key: K, value: V) -> Result<(), ServiceError> {
        let mut map = self.inner.write().await;
        let previous = map.insert(key.clone(), value);
        if let Err(e) = write_file(&self.file_path, &map).await {
            match previous {
                Some(v) => map.insert(key, v),
                None => map.remove(&key),
            };
            return Err(e);
        }
        Ok(())
    }

    /// Apply `f` to the value under `key` and persist; `None` when the key is absent.
    pub async fn modify<T>(&self, key: &K, f: impl FnOnce(&mut V) -> T) -> Result<Option<T>, ServiceError> {
        let mut map = self.inner.write().await;
        let Some(value) = map.get_mut(key) else { return Ok(None) };
        let before = value.clone();
        let out = f(value);
        if let Err(e) = write_file(&self.file_path, &map).await {
            map.insert(key.clone(), before);
            return Err(e);
        }
        Ok(Some(out))
    }

    /// Remove a key and persist; returns whether it existed.
    pub async fn remove(&self, key: &K) -> Result<bool, ServiceError> {
        let mut map = self.inner.write().await;
        let Some(old) = map.remove(key) else { return Ok(false) };
        if let Err(e) = write_file(&self.file_path, &map).await {
            map.insert(key.clone(), old);
            return Err(e);
        }
        Ok(true)
    }
}

async fn write_file<K, V>(path: &std::path::Path, map: &HashMap<K, V>) -> Result<(), ServiceError>
where
    K: Eq + Hash + Serialize,
    V: Serialize,
{
    let data = serde_json::to_vec_pretty(map).map_err(io_err)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, data).await.map_err(io_err)?;
    fs::rename(&tmp, path).await.map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("json_store_{}", uuid::Uuid::new_v4())).join("store.json")
    }

    #[tokio::test]
    async fn json_store_crud_persists() -> Result<(), anyhow::Error> {
        let path = temp_path();
        let store = JsonStore::<String, String>::open(&path).await?;
        assert!(store.is_empty().await);

        store.insert("a".into(), "1".into()).await?;
        store.insert("b".into(), "2".into()).await?;
        assert_eq!(store.get(&"a".into()).await.as_deref(), Some("1"));
        assert_eq!(store.find(|v| v == "2").await.as_deref(), Some("2"));

        let len = store.modify(&"a".into(), |v| { *v = "10".into(); v.len() }).await?;
        assert_eq!(len, Some(2));
        assert_eq!(store.modify(&"zzz".into(), |_| ()).await?, None);

        assert!(store.remove(&"b".into()).await?);
        assert!(!store.remove(&"b".into()).await?);

        let reopened = JsonStore::<String, String>::open(&path).await?;
        assert_eq!(reopened.len().await, 1);
        assert_eq!(reopened.get(&"a".into()).await.as_deref(), Some("10"));

        let _ = fs::remove_dir_all(path.parent().unwrap()).await;
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_file_is_reported() -> Result<(), anyhow::Error> {
        let path = temp_path();
        fs::create_dir_all(path.parent().unwrap()).await?;
        fs::write(&path, b"{not json").await?;
        let res = JsonStore::<String, String>::open(&path).await;
        assert!(matches!(res, Err(ServiceError::Db(_))));
        let _ = fs::remove_dir_all(path.parent().unwrap()).await;
        Ok(())
    }
}
