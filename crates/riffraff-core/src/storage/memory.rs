use std::collections::HashSet;
use std::sync::Mutex;

use super::ObjectStore;
use crate::error::StorageError;

/// An object written to a [`MemoryStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bucket: String,
    pub key: String,
    pub data: Vec<u8>,
}

/// In-process store that records writes in the order they complete
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<Vec<StoredObject>>,
    denied: HashSet<String>,
    failing: HashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject puts to `key` as a permissions failure
    pub fn deny(mut self, key: impl Into<String>) -> Self {
        self.denied.insert(key.into());
        self
    }

    /// Reject puts to `key` with a generic failure
    pub fn fail(mut self, key: impl Into<String>) -> Self {
        self.failing.insert(key.into());
        self
    }

    /// Everything written so far, in write order
    pub fn objects(&self) -> Vec<StoredObject> {
        self.objects
            .lock()
            .map(|objects| objects.clone())
            .unwrap_or_default()
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects()
            .into_iter()
            .find(|o| o.bucket == bucket && o.key == key)
            .map(|o| o.data)
    }
}

impl ObjectStore for MemoryStore {
    async fn put(&self, data: Vec<u8>, bucket: &str, key: &str) -> Result<(), StorageError> {
        if self.denied.contains(key) {
            return Err(StorageError::AccessDenied {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }
        if self.failing.contains(key) {
            return Err(StorageError::Put {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: "simulated failure".to_string(),
            });
        }

        let mut objects = self.objects.lock().map_err(|_| StorageError::Put {
            bucket: bucket.to_string(),
            key: key.to_string(),
            message: "store lock poisoned".to_string(),
        })?;
        objects.push(StoredObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            data,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_in_order() {
        let store = MemoryStore::new();
        store.put(b"a".to_vec(), "b1", "k1").await.unwrap();
        store.put(b"b".to_vec(), "b2", "k2").await.unwrap();

        let keys: Vec<String> = store.objects().into_iter().map(|o| o.key).collect();
        assert_eq!(keys, vec!["k1", "k2"]);
        assert_eq!(store.get("b2", "k2"), Some(b"b".to_vec()));
    }

    #[tokio::test]
    async fn test_denied_key() {
        let store = MemoryStore::new().deny("k1");
        let err = store.put(Vec::new(), "b", "k1").await.unwrap_err();
        assert!(err.is_access_denied());
        assert!(store.objects().is_empty());
    }
}
