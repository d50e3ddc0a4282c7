//! In-memory storage handler

use ballot_core::effects::{validate_key, StorageEffects, WriteBatch, WriteOp};
use ballot_core::StorageError;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// In-memory storage handler
///
/// A batch is applied under a single write lock, so readers observe either
/// none or all of it.
#[derive(Debug, Default)]
pub struct MemoryStorageHandler {
    data: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorageHandler {
    /// Create a new memory storage handler
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// True if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl StorageEffects for MemoryStorageHandler {
    fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.data.read().get(key).cloned())
    }

    fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        validate_key(key)?;
        self.data.write().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.data.write().remove(key).is_some())
    }

    fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let data = self.data.read();
        Ok(data
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }

    fn apply_batch(&self, batch: WriteBatch) -> Result<(), StorageError> {
        for op in batch.ops() {
            validate_key(op.key())?;
        }
        let mut data = self.data.write();
        for op in batch.into_ops() {
            match op {
                WriteOp::Put { key, value } => {
                    data.insert(key, value);
                }
                WriteOp::Delete { key } => {
                    data.remove(&key);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_keys_is_prefix_scoped_and_sorted() {
        let store = MemoryStorageHandler::new();
        store.store("receipts/B", vec![2]).unwrap();
        store.store("receipts/A", vec![1]).unwrap();
        store.store("voters/id/V1", vec![3]).unwrap();

        assert_eq!(
            store.list_keys("receipts/").unwrap(),
            vec!["receipts/A".to_string(), "receipts/B".to_string()]
        );
        assert_eq!(store.list_keys("").unwrap().len(), 3);
    }

    #[test]
    fn batch_applies_puts_and_deletes() {
        let store = MemoryStorageHandler::new();
        store.store("gone", vec![0]).unwrap();

        let mut batch = WriteBatch::new();
        batch.put("a", vec![1]);
        batch.delete("gone");
        batch.put("a", vec![2]);
        store.apply_batch(batch).unwrap();

        assert_eq!(store.retrieve("a").unwrap(), Some(vec![2]));
        assert_eq!(store.retrieve("gone").unwrap(), None);
    }

    #[test]
    fn invalid_key_rejects_whole_batch() {
        let store = MemoryStorageHandler::new();
        let mut batch = WriteBatch::new();
        batch.put("ok", vec![1]);
        batch.put("", vec![2]);

        assert!(store.apply_batch(batch).is_err());
        assert!(store.is_empty());
    }
}
