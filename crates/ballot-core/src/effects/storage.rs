//! Key-value storage effects
//!
//! The store is a flat namespace of string keys holding opaque bytes. Callers
//! that must change several keys together stage them in a [`WriteBatch`] and
//! hand it to [`StorageEffects::apply_batch`]; a handler guarantees that no
//! reader of that handler sees half of a batch.

use crate::errors::StorageError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Longest key a handler must accept.
pub const MAX_KEY_LEN: usize = 512;

/// A single staged mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Replace the value stored at `key`
    Put { key: String, value: Vec<u8> },
    /// Remove `key` if present
    Delete { key: String },
}

impl WriteOp {
    /// Key this operation touches.
    pub fn key(&self) -> &str {
        match self {
            WriteOp::Put { key, .. } | WriteOp::Delete { key } => key,
        }
    }
}

/// Ordered set of mutations applied as one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a raw put.
    pub fn put(&mut self, key: impl Into<String>, value: Vec<u8>) {
        self.ops.push(WriteOp::Put {
            key: key.into(),
            value,
        });
    }

    /// Stage a put of `value` encoded as JSON.
    pub fn put_json<T: Serialize>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<(), StorageError> {
        let key = key.into();
        let bytes = encode_json(&key, value)?;
        self.put(key, bytes);
        Ok(())
    }

    /// Stage a delete.
    pub fn delete(&mut self, key: impl Into<String>) {
        self.ops.push(WriteOp::Delete { key: key.into() });
    }

    /// Append every operation of `other` after the ones already staged.
    pub fn extend(&mut self, other: WriteBatch) {
        self.ops.extend(other.ops);
    }

    /// Staged operations in application order.
    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    /// Consume the batch.
    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }

    /// Number of staged operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// True if nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Persistent key-value store.
///
/// `store` and `apply_batch` replace values atomically from the caller's
/// perspective. `list_keys` returns keys in ascending byte order.
pub trait StorageEffects: Send + Sync {
    /// Fetch the value at `key`, or `None` if absent.
    fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Replace the value at `key`.
    fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

    /// Remove `key`; returns whether it existed.
    fn remove(&self, key: &str) -> Result<bool, StorageError>;

    /// All keys starting with `prefix`, sorted ascending.
    fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Apply every operation in `batch` as one unit.
    fn apply_batch(&self, batch: WriteBatch) -> Result<(), StorageError>;
}

impl<T: StorageEffects + ?Sized> StorageEffects for Arc<T> {
    fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).retrieve(key)
    }

    fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        (**self).store(key, value)
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        (**self).remove(key)
    }

    fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        (**self).list_keys(prefix)
    }

    fn apply_batch(&self, batch: WriteBatch) -> Result<(), StorageError> {
        (**self).apply_batch(batch)
    }
}

/// Typed JSON helpers over any [`StorageEffects`].
pub trait StorageExt: StorageEffects {
    /// Fetch and decode a JSON value.
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.retrieve(key)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StorageError::Codec {
                    key: key.to_string(),
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    /// Encode and store a JSON value.
    fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let bytes = encode_json(key, value)?;
        self.store(key, bytes)
    }
}

impl<S: StorageEffects + ?Sized> StorageExt for S {}

/// Reject keys no handler should have to represent.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey {
            reason: "Key cannot be empty".to_string(),
        });
    }
    if key.len() > MAX_KEY_LEN {
        return Err(StorageError::InvalidKey {
            reason: format!("Key longer than {MAX_KEY_LEN} bytes"),
        });
    }
    Ok(())
}

fn encode_json<T: Serialize>(key: &str, value: &T) -> Result<Vec<u8>, StorageError> {
    serde_json::to_vec(value).map_err(|e| StorageError::Codec {
        key: key.to_string(),
        reason: e.to_string(),
    })
}
