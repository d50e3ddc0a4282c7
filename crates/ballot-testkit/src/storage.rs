//! Storage wrapper with injectable faults
//!
//! Faults are keyed by prefix: a write (or a batch containing a write) whose key
//! starts with an armed prefix fails with [`StorageError::WriteFailed`] and the
//! inner store is left untouched.

use ballot_core::effects::{StorageEffects, WriteBatch};
use ballot_core::StorageError;
use parking_lot::Mutex;

/// Storage wrapper that fails reads or writes touching armed key prefixes.
#[derive(Debug)]
pub struct FailingStorage<S> {
    inner: S,
    failing_write_prefixes: Mutex<Vec<String>>,
    failing_read_prefixes: Mutex<Vec<String>>,
}

impl<S: StorageEffects> FailingStorage<S> {
    /// Wrap `inner` with no faults armed.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            failing_write_prefixes: Mutex::new(Vec::new()),
            failing_read_prefixes: Mutex::new(Vec::new()),
        }
    }

    /// Fail writes and deletes under `prefix` until [`heal`](Self::heal).
    pub fn fail_writes_under(&self, prefix: &str) {
        self.failing_write_prefixes.lock().push(prefix.to_string());
    }

    /// Fail reads and listings under `prefix` until [`heal`](Self::heal).
    pub fn fail_reads_under(&self, prefix: &str) {
        self.failing_read_prefixes.lock().push(prefix.to_string());
    }

    /// Disarm every fault.
    pub fn heal(&self) {
        self.failing_write_prefixes.lock().clear();
        self.failing_read_prefixes.lock().clear();
    }

    /// The wrapped store, for tampering with values directly.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn check_write(&self, key: &str) -> Result<(), StorageError> {
        if matches_any(&self.failing_write_prefixes.lock(), key) {
            return Err(StorageError::WriteFailed(format!("injected fault at {key}")));
        }
        Ok(())
    }

    fn check_read(&self, key: &str) -> Result<(), StorageError> {
        if matches_any(&self.failing_read_prefixes.lock(), key) {
            return Err(StorageError::ReadFailed(format!("injected fault at {key}")));
        }
        Ok(())
    }
}

fn matches_any(prefixes: &[String], key: &str) -> bool {
    prefixes.iter().any(|prefix| key.starts_with(prefix.as_str()))
}

impl<S: StorageEffects> StorageEffects for FailingStorage<S> {
    fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.check_read(key)?;
        self.inner.retrieve(key)
    }

    fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        self.check_write(key)?;
        self.inner.store(key, value)
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        self.check_write(key)?;
        self.inner.remove(key)
    }

    fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        self.check_read(prefix)?;
        self.inner.list_keys(prefix)
    }

    fn apply_batch(&self, batch: WriteBatch) -> Result<(), StorageError> {
        for op in batch.ops() {
            self.check_write(op.key())?;
        }
        self.inner.apply_batch(batch)
    }
}
