//! Filesystem storage handler
//!
//! Each key is stored in its own file named by a digest of the key, so keys may
//! contain `/`, `@` or anything else and still fit filesystem name limits. The
//! file begins with the key itself (length-prefixed) followed by the value.
//! Values are written to a temporary sibling and renamed into place.
//!
//! A handler owns its directory exclusively: [`FilesystemStorageHandler::open`]
//! creates `writer.lock` and fails if it already exists, and the file is removed
//! when the handler drops. Per-key locks elsewhere in the pipeline only
//! serialize callers that share one handler, so a second process on the same
//! directory is refused rather than allowed to race.

use ballot_core::crypto::framed_sha256;
use ballot_core::effects::{validate_key, StorageEffects, WriteBatch, WriteOp};
use ballot_core::StorageError;
use parking_lot::RwLock;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const VALUE_SUFFIX: &str = ".dat";
const TEMP_SUFFIX: &str = ".tmp";
const KEY_DIGEST_DOMAIN: &str = "ballot/storage-key";
const WRITER_LOCK: &str = "writer.lock";

/// Exclusive claim on a data directory, released on drop.
#[derive(Debug)]
struct WriterLock {
    path: PathBuf,
}

impl WriterLock {
    fn acquire(base_path: &Path) -> Result<Self, StorageError> {
        let path = base_path.join(WRITER_LOCK);
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let holder = fs::read_to_string(&path).unwrap_or_default();
                return Err(StorageError::WriteFailed(format!(
                    "Data directory {} is in use by process {}; remove {} if that process is gone",
                    base_path.display(),
                    holder.trim(),
                    path.display()
                )));
            }
            Err(e) => {
                return Err(StorageError::WriteFailed(format!(
                    "Failed to create {}: {e}",
                    path.display()
                )))
            }
        };
        // The pid is informational; the lock is the file's existence.
        let _ = write!(file, "{}", std::process::id());
        Ok(Self { path })
    }
}

impl Drop for WriterLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to release writer lock");
        }
    }
}

/// Filesystem-based storage handler for production use
///
/// Writers within one process are serialized and readers of the same handler
/// never observe a partially applied batch. A crash part-way through a batch can
/// leave a prefix of it applied; cross-key durability is not provided.
#[derive(Debug)]
pub struct FilesystemStorageHandler {
    /// Base directory for storage files
    base_path: PathBuf,
    batch_lock: RwLock<()>,
    _writer: WriterLock,
}

impl FilesystemStorageHandler {
    /// Open (creating if needed) a store rooted at `base_path`.
    ///
    /// Fails while another handler, in this process or another, holds the
    /// directory.
    pub fn open(base_path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).map_err(|e| {
            StorageError::WriteFailed(format!(
                "Failed to create directory {}: {e}",
                base_path.display()
            ))
        })?;
        let writer = WriterLock::acquire(&base_path)?;
        Ok(Self {
            base_path,
            batch_lock: RwLock::new(()),
            _writer: writer,
        })
    }

    /// Root directory of the store.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn file_stem(key: &str) -> String {
        hex::encode(framed_sha256(KEY_DIGEST_DOMAIN, &[key.as_bytes()]))
    }

    fn value_path(&self, key: &str) -> PathBuf {
        self.base_path
            .join(format!("{}{VALUE_SUFFIX}", Self::file_stem(key)))
    }

    fn temp_path(&self, key: &str, slot: usize) -> PathBuf {
        self.base_path
            .join(format!("{}.{slot}{TEMP_SUFFIX}", Self::file_stem(key)))
    }

    fn encode_record(key: &str, value: &[u8]) -> Vec<u8> {
        let mut record = Vec::with_capacity(4 + key.len() + value.len());
        record.extend_from_slice(&(key.len() as u32).to_le_bytes());
        record.extend_from_slice(key.as_bytes());
        record.extend_from_slice(value);
        record
    }

    /// Split a file into its key and value; `None` if it is not one of ours.
    fn decode_record(record: &[u8]) -> Option<(&str, &[u8])> {
        let len_bytes: [u8; 4] = record.get(..4)?.try_into().ok()?;
        let key_len = u32::from_le_bytes(len_bytes) as usize;
        let key = record.get(4..4 + key_len)?;
        let value = record.get(4 + key_len..)?;
        Some((std::str::from_utf8(key).ok()?, value))
    }

    /// Write `value` beside its final location. `slot` keeps two puts of the
    /// same key within one batch from sharing a temporary file.
    fn write_temp(&self, key: &str, value: &[u8], slot: usize) -> Result<PathBuf, StorageError> {
        let temp = self.temp_path(key, slot);
        let mut file = fs::File::create(&temp)
            .map_err(|e| StorageError::WriteFailed(format!("Failed to create {key}: {e}")))?;
        file.write_all(&Self::encode_record(key, value))
            .and_then(|()| file.sync_all())
            .map_err(|e| StorageError::WriteFailed(format!("Failed to write {key}: {e}")))?;
        Ok(temp)
    }

    fn commit_temp(&self, key: &str, temp: &Path) -> Result<(), StorageError> {
        fs::rename(temp, self.value_path(key))
            .map_err(|e| StorageError::WriteFailed(format!("Failed to commit {key}: {e}")))
    }

    fn delete_file(&self, key: &str) -> Result<bool, StorageError> {
        match fs::remove_file(self.value_path(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to remove {key}: {e}"
            ))),
        }
    }
}

impl StorageEffects for FilesystemStorageHandler {
    fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let _read = self.batch_lock.read();
        match fs::read(self.value_path(key)) {
            Ok(record) => match Self::decode_record(&record) {
                Some((stored_key, value)) if stored_key == key => Ok(Some(value.to_vec())),
                _ => Err(StorageError::ReadFailed(format!(
                    "Corrupt record file for {key}"
                ))),
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::ReadFailed(format!(
                "Failed to read {key}: {e}"
            ))),
        }
    }

    fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        validate_key(key)?;
        let _write = self.batch_lock.write();
        let temp = self.write_temp(key, &value, 0)?;
        self.commit_temp(key, &temp)
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let _write = self.batch_lock.write();
        self.delete_file(key)
    }

    fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let _read = self.batch_lock.read();
        let entries = match fs::read_dir(&self.base_path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StorageError::ReadFailed(format!(
                    "Failed to read directory: {e}"
                )))
            }
        };

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                StorageError::ReadFailed(format!("Failed to read directory entry: {e}"))
            })?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(&VALUE_SUFFIX[1..]) {
                continue;
            }
            let record = fs::read(&path).map_err(|e| {
                StorageError::ReadFailed(format!("Failed to read {}: {e}", path.display()))
            })?;
            // Files we did not write (or cannot decode) are not keys.
            let Some((key, _)) = Self::decode_record(&record) else {
                continue;
            };
            if key.starts_with(prefix) {
                keys.push(key.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn apply_batch(&self, batch: WriteBatch) -> Result<(), StorageError> {
        for op in batch.ops() {
            validate_key(op.key())?;
        }
        let _write = self.batch_lock.write();

        // Stage every value first so a write failure leaves the store untouched.
        let mut staged = Vec::new();
        for (slot, op) in batch.ops().iter().enumerate() {
            if let WriteOp::Put { key, value } = op {
                match self.write_temp(key, value, slot) {
                    Ok(temp) => staged.push(temp),
                    Err(e) => {
                        for temp in &staged {
                            let _ = fs::remove_file(temp);
                        }
                        return Err(e);
                    }
                }
            }
        }

        let mut staged = staged.into_iter();
        for op in batch.ops() {
            match op {
                WriteOp::Put { key, .. } => {
                    if let Some(temp) = staged.next() {
                        self.commit_temp(key, &temp)?;
                    }
                }
                WriteOp::Delete { key } => {
                    self.delete_file(key)?;
                }
            }
        }
        Ok(())
    }
}
