//! Layer 3: Storage Effect Handlers
//!
//! Two implementations of `StorageEffects` from ballot-core: an in-memory map
//! for tests and single-process deployments, and a directory of files for the
//! CLI.

mod filesystem;
mod memory;

pub use filesystem::FilesystemStorageHandler;
pub use memory::MemoryStorageHandler;
