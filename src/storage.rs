use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::errors::StorageError;

pub mod memory;

pub use memory::MemoryStorage;

/// Key-value persistence substrate for the consent record.
///
/// Access is synchronous: the substrate is expected to behave atomically
/// from a single consumer's perspective, like the per-origin storage it
/// stands in for. Cross-consumer races on the same key are out of scope.
pub trait Storage: Send + Sync {
    /// Returns the value stored under the given key, if any.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores the given value under the given key, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// A store that keeps one file per key under a fixed directory.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Creates a new instance rooted at the given directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_env() -> Self {
        use crate::config::get_variable;

        FileStorage::new(get_variable("FRONTEND_STORAGE_DIR"))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.dir.join(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io { source: e }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.dir.join(key), value)?;

        Ok(())
    }
}
