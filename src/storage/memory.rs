use std::collections::HashMap;
use std::sync::RwLock;

use crate::errors::StorageError;
use crate::storage::Storage;

/// An in-memory store, for embedders without a persistent substrate and
/// for tests.
#[derive(Default)]
pub struct MemoryStorage {
    map: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Default::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.map.read().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.map.write().unwrap().insert(key.to_owned(), value.to_owned());

        Ok(())
    }
}
