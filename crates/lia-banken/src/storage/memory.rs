use std::collections::HashMap;
use std::sync::Mutex;

use super::{validate_path, ObjectStore, StorageError, StoredObject};

#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, (StoredObject, Vec<u8>)>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .objects
            .lock()
            .map(|guard| guard.keys().cloned().collect())
            .unwrap_or_default();
        paths.sort();
        paths
    }
}

fn poisoned() -> StorageError {
    StorageError::Backend("object store mutex poisoned".to_string())
}

impl ObjectStore for MemoryObjectStore {
    fn put(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<StoredObject, StorageError> {
        validate_path(path)?;
        let object = StoredObject {
            path: path.to_string(),
            content_type: content_type.to_string(),
            size: bytes.len() as u64,
        };
        self.objects
            .lock()
            .map_err(|_| poisoned())?
            .insert(path.to_string(), (object.clone(), bytes.to_vec()));
        Ok(object)
    }

    fn get(&self, path: &str) -> Result<(StoredObject, Vec<u8>), StorageError> {
        validate_path(path)?;
        self.objects
            .lock()
            .map_err(|_| poisoned())?
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    fn remove(&self, path: &str) -> Result<(), StorageError> {
        validate_path(path)?;
        self.objects
            .lock()
            .map_err(|_| poisoned())?
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }
}
