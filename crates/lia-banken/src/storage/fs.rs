use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::warn;

use super::{guess_content_type, validate_path, ObjectStore, StorageError, StoredObject};

/// Stores objects as plain files below a root directory.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|err| {
            StorageError::Backend(format!("cannot create {}: {err}", root.display()))
        })?;
        Ok(Self { root })
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        validate_path(path)?;
        Ok(path.split('/').fold(self.root.clone(), |acc, part| acc.join(part)))
    }
}

fn backend(err: std::io::Error) -> StorageError {
    StorageError::Backend(err.to_string())
}

impl ObjectStore for FsObjectStore {
    fn put(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<StoredObject, StorageError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(backend)?;
        }
        fs::write(&target, bytes).map_err(|err| {
            warn!(path, error = %err, "object write failed");
            backend(err)
        })?;

        Ok(StoredObject {
            path: path.to_string(),
            content_type: content_type.to_string(),
            size: bytes.len() as u64,
        })
    }

    fn get(&self, path: &str) -> Result<(StoredObject, Vec<u8>), StorageError> {
        let target = self.resolve(path)?;
        let bytes = fs::read(&target).map_err(|err| match err.kind() {
            ErrorKind::NotFound => StorageError::NotFound(path.to_string()),
            _ => backend(err),
        })?;
        let object = StoredObject {
            path: path.to_string(),
            content_type: guess_content_type(path).to_string(),
            size: bytes.len() as u64,
        };
        Ok((object, bytes))
    }

    fn remove(&self, path: &str) -> Result<(), StorageError> {
        let target = self.resolve(path)?;
        fs::remove_file(&target).map_err(|err| match err.kind() {
            ErrorKind::NotFound => StorageError::NotFound(path.to_string()),
            _ => backend(err),
        })
    }
}
