//! Object storage for uploaded documents (CVs).

mod fs;
mod memory;
mod path;

pub use fs::FsObjectStore;
pub use memory::MemoryObjectStore;
pub use path::{object_path, sanitize_filename};

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredObject {
    pub path: String,
    pub content_type: String,
    pub size: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object path '{0}' is not allowed")]
    InvalidPath(String),
    #[error("object '{0}' not found")]
    NotFound(String),
    #[error("storage backend unavailable: {0}")]
    Backend(String),
}

/// Bucket-like blob store addressed by relative, slash-separated paths.
pub trait ObjectStore: Send + Sync {
    fn put(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<StoredObject, StorageError>;
    fn get(&self, path: &str) -> Result<(StoredObject, Vec<u8>), StorageError>;
    fn remove(&self, path: &str) -> Result<(), StorageError>;
}

/// Content type inferred from the file extension.
pub fn guess_content_type(filename: &str) -> mime::Mime {
    mime_guess::from_path(filename).first_or_octet_stream()
}

pub(crate) fn validate_path(path: &str) -> Result<(), StorageError> {
    let invalid = path.is_empty()
        || path.starts_with('/')
        || path.contains('\\')
        || path
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if invalid {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    Ok(())
}
