//! Blob storage for uploaded document bytes.
//!
//! The archive only needs save/read/delete by key plus a filesystem path the
//! OCR worker can open, so the store sits behind a small trait.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `bytes` under `key`, creating parent directories as needed.
    async fn save(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    async fn read(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Remove a blob. Returns whether it existed.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    /// Absolute path of the blob, for out-of-process readers.
    fn local_path(&self, key: &str) -> Result<PathBuf, StorageError>;
}

/// Build the storage key for a document's content.
///
/// Uses a two-level layout based on hash prefix:
/// `{hash[0..2]}/{hash[0..8]}-{document_id}.{extension}`. The document id
/// keeps keys unique even when two uploads race on the same bytes.
pub fn content_storage_key(content_hash: &str, document_id: &str, extension: &str) -> String {
    let prefix = content_hash.get(..2).unwrap_or("00");
    let short = content_hash.get(..8).unwrap_or(content_hash);
    format!("{}/{}-{}.{}", prefix, short, document_id, extension)
}

/// Pick a file extension from the uploaded name, falling back to the
/// content type.
pub fn file_extension(file_name: &str, content_type: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| mime_to_extension(content_type).to_string())
}

/// Content type for an upload: the declared one, else a guess from the name.
pub fn resolve_content_type(file_name: &str, declared: Option<&str>) -> String {
    declared
        .map(str::trim)
        .filter(|ct| !ct.is_empty() && *ct != "application/octet-stream")
        .map(str::to_string)
        .unwrap_or_else(|| {
            mime_guess::from_path(file_name)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        })
}

/// Map MIME type to file extension.
pub fn mime_to_extension(mime: &str) -> &'static str {
    match mime {
        "application/pdf" => "pdf",
        "text/plain" => "txt",
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/tiff" => "tiff",
        "image/bmp" => "bmp",
        "application/msword" => "doc",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => "docx",
        "application/vnd.ms-excel" => "xls",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => "xlsx",
        _ => "bin",
    }
}

/// Blob store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let rel = Path::new(key);
        let safe = !key.is_empty()
            && rel
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn save(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    fn local_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let path = self.resolve(key)?;
        if path.is_absolute() {
            Ok(path)
        } else {
            Ok(std::env::current_dir()?.join(path))
        }
    }
}
