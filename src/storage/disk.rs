use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufReader, BufWriter};
use uuid::Uuid;

pub const UPLOADS_DIR: &str = "uploads";
const STAGING_DIR: &str = ".staging";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found")]
    NotFound,
    #[error("object exceeds {limit} bytes")]
    TooLarge { limit: u64 },
    #[error("invalid object name")]
    InvalidName,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    fn from_io(e: std::io::Error) -> Self {
        if e.kind() == ErrorKind::NotFound {
            Self::NotFound
        } else {
            Self::Io(e)
        }
    }
}

/// A committed object on disk.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub stored_name: String,
    /// Path relative to the data directory, e.g. `uploads/<stored_name>`.
    pub relative_path: String,
    pub size: u64,
    pub sha256: String,
}

/// Durable byte storage for uploaded files, rooted at `<data_dir>/uploads`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            base_path: data_dir.join(UPLOADS_DIR),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn object_path(&self, stored_name: &str) -> Result<PathBuf, StorageError> {
        validate_name(stored_name)?;
        Ok(self.base_path.join(stored_name))
    }

    fn staging_path(&self, stored_name: &str) -> PathBuf {
        self.base_path.join(STAGING_DIR).join(stored_name)
    }

    /// Opens a staging file for a new object. `extension` (including the
    /// leading dot) is kept on the generated name.
    pub async fn stage(&self, extension: &str, limit: u64) -> Result<StagedUpload, StorageError> {
        let stored_name = generate_stored_name(extension);
        validate_name(&stored_name)?;

        let temp_path = self.staging_path(&stored_name);
        if let Some(parent) = temp_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let file = File::create(&temp_path).await?;

        Ok(StagedUpload {
            final_path: self.base_path.join(&stored_name),
            stored_name,
            temp_path,
            writer: Some(BufWriter::new(file)),
            written: 0,
            limit,
            hasher: Sha256::new(),
            committed: false,
        })
    }

    pub async fn open(&self, stored_name: &str) -> Result<(BufReader<File>, u64), StorageError> {
        let path = self.object_path(stored_name)?;
        let file = File::open(&path).await.map_err(StorageError::from_io)?;

        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(StorageError::NotFound);
        }

        Ok((BufReader::new(file), metadata.len()))
    }

    /// Removes an object. Returns false if it was already gone.
    pub async fn remove(&self, stored_name: &str) -> Result<bool, StorageError> {
        let path = self.object_path(stored_name)?;

        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

/// An object being written. Bytes land in a staging file and only appear
/// under the uploads directory once [`StagedUpload::commit`] succeeds.
/// Dropping an uncommitted upload removes the staging file.
pub struct StagedUpload {
    stored_name: String,
    temp_path: PathBuf,
    final_path: PathBuf,
    writer: Option<BufWriter<File>>,
    written: u64,
    limit: u64,
    hasher: Sha256,
    committed: bool,
}

impl StagedUpload {
    pub fn stored_name(&self) -> &str {
        &self.stored_name
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub async fn write(&mut self, chunk: &[u8]) -> Result<(), StorageError> {
        let new_len = self.written + chunk.len() as u64;
        if new_len > self.limit {
            return Err(StorageError::TooLarge { limit: self.limit });
        }

        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| StorageError::Io(std::io::Error::other("upload already closed")))?;
        writer.write_all(chunk).await?;

        self.hasher.update(chunk);
        self.written = new_len;
        Ok(())
    }

    /// Flushes, syncs and moves the object into place.
    pub async fn commit(mut self) -> Result<StoredObject, StorageError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().await?;
            writer.get_mut().sync_all().await?;
        }

        fs::rename(&self.temp_path, &self.final_path).await?;
        self.committed = true;

        let hasher = std::mem::take(&mut self.hasher);
        Ok(StoredObject {
            relative_path: format!("{UPLOADS_DIR}/{}", self.stored_name),
            stored_name: self.stored_name.clone(),
            size: self.written,
            sha256: hex::encode(hasher.finalize()),
        })
    }
}

impl Drop for StagedUpload {
    // Synchronous so a rejected upload is gone before its error response.
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        self.writer.take();
        if let Err(e) = std::fs::remove_file(&self.temp_path) {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!(
                    "Failed to remove staged upload {}: {e}",
                    self.temp_path.display()
                );
            }
        }
    }
}

/// `<unix millis>-<uuid><ext>`; unique and free of user input.
#[must_use]
fn generate_stored_name(extension: &str) -> String {
    format!(
        "{}-{}{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4(),
        extension
    )
}

fn validate_name(name: &str) -> Result<(), StorageError> {
    let valid = !name.is_empty()
        && name.len() <= 255
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');

    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidName)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    async fn stage_bytes(storage: &FileStorage, data: &[u8]) -> StoredObject {
        let mut upload = storage.stage(".zip", 1024).await.unwrap();
        upload.write(data).await.unwrap();
        upload.commit().await.unwrap()
    }

    #[tokio::test]
    async fn test_stage_commit_and_open() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());

        let stored = stage_bytes(&storage, b"1234").await;
        assert!(stored.stored_name.ends_with(".zip"));
        assert_eq!(stored.relative_path, format!("uploads/{}", stored.stored_name));
        assert_eq!(stored.size, 4);
        assert_eq!(
            stored.sha256,
            "03ac674216f3e15c761ee1a5e255f067953623c8b388b4459e13f978d7c846f4"
        );

        assert!(storage.base_path().join(&stored.stored_name).is_file());

        let (mut reader, size) = storage.open(&stored.stored_name).await.unwrap();
        assert_eq!(size, 4);
        let mut content = Vec::new();
        reader.read_to_end(&mut content).await.unwrap();
        assert_eq!(content, b"1234");
    }

    #[tokio::test]
    async fn test_stored_names_are_unique() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());

        let a = stage_bytes(&storage, b"a").await;
        let b = stage_bytes(&storage, b"b").await;
        assert_ne!(a.stored_name, b.stored_name);
    }

    #[tokio::test]
    async fn test_limit_enforced_while_streaming() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());

        let mut upload = storage.stage(".rar", 5).await.unwrap();
        upload.write(b"abc").await.unwrap();
        let result = upload.write(b"def").await;
        assert!(matches!(result, Err(StorageError::TooLarge { limit: 5 })));
        assert_eq!(upload.written(), 3);
    }

    #[tokio::test]
    async fn test_dropped_upload_leaves_nothing_behind() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());

        let mut upload = storage.stage(".7z", 1024).await.unwrap();
        upload.write(b"partial").await.unwrap();
        let name = upload.stored_name().to_string();
        drop(upload);

        assert!(!storage.base_path().join(&name).exists());
        let staging = storage.base_path().join(STAGING_DIR);
        let mut entries = std::fs::read_dir(staging).unwrap();
        assert!(entries.next().is_none());
    }

    #[tokio::test]
    async fn test_remove_is_tolerant() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());

        let stored = stage_bytes(&storage, b"data").await;
        assert!(storage.remove(&stored.stored_name).await.unwrap());
        assert!(!storage.remove(&stored.stored_name).await.unwrap());
        assert!(matches!(
            storage.open(&stored.stored_name).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_rejects_traversal_names() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());

        for name in ["../secret", "a/b.zip", ".staging", "", "..\\x.zip"] {
            assert!(matches!(
                storage.open(name).await,
                Err(StorageError::InvalidName)
            ));
        }
    }
}
