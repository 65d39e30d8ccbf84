//! The asset catalog: categories, file metadata, and the disk objects the
//! metadata points at.

mod dispense;
mod ingest;

pub use dispense::Download;
pub use ingest::{ALLOWED_EXTENSIONS, MAX_FILE_SIZE, PendingUpload, allowed_extension};

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::storage::{FileStorage, StorageError, StoredObject};
use crate::store::Store;
use crate::types::{Category, CategoryWithFiles, FileAsset};

const MAX_CATEGORY_NAME_LEN: usize = 100;

/// What happened to the disk object during a delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskRemoval {
    Removed,
    AlreadyMissing,
    Failed,
}

pub struct Catalog {
    store: Arc<dyn Store>,
    storage: FileStorage,
    max_file_size: u64,
}

impl Catalog {
    pub fn new(store: Arc<dyn Store>, storage: FileStorage, max_file_size: u64) -> Self {
        Self {
            store,
            storage,
            max_file_size,
        }
    }

    #[must_use]
    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    #[cfg(test)]
    pub(crate) fn storage(&self) -> &FileStorage {
        &self.storage
    }

    pub fn create_category(&self, name: &str) -> Result<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("Category name is required".to_string()));
        }
        if name.chars().count() > MAX_CATEGORY_NAME_LEN {
            return Err(Error::InvalidInput(format!(
                "Category name cannot exceed {MAX_CATEGORY_NAME_LEN} characters"
            )));
        }

        let category = Category {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.store.create_category(&category)?;

        info!(category = %category.name, "Category created");
        Ok(category)
    }

    /// Categories by name, each with its files newest first. A fresh snapshot
    /// on every call.
    pub fn list_categories(&self) -> Result<Vec<CategoryWithFiles>> {
        self.store.list_categories_with_files()
    }

    /// Inserts metadata for an object that is already on disk.
    pub fn record_file(
        &self,
        stored: &StoredObject,
        original_name: &str,
        category_id: &str,
    ) -> Result<FileAsset> {
        let file = FileAsset {
            id: Uuid::new_v4().to_string(),
            stored_name: stored.stored_name.clone(),
            original_name: original_name.to_string(),
            storage_path: stored.relative_path.clone(),
            size_bytes: i64::try_from(stored.size)
                .map_err(|_| Error::InvalidInput("File size out of range".to_string()))?,
            sha256: stored.sha256.clone(),
            category_id: category_id.to_string(),
            uploaded_at: Utc::now(),
        };

        self.store.create_file(&file)?;
        Ok(file)
    }

    /// Removes the disk object if present, then the catalog row regardless of
    /// how the disk removal went.
    pub async fn delete_file(&self, file_id: &str) -> Result<DiskRemoval> {
        let file = self
            .store
            .get_file(file_id)?
            .ok_or_else(|| Error::NotFound("File not found".to_string()))?;

        let removal = match self.storage.remove(&file.stored_name).await {
            Ok(true) => DiskRemoval::Removed,
            Ok(false) => {
                warn!(file_id, stored_name = %file.stored_name, "File already missing from disk");
                DiskRemoval::AlreadyMissing
            }
            Err(e) => {
                warn!(file_id, stored_name = %file.stored_name, "Failed to remove file from disk: {e}");
                DiskRemoval::Failed
            }
        };

        if !self.store.delete_file(file_id)? {
            return Err(Error::NotFound("File not found".to_string()));
        }

        info!(file_id, name = %file.original_name, "File deleted");
        Ok(removal)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound => Error::StorageMissing,
            StorageError::TooLarge { limit } => Error::TooLarge { limit },
            StorageError::InvalidName => Error::Storage("invalid object name".to_string()),
            StorageError::Io(e) => Error::Storage(e.to_string()),
        }
    }
}

/// Human readable size, e.g. `1.5 KB`, using 1024-based units.
#[must_use]
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", UNITS[unit])
}
