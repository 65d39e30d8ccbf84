use std::path::Path;

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{info, warn};

use super::Catalog;
use crate::error::{Error, Result};
use crate::storage::StagedUpload;
use crate::types::FileAsset;

/// Largest accepted upload: 5 GiB.
pub const MAX_FILE_SIZE: u64 = 5 * 1024 * 1024 * 1024;

pub const ALLOWED_EXTENSIONS: [&str; 6] = [".zip", ".rar", ".exe", ".dll", ".data", ".7z"];

const MAX_ORIGINAL_NAME_LEN: usize = 255;
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Returns the lowercased extension (with leading dot) if it is allowed.
#[must_use]
pub fn allowed_extension(filename: &str) -> Option<String> {
    let ext = Path::new(filename).extension()?.to_str()?;
    let ext = format!(".{}", ext.to_ascii_lowercase());
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Reduces a client-supplied filename to a displayable base name.
fn display_name(original: &str) -> Option<String> {
    let base = original.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_ORIGINAL_NAME_LEN)
        .collect();
    let cleaned = cleaned.trim();

    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

/// An accepted upload whose bytes are still arriving.
pub struct PendingUpload {
    original_name: String,
    staged: StagedUpload,
}

impl PendingUpload {
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn stored_name(&self) -> &str {
        self.staged.stored_name()
    }

    /// Bytes staged so far.
    pub fn received(&self) -> u64 {
        self.staged.written()
    }

    pub async fn write(&mut self, chunk: &[u8]) -> Result<()> {
        self.staged.write(chunk).await.map_err(Error::from)
    }
}

impl Catalog {
    /// Validates the filename and declared size, then opens a staging object.
    /// Nothing is written for rejected uploads.
    pub async fn begin_upload(
        &self,
        original_name: &str,
        declared_size: Option<u64>,
    ) -> Result<PendingUpload> {
        let original_name = display_name(original_name)
            .ok_or_else(|| Error::InvalidInput("No file uploaded".to_string()))?;

        let extension = allowed_extension(&original_name).ok_or(Error::UnsupportedType)?;

        if declared_size.is_some_and(|size| size > self.max_file_size) {
            return Err(Error::TooLarge {
                limit: self.max_file_size,
            });
        }

        let staged = self.storage.stage(&extension, self.max_file_size).await?;

        Ok(PendingUpload {
            original_name,
            staged,
        })
    }

    /// Moves a fully received upload into storage and records it. If the
    /// catalog insert fails the stored object is deleted again.
    pub async fn commit_upload(
        &self,
        upload: PendingUpload,
        category_id: Option<&str>,
    ) -> Result<FileAsset> {
        let category_id = category_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(Error::MissingCategory)?;

        let PendingUpload {
            original_name,
            staged,
        } = upload;

        let stored = staged.commit().await?;

        match self.record_file(&stored, &original_name, category_id) {
            Ok(file) => {
                info!(
                    file_id = %file.id,
                    name = %file.original_name,
                    size = file.size_bytes,
                    category_id,
                    "File uploaded"
                );
                Ok(file)
            }
            Err(e) => {
                warn!(stored_name = %stored.stored_name, "Recording upload failed, removing stored object: {e}");
                if let Err(remove_err) = self.storage.remove(&stored.stored_name).await {
                    warn!(stored_name = %stored.stored_name, "Failed to remove orphaned object: {remove_err}");
                }
                Err(e)
            }
        }
    }

    /// Full ingestion of a byte stream whose category is known up front.
    pub async fn ingest<R>(
        &self,
        mut reader: R,
        original_name: &str,
        declared_size: Option<u64>,
        category_id: Option<&str>,
    ) -> Result<FileAsset>
    where
        R: AsyncRead + Unpin,
    {
        let category_id = category_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(Error::MissingCategory)?;

        let mut upload = self.begin_upload(original_name, declared_size).await?;

        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        loop {
            let n = reader
                .read(&mut buf)
                .await
                .map_err(|e| Error::Storage(format!("failed to read upload: {e}")))?;
            if n == 0 {
                break;
            }
            upload.write(&buf[..n]).await?;
        }

        self.commit_upload(upload, Some(category_id)).await
    }
}
