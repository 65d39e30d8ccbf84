use chrono::Utc;
use tokio::fs::File;
use tokio::io::BufReader;
use tracing::{debug, warn};

use super::Catalog;
use crate::auth::SessionUser;
use crate::error::{Error, Result};
use crate::storage::StorageError;
use crate::subscription::{SubscriptionLedger, has_active};
use crate::types::FileAsset;

/// A resolved download, ready to be streamed.
pub struct Download {
    pub file: FileAsset,
    pub reader: BufReader<File>,
    pub size: u64,
}

impl Download {
    /// The name the client should save the bytes under.
    pub fn suggested_filename(&self) -> &str {
        &self.file.original_name
    }
}

impl Catalog {
    /// Resolves `file_id` for `requester`. The subscription is checked before
    /// the catalog or disk is touched.
    pub async fn resolve_download(
        &self,
        ledger: &SubscriptionLedger,
        requester: &SessionUser,
        file_id: &str,
    ) -> Result<Download> {
        let grant = ledger.active_grant(&requester.id)?;
        if !has_active(grant.as_ref(), Utc::now()) {
            debug!(username = %requester.username, "Download refused without active subscription");
            return Err(Error::NoActiveSubscription);
        }

        let file = self
            .store
            .get_file(file_id)?
            .ok_or_else(|| Error::NotFound("File not found".to_string()))?;

        let (reader, size) = match self.storage.open(&file.stored_name).await {
            Ok(opened) => opened,
            Err(StorageError::NotFound) => {
                warn!(file_id, stored_name = %file.stored_name, "Catalog entry has no object on disk");
                return Err(Error::StorageMissing);
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Download { file, reader, size })
    }
}
