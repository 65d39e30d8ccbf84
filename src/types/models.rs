use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Role, SubscriptionType};

pub const DEFAULT_SITE_NAME: &str = "SPOOFER4YOU";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(skip)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionGrant {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub subscription_type: SubscriptionType,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAsset {
    pub id: String,
    /// Generated name the bytes live under; never derived from user input.
    pub stored_name: String,
    /// Name supplied by the uploader, used for display and as the download name.
    pub original_name: String,
    /// Location relative to the data directory.
    pub storage_path: String,
    pub size_bytes: i64,
    pub sha256: String,
    pub category_id: String,
    pub uploaded_at: DateTime<Utc>,
}

/// A category together with its files, newest upload first.
#[derive(Debug, Clone)]
pub struct CategoryWithFiles {
    pub category: Category,
    pub files: Vec<FileAsset>,
}

/// A user joined with the grant currently flagged active, if any.
#[derive(Debug, Clone)]
pub struct UserWithGrant {
    pub user: User,
    pub grant: Option<SubscriptionGrant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSettings {
    pub site_name: String,
    pub site_icon: String,
    pub header_image: String,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            site_name: DEFAULT_SITE_NAME.to_string(),
            site_icon: String::new(),
            header_image: String::new(),
        }
    }
}
