mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    fn list_users(&self) -> Result<Vec<UserWithGrant>>;
    fn has_admin(&self) -> Result<bool>;

    // Subscription operations

    /// Deactivates every grant held by `grant.user_id` and inserts `grant`
    /// as the sole active one, in a single transaction. A grant stamped no
    /// later than the user's newest is moved just past it, keeping its
    /// duration. Returns the grant as stored.
    fn replace_active_grant(&self, grant: &SubscriptionGrant) -> Result<SubscriptionGrant>;
    fn get_active_grant(&self, user_id: &str) -> Result<Option<SubscriptionGrant>>;
    fn list_grants(&self, user_id: &str) -> Result<Vec<SubscriptionGrant>>;

    // Category operations
    fn create_category(&self, category: &Category) -> Result<()>;
    fn list_categories_with_files(&self) -> Result<Vec<CategoryWithFiles>>;

    // File operations
    fn create_file(&self, file: &FileAsset) -> Result<()>;
    fn get_file(&self, id: &str) -> Result<Option<FileAsset>>;
    fn delete_file(&self, id: &str) -> Result<bool>;

    // Settings
    fn get_settings(&self) -> Result<SiteSettings>;
    fn update_settings(&self, settings: &SiteSettings) -> Result<()>;
}
