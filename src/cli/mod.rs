mod commands;
mod info;
mod init;
mod subscription;
mod user;

pub use commands::{AdminCommands, UserCommands};
pub use info::run_info;
pub use init::{DEFAULT_ADMIN_USERNAME, DEFAULT_CATEGORY, run_init};
pub use subscription::run_grant;
pub use user::run_user_add;

use crate::store::{SqliteStore, Store};

/// Initialize store from data directory, checking it exists
pub fn init_store(data_dir: &str) -> anyhow::Result<SqliteStore> {
    let data_path: std::path::PathBuf = data_dir.into();
    let db_path = data_path.join("filegate.db");

    if !db_path.exists() {
        anyhow::bail!(
            "Database not found at {}. Run 'filegate admin init' first.",
            db_path.display()
        );
    }

    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;
    Ok(store)
}
