use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::bail;
use inquire::{Password, PasswordDisplayMode};

use crate::auth::{Authenticator, SessionKeys, generate_secret, validate_password};
use crate::catalog::{Catalog, MAX_FILE_SIZE};
use crate::config::SECRET_FILE;
use crate::storage::FileStorage;
use crate::store::{SqliteStore, Store};
use crate::types::{Role, SiteSettings};

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_CATEGORY: &str = "SPOOFER4YOU";

const GENERATED_PASSWORD_LEN: usize = 16;

#[cfg(unix)]
fn set_restrictive_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

/// Reads the existing signing secret or writes a fresh one.
fn ensure_secret(path: &Path) -> anyhow::Result<String> {
    if let Ok(existing) = fs::read_to_string(path) {
        let existing = existing.trim();
        if !existing.is_empty() {
            return Ok(existing.to_string());
        }
    }

    let secret = generate_secret();
    fs::write(path, &secret)?;

    #[cfg(unix)]
    set_restrictive_permissions(path);

    Ok(secret)
}

fn prompt_admin_password() -> anyhow::Result<String> {
    let password = Password::new("Admin password:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .with_validator(|input: &str| {
            Ok(validate_password(input)
                .map(|()| inquire::validator::Validation::Valid)
                .unwrap_or_else(|e| inquire::validator::Validation::Invalid(e.to_string().into())))
        })
        .prompt()?;
    Ok(password)
}

pub fn run_init(
    data_dir: String,
    admin_password: Option<String>,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let data_path: PathBuf = data_dir.into();
    fs::create_dir_all(&data_path)?;

    let store = Arc::new(SqliteStore::new(data_path.join("filegate.db"))?);
    store.initialize()?;

    if store.has_admin()? {
        bail!(
            "Server already initialized. Database exists at: {}",
            data_path.join("filegate.db").display()
        );
    }

    let secret_path = data_path.join(SECRET_FILE);
    let secret = ensure_secret(&secret_path)?;

    let storage = FileStorage::new(&data_path);
    fs::create_dir_all(storage.base_path())?;

    let (password, generated) = match admin_password {
        Some(password) => (password, false),
        None if non_interactive => (
            generate_secret().chars().take(GENERATED_PASSWORD_LEN).collect(),
            true,
        ),
        None => (prompt_admin_password()?, false),
    };

    let auth = Authenticator::new(store.clone(), SessionKeys::new(secret.as_bytes(), None)?);
    auth.create_user(DEFAULT_ADMIN_USERNAME, &password, Role::Admin)?;

    let catalog = Catalog::new(store.clone(), storage, MAX_FILE_SIZE);
    catalog.create_category(DEFAULT_CATEGORY)?;

    store.update_settings(&SiteSettings::default())?;

    println!();
    println!("========================================");
    println!("Created admin user '{DEFAULT_ADMIN_USERNAME}'.");
    if generated {
        println!();
        println!("Generated password (save this, it won't be shown again):");
        println!();
        println!("  {password}");
    }
    println!();
    println!("Session secret written to: {}", secret_path.display());
    println!("========================================");
    println!();

    Ok(())
}
