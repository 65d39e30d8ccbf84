use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

const BUSY_TIMEOUT_MS: u64 = 5_000;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(std::time::Duration::from_millis(BUSY_TIMEOUT_MS))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    let role: String = row.get(3)?;
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        role: Role::parse(&role).ok_or_else(|| conversion_error(3, format!("unknown role '{role}'")))?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

/// Maps a grant starting at column `offset`.
fn row_to_grant(row: &Row<'_>, offset: usize) -> rusqlite::Result<SubscriptionGrant> {
    let kind: String = row.get(offset + 2)?;
    Ok(SubscriptionGrant {
        id: row.get(offset)?,
        user_id: row.get(offset + 1)?,
        subscription_type: SubscriptionType::parse(&kind).ok_or_else(|| {
            conversion_error(offset + 2, format!("unknown subscription type '{kind}'"))
        })?,
        expires_at: parse_datetime(&row.get::<_, String>(offset + 3)?),
        is_active: row.get(offset + 4)?,
        created_at: parse_datetime(&row.get::<_, String>(offset + 5)?),
    })
}

fn row_to_file(row: &Row<'_>, offset: usize) -> rusqlite::Result<FileAsset> {
    Ok(FileAsset {
        id: row.get(offset)?,
        stored_name: row.get(offset + 1)?,
        original_name: row.get(offset + 2)?,
        storage_path: row.get(offset + 3)?,
        size_bytes: row.get(offset + 4)?,
        sha256: row.get(offset + 5)?,
        category_id: row.get(offset + 6)?,
        uploaded_at: parse_datetime(&row.get::<_, String>(offset + 7)?),
    })
}

const USER_COLUMNS: &str = "id, username, password_hash, role, created_at";
const FILE_COLUMNS: &str =
    "id, stored_name, original_name, storage_path, size_bytes, sha256, category_id, uploaded_at";

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO users (id, username, password_hash, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.id,
                user.username,
                user.password_hash,
                user.role.as_str(),
                format_datetime(&user.created_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::Conflict("Username already taken".to_string()))
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            row_to_user,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
            params![username],
            row_to_user,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_users(&self) -> Result<Vec<UserWithGrant>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT u.id, u.username, u.password_hash, u.role, u.created_at,
                    s.id, s.user_id, s.type, s.expires_at, s.is_active, s.created_at
             FROM users u
             LEFT JOIN subscriptions s ON s.user_id = u.id AND s.is_active = 1
             ORDER BY u.created_at DESC, u.id",
        )?;

        let rows = stmt.query_map([], |row| {
            let user = row_to_user(row)?;
            let grant = match row.get::<_, Option<String>>(5)? {
                Some(_) => Some(row_to_grant(row, 5)?),
                None => None,
            };
            Ok(UserWithGrant { user, grant })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn has_admin(&self) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM users WHERE role = 'admin'",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // Subscription operations

    fn replace_active_grant(&self, grant: &SubscriptionGrant) -> Result<SubscriptionGrant> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let user_exists = tx
            .query_row(
                "SELECT 1 FROM users WHERE id = ?1",
                params![grant.user_id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if !user_exists {
            return Err(Error::NotFound("User not found".to_string()));
        }

        let newest: Option<String> = tx.query_row(
            "SELECT MAX(created_at) FROM subscriptions WHERE user_id = ?1",
            params![grant.user_id],
            |row| row.get(0),
        )?;

        // The last committed grant must also be the newest one.
        let mut stored = grant.clone();
        stored.is_active = true;
        stored.created_at = stored.created_at.trunc_subsecs(6);
        stored.expires_at = stored.expires_at.trunc_subsecs(6);
        if let Some(newest) = newest
            .as_deref()
            .map(parse_datetime)
            .filter(|newest| stored.created_at <= *newest)
        {
            let shift = newest - stored.created_at + Duration::microseconds(1);
            stored.created_at += shift;
            stored.expires_at += shift;
        }

        tx.execute(
            "UPDATE subscriptions SET is_active = 0 WHERE user_id = ?1 AND is_active = 1",
            params![stored.user_id],
        )?;

        tx.execute(
            "INSERT INTO subscriptions (id, user_id, type, expires_at, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, 1, ?5)",
            params![
                stored.id,
                stored.user_id,
                stored.subscription_type.as_str(),
                format_datetime(&stored.expires_at),
                format_datetime(&stored.created_at),
            ],
        )?;

        tx.commit()?;
        Ok(stored)
    }

    fn get_active_grant(&self, user_id: &str) -> Result<Option<SubscriptionGrant>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, user_id, type, expires_at, is_active, created_at
             FROM subscriptions WHERE user_id = ?1 AND is_active = 1
             ORDER BY created_at DESC LIMIT 1",
            params![user_id],
            |row| row_to_grant(row, 0),
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_grants(&self, user_id: &str) -> Result<Vec<SubscriptionGrant>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, type, expires_at, is_active, created_at
             FROM subscriptions WHERE user_id = ?1
             ORDER BY created_at, rowid",
        )?;

        let rows = stmt.query_map(params![user_id], |row| row_to_grant(row, 0))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Category operations

    fn create_category(&self, category: &Category) -> Result<()> {
        self.conn().execute(
            "INSERT INTO categories (id, name, created_at) VALUES (?1, ?2, ?3)",
            params![
                category.id,
                category.name,
                format_datetime(&category.created_at)
            ],
        )?;
        Ok(())
    }

    fn list_categories_with_files(&self) -> Result<Vec<CategoryWithFiles>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT c.id, c.name, c.created_at,
                    f.id, f.stored_name, f.original_name, f.storage_path, f.size_bytes,
                    f.sha256, f.category_id, f.uploaded_at
             FROM categories c
             LEFT JOIN files f ON f.category_id = c.id
             ORDER BY c.name, c.created_at, c.id, f.uploaded_at DESC, f.id",
        )?;

        let mut rows = stmt.query([])?;
        let mut result: Vec<CategoryWithFiles> = Vec::new();

        while let Some(row) = rows.next()? {
            let category_id: String = row.get(0)?;

            let is_new = result
                .last()
                .is_none_or(|last| last.category.id != category_id);
            if is_new {
                result.push(CategoryWithFiles {
                    category: Category {
                        id: category_id,
                        name: row.get(1)?,
                        created_at: parse_datetime(&row.get::<_, String>(2)?),
                    },
                    files: Vec::new(),
                });
            }

            if row.get::<_, Option<String>>(3)?.is_some() {
                let file = row_to_file(row, 3)?;
                if let Some(current) = result.last_mut() {
                    current.files.push(file);
                }
            }
        }

        Ok(result)
    }

    // File operations

    fn create_file(&self, file: &FileAsset) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let category_exists = tx
            .query_row(
                "SELECT 1 FROM categories WHERE id = ?1",
                params![file.category_id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if !category_exists {
            return Err(Error::NotFound("Category not found".to_string()));
        }

        tx.execute(
            &format!("INSERT INTO files ({FILE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
            params![
                file.id,
                file.stored_name,
                file.original_name,
                file.storage_path,
                file.size_bytes,
                file.sha256,
                file.category_id,
                format_datetime(&file.uploaded_at),
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn get_file(&self, id: &str) -> Result<Option<FileAsset>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {FILE_COLUMNS} FROM files WHERE id = ?1"),
            params![id],
            |row| row_to_file(row, 0),
        )
        .optional()
        .map_err(Error::from)
    }

    fn delete_file(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM files WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Settings

    fn get_settings(&self) -> Result<SiteSettings> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT key, value FROM settings")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut settings = SiteSettings::default();
        for row in rows {
            let (key, value) = row?;
            match key.as_str() {
                "siteName" => settings.site_name = value,
                "siteIcon" => settings.site_icon = value,
                "headerImage" => settings.header_image = value,
                other => tracing::debug!("Ignoring unknown setting '{other}'"),
            }
        }

        Ok(settings)
    }

    fn update_settings(&self, settings: &SiteSettings) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        for (key, value) in [
            ("siteName", &settings.site_name),
            ("siteIcon", &settings.site_icon),
            ("headerImage", &settings.header_image),
        ] {
            tx.execute(
                "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
                params![key, value],
            )?;
        }

        tx.commit()?;
        Ok(())
    }
}
