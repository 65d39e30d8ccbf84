use std::sync::{Arc, OnceLock};

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{PasswordHasher, SessionKeys, SessionUser};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Role, User};

pub const MAX_USERNAME_LEN: usize = 6;
pub const MIN_PASSWORD_LEN: usize = 6;
const MAX_PASSWORD_LEN: usize = 256;

pub fn validate_username(username: &str) -> Result<()> {
    if username.is_empty() {
        return Err(Error::InvalidInput("Username is required".to_string()));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(Error::InvalidInput(format!(
            "Username must be {MAX_USERNAME_LEN} characters or less"
        )));
    }
    if username.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(Error::InvalidInput(
            "Username cannot contain whitespace".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<()> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(Error::InvalidInput(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if len > MAX_PASSWORD_LEN {
        return Err(Error::InvalidInput(format!(
            "Password cannot exceed {MAX_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Verifies credentials against the store and issues session tokens.
pub struct Authenticator {
    store: Arc<dyn Store>,
    hasher: PasswordHasher,
    sessions: SessionKeys,
    dummy_hash: OnceLock<String>,
}

impl Authenticator {
    pub fn new(store: Arc<dyn Store>, sessions: SessionKeys) -> Self {
        Self {
            store,
            hasher: PasswordHasher::new(),
            sessions,
            dummy_hash: OnceLock::new(),
        }
    }

    /// Self-service registration; always creates a `user`.
    pub fn register(&self, username: &str, password: &str) -> Result<User> {
        self.create_user(username, password, Role::User)
    }

    pub fn create_user(&self, username: &str, password: &str, role: Role) -> Result<User> {
        validate_username(username)?;
        validate_password(password)?;

        if self.store.get_user_by_username(username)?.is_some() {
            return Err(Error::Conflict("Username already taken".to_string()));
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            password_hash: self.hasher.hash(password)?,
            role,
            created_at: Utc::now(),
        };
        self.store.create_user(&user)?;

        info!(username = %user.username, role = %user.role, "User created");
        Ok(user)
    }

    /// Returns a signed session token for valid credentials.
    ///
    /// Unknown usernames and wrong passwords fail identically, and both pay
    /// for one hash verification.
    pub fn login(&self, username: &str, password: &str) -> Result<(String, User)> {
        if username.is_empty() || password.is_empty() {
            return Err(Error::InvalidInput(
                "Username and password required".to_string(),
            ));
        }
        if username.chars().count() > MAX_USERNAME_LEN {
            return Err(Error::InvalidInput(format!(
                "Username must be {MAX_USERNAME_LEN} characters or less"
            )));
        }

        let user = self.store.get_user_by_username(username)?;

        let verified = match &user {
            Some(user) => self.hasher.verify(password, &user.password_hash)?,
            None => {
                let _ = self.hasher.verify(password, self.dummy_hash()?);
                false
            }
        };

        let user = match (user, verified) {
            (Some(user), true) => user,
            _ => {
                warn!(username, "Failed login attempt");
                return Err(Error::InvalidCredentials);
            }
        };

        let token = self.sessions.issue(&user)?;
        info!(username = %user.username, "User logged in");
        Ok((token, user))
    }

    /// Validates a session token and confirms its identity still exists.
    pub fn verify(&self, token: &str) -> Result<User> {
        let claims = self.sessions.verify(token)?;
        let user = self
            .store
            .get_user(&claims.sub)?
            .ok_or(Error::InvalidToken)?;

        if SessionUser::from(&user) != SessionUser::from(claims) {
            return Err(Error::InvalidToken);
        }

        Ok(user)
    }

    fn dummy_hash(&self) -> Result<&str> {
        if let Some(hash) = self.dummy_hash.get() {
            return Ok(hash);
        }
        let hash = self.hasher.hash(&Uuid::new_v4().to_string())?;
        Ok(self.dummy_hash.get_or_init(|| hash))
    }
}
