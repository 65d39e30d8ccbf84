use std::fs;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::catalog::MAX_FILE_SIZE;
use crate::error::{Error, Result};

/// Name of the signing secret written by `admin init`.
pub const SECRET_FILE: &str = ".session_secret";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Signing secret for session tokens. Falls back to the secret file in
    /// `data_dir` when unset.
    pub session_secret: Option<String>,
    /// Session lifetime. Tokens never expire when unset.
    pub session_ttl_hours: Option<u64>,
    pub max_upload_bytes: u64,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("filegate.db")
    }

    #[must_use]
    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join(crate::storage::UPLOADS_DIR)
    }

    #[must_use]
    pub fn secret_path(&self) -> PathBuf {
        self.data_dir.join(SECRET_FILE)
    }

    #[must_use]
    pub fn session_ttl(&self) -> Option<chrono::Duration> {
        self.session_ttl_hours
            .and_then(|hours| i64::try_from(hours).ok())
            .map(chrono::Duration::hours)
    }

    /// The configured secret, or the one persisted at [`Self::secret_path`].
    pub fn resolve_session_secret(&self) -> Result<String> {
        if let Some(secret) = self.session_secret.as_deref().map(str::trim) {
            if !secret.is_empty() {
                return Ok(secret.to_string());
            }
        }

        let path = self.secret_path();
        match fs::read_to_string(&path) {
            Ok(contents) => {
                let secret = contents.trim();
                if secret.is_empty() {
                    return Err(Error::Config(format!(
                        "session secret file {} is empty",
                        path.display()
                    )));
                }
                Ok(secret.to_string())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::Config(format!(
                "no session secret configured and {} does not exist",
                path.display()
            ))),
            Err(e) => Err(e.into()),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            data_dir: PathBuf::from("./data"),
            session_secret: None,
            session_ttl_hours: None,
            max_upload_bytes: MAX_FILE_SIZE,
        }
    }
}
