//! # Filegate
//!
//! A subscription-gated file distribution server, usable both as a standalone
//! binary and as a library. Users sign in, admins grant time-boxed
//! subscriptions, and only users with an active subscription may download the
//! files admins upload into categories.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! filegate = { version = "0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::path::Path;
//! use filegate::auth::SessionKeys;
//! use filegate::catalog::MAX_FILE_SIZE;
//! use filegate::server::{AppState, create_router};
//! use filegate::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new("./data/filegate.db").unwrap();
//! store.initialize().unwrap();
//!
//! let sessions = SessionKeys::new(b"a-long-random-signing-secret", None).unwrap();
//! let state = Arc::new(AppState::new(
//!     Arc::new(store),
//!     sessions,
//!     Path::new("./data"),
//!     MAX_FILE_SIZE,
//! ));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes the admin CLI module. Disable with `default-features = false`.

pub mod auth;
pub mod catalog;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod server;
pub mod storage;
pub mod store;
pub mod subscription;
pub mod types;
