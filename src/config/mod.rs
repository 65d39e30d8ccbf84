mod server;

pub use server::{SECRET_FILE, ServerConfig};
