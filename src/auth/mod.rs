mod authenticator;
mod helpers;
mod middleware;
mod password;
mod session;

pub use authenticator::{
    Authenticator, MAX_USERNAME_LEN, MIN_PASSWORD_LEN, validate_password, validate_username,
};
pub use middleware::{AuthError, RequireAdmin, RequireAuth};
pub use password::PasswordHasher;
pub use session::{Claims, SessionKeys, SessionUser, generate_secret};
