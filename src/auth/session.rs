use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Role, User};

const SECRET_BYTES: usize = 32;
const MIN_SECRET_LEN: usize = 16;

/// Claims signed into every session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub username: String,
    pub role: Role,
    pub iat: i64,
    /// Present only when sessions are configured to expire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// The identity a verified session speaks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionUser {
    pub id: String,
    pub username: String,
    pub role: Role,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            role: user.role,
        }
    }
}

impl From<Claims> for SessionUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            username: claims.username,
            role: claims.role,
        }
    }
}

/// HS256 signing and verification keys derived from the server secret.
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Option<Duration>,
}

impl SessionKeys {
    pub fn new(secret: &[u8], ttl: Option<Duration>) -> Result<Self> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(Error::Config(format!(
                "session secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = true;

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        })
    }

    /// Signs a session token for `user`.
    pub fn issue(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.clone(),
            username: user.username.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: self.ttl.map(|ttl| (now + ttl).timestamp()),
        };
        self.sign(&claims)
    }

    pub fn sign(&self, claims: &Claims) -> Result<String> {
        Ok(encode(&Header::new(Algorithm::HS256), claims, &self.encoding)?)
    }

    /// Checks the signature (and expiry, when present) of a token.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => Error::TokenExpired,
                _ => Error::InvalidToken,
            })
    }
}

/// Generates a random URL-safe secret suitable for [`SessionKeys::new`].
#[must_use]
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(ttl: Option<Duration>) -> SessionKeys {
        SessionKeys::new(b"0123456789abcdef0123456789abcdef", ttl).unwrap()
    }

    fn user() -> User {
        User {
            id: "user-1".to_string(),
            username: "bob".to_string(),
            password_hash: String::new(),
            role: Role::User,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let keys = keys(None);
        let token = keys.issue(&user()).unwrap();

        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.username, "bob");
        assert_eq!(claims.role, Role::User);
        assert!(claims.exp.is_none());
    }

    #[test]
    fn test_ttl_adds_expiry() {
        let keys = keys(Some(Duration::hours(2)));
        let token = keys.issue(&user()).unwrap();

        let claims = keys.verify(&token).unwrap();
        let exp = claims.exp.unwrap();
        assert!((exp - claims.iat - 7200).abs() <= 1);
    }

    #[test]
    fn test_expired_token_rejected() {
        let keys = keys(None);
        let past = Utc::now() - Duration::hours(3);
        let token = keys
            .sign(&Claims {
                sub: "user-1".to_string(),
                username: "bob".to_string(),
                role: Role::User,
                iat: past.timestamp(),
                exp: Some((past + Duration::hours(1)).timestamp()),
            })
            .unwrap();

        assert!(matches!(keys.verify(&token), Err(Error::TokenExpired)));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let keys = keys(None);
        let token = keys.issue(&user()).unwrap();

        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_claims = URL_SAFE_NO_PAD.encode(
            serde_json::json!({"sub": "user-1", "username": "bob", "role": "admin", "iat": 0})
                .to_string(),
        );
        parts[1] = &forged_claims;
        let forged = parts.join(".");

        assert!(matches!(keys.verify(&forged), Err(Error::InvalidToken)));
    }

    #[test]
    fn test_foreign_secret_rejected() {
        let token = keys(None).issue(&user()).unwrap();
        let other = SessionKeys::new(b"another-secret-another-secret!!", None).unwrap();

        assert!(matches!(other.verify(&token), Err(Error::InvalidToken)));
        assert!(matches!(other.verify("garbage"), Err(Error::InvalidToken)));
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(matches!(SessionKeys::new(b"short", None), Err(Error::Config(_))));
    }

    #[test]
    fn test_generated_secret_is_usable() {
        let secret = generate_secret();
        assert!(secret.len() >= 40);
        assert!(SessionKeys::new(secret.as_bytes(), None).is_ok());
    }
}
