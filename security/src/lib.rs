// security/src/lib.rs
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2, PasswordHash, PasswordVerifier,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use models::{ClinicError, Role, User};

pub mod middleware;
pub mod roles;

pub use middleware::{authenticate_bearer, bearer_token};
pub use roles::require_role;

/// Issued tokens stay valid for seven days.
pub const DEFAULT_TOKEN_TTL_DAYS: i64 = 7;

/// Claims carried by every bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub role: Role,
    pub identifier: String,
    pub iat: i64,
    pub exp: i64,
}

/// The authenticated caller, as recovered from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub role: Role,
    pub identifier: String,
}

impl AuthUser {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        AuthUser { id: id.into(), role, identifier: String::new() }
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        AuthUser { id: claims.sub, role: claims.role, identifier: claims.identifier }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing Bearer token")]
    MissingToken,
    #[error("Invalid or expired token")]
    InvalidToken(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Forbidden")]
    Forbidden(String),
    #[error("Password hashing error: {0}")]
    PasswordHash(String),
    #[error("JWT error: {0}")]
    Jwt(String),
}

impl From<AuthError> for ClinicError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken | AuthError::InvalidToken(_) | AuthError::InvalidCredentials => {
                ClinicError::Unauthenticated(err.to_string())
            }
            AuthError::Forbidden(_) => ClinicError::Forbidden(err.to_string()),
            AuthError::PasswordHash(msg) | AuthError::Jwt(msg) => ClinicError::Internal(msg),
        }
    }
}

/// Hashes a password using Argon2 with a random salt.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::PasswordHash(format!("Failed to hash password with Argon2: {}", e)))
}

/// Verifies a password against an Argon2 hash. A mismatch is `Ok(false)`;
/// only a malformed stored hash is an error.
pub fn verify_password(password: &str, hashed_password: &str) -> Result<bool, AuthError> {
    let password_hash = PasswordHash::new(hashed_password)
        .map_err(|e| AuthError::PasswordHash(format!("Failed to parse Argon2 password hash: {}", e)))?;
    match Argon2::default().verify_password(password.as_bytes(), &password_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::PasswordHash(format!("Failed to verify Argon2 password: {}", e))),
    }
}

/// Signs and verifies HS256 bearer tokens with a shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str) -> Self {
        Self::with_ttl(secret, Duration::days(DEFAULT_TOKEN_TTL_DAYS))
    }

    pub fn with_ttl(secret: &str, ttl: Duration) -> Self {
        TokenIssuer {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        self.sign(&user.id, user.role, &user.identifier())
    }

    pub fn sign(&self, subject: &str, role: Role, identifier: &str) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            role,
            identifier: identifier.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Jwt(format!("Failed to encode JWT: {}", e)))
    }

    /// Decodes and validates a token, including its expiry.
    pub fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| AuthUser::from(data.claims))
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doctor_user() -> User {
        User {
            id: "doc-1".into(),
            username: Some("dr.house".into()),
            email: None,
            phone: None,
            name: "Gregory House".into(),
            password_hash: String::new(),
            role: Role::Doctor,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn hashed_passwords_verify() {
        let hash = hash_password("s3cret").unwrap();
        assert_ne!(hash, "s3cret");
        assert_eq!(verify_password("s3cret", &hash), Ok(true));
        assert_eq!(verify_password("wrong", &hash), Ok(false));
    }

    #[test]
    fn malformed_hash_is_an_error_not_a_mismatch() {
        assert!(matches!(verify_password("x", "not-a-hash"), Err(AuthError::PasswordHash(_))));
    }

    #[test]
    fn issued_tokens_carry_subject_role_and_identifier() {
        let issuer = TokenIssuer::new("test-secret");
        let token = issuer.issue(&doctor_user()).unwrap();
        let actor = issuer.verify(&token).unwrap();
        assert_eq!(actor.id, "doc-1");
        assert_eq!(actor.role, Role::Doctor);
        assert_eq!(actor.identifier, "dr.house");
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() {
        let token = TokenIssuer::new("one").issue(&doctor_user()).unwrap();
        assert!(matches!(TokenIssuer::new("two").verify(&token), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let issuer = TokenIssuer::with_ttl("test-secret", Duration::hours(-2));
        let token = issuer.issue(&doctor_user()).unwrap();
        assert!(matches!(issuer.verify(&token), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn auth_errors_map_onto_clinic_error_classes() {
        assert!(matches!(ClinicError::from(AuthError::MissingToken), ClinicError::Unauthenticated(_)));
        assert!(matches!(
            ClinicError::from(AuthError::Forbidden("DOCTOR".into())),
            ClinicError::Forbidden(_)
        ));
    }
}
