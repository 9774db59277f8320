use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{config::AppConfig, error::AppError, models::Role};

// The only message a token failure ever produces.
const INVALID_TOKEN: &str = "Token is missing or invalid";

fn invalid_token() -> AppError {
    AppError::Unauthenticated(INVALID_TOKEN.to_string())
}

/// Claims
///
/// Payload of the bearer token. The token is self-contained: identity, role and expiry travel
/// inside it, and no session state is kept on the server.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the account id.
    pub sub: Uuid,
    /// The account's role at issue time.
    pub role: Role,
    /// Expiration Time (exp): checked on every request.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

/// AuthUser Extractor Result
///
/// The resolved identity of an authenticated request. Handlers use it for role and
/// ownership decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

impl AuthUser {
    /// role_required
    ///
    /// Fails with `Forbidden` unless the caller's role is one of `allowed`.
    pub fn require_role(&self, allowed: &[Role]) -> Result<(), AppError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden("Insufficient permissions".to_string()))
        }
    }
}

/// AuthUser Extractor Implementation
///
/// Makes `AuthUser` usable as a handler argument. Extraction:
/// 1. Reads the `Authorization` header and strips the `Bearer ` prefix.
/// 2. Decodes the JWT with the configured secret, validating signature and expiry.
///
/// Rejection: `AppError::Unauthenticated` (401) with the same message on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(invalid_token)?;

        let claims = decode_token(&config, token)?;

        Ok(AuthUser {
            id: claims.sub,
            role: claims.role,
        })
    }
}

/// issue_token
///
/// Signs a token for `account_id` valid for `config.token_ttl_hours`.
pub fn issue_token(config: &AppConfig, account_id: Uuid, role: Role) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        sub: account_id,
        role,
        iat: now.timestamp() as usize,
        exp: (now + Duration::hours(config.token_ttl_hours)).timestamp() as usize,
    };

    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    encode(&Header::default(), &claims, &key).map_err(|e| AppError::Credential(e.to_string()))
}

/// decode_token
///
/// Validates signature and expiry. Every failure kind (bad signature, malformed token,
/// expired token) collapses into `Unauthenticated`.
pub fn decode_token(config: &AppConfig, token: &str) -> Result<Claims, AppError> {
    let key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

    let mut validation = Validation::default();
    validation.validate_exp = true;

    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(kind = ?e.kind(), "rejected bearer token");
            invalid_token()
        })
}

/// Hashes a password with Argon2id and a fresh random salt (PHC string format).
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Credential(e.to_string()))
}

/// Checks a password against a stored PHC hash. Unparsable hashes never verify.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}
