//! Identity tokens. Sign-in happens at the external identity provider; this
//! service only checks the access token it is handed and reads the user id.

pub mod errors;

use crate::modules::extractors::jwt::JwtAccessSecret;
use anyhow::Context;
use errors::AuthError;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use time::Duration;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Claims {
    /// User id assigned by the identity provider.
    pub sub: String,
    pub exp: u64,
}

impl Claims {
    pub fn new(user_id: &str, duration: Duration) -> Self {
        Self {
            sub: user_id.to_string(),
            exp: jsonwebtoken::get_current_timestamp() + duration.whole_seconds().unsigned_abs(),
        }
    }
}

pub fn create_access_token(
    user_id: &str,
    duration: Duration,
    secret: &JwtAccessSecret,
) -> Result<String, AuthError> {
    if user_id.trim().is_empty() {
        return Err(AuthError::NotAuthenticated);
    }
    let JwtAccessSecret(key) = secret;
    let token = encode(
        &Header::default(),
        &Claims::new(user_id, duration),
        &EncodingKey::from_secret(key.expose_secret().as_bytes()),
    )
    .context("Failed to encode the access JWT")?;

    Ok(token)
}

pub fn validate_access_token(token: &str, secret: &JwtAccessSecret) -> Result<Claims, AuthError> {
    let mut validation = Validation::default();
    validation.leeway = 5;

    let JwtAccessSecret(key) = secret;
    let claims: Claims = decode(
        token,
        &DecodingKey::from_secret(key.expose_secret().as_bytes()),
        &validation,
    )
    .map_err(|_e| AuthError::InvalidToken)?
    .claims;

    if claims.sub.trim().is_empty() {
        return Err(AuthError::NotAuthenticated);
    }
    Ok(claims)
}
