use crate::{
    state::AppState,
    utils::auth::{errors::AuthError, validate_access_token},
};
use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::{header::AUTHORIZATION, request::Parts},
};
use secrecy::Secret;
use serde::Deserialize;

#[derive(Clone)]
pub struct JwtAccessSecret(pub Secret<String>);

#[derive(Clone)]
pub struct TokenExtractors {
    pub access: JwtAccessSecret,
}

/// User resolved from the access token. Handlers taking this never run for
/// anonymous requests.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        req: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = match bearer_token(req) {
            Some(token) => token,
            // browsers cannot set headers on a websocket upgrade
            None => Query::<TokenQuery>::from_request_parts(req, state)
                .await
                .ok()
                .and_then(|Query(query)| query.token)
                .ok_or(AuthError::NotAuthenticated)?,
        };

        let claims = validate_access_token(&token, &state.token_ext.access)?;
        Ok(AuthUser {
            user_id: claims.sub,
        })
    }
}

fn bearer_token(req: &Parts) -> Option<String> {
    let value = req.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}
