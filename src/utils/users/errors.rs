use crate::modules::store::StoreError;
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UserError {
    #[error("Not authenticated")]
    NotAuthenticated,
    #[error("Missing user name")]
    MissingName,
    #[error("Store unavailable")]
    StoreUnavailable(#[from] StoreError),
}

impl IntoResponse for UserError {
    fn into_response(self) -> axum::response::Response {
        let status_code = match &self {
            UserError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            UserError::MissingName => StatusCode::BAD_REQUEST,
            UserError::StoreUnavailable(e) => {
                tracing::error!("Store unavailable: {e:?}");
                StatusCode::SERVICE_UNAVAILABLE
            }
        };

        (status_code, Json(json!({ "error_info": self.to_string() }))).into_response()
    }
}
