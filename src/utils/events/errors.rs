use crate::modules::store::StoreError;
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventError {
    #[error("Event does not exist")]
    EventDoesNotExist,
    #[error("Missing event title")]
    MissingTitle,
    #[error("Fullness must be between 0 and 100")]
    InvalidFullness,
    #[error("Store unavailable")]
    StoreUnavailable(#[from] StoreError),
}

impl IntoResponse for EventError {
    fn into_response(self) -> axum::response::Response {
        let status_code = match &self {
            EventError::EventDoesNotExist => StatusCode::NOT_FOUND,
            EventError::MissingTitle => StatusCode::BAD_REQUEST,
            EventError::InvalidFullness => StatusCode::BAD_REQUEST,
            EventError::StoreUnavailable(e) => {
                tracing::error!("Store unavailable: {e:?}");
                StatusCode::SERVICE_UNAVAILABLE
            }
        };

        (status_code, Json(json!({ "error_info": self.to_string() }))).into_response()
    }
}
