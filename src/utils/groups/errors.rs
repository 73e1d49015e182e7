use crate::modules::store::StoreError;
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GroupError {
    #[error("Not authenticated")]
    NotAuthenticated,
    #[error("Group capacity must be at least 1")]
    InvalidCapacity,
    #[error("Missing one or more group fields")]
    MissingGroupField,
    #[error("Group does not exist")]
    GroupDoesNotExist,
    #[error("Too many concurrent changes to this event's groups, try again")]
    Contention,
    #[error("Store unavailable")]
    StoreUnavailable(#[from] StoreError),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl IntoResponse for GroupError {
    fn into_response(self) -> axum::response::Response {
        let status_code = match &self {
            GroupError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            GroupError::InvalidCapacity => StatusCode::BAD_REQUEST,
            GroupError::MissingGroupField => StatusCode::BAD_REQUEST,
            GroupError::GroupDoesNotExist => StatusCode::NOT_FOUND,
            GroupError::Contention => StatusCode::CONFLICT,
            GroupError::StoreUnavailable(e) => {
                tracing::error!("Store unavailable: {e:?}");
                StatusCode::SERVICE_UNAVAILABLE
            }
            GroupError::Unexpected(e) => {
                tracing::error!("Internal server error: {e:?}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let info = match self {
            GroupError::Unexpected(_) => "Unexpected server error".into(),
            _ => self.to_string(),
        };

        (status_code, Json(json!({ "error_info": info }))).into_response()
    }
}
