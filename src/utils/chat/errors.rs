use crate::modules::store::StoreError;
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Not authenticated")]
    NotAuthenticated,
    #[error("Empty message")]
    EmptyMessage,
    #[error("Message is too long")]
    MessageTooLong,
    #[error("Group does not exist")]
    GroupDoesNotExist,
    #[error("User not in group")]
    NotGroupMember,
    #[error("Store unavailable")]
    StoreUnavailable(#[source] StoreError),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl From<StoreError> for ChatError {
    fn from(val: StoreError) -> Self {
        match val {
            StoreError::NotFound => ChatError::GroupDoesNotExist,
            other => ChatError::StoreUnavailable(other),
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> axum::response::Response {
        let status_code = match &self {
            ChatError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            ChatError::EmptyMessage => StatusCode::BAD_REQUEST,
            ChatError::MessageTooLong => StatusCode::BAD_REQUEST,
            ChatError::GroupDoesNotExist => StatusCode::NOT_FOUND,
            ChatError::NotGroupMember => StatusCode::FORBIDDEN,
            ChatError::StoreUnavailable(e) => {
                tracing::error!("Store unavailable: {e:?}");
                StatusCode::SERVICE_UNAVAILABLE
            }
            ChatError::Unexpected(e) => {
                tracing::error!("Internal server error: {e:?}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let info = match self {
            ChatError::Unexpected(_) => "Unexpected server error".into(),
            _ => self.to_string(),
        };

        (status_code, Json(json!({ "error_info": info }))).into_response()
    }
}
