use crate::modules::store::UserDocument;
use serde::{Deserialize, Serialize};

pub const UNKNOWN_NAME: &str = "Unknown";

/// Display profile of a user. Missing stored fields fall back to defaults.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub is_local: bool,
}

impl UserProfile {
    pub fn unknown(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: UNKNOWN_NAME.to_string(),
            is_local: false,
        }
    }
}

impl From<UserDocument> for UserProfile {
    fn from(doc: UserDocument) -> Self {
        Self {
            name: doc.name.unwrap_or_else(|| UNKNOWN_NAME.to_string()),
            is_local: doc.is_local.unwrap_or(false),
            id: doc.id,
        }
    }
}

/// Partial update; absent fields keep their stored value.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub is_local: Option<bool>,
}
