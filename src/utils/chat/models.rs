use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// `<epoch millis>-<random suffix>`: sorts by send time, unique across senders.
    pub id: String,
    pub sender_id: String,
    pub text: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

impl ChatMessage {
    pub fn new(sender_id: &str, text: &str) -> Self {
        let timestamp = now_millis();
        Self {
            id: format!("{timestamp}-{}", nanoid::nanoid!(10)),
            sender_id: sender_id.to_string(),
            text: text.to_string(),
            timestamp,
        }
    }
}

pub fn now_millis() -> i64 {
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
    i64::try_from(nanos / 1_000_000).unwrap_or(i64::MAX)
}

#[derive(Deserialize)]
pub struct NewMessage {
    pub text: String,
}
