//! Document store holding events, event groups, chat messages and user profiles.
//!
//! Every successful write is announced on a broadcast change feed, which is what
//! the live group and message subscriptions listen to. Group writes are
//! compare-and-swap on the document `version`, so two clients racing for the
//! last seat of a group cannot both win.

pub mod memory;
pub mod postgres;

use crate::utils::chat::models::ChatMessage;
use crate::utils::events::models::Event;
use axum::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::warn;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Capacity of the change feed; slower subscribers see `Lagged` and re-read.
pub const CHANGE_FEED_CAPACITY: usize = 256;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),
    #[error("document changed since it was read")]
    Conflict,
    #[error("document not found")]
    NotFound,
}

impl From<sqlx::Error> for StoreError {
    fn from(val: sqlx::Error) -> Self {
        match val {
            sqlx::Error::RowNotFound => Self::NotFound,
            other => Self::Unavailable(anyhow::Error::new(other)),
        }
    }
}

/// Group document as the store keeps it. `member_count` is stored redundantly
/// so the store can filter groups with room without reading member lists.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupDocument {
    pub id: Uuid,
    pub event_id: String,
    pub members: Vec<String>,
    pub member_count: i64,
    pub version: i64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserDocument {
    pub id: String,
    pub name: Option<String>,
    pub is_local: Option<bool>,
}

/// Notification published after a successful write.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreChange {
    GroupChanged { event_id: String, group_id: Uuid },
    MessageAppended { event_id: String, group_id: Uuid, message_id: String },
    EventChanged { event_id: String },
    UserChanged { user_id: String },
}

#[async_trait]
pub trait GroupStore: Send + Sync {
    /// First group of the event (oldest created first) with `member_count < max_size`.
    async fn find_group_with_room(
        &self,
        event_id: &str,
        max_size: usize,
    ) -> Result<Option<GroupDocument>, StoreError>;

    async fn find_user_group_for_event(
        &self,
        event_id: &str,
        user_id: &str,
    ) -> Result<Option<GroupDocument>, StoreError>;

    async fn get_group(
        &self,
        event_id: &str,
        group_id: &Uuid,
    ) -> Result<Option<GroupDocument>, StoreError>;

    /// Creates an empty group (`members = []`, `member_count = 0`).
    async fn create_group(&self, event_id: &str) -> Result<GroupDocument, StoreError>;

    /// Replaces the member list and sets `member_count` to its length, but only
    /// if the stored version still equals `expected_version`.
    ///
    /// # Errors
    ///
    /// [`StoreError::Conflict`] when another write landed first.
    async fn update_members(
        &self,
        event_id: &str,
        group_id: &Uuid,
        expected_version: i64,
        members: &[String],
    ) -> Result<GroupDocument, StoreError>;

    async fn groups_for_user(&self, user_id: &str) -> Result<Vec<GroupDocument>, StoreError>;

    async fn append_message(
        &self,
        event_id: &str,
        group_id: &Uuid,
        message: &ChatMessage,
    ) -> Result<(), StoreError>;

    /// Messages of a group ordered by timestamp, then id.
    async fn list_messages(
        &self,
        event_id: &str,
        group_id: &Uuid,
    ) -> Result<Vec<ChatMessage>, StoreError>;

    async fn list_events(&self) -> Result<Vec<Event>, StoreError>;

    async fn get_event(&self, event_id: &str) -> Result<Option<Event>, StoreError>;

    async fn upsert_event(&self, event: &Event) -> Result<(), StoreError>;

    async fn upsert_user(&self, user: &UserDocument) -> Result<(), StoreError>;

    async fn get_user(&self, user_id: &str) -> Result<Option<UserDocument>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;

    fn changes(&self) -> broadcast::Receiver<StoreChange>;
}

/// Reads a stored `members` field. Anything but an array of strings is logged as
/// data corruption; the readable part is kept.
pub fn members_from_json(group_id: &Uuid, value: &Value) -> Vec<String> {
    let Some(items) = value.as_array() else {
        warn!(%group_id, "DataCorruption: members is not a list, treating as empty");
        return Vec::new();
    };

    let members: Vec<String> = items
        .iter()
        .filter_map(|item| item.as_str().map(str::to_owned))
        .collect();

    if members.len() != items.len() {
        warn!(
            %group_id,
            dropped = items.len() - members.len(),
            "DataCorruption: members contains non-string entries"
        );
    }
    members
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tracing_test::traced_test;

    #[test]
    #[traced_test]
    fn members_object_degrades_to_empty() {
        let members = members_from_json(&Uuid::new_v4(), &json!({"0": "alice"}));

        assert!(members.is_empty());
        assert!(logs_contain("DataCorruption"));
    }

    #[test]
    #[traced_test]
    fn members_keeps_string_entries() {
        let members = members_from_json(&Uuid::new_v4(), &json!(["alice", 7, "bob", null]));

        assert_eq!(members, vec!["alice".to_string(), "bob".to_string()]);
        assert!(logs_contain("non-string entries"));
    }

    #[test]
    fn members_well_formed() {
        let members = members_from_json(&Uuid::new_v4(), &json!(["alice", "bob"]));
        assert_eq!(members, vec!["alice".to_string(), "bob".to_string()]);
    }
}
