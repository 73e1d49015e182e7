use super::{
    members_from_json, GroupDocument, GroupStore, StoreChange, StoreError, UserDocument,
    CHANGE_FEED_CAPACITY,
};
use crate::utils::chat::models::ChatMessage;
use crate::utils::events::models::Event;
use crate::utils::map::models::Location;
use axum::async_trait;
use serde_json::{json, Value};
use sqlx::{FromRow, PgPool};
use tokio::sync::broadcast;
use uuid::Uuid;

const GROUP_COLUMNS: &str = "id, event_id, members, member_count, version";

#[derive(FromRow)]
struct GroupRow {
    id: Uuid,
    event_id: String,
    members: Value,
    member_count: i32,
    version: i64,
}

impl From<GroupRow> for GroupDocument {
    fn from(row: GroupRow) -> Self {
        Self {
            members: members_from_json(&row.id, &row.members),
            id: row.id,
            event_id: row.event_id,
            member_count: i64::from(row.member_count),
            version: row.version,
        }
    }
}

#[derive(FromRow)]
struct MessageRow {
    id: String,
    sender_id: String,
    text: String,
    sent_at: i64,
}

impl From<MessageRow> for ChatMessage {
    fn from(row: MessageRow) -> Self {
        Self {
            id: row.id,
            sender_id: row.sender_id,
            text: row.text,
            timestamp: row.sent_at,
        }
    }
}

#[derive(FromRow)]
struct EventRow {
    id: String,
    title: String,
    location: String,
    image_url: String,
    fullness_percentage: i32,
    is_trending: bool,
    start_time: String,
    category: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        let coordinates = match (row.latitude, row.longitude) {
            (Some(latitude), Some(longitude)) => Some(Location {
                latitude,
                longitude,
            }),
            _ => None,
        };
        Self {
            id: row.id,
            title: row.title,
            location: row.location,
            image_url: row.image_url,
            fullness_percentage: row.fullness_percentage,
            is_trending: row.is_trending,
            start_time: row.start_time,
            category: row.category,
            coordinates,
        }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: String,
    name: Option<String>,
    is_local: Option<bool>,
}

/// Postgres-backed store. The change feed is process local: it reports writes
/// made through this pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    changes: broadcast::Sender<StoreChange>,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        let (changes, _rx) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self { pool, changes }
    }

    fn publish(&self, change: StoreChange) {
        let _ = self.changes.send(change);
    }
}

#[async_trait]
impl GroupStore for PgStore {
    async fn find_group_with_room(
        &self,
        event_id: &str,
        max_size: usize,
    ) -> Result<Option<GroupDocument>, StoreError> {
        let max_size = i32::try_from(max_size).unwrap_or(i32::MAX);
        let row = sqlx::query_as::<_, GroupRow>(&format!(
            "SELECT {GROUP_COLUMNS} FROM event_groups
             WHERE event_id = $1 AND member_count < $2
             ORDER BY created_at, id
             LIMIT 1"
        ))
        .bind(event_id)
        .bind(max_size)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(GroupDocument::from))
    }

    async fn find_user_group_for_event(
        &self,
        event_id: &str,
        user_id: &str,
    ) -> Result<Option<GroupDocument>, StoreError> {
        let row = sqlx::query_as::<_, GroupRow>(&format!(
            "SELECT {GROUP_COLUMNS} FROM event_groups
             WHERE event_id = $1 AND members @> $2
             ORDER BY created_at, id
             LIMIT 1"
        ))
        .bind(event_id)
        .bind(json!([user_id]))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(GroupDocument::from))
    }

    async fn get_group(
        &self,
        event_id: &str,
        group_id: &Uuid,
    ) -> Result<Option<GroupDocument>, StoreError> {
        let row = sqlx::query_as::<_, GroupRow>(&format!(
            "SELECT {GROUP_COLUMNS} FROM event_groups WHERE id = $1 AND event_id = $2"
        ))
        .bind(group_id)
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(GroupDocument::from))
    }

    async fn create_group(&self, event_id: &str) -> Result<GroupDocument, StoreError> {
        let row = sqlx::query_as::<_, GroupRow>(&format!(
            "INSERT INTO event_groups (id, event_id) VALUES ($1, $2) RETURNING {GROUP_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;

        let doc = GroupDocument::from(row);
        self.publish(StoreChange::GroupChanged {
            event_id: event_id.to_string(),
            group_id: doc.id,
        });
        Ok(doc)
    }

    async fn update_members(
        &self,
        event_id: &str,
        group_id: &Uuid,
        expected_version: i64,
        members: &[String],
    ) -> Result<GroupDocument, StoreError> {
        let member_count = i32::try_from(members.len())
            .map_err(|e| StoreError::Unavailable(anyhow::Error::new(e)))?;

        let row = sqlx::query_as::<_, GroupRow>(&format!(
            "UPDATE event_groups
             SET members = $1, member_count = $2, version = version + 1
             WHERE id = $3 AND event_id = $4 AND version = $5
             RETURNING {GROUP_COLUMNS}"
        ))
        .bind(json!(members))
        .bind(member_count)
        .bind(group_id)
        .bind(event_id)
        .bind(expected_version)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return match self.get_group(event_id, group_id).await? {
                Some(_) => Err(StoreError::Conflict),
                None => Err(StoreError::NotFound),
            };
        };

        self.publish(StoreChange::GroupChanged {
            event_id: event_id.to_string(),
            group_id: *group_id,
        });
        Ok(GroupDocument::from(row))
    }

    async fn groups_for_user(&self, user_id: &str) -> Result<Vec<GroupDocument>, StoreError> {
        let rows = sqlx::query_as::<_, GroupRow>(&format!(
            "SELECT {GROUP_COLUMNS} FROM event_groups
             WHERE members @> $1
             ORDER BY created_at, id"
        ))
        .bind(json!([user_id]))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(GroupDocument::from).collect())
    }

    async fn append_message(
        &self,
        event_id: &str,
        group_id: &Uuid,
        message: &ChatMessage,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO messages (id, group_id, event_id, sender_id, text, sent_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&message.id)
        .bind(group_id)
        .bind(event_id)
        .bind(&message.sender_id)
        .bind(&message.text)
        .bind(message.timestamp)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            // foreign_key_violation: the group vanished
            let missing_group = e
                .as_database_error()
                .and_then(|db| db.code())
                .map_or(false, |code| code == "23503");
            if missing_group {
                StoreError::NotFound
            } else {
                StoreError::from(e)
            }
        })?;

        self.publish(StoreChange::MessageAppended {
            event_id: event_id.to_string(),
            group_id: *group_id,
            message_id: message.id.clone(),
        });
        Ok(())
    }

    async fn list_messages(
        &self,
        event_id: &str,
        group_id: &Uuid,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT id, sender_id, text, sent_at FROM messages
             WHERE group_id = $1 AND event_id = $2
             ORDER BY sent_at, id",
        )
        .bind(group_id)
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ChatMessage::from).collect())
    }

    async fn list_events(&self) -> Result<Vec<Event>, StoreError> {
        let rows = sqlx::query_as::<_, EventRow>(
            "SELECT id, title, location, image_url, fullness_percentage, is_trending,
                    start_time, category, latitude, longitude
             FROM events ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Event::from).collect())
    }

    async fn get_event(&self, event_id: &str) -> Result<Option<Event>, StoreError> {
        let row = sqlx::query_as::<_, EventRow>(
            "SELECT id, title, location, image_url, fullness_percentage, is_trending,
                    start_time, category, latitude, longitude
             FROM events WHERE id = $1",
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Event::from))
    }

    async fn upsert_event(&self, event: &Event) -> Result<(), StoreError> {
        let (latitude, longitude) = match event.coordinates {
            Some(Location {
                latitude,
                longitude,
            }) => (Some(latitude), Some(longitude)),
            None => (None, None),
        };

        sqlx::query(
            "INSERT INTO events (id, title, location, image_url, fullness_percentage,
                                 is_trending, start_time, category, latitude, longitude)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                location = EXCLUDED.location,
                image_url = EXCLUDED.image_url,
                fullness_percentage = EXCLUDED.fullness_percentage,
                is_trending = EXCLUDED.is_trending,
                start_time = EXCLUDED.start_time,
                category = EXCLUDED.category,
                latitude = EXCLUDED.latitude,
                longitude = EXCLUDED.longitude",
        )
        .bind(&event.id)
        .bind(&event.title)
        .bind(&event.location)
        .bind(&event.image_url)
        .bind(event.fullness_percentage)
        .bind(event.is_trending)
        .bind(&event.start_time)
        .bind(&event.category)
        .bind(latitude)
        .bind(longitude)
        .execute(&self.pool)
        .await?;

        self.publish(StoreChange::EventChanged {
            event_id: event.id.clone(),
        });
        Ok(())
    }

    async fn upsert_user(&self, user: &UserDocument) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO users (id, name, is_local) VALUES ($1, $2, $3)
             ON CONFLICT (id) DO UPDATE SET
                name = COALESCE(EXCLUDED.name, users.name),
                is_local = COALESCE(EXCLUDED.is_local, users.is_local)",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(user.is_local)
        .execute(&self.pool)
        .await?;

        self.publish(StoreChange::UserChanged {
            user_id: user.id.clone(),
        });
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<UserDocument>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>("SELECT id, name, is_local FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| UserDocument {
            id: row.id,
            name: row.name,
            is_local: row.is_local,
        }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}
