use super::{GroupDocument, GroupStore, StoreChange, StoreError, UserDocument, CHANGE_FEED_CAPACITY};
use crate::utils::chat::models::ChatMessage;
use crate::utils::events::models::Event;
use axum::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::trace;
use uuid::Uuid;

struct StoredGroup {
    doc: GroupDocument,
    created: u64,
}

/// In-process store. Group compare-and-swap runs under the map entry lock.
pub struct MemoryStore {
    groups: DashMap<Uuid, StoredGroup>,
    messages: DashMap<Uuid, Vec<ChatMessage>>,
    events: DashMap<String, Event>,
    users: DashMap<String, UserDocument>,
    sequence: AtomicU64,
    changes: broadcast::Sender<StoreChange>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _rx) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            groups: DashMap::new(),
            messages: DashMap::new(),
            events: DashMap::new(),
            users: DashMap::new(),
            sequence: AtomicU64::new(0),
            changes,
        }
    }

    /// Stores a group document as given, bypassing every consistency rule.
    /// Used to reproduce documents written by older or misbehaving clients.
    pub fn insert_raw_group(&self, doc: GroupDocument) {
        let created = self.sequence.fetch_add(1, Ordering::SeqCst);
        self.groups.insert(doc.id, StoredGroup { doc, created });
    }

    fn publish(&self, change: StoreChange) {
        // No receivers is fine: nobody is watching yet.
        let _ = self.changes.send(change);
    }

    fn event_groups(&self, event_id: &str) -> Vec<(u64, GroupDocument)> {
        let mut groups: Vec<(u64, GroupDocument)> = self
            .groups
            .iter()
            .filter(|entry| entry.doc.event_id == event_id)
            .map(|entry| (entry.created, entry.doc.clone()))
            .collect();
        groups.sort_by_key(|(created, _)| *created);
        groups
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GroupStore for MemoryStore {
    async fn find_group_with_room(
        &self,
        event_id: &str,
        max_size: usize,
    ) -> Result<Option<GroupDocument>, StoreError> {
        let max_size = i64::try_from(max_size).unwrap_or(i64::MAX);
        Ok(self
            .event_groups(event_id)
            .into_iter()
            .map(|(_, doc)| doc)
            .find(|doc| doc.member_count < max_size))
    }

    async fn find_user_group_for_event(
        &self,
        event_id: &str,
        user_id: &str,
    ) -> Result<Option<GroupDocument>, StoreError> {
        Ok(self
            .event_groups(event_id)
            .into_iter()
            .map(|(_, doc)| doc)
            .find(|doc| doc.members.iter().any(|member| member == user_id)))
    }

    async fn get_group(
        &self,
        event_id: &str,
        group_id: &Uuid,
    ) -> Result<Option<GroupDocument>, StoreError> {
        Ok(self
            .groups
            .get(group_id)
            .filter(|entry| entry.doc.event_id == event_id)
            .map(|entry| entry.doc.clone()))
    }

    async fn create_group(&self, event_id: &str) -> Result<GroupDocument, StoreError> {
        let doc = GroupDocument {
            id: Uuid::new_v4(),
            event_id: event_id.to_string(),
            members: Vec::new(),
            member_count: 0,
            version: 0,
        };
        let created = self.sequence.fetch_add(1, Ordering::SeqCst);
        self.groups.insert(
            doc.id,
            StoredGroup {
                doc: doc.clone(),
                created,
            },
        );
        trace!(group_id = %doc.id, event_id, "group document created");
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
        let updated = {
            let mut entry = self.groups.get_mut(group_id).ok_or(StoreError::NotFound)?;
            if entry.doc.event_id != event_id {
                return Err(StoreError::NotFound);
            }
            if entry.doc.version != expected_version {
                return Err(StoreError::Conflict);
            }
            entry.doc.members = members.to_vec();
            entry.doc.member_count = members.len() as i64;
            entry.doc.version += 1;
            entry.doc.clone()
        };

        self.publish(StoreChange::GroupChanged {
            event_id: event_id.to_string(),
            group_id: *group_id,
        });
        Ok(updated)
    }

    async fn groups_for_user(&self, user_id: &str) -> Result<Vec<GroupDocument>, StoreError> {
        let mut groups: Vec<(u64, GroupDocument)> = self
            .groups
            .iter()
            .filter(|entry| entry.doc.members.iter().any(|member| member == user_id))
            .map(|entry| (entry.created, entry.doc.clone()))
            .collect();
        groups.sort_by_key(|(created, _)| *created);
        Ok(groups.into_iter().map(|(_, doc)| doc).collect())
    }

    async fn append_message(
        &self,
        event_id: &str,
        group_id: &Uuid,
        message: &ChatMessage,
    ) -> Result<(), StoreError> {
        if self.get_group(event_id, group_id).await?.is_none() {
            return Err(StoreError::NotFound);
        }
        self.messages
            .entry(*group_id)
            .or_default()
            .push(message.clone());

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
        if self.get_group(event_id, group_id).await?.is_none() {
            return Ok(Vec::new());
        }
        let mut messages = self
            .messages
            .get(group_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        Ok(messages)
    }

    async fn list_events(&self) -> Result<Vec<Event>, StoreError> {
        let mut events: Vec<Event> = self.events.iter().map(|entry| entry.value().clone()).collect();
        events.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(events)
    }

    async fn get_event(&self, event_id: &str) -> Result<Option<Event>, StoreError> {
        Ok(self.events.get(event_id).map(|entry| entry.value().clone()))
    }

    async fn upsert_event(&self, event: &Event) -> Result<(), StoreError> {
        self.events.insert(event.id.clone(), event.clone());
        self.publish(StoreChange::EventChanged {
            event_id: event.id.clone(),
        });
        Ok(())
    }

    async fn upsert_user(&self, user: &UserDocument) -> Result<(), StoreError> {
        self.users
            .entry(user.id.clone())
            .and_modify(|stored| {
                // Merge semantics: absent fields keep their stored value.
                if user.name.is_some() {
                    stored.name = user.name.clone();
                }
                if user.is_local.is_some() {
                    stored.is_local = user.is_local;
                }
            })
            .or_insert_with(|| user.clone());

        self.publish(StoreChange::UserChanged {
            user_id: user.id.clone(),
        });
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<UserDocument>, StoreError> {
        Ok(self.users.get(user_id).map(|entry| entry.value().clone()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}
