pub mod errors;
pub mod models;
pub mod socket;

use crate::configuration::ChatSettings;
use crate::modules::store::{GroupStore, StoreChange};
use crate::modules::subscriptions::{Subscription, SNAPSHOT_BUFFER};
use crate::utils::groups::models::Group;
use errors::ChatError;
use models::ChatMessage;
use std::sync::Arc;
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn GroupStore>,
    settings: ChatSettings,
}

impl ChatService {
    pub fn new(store: Arc<dyn GroupStore>, settings: ChatSettings) -> Self {
        Self { store, settings }
    }

    pub async fn send_message(
        &self,
        event_id: &str,
        group_id: &Uuid,
        text: &str,
        sender_id: &str,
    ) -> Result<ChatMessage, ChatError> {
        if sender_id.trim().is_empty() {
            return Err(ChatError::NotAuthenticated);
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if text.chars().count() > self.settings.max_message_length {
            return Err(ChatError::MessageTooLong);
        }

        let group = self.member_group(event_id, group_id, sender_id).await?;

        let message = ChatMessage::new(sender_id, text);
        self.store
            .append_message(&group.event_id, &group.id, &message)
            .await?;

        debug!(event_id, %group_id, message_id = %message.id, "message stored");
        Ok(message)
    }

    /// Messages of a group the reader belongs to, oldest first.
    pub async fn list_messages(
        &self,
        event_id: &str,
        group_id: &Uuid,
        reader_id: &str,
    ) -> Result<Vec<ChatMessage>, ChatError> {
        if reader_id.trim().is_empty() {
            return Err(ChatError::NotAuthenticated);
        }
        self.member_group(event_id, group_id, reader_id).await?;
        Ok(self.store.list_messages(event_id, group_id).await?)
    }

    /// Live message list of one group: the current messages first, then the
    /// full list again after every message appended to it. The stream ends
    /// once `reader_id` is no longer a member of the group.
    pub fn stream_messages(
        &self,
        event_id: &str,
        group_id: &Uuid,
        reader_id: &str,
    ) -> Subscription<Vec<ChatMessage>> {
        let (tx, rx) = mpsc::channel(SNAPSHOT_BUFFER);
        let service = self.clone();
        let event_id = event_id.to_string();
        let group_id = *group_id;
        let reader_id = reader_id.to_string();
        let mut changes = self.store.changes();

        let task = tokio::spawn(async move {
            let mut last: Option<Vec<ChatMessage>> = None;
            loop {
                match service.list_messages(&event_id, &group_id, &reader_id).await {
                    Ok(messages) => {
                        if last.as_ref() != Some(&messages) {
                            if tx.send(messages.clone()).await.is_err() {
                                break;
                            }
                            last = Some(messages);
                        }
                    }
                    Err(ChatError::StoreUnavailable(e)) => {
                        warn!(%group_id, "failed to refresh message snapshot: {e:?}")
                    }
                    Err(e) => {
                        debug!(%group_id, %reader_id, "closing message stream: {e}");
                        break;
                    }
                }

                loop {
                    match changes.recv().await {
                        Ok(StoreChange::MessageAppended { group_id: changed, .. })
                        | Ok(StoreChange::GroupChanged { group_id: changed, .. })
                            if changed == group_id =>
                        {
                            break
                        }
                        Ok(_) => continue,
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(%group_id, skipped, "message feed lagged, re-reading");
                            break;
                        }
                        Err(RecvError::Closed) => return,
                    }
                }
            }
        });

        Subscription::new(rx, task)
    }

    async fn member_group(
        &self,
        event_id: &str,
        group_id: &Uuid,
        user_id: &str,
    ) -> Result<Group, ChatError> {
        let group = self
            .store
            .get_group(event_id, group_id)
            .await?
            .map(Group::from)
            .ok_or(ChatError::GroupDoesNotExist)?;

        if !group.contains(user_id) {
            return Err(ChatError::NotGroupMember);
        }
        Ok(group)
    }
}
