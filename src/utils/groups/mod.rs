//! Capacity-bounded event groups.
//!
//! A user joining an event lands in the oldest group of that event that still
//! has room, or in a freshly created one. Membership writes are conditional on
//! the group version read just before, and a lost race re-reads the event's
//! groups, so concurrent joins never push a group past its capacity.

pub mod errors;
pub mod models;

use crate::configuration::GroupSettings;
use crate::modules::store::{GroupStore, StoreChange, StoreError};
use crate::modules::subscriptions::{Subscription, SNAPSHOT_BUFFER};
use errors::GroupError;
use models::Group;
use std::sync::Arc;
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct GroupService {
    store: Arc<dyn GroupStore>,
    settings: GroupSettings,
}

impl GroupService {
    pub fn new(store: Arc<dyn GroupStore>, settings: GroupSettings) -> Self {
        Self { store, settings }
    }

    pub fn default_max_size(&self) -> usize {
        self.settings.default_max_size
    }

    /// Puts `user_id` into a group of `event_id` holding fewer than `max_size`
    /// members and returns that group's id. Joining again returns the same group.
    pub async fn assign_user_to_group(
        &self,
        event_id: &str,
        user_id: &str,
        max_size: usize,
    ) -> Result<Uuid, GroupError> {
        if user_id.trim().is_empty() {
            return Err(GroupError::NotAuthenticated);
        }
        if event_id.trim().is_empty() {
            return Err(GroupError::MissingGroupField);
        }
        if max_size == 0 {
            return Err(GroupError::InvalidCapacity);
        }

        if let Some(doc) = self.store.find_user_group_for_event(event_id, user_id).await? {
            debug!(event_id, user_id, group_id = %doc.id, "user already in a group of this event");
            return Ok(doc.id);
        }

        for attempt in 1..=self.settings.max_assign_attempts {
            let group = match self.store.find_group_with_room(event_id, max_size).await? {
                Some(doc) => Group::from(doc),
                None => {
                    let group = Group::from(self.store.create_group(event_id).await?);
                    info!(event_id, group_id = %group.id, "created group");
                    group
                }
            };

            if group.contains(user_id) {
                return Ok(group.id);
            }

            if !group.has_room(max_size) {
                // Stored count said there was room, the member list says otherwise.
                self.repair(event_id, &group).await?;
                continue;
            }

            let mut members = group.members.clone();
            members.push(user_id.to_string());

            match self
                .store
                .update_members(event_id, &group.id, group.version, &members)
                .await
            {
                Ok(_) => {
                    info!(event_id, user_id, group_id = %group.id, "user joined group");
                    return Ok(group.id);
                }
                Err(StoreError::Conflict | StoreError::NotFound) => {
                    debug!(event_id, user_id, attempt, "lost a membership write race, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!(event_id, user_id, "giving up group assignment after repeated conflicts");
        Err(GroupError::Contention)
    }

    /// Removes `user_id` from the group. Leaving a group one is not in, or one
    /// that does not exist, changes nothing.
    pub async fn leave_group(
        &self,
        event_id: &str,
        group_id: &Uuid,
        user_id: &str,
    ) -> Result<(), GroupError> {
        if user_id.trim().is_empty() {
            return Err(GroupError::NotAuthenticated);
        }

        for attempt in 1..=self.settings.max_assign_attempts {
            let Some(doc) = self.store.get_group(event_id, group_id).await? else {
                debug!(event_id, %group_id, "leaving a group that does not exist");
                return Ok(());
            };
            let group = Group::from(doc);
            if !group.contains(user_id) {
                return Ok(());
            }

            let members: Vec<String> = group
                .members
                .iter()
                .filter(|member| member.as_str() != user_id)
                .cloned()
                .collect();

            match self
                .store
                .update_members(event_id, group_id, group.version, &members)
                .await
            {
                Ok(_) => {
                    info!(event_id, user_id, %group_id, "user left group");
                    return Ok(());
                }
                Err(StoreError::NotFound) => return Ok(()),
                Err(StoreError::Conflict) => {
                    debug!(event_id, user_id, attempt, "lost a membership write race, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!(event_id, user_id, %group_id, "giving up leave after repeated conflicts");
        Err(GroupError::Contention)
    }

    pub async fn get_group(&self, event_id: &str, group_id: &Uuid) -> Result<Group, GroupError> {
        self.store
            .get_group(event_id, group_id)
            .await?
            .map(Group::from)
            .ok_or(GroupError::GroupDoesNotExist)
    }

    pub async fn groups_for_user(&self, user_id: &str) -> Result<Vec<Group>, GroupError> {
        if user_id.trim().is_empty() {
            return Err(GroupError::NotAuthenticated);
        }
        let groups = self.store.groups_for_user(user_id).await?;
        Ok(groups.into_iter().map(Group::from).collect())
    }

    /// Live list of the user's groups: the current list first, then a new list
    /// whenever a group write changes it.
    pub fn stream_groups_for_user(&self, user_id: &str) -> Subscription<Vec<Group>> {
        let (tx, rx) = mpsc::channel(SNAPSHOT_BUFFER);
        let service = self.clone();
        let user_id = user_id.to_string();
        let mut changes = self.store.changes();

        let task = tokio::spawn(async move {
            let mut last: Option<Vec<Group>> = None;
            loop {
                match service.groups_for_user(&user_id).await {
                    Ok(groups) if last.as_ref() != Some(&groups) => {
                        if tx.send(groups.clone()).await.is_err() {
                            break;
                        }
                        last = Some(groups);
                    }
                    Ok(_) => {}
                    Err(e) => warn!(user_id = %user_id, "failed to refresh group snapshot: {e:?}"),
                }

                loop {
                    match changes.recv().await {
                        Ok(StoreChange::GroupChanged { .. }) => break,
                        Ok(_) => continue,
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(user_id = %user_id, skipped, "group feed lagged, re-reading");
                            break;
                        }
                        Err(RecvError::Closed) => return,
                    }
                }
            }
        });

        Subscription::new(rx, task)
    }

    async fn repair(&self, event_id: &str, group: &Group) -> Result<(), GroupError> {
        match self
            .store
            .update_members(event_id, &group.id, group.version, &group.members)
            .await
        {
            Ok(_) => {
                warn!(group_id = %group.id, "rewrote inconsistent member count");
                Ok(())
            }
            Err(StoreError::Conflict | StoreError::NotFound) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
