//! Live snapshot subscriptions and the per-(user, screen) registry.
//!
//! A [`Subscription`] owns the task that turns store changes into snapshots.
//! Dropping it, calling [`Subscription::unsubscribe`], or cancelling its
//! [`SubscriptionHandle`] stops that task.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Snapshot buffer per subscription; the producer waits when the consumer is this far behind.
pub const SNAPSHOT_BUFFER: usize = 16;

pub struct Subscription<T> {
    rx: mpsc::Receiver<T>,
    handle: SubscriptionHandle,
}

impl<T> Subscription<T> {
    pub fn new(rx: mpsc::Receiver<T>, task: JoinHandle<()>) -> Self {
        Self {
            rx,
            handle: SubscriptionHandle(Arc::new(task)),
        }
    }

    /// Next snapshot, or `None` once the subscription was cancelled.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    pub fn handle(&self) -> SubscriptionHandle {
        self.handle.clone()
    }

    pub fn unsubscribe(self) {}
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.handle.cancel();
    }
}

#[derive(Clone, Debug)]
pub struct SubscriptionHandle(Arc<JoinHandle<()>>);

impl SubscriptionHandle {
    pub fn cancel(&self) {
        self.0.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.0.is_finished()
    }

    fn same_as(&self, other: &SubscriptionHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Screen {
    Groups,
    Chat,
}

/// Keeps at most one live subscription per (user, screen).
#[derive(Clone, Default)]
pub struct SubscriptionRegistry(Arc<DashMap<(String, Screen), SubscriptionHandle>>);

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handle`, cancelling whatever was active for the same key.
    pub fn register(&self, user_id: &str, screen: Screen, handle: SubscriptionHandle) {
        let SubscriptionRegistry(active) = self;
        if let Some(previous) = active.insert((user_id.to_string(), screen), handle) {
            debug!(user_id, ?screen, "replacing live subscription");
            previous.cancel();
        }
    }

    pub fn unsubscribe(&self, user_id: &str, screen: Screen) {
        let SubscriptionRegistry(active) = self;
        if let Some((_, handle)) = active.remove(&(user_id.to_string(), screen)) {
            handle.cancel();
        }
    }

    /// Removes the entry only if it still holds `handle`; a newer registration is left alone.
    pub fn release(&self, user_id: &str, screen: Screen, handle: &SubscriptionHandle) {
        let SubscriptionRegistry(active) = self;
        if let Some((_, removed)) =
            active.remove_if(&(user_id.to_string(), screen), |_, held| held.same_as(handle))
        {
            removed.cancel();
        }
    }

    pub fn clear_user(&self, user_id: &str) {
        let SubscriptionRegistry(active) = self;
        active.retain(|(owner, _), handle| {
            if owner == user_id {
                handle.cancel();
                false
            } else {
                true
            }
        });
    }

    pub fn active_count(&self) -> usize {
        let SubscriptionRegistry(active) = self;
        active.iter().filter(|entry| !entry.value().is_finished()).count()
    }
}
