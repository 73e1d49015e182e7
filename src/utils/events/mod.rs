//! Event catalog with the home screen's views.

pub mod errors;
pub mod models;

use crate::modules::store::GroupStore;
use crate::utils::map::models::Location;
use anyhow::Context;
use errors::EventError;
use models::{Event, EventView};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Size of the nearby view.
pub const NEARBY_LIMIT: usize = 3;

#[derive(Clone)]
pub struct EventService {
    store: Arc<dyn GroupStore>,
}

impl EventService {
    pub fn new(store: Arc<dyn GroupStore>) -> Self {
        Self { store }
    }

    /// `Nearby` orders by distance from `origin` when both it and the event
    /// coordinates are known; events without coordinates go last.
    pub async fn list_events(
        &self,
        view: EventView,
        origin: Option<Location>,
    ) -> Result<Vec<Event>, EventError> {
        let events = self.store.list_events().await?;

        Ok(match view {
            EventView::All => events,
            EventView::Trending => events.into_iter().filter(|e| e.is_trending).collect(),
            EventView::Nearby => nearby(events, origin),
        })
    }

    pub async fn get_event(&self, event_id: &str) -> Result<Event, EventError> {
        self.store
            .get_event(event_id)
            .await?
            .ok_or(EventError::EventDoesNotExist)
    }

    pub async fn upsert_event(&self, mut event: Event) -> Result<Event, EventError> {
        event.title = event.title.trim().to_string();
        if event.title.is_empty() || event.id.trim().is_empty() {
            return Err(EventError::MissingTitle);
        }
        if !(0..=100).contains(&event.fullness_percentage) {
            return Err(EventError::InvalidFullness);
        }

        self.store.upsert_event(&event).await?;
        debug!(event_id = %event.id, "event stored");
        Ok(event)
    }

    /// Upserts every event of a JSON catalog file; returns how many were stored.
    pub async fn load_catalog(&self, path: impl AsRef<Path>) -> anyhow::Result<usize> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read event catalog {}", path.display()))?;
        let events: Vec<Event> =
            serde_json::from_str(&raw).context("Failed to parse event catalog")?;

        let count = events.len();
        for event in events {
            let event_id = event.id.clone();
            self.upsert_event(event)
                .await
                .with_context(|| format!("Invalid catalog event {event_id}"))?;
        }

        info!(count, path = %path.display(), "event catalog loaded");
        Ok(count)
    }
}

fn nearby(mut events: Vec<Event>, origin: Option<Location>) -> Vec<Event> {
    if let Some(origin) = origin {
        let distance = |event: &Event| {
            event
                .coordinates
                .map(|at| origin.distance_meters(&at))
                .unwrap_or(f64::INFINITY)
        };
        events.sort_by(|a, b| distance(a).total_cmp(&distance(b)));
    }
    events.truncate(NEARBY_LIMIT);
    events
}
