use crate::utils::map::models::Location;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CATEGORY: &str = "Other";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    /// Venue name.
    pub location: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub fullness_percentage: i32,
    #[serde(default)]
    pub is_trending: bool,
    #[serde(default)]
    pub start_time: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub coordinates: Option<Location>,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EventView {
    #[default]
    All,
    Trending,
    Nearby,
}

#[derive(Deserialize, Debug, Default)]
pub struct EventQuery {
    #[serde(default)]
    pub view: EventView,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl EventQuery {
    pub fn origin(&self) -> Option<Location> {
        Some(Location::new(self.lat?, self.lon?))
    }
}
