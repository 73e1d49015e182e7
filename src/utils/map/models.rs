use serde::{Deserialize, Serialize};

/// Category filter value that lets every event through.
pub const ALL_CATEGORIES: &str = "All";

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Hashable identity for exact coordinate equality. `-0.0` and `0.0` are the same point.
    pub(crate) fn key(&self) -> (u64, u64) {
        fn bits(value: f64) -> u64 {
            if value == 0.0 {
                0.0_f64.to_bits()
            } else {
                value.to_bits()
            }
        }
        (bits(self.latitude), bits(self.longitude))
    }

    /// Great-circle distance (haversine).
    pub fn distance_meters(&self, other: &Location) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let d_lat = lat2 - lat1;
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_METERS * a.sqrt().asin()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MapEvent {
    pub id: String,
    pub title: String,
    pub location: Location,
    pub category: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MapState {
    #[serde(default)]
    pub user_location: Option<Location>,
    #[serde(default)]
    pub other_people: Vec<Location>,
    #[serde(default)]
    pub events: Vec<MapEvent>,
    #[serde(default = "all_categories")]
    pub selected_filter: String,
}

fn all_categories() -> String {
    ALL_CATEGORIES.to_string()
}

impl Default for MapState {
    fn default() -> Self {
        Self {
            user_location: None,
            other_people: Vec::new(),
            events: Vec::new(),
            selected_filter: all_categories(),
        }
    }
}

impl MapState {
    /// Events passing the selected category filter.
    pub fn visible_events(&self) -> impl Iterator<Item = &MapEvent> {
        let show_all = self.selected_filter == ALL_CATEGORIES;
        self.events
            .iter()
            .filter(move |event| show_all || event.category == self.selected_filter)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "change", content = "location", rename_all = "camelCase")]
pub enum UserMarkerChange {
    None,
    Added(Location),
    Removed(Location),
    Updated(Location),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct PeopleDiff {
    pub added: Vec<Location>,
    pub removed: Vec<Location>,
    pub unchanged: Vec<Location>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct EventsDiff {
    pub added: Vec<MapEvent>,
    pub removed: Vec<MapEvent>,
    /// New values of events whose id survived but whose content changed.
    pub updated: Vec<MapEvent>,
    pub unchanged: Vec<MapEvent>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MarkerDiff {
    pub user: UserMarkerChange,
    pub people: PeopleDiff,
    pub events: EventsDiff,
}

impl MarkerDiff {
    /// True when applying the diff would not touch any marker.
    pub fn is_empty(&self) -> bool {
        self.user == UserMarkerChange::None
            && self.people.added.is_empty()
            && self.people.removed.is_empty()
            && self.events.added.is_empty()
            && self.events.removed.is_empty()
            && self.events.updated.is_empty()
    }
}

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiffOptions {
    /// Moves of the user marker shorter than this are ignored. Zero means exact comparison.
    #[serde(default)]
    pub user_move_threshold_meters: f64,
}

/// Body of a diff request: the rendered state and the state to render next.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MarkerDiffRequest {
    pub old: MapState,
    pub new: MapState,
}
