//! Map overlay reconciliation.
//!
//! Rebuilding every marker on each refresh is expensive on the client, so the
//! overlay is reconciled lane by lane: the user's own marker, nearby people,
//! and event pins. Nearby people have no identity, only coordinates, so that
//! lane is a value diff; events are diffed by id after the category filter.

pub mod models;

use models::*;
use std::collections::{HashMap, HashSet};

pub fn compute_marker_diff(old: &MapState, new: &MapState, options: &DiffOptions) -> MarkerDiff {
    MarkerDiff {
        user: diff_user(
            old.user_location.as_ref(),
            new.user_location.as_ref(),
            options.user_move_threshold_meters,
        ),
        people: diff_people(&old.other_people, &new.other_people),
        events: diff_events(old, new),
    }
}

fn diff_user(old: Option<&Location>, new: Option<&Location>, threshold: f64) -> UserMarkerChange {
    match (old, new) {
        (None, None) => UserMarkerChange::None,
        (None, Some(to)) => UserMarkerChange::Added(*to),
        (Some(from), None) => UserMarkerChange::Removed(*from),
        (Some(from), Some(to)) => {
            let moved = if threshold > 0.0 {
                from.distance_meters(to) >= threshold
            } else {
                from.key() != to.key()
            };
            if moved {
                UserMarkerChange::Updated(*to)
            } else {
                UserMarkerChange::None
            }
        }
    }
}

/// Set difference on coordinates: people standing on the same spot share one marker.
fn diff_people(old: &[Location], new: &[Location]) -> PeopleDiff {
    let old = distinct(old);
    let new = distinct(new);
    let old_keys: HashSet<(u64, u64)> = old.iter().map(Location::key).collect();
    let new_keys: HashSet<(u64, u64)> = new.iter().map(Location::key).collect();

    let (unchanged, added): (Vec<Location>, Vec<Location>) = new
        .into_iter()
        .partition(|location| old_keys.contains(&location.key()));
    let removed: Vec<Location> = old
        .into_iter()
        .filter(|location| !new_keys.contains(&location.key()))
        .collect();

    PeopleDiff {
        added,
        removed,
        unchanged,
    }
}

fn distinct(locations: &[Location]) -> Vec<Location> {
    let mut seen = HashSet::new();
    locations
        .iter()
        .filter(|location| seen.insert(location.key()))
        .copied()
        .collect()
}

fn diff_events(old: &MapState, new: &MapState) -> EventsDiff {
    let old_events = last_by_id(old.visible_events());
    let new_events = last_by_id(new.visible_events());

    let old_by_id: HashMap<&str, &MapEvent> = old_events
        .iter()
        .map(|event| (event.id.as_str(), *event))
        .collect();
    let new_ids: HashSet<&str> = new_events.iter().map(|event| event.id.as_str()).collect();

    let mut diff = EventsDiff::default();
    for event in &new_events {
        match old_by_id.get(event.id.as_str()) {
            None => diff.added.push((*event).clone()),
            Some(previous) if *previous == *event => diff.unchanged.push((*event).clone()),
            Some(_) => diff.updated.push((*event).clone()),
        }
    }

    diff.removed = old_events
        .iter()
        .filter(|event| !new_ids.contains(event.id.as_str()))
        .map(|event| (*event).clone())
        .collect();
    diff
}

/// One entry per id: a repeated id keeps the position of its first occurrence
/// and the value of its last, so every id lands in exactly one bucket.
fn last_by_id<'a>(events: impl Iterator<Item = &'a MapEvent>) -> Vec<&'a MapEvent> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut unique: Vec<&MapEvent> = Vec::new();
    for event in events {
        match slots.get(event.id.as_str()) {
            Some(&slot) => unique[slot] = event,
            None => {
                slots.insert(event.id.as_str(), unique.len());
                unique.push(event);
            }
        }
    }
    unique
}
