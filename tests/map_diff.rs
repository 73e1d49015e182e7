use munich_pulse::utils::map::compute_marker_diff;
use munich_pulse::utils::map::models::*;
use std::collections::HashSet;

fn event(id: &str, title: &str, category: &str, latitude: f64) -> MapEvent {
    MapEvent {
        id: id.into(),
        title: title.into(),
        location: Location::new(latitude, 11.57),
        category: category.into(),
    }
}

fn state(events: Vec<MapEvent>, filter: &str) -> MapState {
    MapState {
        user_location: Some(Location::new(48.137, 11.575)),
        other_people: vec![Location::new(48.14, 11.58), Location::new(48.15, 11.59)],
        events,
        selected_filter: filter.into(),
    }
}

fn ids(events: &[MapEvent]) -> Vec<&str> {
    events.iter().map(|e| e.id.as_str()).collect()
}

fn id_set<'a>(lists: &[&'a [MapEvent]]) -> HashSet<&'a str> {
    lists
        .iter()
        .flat_map(|list| list.iter().map(|e| e.id.as_str()))
        .collect()
}

#[test]
fn diff_of_identical_states_is_empty() {
    let s = state(
        vec![
            event("1", "Tollwood", "Music", 48.16),
            event("2", "Streetlife", "Food", 48.14),
        ],
        "All",
    );

    let diff = compute_marker_diff(&s, &s.clone(), &DiffOptions::default());

    assert!(diff.is_empty());
    assert_eq!(diff.user, UserMarkerChange::None);
    assert_eq!(ids(&diff.events.unchanged), vec!["1", "2"]);
    assert_eq!(diff.people.unchanged.len(), 2);
}

#[test]
fn widening_filter_only_adds() {
    let events = vec![
        event("1", "Tollwood", "Music", 48.16),
        event("2", "Streetlife", "Food", 48.14),
    ];
    let old = state(events.clone(), "Music");
    let new = state(events, "All");

    let diff = compute_marker_diff(&old, &new, &DiffOptions::default());

    assert_eq!(ids(&diff.events.added), vec!["2"]);
    assert!(diff.events.removed.is_empty());
    assert!(diff.events.updated.is_empty());
    assert_eq!(ids(&diff.events.unchanged), vec!["1"]);
}

#[test]
fn narrowing_filter_only_removes() {
    let events = vec![
        event("1", "Tollwood", "Music", 48.16),
        event("2", "Streetlife", "Food", 48.14),
        event("3", "Auer Dult", "Market", 48.12),
    ];
    let old = state(events.clone(), "All");
    let new = state(events, "Food");

    let diff = compute_marker_diff(&old, &new, &DiffOptions::default());

    assert_eq!(ids(&diff.events.removed), vec!["1", "3"]);
    assert!(diff.events.added.is_empty());
    assert!(diff.events.updated.is_empty());
    assert_eq!(ids(&diff.events.unchanged), vec!["2"]);
}

#[test]
fn event_lanes_partition_both_sides() {
    let old = state(
        vec![
            event("1", "Tollwood", "Music", 48.16),
            event("2", "Streetlife", "Food", 48.14),
            event("3", "Auer Dult", "Market", 48.12),
            event("4", "Kocherlball", "Music", 48.15),
        ],
        "All",
    );
    let new = state(
        vec![
            event("2", "Streetlife", "Food", 48.14),
            event("4", "Kocherlball 2026", "Music", 48.15),
            event("5", "Jazzwoche", "Music", 48.13),
            event("6", "Christkindlmarkt", "Market", 48.137),
        ],
        "Music",
    );

    let diff = compute_marker_diff(&old, &new, &DiffOptions::default());
    let lanes = &diff.events;

    let new_visible: HashSet<&str> = new.visible_events().map(|e| e.id.as_str()).collect();
    let old_visible: HashSet<&str> = old.visible_events().map(|e| e.id.as_str()).collect();

    assert_eq!(
        id_set(&[&lanes.added, &lanes.updated, &lanes.unchanged]),
        new_visible
    );
    assert_eq!(
        id_set(&[&lanes.removed, &lanes.updated, &lanes.unchanged]),
        old_visible
    );
    assert_eq!(ids(&lanes.updated), vec!["4"]);
    assert_eq!(lanes.updated[0].title, "Kocherlball 2026");
    assert_eq!(ids(&lanes.added), vec!["5"]);
    assert_eq!(ids(&lanes.removed), vec!["1", "2", "3"]);
}

#[test]
fn people_and_user_lanes_move_independently() {
    let old = state(vec![], "All");
    let mut new = old.clone();
    new.user_location = None;
    new.other_people[1] = Location::new(48.16, 11.6);

    let diff = compute_marker_diff(&old, &new, &DiffOptions::default());

    assert_eq!(
        diff.user,
        UserMarkerChange::Removed(Location::new(48.137, 11.575))
    );
    assert_eq!(diff.people.added, vec![Location::new(48.16, 11.6)]);
    assert_eq!(diff.people.removed, vec![Location::new(48.15, 11.59)]);
    assert_eq!(diff.people.unchanged, vec![Location::new(48.14, 11.58)]);
}

#[test]
fn people_on_the_same_spot_are_one_marker() {
    let spot = Location::new(48.1351, 11.582);
    let mut old = state(vec![], "All");
    old.other_people = vec![spot, spot];
    let mut new = old.clone();
    new.other_people = vec![spot];

    let diff = compute_marker_diff(&old, &new, &DiffOptions::default());

    assert!(diff.people.added.is_empty());
    assert!(diff.people.removed.is_empty());
    assert_eq!(diff.people.unchanged, vec![spot]);
    assert!(diff.is_empty());
}

#[test]
fn repeated_event_id_takes_the_later_entry() {
    let old = state(vec![], "All");
    let new = state(
        vec![
            event("1", "first", "Music", 48.16),
            event("1", "last", "Music", 48.16),
        ],
        "All",
    );

    let diff = compute_marker_diff(&old, &new, &DiffOptions::default());

    assert_eq!(ids(&diff.events.added), vec!["1"]);
    assert_eq!(diff.events.added[0].title, "last");
}
