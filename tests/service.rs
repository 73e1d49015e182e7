use futures::{SinkExt, StreamExt};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use uuid::Uuid;

async fn join(app: &tools::AppData, event_id: &str, user: &str) -> Uuid {
    let res = app
        .client()
        .post(app.url(&format!("/events/{event_id}/groups/join")))
        .bearer_auth(tools::token(user))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await.unwrap();
    Uuid::parse_str(body["groupId"].as_str().unwrap()).unwrap()
}

#[tokio::test]
async fn health_check() {
    let app = tools::AppData::new().await;

    let res = app.client().get(app.url("/health")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::OK)
}

#[tokio::test]
async fn protected_routes_require_token() {
    let app = tools::AppData::new().await;

    let res = app
        .client()
        .post(app.url("/events/tollwood/groups/join"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = app
        .client()
        .get(app.url("/groups"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error_info"], "Invalid or expired token");
}

#[tokio::test]
async fn join_uses_configured_capacity() {
    let app = tools::AppData::new().await;

    let first = join(&app, "tollwood", "alice").await;
    assert_eq!(join(&app, "tollwood", "bob").await, first);
    assert_eq!(join(&app, "tollwood", "carol").await, first);
    // default_max_size is 3 in the test settings
    assert_ne!(join(&app, "tollwood", "dave").await, first);
}

#[tokio::test]
async fn zero_max_size_is_bad_request() {
    let app = tools::AppData::new().await;

    let res = app
        .client()
        .post(app.url("/events/tollwood/groups/join"))
        .bearer_auth(tools::token("alice"))
        .json(&json!({ "maxSize": 0 }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn requested_max_size_cannot_exceed_configured_capacity() {
    let app = tools::AppData::new().await;

    let mut group_ids = Vec::new();
    for user in ["alice", "bob", "carol", "dave"] {
        let res = app
            .client()
            .post(app.url("/events/tollwood/groups/join"))
            .bearer_auth(tools::token(user))
            .json(&json!({ "maxSize": 1000 }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        group_ids.push(body["groupId"].as_str().unwrap().to_string());
    }

    // default_max_size is 3 in the test settings
    assert_eq!(group_ids[0], group_ids[2]);
    assert_ne!(group_ids[0], group_ids[3]);
}

#[tokio::test]
async fn smaller_max_size_is_honoured() {
    let app = tools::AppData::new().await;

    let mut group_ids = Vec::new();
    for user in ["alice", "bob"] {
        let body: Value = app
            .client()
            .post(app.url("/events/tollwood/groups/join"))
            .bearer_auth(tools::token(user))
            .json(&json!({ "maxSize": 1 }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        group_ids.push(body["groupId"].as_str().unwrap().to_string());
    }

    assert_ne!(group_ids[0], group_ids[1]);
}

#[tokio::test]
async fn my_groups_resolve_member_profiles() {
    let app = tools::AppData::new().await;

    let res = app
        .client()
        .put(app.url("/users/me"))
        .bearer_auth(tools::token("alice"))
        .json(&json!({ "name": "Alice", "isLocal": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let group_id = join(&app, "tollwood", "alice").await;
    join(&app, "tollwood", "bob").await;

    let groups: Value = app
        .client()
        .get(app.url("/groups"))
        .bearer_auth(tools::token("alice"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(groups[0]["id"], group_id.to_string());
    assert_eq!(groups[0]["memberCount"], 2);
    assert_eq!(
        groups[0]["members"],
        json!([
            { "id": "alice", "name": "Alice", "isLocal": true },
            { "id": "bob", "name": "Unknown", "isLocal": false },
        ])
    );
}

#[tokio::test]
async fn leave_then_group_info_shows_remaining_members() {
    let app = tools::AppData::new().await;
    let group_id = join(&app, "tollwood", "alice").await;
    join(&app, "tollwood", "bob").await;

    let res = app
        .client()
        .post(app.url(&format!("/events/tollwood/groups/{group_id}/leave")))
        .bearer_auth(tools::token("alice"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let info: Value = app
        .client()
        .get(app.url(&format!("/events/tollwood/groups/{group_id}")))
        .bearer_auth(tools::token("bob"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(info["memberCount"], 1);
    assert_eq!(info["members"][0]["id"], "bob");
}

#[tokio::test]
async fn messages_round_trip_over_http() {
    let app = tools::AppData::new().await;
    let group_id = join(&app, "tollwood", "alice").await;
    let path = format!("/events/tollwood/groups/{group_id}/messages");

    let res = app
        .client()
        .post(app.url(&path))
        .bearer_auth(tools::token("alice"))
        .json(&json!({ "text": "Servus" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = app
        .client()
        .post(app.url(&path))
        .bearer_auth(tools::token("mallory"))
        .json(&json!({ "text": "let me in" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let messages: Value = app
        .client()
        .get(app.url(&path))
        .bearer_auth(tools::token("alice"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(messages.as_array().unwrap().len(), 1);
    assert_eq!(messages[0]["senderId"], "alice");
    assert_eq!(messages[0]["text"], "Servus");
}

#[tokio::test]
async fn catalog_is_served_from_startup() {
    let app = tools::AppData::new().await;

    let events: Value = app
        .client()
        .get(app.url("/events"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(events.as_array().unwrap().len(), 7);

    let res = app.client().get(app.url("/events/1")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let tollwood: Value = res.json().await.unwrap();
    assert_eq!(tollwood["title"], "Tollwood Festival");
    assert_eq!(tollwood["location"], "Olympiapark Süd");

    let res = app.client().get(app.url("/events/99")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn trending_events_are_public() {
    let app = tools::AppData::new().await;

    let events: Value = app
        .client()
        .get(app.url("/events?view=trending"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let ids: Vec<&str> = events
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["1", "2"]);
    assert_eq!(events[0]["isTrending"], true);
}

#[tokio::test]
async fn nearby_events_follow_the_caller() {
    let app = tools::AppData::new().await;

    // Königsplatz
    let events: Value = app
        .client()
        .get(app.url("/events?view=nearby&lat=48.1459&lon=11.5655"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(events.as_array().unwrap().len(), 3);
    assert_eq!(events[0]["title"], "Open Air Kino");
}

#[tokio::test]
async fn map_diff_endpoint() {
    let app = tools::AppData::new().await;
    let events = json!([
        { "id": "1", "title": "Tollwood", "location": { "latitude": 48.16, "longitude": 11.55 }, "category": "Music" },
        { "id": "2", "title": "Streetlife", "location": { "latitude": 48.14, "longitude": 11.58 }, "category": "Food" },
    ]);

    let diff: Value = app
        .client()
        .post(app.url("/map/diff"))
        .json(&json!({
            "old": { "events": events, "selectedFilter": "Music" },
            "new": { "events": events, "selectedFilter": "All" },
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(diff["user"]["change"], "none");
    assert_eq!(diff["events"]["added"][0]["id"], "2");
    assert_eq!(diff["events"]["unchanged"][0]["id"], "1");
    assert_eq!(diff["events"]["removed"], json!([]));
}

async fn next_json<S>(socket: &mut S) -> Value
where
    S: StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let message = timeout(Duration::from_secs(2), socket.next())
            .await
            .expect("no message from server")
            .unwrap()
            .unwrap();
        if let Message::Text(text) = message {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

#[tokio::test]
async fn websocket_streams_groups_and_messages() {
    let app = tools::AppData::new().await;
    let group_id = join(&app, "tollwood", "alice").await;

    let (mut socket, _) = connect_async(app.ws_url(&tools::token("alice")))
        .await
        .unwrap();

    socket
        .send(Message::Text(r#""MyGroups""#.into()))
        .await
        .unwrap();
    let groups = next_json(&mut socket).await;
    assert_eq!(groups["Groups"][0]["id"], group_id.to_string());

    socket
        .send(Message::Text(
            json!({ "Subscribe": { "event_id": "tollwood", "group_id": group_id } }).to_string(),
        ))
        .await
        .unwrap();
    let initial = next_json(&mut socket).await;
    assert_eq!(initial["Messages"], json!([]));

    socket
        .send(Message::Text(
            json!({ "SendMessage": { "text": "Servus" } }).to_string(),
        ))
        .await
        .unwrap();
    let after = next_json(&mut socket).await;
    assert_eq!(after["Messages"][0]["text"], "Servus");
    assert_eq!(after["Messages"][0]["senderId"], "alice");

    socket.close(None).await.unwrap();
}

#[tokio::test]
async fn websocket_rejects_foreign_group() {
    let app = tools::AppData::new().await;
    let group_id = join(&app, "tollwood", "alice").await;

    let (mut socket, _) = connect_async(app.ws_url(&tools::token("mallory")))
        .await
        .unwrap();

    socket
        .send(Message::Text(
            json!({ "Subscribe": { "event_id": "tollwood", "group_id": group_id } }).to_string(),
        ))
        .await
        .unwrap();
    let reply = next_json(&mut socket).await;
    assert_eq!(reply["Error"], "User not in group");
}

#[tokio::test]
async fn websocket_stops_pushing_after_leave() {
    let app = tools::AppData::new().await;
    let group_id = join(&app, "tollwood", "alice").await;
    join(&app, "tollwood", "bob").await;

    let (mut socket, _) = connect_async(app.ws_url(&tools::token("bob")))
        .await
        .unwrap();
    socket
        .send(Message::Text(
            json!({ "Subscribe": { "event_id": "tollwood", "group_id": group_id } }).to_string(),
        ))
        .await
        .unwrap();
    let initial = next_json(&mut socket).await;
    assert_eq!(initial["Messages"], json!([]));

    let res = app
        .client()
        .post(app.url(&format!("/events/tollwood/groups/{group_id}/leave")))
        .bearer_auth(tools::token("bob"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .client()
        .post(app.url(&format!("/events/tollwood/groups/{group_id}/messages")))
        .bearer_auth(tools::token("alice"))
        .json(&json!({ "text": "bob left" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let pushed = timeout(Duration::from_millis(500), socket.next()).await;
    assert!(pushed.is_err(), "ex-member received {:?}", pushed);
}
