use munich_pulse::configuration::{ChatSettings, GroupSettings};
use munich_pulse::modules::store::MemoryStore;
use munich_pulse::utils::chat::{errors::ChatError, ChatService};
use munich_pulse::utils::groups::GroupService;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use uuid::Uuid;

struct Fixture {
    chat: ChatService,
    groups: GroupService,
    group_id: Uuid,
}

/// Alice and Bob share a group of the "tollwood" event.
async fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let groups = GroupService::new(store.clone(), GroupSettings::default());
    let chat = ChatService::new(
        store,
        ChatSettings {
            max_message_length: 20,
        },
    );

    let group_id = groups.assign_user_to_group("tollwood", "alice", 5).await.unwrap();
    groups.assign_user_to_group("tollwood", "bob", 5).await.unwrap();

    Fixture {
        chat,
        groups,
        group_id,
    }
}

#[tokio::test]
async fn messages_are_listed_in_send_order() {
    let Fixture { chat, group_id, .. } = fixture().await;

    let first = chat
        .send_message("tollwood", &group_id, "Servus", "alice")
        .await
        .unwrap();
    let second = chat
        .send_message("tollwood", &group_id, "  Grüß Gott  ", "bob")
        .await
        .unwrap();

    assert_eq!(second.text, "Grüß Gott");
    let listed = chat.list_messages("tollwood", &group_id, "alice").await.unwrap();
    assert_eq!(listed, vec![first, second]);
}

#[tokio::test]
async fn blank_message_is_rejected() {
    let Fixture { chat, group_id, .. } = fixture().await;
    let res = chat.send_message("tollwood", &group_id, " \n\t ", "alice").await;

    match res {
        Err(ChatError::EmptyMessage) => (),
        _ => panic!("Test result is {:?}", res),
    }
}

#[tokio::test]
async fn overlong_message_is_rejected() {
    let Fixture { chat, group_id, .. } = fixture().await;
    let res = chat
        .send_message("tollwood", &group_id, &"a".repeat(21), "alice")
        .await;

    match res {
        Err(ChatError::MessageTooLong) => (),
        _ => panic!("Test result is {:?}", res),
    }
}

#[tokio::test]
async fn outsider_cannot_post_or_read() {
    let Fixture { chat, group_id, .. } = fixture().await;

    let res = chat.send_message("tollwood", &group_id, "hi", "mallory").await;
    match res {
        Err(ChatError::NotGroupMember) => (),
        _ => panic!("Test result is {:?}", res),
    }

    let res = chat.list_messages("tollwood", &group_id, "mallory").await;
    match res {
        Err(ChatError::NotGroupMember) => (),
        _ => panic!("Test result is {:?}", res),
    }
}

#[tokio::test]
async fn unknown_group_does_not_exist() {
    let Fixture { chat, group_id, .. } = fixture().await;

    let res = chat.send_message("tollwood", &Uuid::new_v4(), "hi", "alice").await;
    match res {
        Err(ChatError::GroupDoesNotExist) => (),
        _ => panic!("Test result is {:?}", res),
    }

    // right group id, wrong event
    let res = chat.send_message("wiesn", &group_id, "hi", "alice").await;
    match res {
        Err(ChatError::GroupDoesNotExist) => (),
        _ => panic!("Test result is {:?}", res),
    }
}

#[tokio::test]
async fn anonymous_sender_is_not_authenticated() {
    let Fixture { chat, group_id, .. } = fixture().await;
    let res = chat.send_message("tollwood", &group_id, "hi", "").await;

    match res {
        Err(ChatError::NotAuthenticated) => (),
        _ => panic!("Test result is {:?}", res),
    }
}

#[tokio::test]
async fn message_stream_emits_after_each_send() {
    let Fixture { chat, group_id, .. } = fixture().await;
    chat.send_message("tollwood", &group_id, "first", "alice")
        .await
        .unwrap();

    let mut stream = chat.stream_messages("tollwood", &group_id, "alice");
    let initial = timeout(Duration::from_secs(1), stream.recv()).await.unwrap().unwrap();
    assert_eq!(initial.len(), 1);

    chat.send_message("tollwood", &group_id, "second", "bob")
        .await
        .unwrap();
    let next = timeout(Duration::from_secs(1), stream.recv()).await.unwrap().unwrap();

    let texts: Vec<&str> = next.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, vec!["first", "second"]);
}

#[tokio::test]
async fn message_stream_ends_when_reader_leaves() {
    let Fixture {
        chat,
        groups,
        group_id,
    } = fixture().await;

    let mut stream = chat.stream_messages("tollwood", &group_id, "bob");
    let initial = timeout(Duration::from_secs(1), stream.recv()).await.unwrap().unwrap();
    assert!(initial.is_empty());

    groups.leave_group("tollwood", &group_id, "bob").await.unwrap();
    chat.send_message("tollwood", &group_id, "still here?", "alice")
        .await
        .unwrap();

    let next = timeout(Duration::from_secs(1), stream.recv()).await.unwrap();
    assert_eq!(next, None);
}

#[tokio::test]
async fn outsider_stream_ends_immediately() {
    let Fixture { chat, group_id, .. } = fixture().await;

    let mut stream = chat.stream_messages("tollwood", &group_id, "mallory");
    let next = timeout(Duration::from_secs(1), stream.recv()).await.unwrap();
    assert_eq!(next, None);
}
