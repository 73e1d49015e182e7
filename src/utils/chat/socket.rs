use super::models::ChatMessage;
use crate::modules::subscriptions::{Screen, Subscription, SubscriptionHandle, SubscriptionRegistry};
use crate::state::AppState;
use crate::utils::groups::models::Group;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace};
use uuid::Uuid;

/// Client action send to server
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub enum ClientAction {
    Subscribe { event_id: String, group_id: Uuid },
    SendMessage { text: String },
    MyGroups,
    Close,
    Ignore,
}

// {"Subscribe": {"event_id": "tollwood", "group_id": "6f0c..."}}
// {"SendMessage": {"text": "Servus"}}
// "MyGroups"

impl ClientAction {
    fn new(message: Message) -> Self {
        match message {
            Message::Text(text) => {
                serde_json::from_str::<ClientAction>(&text).unwrap_or(ClientAction::Ignore)
            }
            Message::Close(frame) => {
                match frame {
                    Some(frame) => {
                        trace!("Code: {} Reason: {}", frame.code, frame.reason);
                    }
                    None => {
                        trace!("Closed without frame")
                    }
                }
                debug!("Closing socket");
                ClientAction::Close
            }
            Message::Binary(_) => {
                info!("Binary message type is not supported");
                ClientAction::Ignore
            }
            Message::Ping(_) | Message::Pong(_) => ClientAction::Ignore,
        }
    }
}

/// Server action send to client
#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum ServerMessage {
    Messages(Vec<ChatMessage>),
    Groups(Vec<Group>),
    Error(String),
}

#[derive(Clone)]
pub struct UserSender(Arc<Mutex<SplitSink<WebSocket, Message>>>);

impl UserSender {
    fn new(sender: SplitSink<WebSocket, Message>) -> Self {
        Self(Arc::new(Mutex::new(sender)))
    }

    /// Send server message to client
    pub async fn send(&self, message: &ServerMessage) -> Result<(), axum::Error> {
        let UserSender(sender) = self;
        let msg = serde_json::to_string(message).map_err(axum::Error::new)?;
        sender.lock().await.send(Message::Text(msg)).await
    }

    /// Push every snapshot of `subscription` to the client until either side stops.
    fn forward<T, F>(&self, mut subscription: Subscription<T>, wrap: F) -> JoinHandle<()>
    where
        T: Send + 'static,
        F: Fn(T) -> ServerMessage + Send + 'static,
    {
        let sender = self.clone();
        tokio::spawn(async move {
            while let Some(snapshot) = subscription.recv().await {
                if sender.send(&wrap(snapshot)).await.is_err() {
                    debug!("Error while sending snapshot to the client");
                    break;
                }
            }
        })
    }
}

pub struct UserReceiver(SplitStream<WebSocket>);

impl UserReceiver {
    fn new(receiver: SplitStream<WebSocket>) -> Self {
        Self(receiver)
    }

    /// Get next client action
    pub async fn next_action(&mut self) -> ClientAction {
        let UserReceiver(receiver) = self;
        if let Some(conn) = receiver.next().await {
            return match conn {
                Ok(message) => ClientAction::new(message),
                Err(e) => {
                    debug!("Error while receiving message from stream {e}");
                    ClientAction::Ignore
                }
            };
        }
        debug!("Data stream dropped");
        ClientAction::Close
    }
}

/// Snapshot feed pushed to this socket, registered under (user, screen).
struct Feed {
    screen: Screen,
    handle: SubscriptionHandle,
    task: JoinHandle<()>,
}

struct ChatTarget {
    event_id: String,
    group_id: Uuid,
}

/// One websocket connection of an authenticated user.
pub struct ChatSession {
    user_id: String,
    sender: UserSender,
    state: AppState,
    registry: SubscriptionRegistry,
    groups_feed: Option<Feed>,
    chat_feed: Option<Feed>,
    target: Option<ChatTarget>,
}

impl ChatSession {
    fn new(user_id: String, sender: UserSender, state: AppState) -> Self {
        Self {
            user_id,
            sender,
            registry: state.subscriptions.clone(),
            state,
            groups_feed: None,
            chat_feed: None,
            target: None,
        }
    }

    async fn watch_groups(&mut self) {
        let subscription = self.state.groups.stream_groups_for_user(&self.user_id);
        let feed = self.feed(Screen::Groups, subscription, ServerMessage::Groups);
        self.replace_feed(feed);
    }

    async fn watch_messages(&mut self, event_id: String, group_id: Uuid) {
        // Only members may listen; the check also rejects unknown groups.
        if let Err(e) = self
            .state
            .chat
            .list_messages(&event_id, &group_id, &self.user_id)
            .await
        {
            self.report(e.to_string()).await;
            return;
        }

        let subscription = self
            .state
            .chat
            .stream_messages(&event_id, &group_id, &self.user_id);
        let feed = self.feed(Screen::Chat, subscription, ServerMessage::Messages);
        self.replace_feed(feed);
        self.target = Some(ChatTarget { event_id, group_id });
    }

    async fn send_message(&mut self, text: &str) {
        let Some(target) = &self.target else {
            self.report("Cannot send message - group not selected".into()).await;
            return;
        };

        let res = self
            .state
            .chat
            .send_message(&target.event_id, &target.group_id, text, &self.user_id)
            .await;
        if let Err(e) = res {
            self.report(e.to_string()).await;
        }
    }

    fn feed<T, F>(&self, screen: Screen, subscription: Subscription<T>, wrap: F) -> Feed
    where
        T: Send + 'static,
        F: Fn(T) -> ServerMessage + Send + 'static,
    {
        let handle = subscription.handle();
        self.registry.register(&self.user_id, screen, handle.clone());
        Feed {
            screen,
            handle,
            task: self.sender.forward(subscription, wrap),
        }
    }

    fn replace_feed(&mut self, feed: Feed) {
        let slot = match feed.screen {
            Screen::Groups => &mut self.groups_feed,
            Screen::Chat => &mut self.chat_feed,
        };
        if let Some(previous) = slot.replace(feed) {
            previous.task.abort();
        }
    }

    async fn report(&self, info: String) {
        debug!(user_id = %self.user_id, "{info}");
        if self.sender.send(&ServerMessage::Error(info)).await.is_err() {
            error!("Failed to report error to the client");
        }
    }

    fn close(&mut self) {
        for feed in [self.groups_feed.take(), self.chat_feed.take()].into_iter().flatten() {
            self.registry.release(&self.user_id, feed.screen, &feed.handle);
            feed.task.abort();
        }
    }
}

pub async fn chat_socket(stream: WebSocket, state: AppState, user_id: String) {
    let (sender, receiver) = stream.split();
    let sender = UserSender::new(sender);
    let mut receiver = UserReceiver::new(receiver);
    let mut session = ChatSession::new(user_id, sender, state);

    loop {
        match receiver.next_action().await {
            ClientAction::MyGroups => session.watch_groups().await,
            ClientAction::Subscribe { event_id, group_id } => {
                session.watch_messages(event_id, group_id).await
            }
            ClientAction::SendMessage { text } => session.send_message(&text).await,
            ClientAction::Ignore => continue,
            ClientAction::Close => break,
        }
    }

    session.close();
    debug!(user_id = %session.user_id, "chat socket closed");
}
