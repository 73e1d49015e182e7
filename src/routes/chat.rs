use crate::{
    modules::extractors::jwt::AuthUser,
    state::AppState,
    utils::chat::{
        errors::ChatError,
        models::{ChatMessage, NewMessage},
        socket::chat_socket,
        ChatService,
    },
};
use axum::{
    debug_handler,
    extract::{ws::WebSocketUpgrade, Path, State},
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

pub fn router() -> Router<AppState> {
    Router::new().route("/websocket", get(chat_handler))
}

/// Group message routes, merged into the `/events` router.
pub fn messages_router() -> Router<AppState> {
    Router::new().route(
        "/:event_id/groups/:group_id/messages",
        get(list_messages).post(send_message),
    )
}

#[debug_handler(state = AppState)]
async fn chat_handler(
    ws: WebSocketUpgrade,
    user: AuthUser,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(|socket| chat_socket(socket, state, user.user_id))
}

#[debug_handler(state = AppState)]
async fn list_messages(
    user: AuthUser,
    State(chat): State<ChatService>,
    Path((event_id, group_id)): Path<(String, Uuid)>,
) -> Result<Json<Vec<ChatMessage>>, ChatError> {
    let messages = chat
        .list_messages(&event_id, &group_id, &user.user_id)
        .await?;
    Ok(Json(messages))
}

#[debug_handler(state = AppState)]
async fn send_message(
    user: AuthUser,
    State(chat): State<ChatService>,
    Path((event_id, group_id)): Path<(String, Uuid)>,
    Json(message): Json<NewMessage>,
) -> Result<(StatusCode, Json<ChatMessage>), ChatError> {
    let message = chat
        .send_message(&event_id, &group_id, &message.text, &user.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}
