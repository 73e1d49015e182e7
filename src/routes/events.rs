use crate::{
    state::AppState,
    utils::events::{
        errors::EventError,
        models::{Event, EventQuery},
        EventService,
    },
};
use axum::{
    debug_handler,
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_events))
        .route("/:event_id", get(event_details))
}

#[debug_handler(state = AppState)]
async fn list_events(
    State(events): State<EventService>,
    Query(query): Query<EventQuery>,
) -> Result<Json<Vec<Event>>, EventError> {
    Ok(Json(events.list_events(query.view, query.origin()).await?))
}

#[debug_handler(state = AppState)]
async fn event_details(
    State(events): State<EventService>,
    Path(event_id): Path<String>,
) -> Result<Json<Event>, EventError> {
    Ok(Json(events.get_event(&event_id).await?))
}
