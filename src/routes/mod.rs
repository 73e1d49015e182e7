use axum::{
    debug_handler, extract::State, http::HeaderValue, response::IntoResponse, routing::get, Json,
    Router,
};
use hyper::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    StatusCode,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::{configuration::Settings, modules::store::GroupStore, state::AppState};

pub mod chat;
pub mod events;
pub mod groups;
pub mod map;
pub mod users;

pub async fn app(config: Settings, test_store: Option<Arc<dyn GroupStore>>) -> Router {
    let origin = config
        .app
        .origin
        .parse::<HeaderValue>()
        .expect("Invalid origin");
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true);

    let api = Router::new()
        .route("/health", get(health_check))
        .nest("/events", events::router().merge(groups::event_router()))
        .nest("/groups", groups::router())
        .nest("/users", users::router())
        .nest("/map", map::router())
        .nest("/chat", chat::router())
        .with_state(AppState::new(config, test_store).await)
        .layer(cors);

    Router::new().nest("/api", api)
}

#[debug_handler(state = AppState)]
async fn health_check(State(store): State<Arc<dyn GroupStore>>) -> impl IntoResponse {
    match store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({"status": "all backend services are working properly"})),
        ),
        Err(e) => {
            warn!("Health check failed: {e:?}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "store unavailable"})),
            )
        }
    }
}
