use crate::{
    configuration::MapSettings,
    state::AppState,
    utils::map::{
        compute_marker_diff,
        models::{DiffOptions, MarkerDiff, MarkerDiffRequest},
    },
};
use axum::{debug_handler, extract::State, routing::post, Json, Router};

pub fn router() -> Router<AppState> {
    Router::new().route("/diff", post(marker_diff))
}

#[debug_handler(state = AppState)]
async fn marker_diff(
    State(settings): State<MapSettings>,
    Json(request): Json<MarkerDiffRequest>,
) -> Json<MarkerDiff> {
    let options = DiffOptions {
        user_move_threshold_meters: settings.user_move_threshold_meters,
    };
    Json(compute_marker_diff(&request.old, &request.new, &options))
}
