use crate::{
    modules::extractors::jwt::AuthUser,
    state::AppState,
    utils::users::{
        errors::UserError,
        models::{ProfileUpdate, UserProfile},
        UserService,
    },
};
use axum::{debug_handler, extract::State, routing::get, Json, Router};

pub fn router() -> Router<AppState> {
    Router::new().route("/me", get(my_profile).put(update_profile))
}

#[debug_handler(state = AppState)]
async fn my_profile(
    user: AuthUser,
    State(users): State<UserService>,
) -> Result<Json<UserProfile>, UserError> {
    Ok(Json(users.get_profile(&user.user_id).await?))
}

#[debug_handler(state = AppState)]
async fn update_profile(
    user: AuthUser,
    State(users): State<UserService>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<UserProfile>, UserError> {
    Ok(Json(users.upsert_profile(&user.user_id, update).await?))
}
