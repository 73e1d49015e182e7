use crate::{
    modules::extractors::jwt::AuthUser,
    state::AppState,
    utils::{
        groups::{
            errors::GroupError,
            models::{Group, GroupInfo, JoinGroup, JoinedGroup},
            GroupService,
        },
        users::UserService,
    },
};
use axum::{
    debug_handler,
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

/// Routes nested under `/events`.
pub fn event_router() -> Router<AppState> {
    Router::new()
        .route("/:event_id/groups/join", post(join_group))
        .route("/:event_id/groups/:group_id", get(group_info))
        .route("/:event_id/groups/:group_id/leave", post(leave_group))
        .merge(super::chat::messages_router())
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(my_groups))
}

#[debug_handler(state = AppState)]
async fn join_group(
    user: AuthUser,
    State(groups): State<GroupService>,
    Path(event_id): Path<String>,
    body: Option<Json<JoinGroup>>,
) -> Result<Json<JoinedGroup>, GroupError> {
    // A client may ask for smaller groups, never larger ones.
    let capacity = groups.default_max_size();
    let max_size = body
        .and_then(|Json(join)| join.max_size)
        .map_or(capacity, |requested| requested.min(capacity));

    let group_id = groups
        .assign_user_to_group(&event_id, &user.user_id, max_size)
        .await?;
    Ok(Json(JoinedGroup { group_id }))
}

#[debug_handler(state = AppState)]
async fn leave_group(
    user: AuthUser,
    State(groups): State<GroupService>,
    Path((event_id, group_id)): Path<(String, Uuid)>,
) -> Result<(), GroupError> {
    groups.leave_group(&event_id, &group_id, &user.user_id).await
}

#[debug_handler(state = AppState)]
async fn group_info(
    _user: AuthUser,
    State(groups): State<GroupService>,
    State(users): State<UserService>,
    Path((event_id, group_id)): Path<(String, Uuid)>,
) -> Result<Json<GroupInfo>, GroupError> {
    let group = groups.get_group(&event_id, &group_id).await?;
    Ok(Json(resolve(&users, group).await))
}

#[debug_handler(state = AppState)]
async fn my_groups(
    user: AuthUser,
    State(groups): State<GroupService>,
    State(users): State<UserService>,
) -> Result<Json<Vec<GroupInfo>>, GroupError> {
    let mut infos = Vec::new();
    for group in groups.groups_for_user(&user.user_id).await? {
        infos.push(resolve(&users, group).await);
    }
    Ok(Json(infos))
}

async fn resolve(users: &UserService, group: Group) -> GroupInfo {
    GroupInfo {
        id: group.id,
        members: users.resolve_members(&group.members).await,
        event_id: group.event_id,
        member_count: group.member_count,
    }
}
