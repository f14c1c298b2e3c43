use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::group::{
        CreateGroupRequest, GroupCreatedResponse, GroupQuery, GroupSummary, ParticipantsResponse,
        ParticipationResponse,
    },
    error::AppError,
    routes::session::SessionUser,
    services::group_service,
    state::SharedState,
};

/// Group browsing, creation and admission endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/groups", get(list_groups).post(create))
        .route("/groups/main", get(main_page))
        .route("/groups/quick/join", post(join_quick))
        .route("/groups/{id}/participants", get(participants))
        .route("/groups/{id}/join", post(join))
}

#[utoipa::path(
    get,
    path = "/groups",
    tag = "groups",
    params(GroupQuery),
    responses((status = 200, description = "Upcoming active groups by start time", body = [GroupSummary]))
)]
/// List upcoming groups, optionally filtered by tag and title fragment.
pub async fn list_groups(
    State(state): State<SharedState>,
    Query(query): Query<GroupQuery>,
) -> Result<Json<Vec<GroupSummary>>, AppError> {
    Ok(Json(group_service::list_upcoming_groups(&state, query).await?))
}

#[utoipa::path(
    get,
    path = "/groups/main",
    tag = "groups",
    responses((status = 200, description = "Next upcoming groups for the main page", body = [GroupSummary]))
)]
/// Return the first upcoming groups shown on the main page.
pub async fn main_page(
    State(state): State<SharedState>,
) -> Result<Json<Vec<GroupSummary>>, AppError> {
    Ok(Json(group_service::main_page_groups(&state).await?))
}

#[utoipa::path(
    post,
    path = "/groups",
    tag = "groups",
    params(("X-Session-Token" = String, Header, description = "Token issued at registration")),
    request_body = CreateGroupRequest,
    responses(
        (status = 201, description = "Group created and creator enrolled", body = GroupCreatedResponse),
        (status = 400, description = "Invalid group definition", body = crate::error::ErrorBody),
        (status = 401, description = "Missing or unknown session", body = crate::error::ErrorBody)
    )
)]
/// Open a new group; the creator joins it immediately.
pub async fn create(
    State(state): State<SharedState>,
    Extension(SessionUser(user)): Extension<SessionUser>,
    Json(payload): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<GroupCreatedResponse>), AppError> {
    payload.validate()?;
    let created = group_service::create_group(&state, user, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/groups/{id}/participants",
    tag = "groups",
    params(("id" = String, Path, description = "Identifier of the group")),
    responses(
        (status = 200, description = "Group details and participants in join order", body = ParticipantsResponse),
        (status = 404, description = "Unknown group", body = crate::error::ErrorBody)
    )
)]
/// Describe a group and list its participants.
pub async fn participants(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ParticipantsResponse>, AppError> {
    Ok(Json(group_service::group_participants(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/groups/{id}/join",
    tag = "groups",
    params(
        ("X-Session-Token" = String, Header, description = "Token issued at registration"),
        ("id" = String, Path, description = "Identifier of the group to join")
    ),
    responses(
        (status = 201, description = "Joined as the last-ranked participant", body = ParticipationResponse),
        (status = 401, description = "Missing or unknown session", body = crate::error::ErrorBody),
        (status = 404, description = "Unknown group", body = crate::error::ErrorBody),
        (status = 409, description = "Group full, inactive or already joined", body = crate::error::ErrorBody)
    )
)]
/// Join a group.
pub async fn join(
    State(state): State<SharedState>,
    Extension(SessionUser(user)): Extension<SessionUser>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ParticipationResponse>), AppError> {
    let joined = group_service::join_group(&state, user, id).await?;
    Ok((StatusCode::CREATED, Json(joined)))
}

#[utoipa::path(
    post,
    path = "/groups/quick/join",
    tag = "groups",
    params(("X-Session-Token" = String, Header, description = "Token issued at registration")),
    responses(
        (status = 201, description = "Joined today's quick match group", body = ParticipationResponse),
        (status = 401, description = "Missing or unknown session", body = crate::error::ErrorBody),
        (status = 404, description = "No quick match group is open", body = crate::error::ErrorBody),
        (status = 409, description = "Already joined", body = crate::error::ErrorBody)
    )
)]
/// Join the always-on quick match group.
pub async fn join_quick(
    State(state): State<SharedState>,
    Extension(SessionUser(user)): Extension<SessionUser>,
) -> Result<(StatusCode, Json<ParticipationResponse>), AppError> {
    let joined = group_service::join_quick_match(&state, user).await?;
    Ok((StatusCode::CREATED, Json(joined)))
}
