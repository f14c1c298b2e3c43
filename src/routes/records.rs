use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use uuid::Uuid;

use crate::{
    dto::running::{LeaderboardResponse, SubmitUpdateRequest, SubmitUpdateResponse},
    error::AppError,
    routes::session::SessionUser,
    services::{group_service, running_service},
    state::SharedState,
};

/// Endpoints acting on one participation record.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/records/{id}", delete(leave))
        .route("/records/{id}/updates", post(submit_update))
        .route("/records/{id}/leaderboard", get(leaderboard))
}

#[utoipa::path(
    delete,
    path = "/records/{id}",
    tag = "records",
    params(
        ("X-Session-Token" = String, Header, description = "Token issued at registration"),
        ("id" = String, Path, description = "Participation record to cancel")
    ),
    responses(
        (status = 204, description = "Participation cancelled"),
        (status = 401, description = "Missing or unknown session", body = crate::error::ErrorBody),
        (status = 404, description = "Unknown record", body = crate::error::ErrorBody),
        (status = 409, description = "Group has no participants", body = crate::error::ErrorBody)
    )
)]
/// Leave the group the record belongs to.
pub async fn leave(
    State(state): State<SharedState>,
    Extension(SessionUser(user)): Extension<SessionUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    group_service::leave_group(&state, user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/records/{id}/updates",
    tag = "records",
    params(
        ("X-Session-Token" = String, Header, description = "Token issued at registration"),
        ("id" = String, Path, description = "Participation record being run")
    ),
    request_body = SubmitUpdateRequest,
    responses(
        (status = 200, description = "Update accepted and group re-ranked", body = SubmitUpdateResponse),
        (status = 400, description = "Progress went backwards", body = crate::error::ErrorBody),
        (status = 401, description = "Missing or unknown session", body = crate::error::ErrorBody),
        (status = 404, description = "Unknown record", body = crate::error::ErrorBody)
    )
)]
/// Submit cumulative distance and duration for a running session.
pub async fn submit_update(
    State(state): State<SharedState>,
    Extension(SessionUser(user)): Extension<SessionUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitUpdateRequest>,
) -> Result<Json<SubmitUpdateResponse>, AppError> {
    Ok(Json(
        running_service::submit_update(&state, user, id, payload).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/records/{id}/leaderboard",
    tag = "records",
    params(
        ("X-Session-Token" = String, Header, description = "Token issued at registration"),
        ("id" = String, Path, description = "Any record of the group")
    ),
    responses(
        (status = 200, description = "Results table padded to three rows", body = LeaderboardResponse),
        (status = 401, description = "Missing or unknown session", body = crate::error::ErrorBody),
        (status = 404, description = "Unknown record", body = crate::error::ErrorBody)
    )
)]
/// Return the full results table of the record's group.
pub async fn leaderboard(
    State(state): State<SharedState>,
    Extension(SessionUser(user)): Extension<SessionUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    Ok(Json(running_service::get_leaderboard(&state, user, id).await?))
}
