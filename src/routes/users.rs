use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use validator::Validate;

use crate::{
    dto::user::{ProfileResponse, RegisterUserRequest, RegisterUserResponse},
    error::AppError,
    routes::session::SessionUser,
    services::user_service,
    state::SharedState,
};

/// Registration and profile endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/users", post(register))
        .route("/users/me", get(profile))
}

#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "User registered", body = RegisterUserResponse),
        (status = 400, description = "Invalid nickname or weight", body = crate::error::ErrorBody)
    )
)]
/// Create a runner profile and issue its session token.
pub async fn register(
    State(state): State<SharedState>,
    Json(payload): Json<RegisterUserRequest>,
) -> Result<(StatusCode, Json<RegisterUserResponse>), AppError> {
    payload.validate()?;
    let registered = user_service::register_user(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(registered)))
}

#[utoipa::path(
    get,
    path = "/users/me",
    tag = "users",
    params(("X-Session-Token" = String, Header, description = "Token issued at registration")),
    responses(
        (status = 200, description = "Profile of the caller", body = ProfileResponse),
        (status = 401, description = "Missing or unknown session", body = crate::error::ErrorBody)
    )
)]
/// Return the caller's profile with personal best and totals.
pub async fn profile(
    State(state): State<SharedState>,
    Extension(SessionUser(user)): Extension<SessionUser>,
) -> Result<Json<ProfileResponse>, AppError> {
    Ok(Json(user_service::get_profile(&state, user).await?))
}
