use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;
use tracing::info;
use uuid::Uuid;

use crate::{error::AppError, services::sse_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/groups/{id}/stream",
    tag = "sse",
    params(("id" = String, Path, description = "Group to follow")),
    responses(
        (status = 200, description = "Group SSE stream", content_type = "text/event-stream", body = String),
        (status = 404, description = "Unknown group", body = crate::error::ErrorBody)
    )
)]
/// Stream leaderboard and participant events of one group.
pub async fn group_stream(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let receiver = sse_service::subscribe_group(&state, id).await?;
    info!(group_id = %id, "new group SSE connection");
    Ok(sse_service::to_sse_stream(receiver, id))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/groups/{id}/stream", get(group_stream))
}
