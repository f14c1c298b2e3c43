use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Running Mate Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::users::register,
        crate::routes::users::profile,
        crate::routes::groups::list_groups,
        crate::routes::groups::main_page,
        crate::routes::groups::create,
        crate::routes::groups::participants,
        crate::routes::groups::join,
        crate::routes::groups::join_quick,
        crate::routes::records::leave,
        crate::routes::records::submit_update,
        crate::routes::records::leaderboard,
        crate::routes::sse::group_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::user::RegisterUserRequest,
            crate::dto::user::RegisterUserResponse,
            crate::dto::user::ProfileResponse,
            crate::dto::group::CreateGroupRequest,
            crate::dto::group::GroupSummary,
            crate::dto::group::GroupCreatedResponse,
            crate::dto::group::ParticipationResponse,
            crate::dto::group::ParticipantsResponse,
            crate::dto::running::SubmitUpdateRequest,
            crate::dto::running::SubmitUpdateResponse,
            crate::dto::running::LiveEntry,
            crate::dto::running::LeaderboardEntry,
            crate::dto::running::LeaderboardResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::LeaderboardEventRow,
            crate::dto::sse::LeaderboardUpdatedEvent,
            crate::dto::sse::ParticipantsChangedEvent,
            crate::dto::sse::GroupClosedEvent,
            crate::error::ErrorBody,
            crate::dao::models::GroupTag,
            crate::services::ranking::Movement,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "users", description = "Registration and profiles"),
        (name = "groups", description = "Group browsing, creation and admission"),
        (name = "records", description = "Progress updates and leaderboards"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
