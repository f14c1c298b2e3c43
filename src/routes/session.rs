use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::state::SharedState;

/// Header carrying the token issued at registration.
pub const SESSION_TOKEN_HEADER: &str = "x-session-token";

/// User resolved from the request's session token, `None` when absent or unknown.
#[derive(Debug, Clone, Copy)]
pub struct SessionUser(pub Option<Uuid>);

/// Resolve the session token once per request and expose it as a [`SessionUser`] extension.
pub async fn resolve_session(
    State(state): State<SharedState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let user = req
        .headers()
        .get(SESSION_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .and_then(|token| state.identity().resolve(token));

    req.extensions_mut().insert(SessionUser(user));
    next.run(req).await
}
