use axum::{Router, middleware};

use crate::state::SharedState;

pub mod docs;
pub mod groups;
pub mod health;
pub mod records;
pub mod session;
pub mod sse;
pub mod users;

/// Compose all route trees, wiring in shared state, session resolution and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(users::router())
        .merge(groups::router())
        .merge(records::router())
        .merge(sse::router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session::resolve_session,
        ));

    api_router.merge(docs::router()).with_state(state)
}
