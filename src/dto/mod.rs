use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Group creation, browsing and admission payloads.
pub mod group;
/// Health check payloads.
pub mod health;
/// Progress update and leaderboard payloads.
pub mod running;
/// Server-Sent Events payloads.
pub mod sse;
/// Registration and profile payloads.
pub mod user;
/// Validation helpers for DTOs.
pub mod validation;

fn format_timestamp(time: OffsetDateTime) -> String {
    time.format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
