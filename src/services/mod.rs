/// Calorie estimate from pace and body weight.
pub mod calories;
/// Status line generation after each update.
pub mod commentary;
/// OpenAPI documentation generation.
pub mod documentation;
/// Group admission, departure and browsing.
pub mod group_service;
/// Health check service.
pub mod health_service;
/// Live window and results table projections.
pub mod leaderboard;
/// Dense re-ranking of leaderboard rows.
pub mod ranking;
/// Progress updates and leaderboard queries.
pub mod running_service;
/// Background timers driving the sweeps.
pub mod scheduler;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events streaming service.
pub mod sse_service;
/// Expired group deactivation and quick match rotation.
pub mod sweeps;
/// Registration and profiles.
pub mod user_service;
