use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::services::ranking::Movement;

/// Cumulative progress reported by a running client.
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
pub struct SubmitUpdateRequest {
    /// Total distance since the start of the session, in meters.
    pub distance_m: u32,
    /// Total running time since the start of the session, in seconds.
    pub elapsed_secs: u64,
}

/// Entry of the three-row live widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LiveEntry {
    pub nickname: String,
    pub rank: u32,
    pub is_my_record: bool,
    pub movement: Movement,
    pub distance_km: f64,
}

/// Result of an accepted progress update.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitUpdateResponse {
    pub rank: u32,
    pub movement: Movement,
    pub calories: f64,
    pub commentary: String,
    pub live_window: Vec<LiveEntry>,
}

/// Entry of the post-run results table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub nickname: String,
    pub your_record: bool,
    pub distance_km: f64,
}

/// Full leaderboard of the group a record belongs to.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LeaderboardResponse {
    pub group_id: Uuid,
    pub entries: Vec<LeaderboardEntry>,
}
