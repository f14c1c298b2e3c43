use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::dto::validation::validate_nickname;

/// Payload used to create a runner profile.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RegisterUserRequest {
    #[validate(custom(function = "validate_nickname"))]
    pub nickname: String,
    /// Body weight in kilograms, used for calorie estimates.
    #[validate(range(exclusive_min = 0.0, max = 500.0))]
    pub weight_kg: f64,
}

/// Issued session for a freshly registered user.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterUserResponse {
    pub user_id: Uuid,
    /// Opaque token to send back in the `X-Session-Token` header.
    pub session_token: String,
}

/// Runner profile with lifetime statistics.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProfileResponse {
    pub user_id: Uuid,
    pub nickname: String,
    pub weight_kg: f64,
    /// Longest single-session distance in meters, 0 without any run.
    pub personal_best_m: u32,
    /// Sum of every session distance in meters.
    pub total_distance_m: u64,
    /// Number of participations, past and current.
    pub sessions: usize,
}
