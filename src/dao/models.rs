use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Sentinel used for groups without a participant cap (quick match).
pub const UNBOUNDED_PARTICIPANTS: u32 = u32::MAX;
/// Sentinel used for groups without a target distance (quick match).
pub const UNBOUNDED_DISTANCE_M: u32 = u32::MAX;

/// Category attached to a running group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupTag {
    /// Relaxed pace, no particular goal.
    Casual,
    /// First runs and short distances.
    Beginner,
    /// Regular runners.
    Intermediate,
    /// Fast paced sessions.
    Advanced,
    /// Long distance preparation.
    Marathon,
    /// Always-on group rotated daily by the scheduler.
    Quick,
}

impl GroupTag {
    /// Wire representation, identical to the serde name.
    pub fn as_str(self) -> &'static str {
        match self {
            GroupTag::Casual => "CASUAL",
            GroupTag::Beginner => "BEGINNER",
            GroupTag::Intermediate => "INTERMEDIATE",
            GroupTag::Advanced => "ADVANCED",
            GroupTag::Marathon => "MARATHON",
            GroupTag::Quick => "QUICK",
        }
    }

    /// Whether the tag is owned by the scheduler and cannot be picked by users.
    pub fn is_reserved(self) -> bool {
        matches!(self, GroupTag::Quick)
    }
}

impl fmt::Display for GroupTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupTag {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "CASUAL" => Ok(GroupTag::Casual),
            "BEGINNER" => Ok(GroupTag::Beginner),
            "INTERMEDIATE" => Ok(GroupTag::Intermediate),
            "ADVANCED" => Ok(GroupTag::Advanced),
            "MARATHON" => Ok(GroupTag::Marathon),
            "QUICK" => Ok(GroupTag::Quick),
            other => Err(format!("unknown group tag `{other}`")),
        }
    }
}

/// Registered runner profile.
#[derive(Debug, Clone, PartialEq)]
pub struct UserEntity {
    /// Stable identifier for the user.
    pub id: Uuid,
    /// Display name shown on leaderboards.
    pub nickname: String,
    /// Body weight used by the calorie model.
    pub weight_kg: f64,
}

/// Time-boxed running session that users can join.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupEntity {
    /// Stable identifier for the group.
    pub id: Uuid,
    /// Title chosen by the creator.
    pub title: String,
    /// Category of the group.
    pub tag: GroupTag,
    /// Scheduled start of the run.
    pub starts_at: OffsetDateTime,
    /// Scheduled end of the run; the deactivation sweep closes the group after it.
    pub ends_at: OffsetDateTime,
    /// Target distance in meters, [`UNBOUNDED_DISTANCE_M`] when open-ended.
    pub target_distance_m: u32,
    /// Participant cap, [`UNBOUNDED_PARTICIPANTS`] when unlimited.
    pub max_participants: u32,
    /// Number of live participations.
    pub current_participants: u32,
    /// `false` once the group has been deactivated; terminal.
    pub active: bool,
}

impl GroupEntity {
    /// Whether the group reached its participant cap.
    pub fn is_full(&self) -> bool {
        self.current_participants >= self.max_participants
    }
}

/// Running progress of one user inside one group.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordEntity {
    /// Stable identifier for the record.
    pub id: Uuid,
    /// Owner of the record.
    pub user_id: Uuid,
    /// Group the record participates in.
    pub group_id: Uuid,
    /// Distance covered so far, in meters.
    pub distance_m: u32,
    /// Running duration so far, in seconds.
    pub elapsed_secs: u64,
    /// Estimated energy burned so far.
    pub calories: f64,
    /// When the participation was created.
    pub started_at: OffsetDateTime,
    /// Last accepted update.
    pub updated_at: OffsetDateTime,
}

impl RecordEntity {
    /// Fresh participation with zero progress.
    pub fn new(user_id: Uuid, group_id: Uuid, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            group_id,
            distance_m: 0,
            elapsed_secs: 0,
            calories: 0.0,
            started_at: now,
            updated_at: now,
        }
    }
}

/// Ranking entry pairing one record with its group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardRowEntity {
    /// Record ranked by this row; also the row identifier.
    pub record_id: Uuid,
    /// Group the row belongs to.
    pub group_id: Uuid,
    /// Owner of the record, denormalised for duplicate-join checks.
    pub user_id: Uuid,
    /// Rank after the latest re-rank (1-based).
    pub current_rank: u32,
    /// Rank before the latest re-rank (1-based).
    pub previous_rank: u32,
    /// When the participant joined; secondary ordering key.
    pub joined_at: OffsetDateTime,
}
