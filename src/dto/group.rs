use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{GroupEntity, GroupTag, UNBOUNDED_DISTANCE_M, UNBOUNDED_PARTICIPANTS},
    dto::{format_timestamp, validation::validate_title},
};

/// Payload used to open a new running group.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateGroupRequest {
    #[validate(custom(function = "validate_title"))]
    pub title: String,
    pub tag: GroupTag,
    /// RFC 3339 start timestamp.
    pub starts_at: String,
    /// RFC 3339 end timestamp, strictly after `starts_at`.
    pub ends_at: String,
    pub target_distance_m: u32,
    pub max_participants: u32,
}

/// Filters accepted by the group listing.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GroupQuery {
    /// Only groups carrying this tag.
    pub tag: Option<GroupTag>,
    /// Case-insensitive fragment of the title.
    pub q: Option<String>,
}

/// Public projection of a running group.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GroupSummary {
    pub id: Uuid,
    pub title: String,
    pub tag: GroupTag,
    pub starts_at: String,
    pub ends_at: String,
    /// `null` when the group has no target distance.
    pub target_distance_m: Option<u32>,
    /// `null` when the group accepts any number of participants.
    pub max_participants: Option<u32>,
    pub current_participants: u32,
    pub active: bool,
}

impl From<&GroupEntity> for GroupSummary {
    fn from(group: &GroupEntity) -> Self {
        Self {
            id: group.id,
            title: group.title.clone(),
            tag: group.tag,
            starts_at: format_timestamp(group.starts_at),
            ends_at: format_timestamp(group.ends_at),
            target_distance_m: (group.target_distance_m != UNBOUNDED_DISTANCE_M)
                .then_some(group.target_distance_m),
            max_participants: (group.max_participants != UNBOUNDED_PARTICIPANTS)
                .then_some(group.max_participants),
            current_participants: group.current_participants,
            active: group.active,
        }
    }
}

/// Participation created by a join.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ParticipationResponse {
    pub record_id: Uuid,
    pub group_id: Uuid,
    /// Rank assigned on entry (last place).
    pub rank: u32,
}

/// Newly created group together with the creator's participation.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GroupCreatedResponse {
    pub group: GroupSummary,
    pub participation: ParticipationResponse,
}

/// Group details with participant nicknames in join order.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ParticipantsResponse {
    pub group: GroupSummary,
    pub participants: Vec<String>,
}
