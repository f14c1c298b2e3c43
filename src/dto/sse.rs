use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug)]
/// Dispatched payload carried across the SSE hub.
pub struct ServerEvent {
    /// Group the event concerns; streams only forward their own group's events.
    pub group_id: Uuid,
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(group_id: Uuid, event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            group_id,
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    pub group_id: Uuid,
    /// Human-readable message confirming the subscription.
    pub message: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
/// Compact leaderboard row broadcast after every re-rank.
pub struct LeaderboardEventRow {
    pub rank: u32,
    pub nickname: String,
    pub distance_m: u32,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a group has been re-ranked.
pub struct LeaderboardUpdatedEvent {
    pub group_id: Uuid,
    pub rows: Vec<LeaderboardEventRow>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when someone joins or leaves a group.
pub struct ParticipantsChangedEvent {
    pub group_id: Uuid,
    pub current_participants: u32,
    /// `null` for unbounded groups.
    pub max_participants: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a group has been deactivated.
pub struct GroupClosedEvent {
    pub group_id: Uuid,
}
