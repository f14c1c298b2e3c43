use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dao::models::{GroupEntity, UNBOUNDED_PARTICIPANTS},
    dto::sse::{
        GroupClosedEvent, LeaderboardEventRow, LeaderboardUpdatedEvent, ParticipantsChangedEvent,
        ServerEvent,
    },
    services::leaderboard::BoardRow,
    state::SharedState,
};

pub const EVENT_LEADERBOARD_UPDATED: &str = "leaderboard.updated";
pub const EVENT_GROUP_PARTICIPANTS: &str = "group.participants";
pub const EVENT_GROUP_CLOSED: &str = "group.closed";

/// Broadcast the freshly ranked board of a group.
pub fn broadcast_leaderboard_updated(state: &SharedState, group_id: Uuid, rows: &[BoardRow]) {
    let payload = LeaderboardUpdatedEvent {
        group_id,
        rows: rows
            .iter()
            .map(|row| LeaderboardEventRow {
                rank: row.rank,
                nickname: row.nickname.clone(),
                distance_m: row.distance_m,
            })
            .collect(),
    };
    send_group_event(state, group_id, EVENT_LEADERBOARD_UPDATED, &payload);
}

/// Broadcast the participant count after a join or a leave.
pub fn broadcast_participants_changed(state: &SharedState, group: &GroupEntity) {
    let payload = ParticipantsChangedEvent {
        group_id: group.id,
        current_participants: group.current_participants,
        max_participants: (group.max_participants != UNBOUNDED_PARTICIPANTS)
            .then_some(group.max_participants),
    };
    send_group_event(state, group.id, EVENT_GROUP_PARTICIPANTS, &payload);
}

/// Broadcast that a group has been deactivated.
pub fn broadcast_group_closed(state: &SharedState, group_id: Uuid) {
    let payload = GroupClosedEvent { group_id };
    send_group_event(state, group_id, EVENT_GROUP_CLOSED, &payload);
}

fn send_group_event(state: &SharedState, group_id: Uuid, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(group_id, Some(event.to_string()), payload) {
        Ok(event) => state.sse().broadcast(event),
        Err(err) => warn!(event, %group_id, error = %err, "failed to serialize group SSE payload"),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};
    use time::Duration;
    use tokio::sync::broadcast::Receiver;

    use super::*;
    use crate::{
        dao::models::GroupTag,
        dto::running::SubmitUpdateRequest,
        services::{
            group_service::{join_group, leave_group},
            running_service::submit_update,
            sweeps::deactivate_expired_groups,
            test_support::{NOW, fixed_state, insert_group, register},
        },
    };

    fn next_event(receiver: &mut Receiver<ServerEvent>) -> (Uuid, String, Value) {
        let event = receiver.try_recv().unwrap();
        let data = serde_json::from_str(&event.data).unwrap();
        (event.group_id, event.event.unwrap(), data)
    }

    #[tokio::test]
    async fn joins_and_leaves_announce_the_participant_count() {
        let state = fixed_state(NOW);
        let alice = register(&state, "alice").await;
        let group = insert_group(&state, GroupTag::Casual, 5).await;
        let mut receiver = state.sse().subscribe();

        let joined = join_group(&state, Some(alice), group.id).await.unwrap();
        let (group_id, name, data) = next_event(&mut receiver);
        assert_eq!(group_id, group.id);
        assert_eq!(name, EVENT_GROUP_PARTICIPANTS);
        assert_eq!(data["current_participants"], json!(1));
        assert_eq!(data["max_participants"], json!(5));

        leave_group(&state, Some(alice), joined.record_id)
            .await
            .unwrap();
        let (_, name, data) = next_event(&mut receiver);
        assert_eq!(name, EVENT_GROUP_PARTICIPANTS);
        assert_eq!(data["current_participants"], json!(0));
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn updates_broadcast_the_ranked_board() {
        let state = fixed_state(NOW);
        let group = insert_group(&state, GroupTag::Casual, 5).await;
        let alice = register(&state, "alice").await;
        let bob = register(&state, "bob").await;
        join_group(&state, Some(alice), group.id).await.unwrap();
        let entry = join_group(&state, Some(bob), group.id).await.unwrap();

        let mut receiver = state.sse().subscribe();
        let request = SubmitUpdateRequest {
            distance_m: 700,
            elapsed_secs: 240,
        };
        submit_update(&state, Some(bob), entry.record_id, request)
            .await
            .unwrap();

        let (group_id, name, data) = next_event(&mut receiver);
        assert_eq!(group_id, group.id);
        assert_eq!(name, EVENT_LEADERBOARD_UPDATED);
        assert_eq!(
            data["rows"],
            json!([
                {"rank": 1, "nickname": "bob", "distance_m": 700},
                {"rank": 2, "nickname": "alice", "distance_m": 0},
            ])
        );
    }

    #[tokio::test]
    async fn deactivation_announces_the_closed_group() {
        let state = fixed_state(NOW);
        let group = insert_group(&state, GroupTag::Casual, 5).await;
        let mut receiver = state.sse().subscribe();

        deactivate_expired_groups(&state, NOW + Duration::hours(2))
            .await
            .unwrap();
        let (group_id, name, data) = next_event(&mut receiver);
        assert_eq!(group_id, group.id);
        assert_eq!(name, EVENT_GROUP_CLOSED);
        assert_eq!(data["group_id"], json!(group.id));
    }
}
