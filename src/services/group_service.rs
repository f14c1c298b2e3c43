//! Group admission, departure and browsing.

use std::future::Future;

use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        models::{GroupEntity, GroupTag, LeaderboardRowEntity, RecordEntity},
        storage::StorageResult,
    },
    dto::group::{
        CreateGroupRequest, GroupCreatedResponse, GroupQuery, GroupSummary, ParticipantsResponse,
        ParticipationResponse,
    },
    error::ServiceError,
    services::sse_events::broadcast_participants_changed,
    state::SharedState,
};

/// Number of groups shown on the main page.
pub const MAIN_PAGE_LIMIT: usize = 6;

fn group_not_found(group_id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("group `{group_id}` not found"))
}

fn record_not_found(record_id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("record `{record_id}` not found"))
}

/// Undo the earlier writes of a mutation whose later write failed.
///
/// A failing undo is logged; the caller still reports the original error.
pub(crate) async fn compensate<T>(
    action: &'static str,
    record_id: Uuid,
    undo: impl Future<Output = StorageResult<T>>,
) {
    if let Err(err) = undo.await {
        warn!(action, %record_id, error = %err, "failed to undo partial write");
    }
}

fn parse_timestamp(field: &str, value: &str) -> Result<OffsetDateTime, ServiceError> {
    OffsetDateTime::parse(value.trim(), &Rfc3339).map_err(|err| {
        ServiceError::InvalidInput(format!("`{field}` is not an RFC 3339 timestamp: {err}"))
    })
}

/// Turn a creation request into a fresh active group, enforcing the creation rules.
fn build_group(request: CreateGroupRequest) -> Result<GroupEntity, ServiceError> {
    let title = request.title.trim();
    if title.is_empty() {
        return Err(ServiceError::InvalidInput("title must not be blank".into()));
    }
    if request.tag.is_reserved() {
        return Err(ServiceError::InvalidInput(format!(
            "tag `{}` is reserved for scheduled groups",
            request.tag
        )));
    }
    if request.max_participants < 1 {
        return Err(ServiceError::InvalidInput(
            "max_participants must be at least 1".into(),
        ));
    }
    if request.target_distance_m < 1 {
        return Err(ServiceError::InvalidInput(
            "target_distance_m must be at least 1".into(),
        ));
    }

    let starts_at = parse_timestamp("starts_at", &request.starts_at)?;
    let ends_at = parse_timestamp("ends_at", &request.ends_at)?;
    if ends_at <= starts_at {
        return Err(ServiceError::InvalidInput(
            "ends_at must be after starts_at".into(),
        ));
    }

    Ok(GroupEntity {
        id: Uuid::new_v4(),
        title: title.to_owned(),
        tag: request.tag,
        starts_at,
        ends_at,
        target_distance_m: request.target_distance_m,
        max_participants: request.max_participants,
        current_participants: 0,
        active: true,
    })
}

/// Create a group and enrol its creator as the first participant.
pub async fn create_group(
    state: &SharedState,
    user: Option<Uuid>,
    request: CreateGroupRequest,
) -> Result<GroupCreatedResponse, ServiceError> {
    let user_id = user.ok_or(ServiceError::AuthRequired)?;
    let group = build_group(request)?;
    state.store().save_group(group.clone()).await?;
    info!(group_id = %group.id, tag = %group.tag, creator = %user_id, "created running group");

    let (group, participation) = admit(state, group.id, user_id).await?;
    Ok(GroupCreatedResponse {
        group: GroupSummary::from(&group),
        participation,
    })
}

/// Join `group_id` as the last-ranked participant.
pub async fn join_group(
    state: &SharedState,
    user: Option<Uuid>,
    group_id: Uuid,
) -> Result<ParticipationResponse, ServiceError> {
    let user_id = user.ok_or(ServiceError::AuthRequired)?;
    let (_, participation) = admit(state, group_id, user_id).await?;
    Ok(participation)
}

/// Join the currently active quick match group.
///
/// The daily rotation owns quick match groups; none is created here when missing.
pub async fn join_quick_match(
    state: &SharedState,
    user: Option<Uuid>,
) -> Result<ParticipationResponse, ServiceError> {
    let user_id = user.ok_or(ServiceError::AuthRequired)?;
    let group = state
        .store()
        .find_active_groups_by_tag(GroupTag::Quick)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ServiceError::NotFound("no active quick match group".into()))?;

    let (_, participation) = admit(state, group.id, user_id).await?;
    Ok(participation)
}

/// Admission under the group lock: checks, counter increment, record and row creation.
async fn admit(
    state: &SharedState,
    group_id: Uuid,
    user_id: Uuid,
) -> Result<(GroupEntity, ParticipationResponse), ServiceError> {
    let _guard = state.lock_group(group_id).await;
    let store = state.store();

    let mut group = store
        .find_group(group_id)
        .await?
        .ok_or_else(|| group_not_found(group_id))?;
    if !group.active {
        return Err(ServiceError::GroupInactive);
    }
    if store
        .find_user_row_in_group(group_id, user_id)
        .await?
        .is_some()
    {
        return Err(ServiceError::AlreadyJoined);
    }
    if group.is_full() {
        return Err(ServiceError::CapacityExceeded);
    }

    // ranks left behind by a leave are only renumbered by the next update
    let rank = store
        .rows_for_group(group_id)
        .await?
        .iter()
        .map(|row| row.current_rank)
        .max()
        .unwrap_or(0)
        + 1;
    let now = state.now();
    group.current_participants += 1;
    let record = RecordEntity::new(user_id, group_id, now);
    let record_id = record.id;
    let row = LeaderboardRowEntity {
        record_id,
        group_id,
        user_id,
        current_rank: rank,
        previous_rank: rank,
        joined_at: now,
    };
    let participation = ParticipationResponse {
        record_id,
        group_id,
        rank,
    };

    store.save_record(record).await?;
    if let Err(err) = store.save_rows(vec![row]).await {
        compensate("join", record_id, store.delete_participation(record_id)).await;
        return Err(err.into());
    }
    if let Err(err) = store.save_group(group.clone()).await {
        compensate("join", record_id, store.delete_participation(record_id)).await;
        return Err(err.into());
    }
    info!(
        %group_id,
        %user_id,
        record_id = %participation.record_id,
        participants = group.current_participants,
        "participant joined group"
    );

    broadcast_participants_changed(state, &group);
    Ok((group, participation))
}

/// Load `record_id` on behalf of `user_id`; records of other users are reported as missing.
pub(crate) async fn owned_record(
    state: &SharedState,
    user_id: Uuid,
    record_id: Uuid,
) -> Result<RecordEntity, ServiceError> {
    state
        .store()
        .find_record(record_id)
        .await?
        .filter(|record| record.user_id == user_id)
        .ok_or_else(|| record_not_found(record_id))
}

/// Cancel a participation, deleting its record and row.
///
/// Remaining ranks are left untouched until the next update re-ranks the group.
pub async fn leave_group(
    state: &SharedState,
    user: Option<Uuid>,
    record_id: Uuid,
) -> Result<(), ServiceError> {
    let user_id = user.ok_or(ServiceError::AuthRequired)?;
    let group_id = owned_record(state, user_id, record_id).await?.group_id;

    let _guard = state.lock_group(group_id).await;
    let store = state.store();
    let mut group = store
        .find_group(group_id)
        .await?
        .ok_or_else(|| group_not_found(group_id))?;
    // a concurrent leave may have won the lock first
    let Some(record) = store.find_record(record_id).await? else {
        return Err(record_not_found(record_id));
    };
    if group.current_participants == 0 {
        return Err(ServiceError::EmptyGroup);
    }
    let row = store.find_row(record_id).await?;

    group.current_participants -= 1;
    store.delete_participation(record_id).await?;
    if let Err(err) = store.save_group(group.clone()).await {
        let store = store.clone();
        let restore = async move {
            store.save_record(record).await?;
            match row {
                Some(row) => store.save_rows(vec![row]).await,
                None => Ok(()),
            }
        };
        compensate("leave", record_id, restore).await;
        return Err(err.into());
    }
    info!(
        %group_id,
        %user_id,
        %record_id,
        participants = group.current_participants,
        "participant left group"
    );

    broadcast_participants_changed(state, &group);
    Ok(())
}

/// Group details and participant nicknames in join order.
pub async fn group_participants(
    state: &SharedState,
    group_id: Uuid,
) -> Result<ParticipantsResponse, ServiceError> {
    let store = state.store();
    let group = store
        .find_group(group_id)
        .await?
        .ok_or_else(|| group_not_found(group_id))?;
    let rows = store.rows_for_group(group_id).await?;
    let users = store
        .find_users(rows.iter().map(|row| row.user_id).collect())
        .await?;

    let participants = rows
        .iter()
        .filter_map(|row| {
            users
                .iter()
                .find(|user| user.id == row.user_id)
                .map(|user| user.nickname.clone())
        })
        .collect();

    Ok(ParticipantsResponse {
        group: GroupSummary::from(&group),
        participants,
    })
}

/// Active groups that have not started yet, optionally filtered by tag and title fragment.
pub async fn list_upcoming_groups(
    state: &SharedState,
    query: GroupQuery,
) -> Result<Vec<GroupSummary>, ServiceError> {
    let now = state.now();
    let needle = query
        .q
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());

    let groups = state.store().list_active_groups().await?;
    Ok(groups
        .iter()
        .filter(|group| group.starts_at > now)
        .filter(|group| query.tag.is_none_or(|tag| group.tag == tag))
        .filter(|group| {
            needle
                .as_deref()
                .is_none_or(|needle| group.title.to_lowercase().contains(needle))
        })
        .map(GroupSummary::from)
        .collect())
}

/// The next [`MAIN_PAGE_LIMIT`] upcoming groups by start time.
pub async fn main_page_groups(state: &SharedState) -> Result<Vec<GroupSummary>, ServiceError> {
    let mut groups = list_upcoming_groups(state, GroupQuery::default()).await?;
    groups.truncate(MAIN_PAGE_LIMIT);
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use std::sync::{Arc, atomic::Ordering};

    use super::*;
    use crate::services::test_support::{
        FailingStore, NOW, create_request, fixed_state, insert_group, register, rfc3339,
        state_over,
    };

    async fn stored_ranks(state: &SharedState, group_id: Uuid) -> Vec<u32> {
        state
            .store()
            .rows_for_group(group_id)
            .await
            .unwrap()
            .iter()
            .map(|row| row.current_rank)
            .collect()
    }

    #[tokio::test]
    async fn capacity_is_enforced() {
        let state = fixed_state(NOW);
        let alice = register(&state, "alice").await;
        let bob = register(&state, "bob").await;
        let group = insert_group(&state, GroupTag::Casual, 1).await;

        let joined = join_group(&state, Some(alice), group.id).await.unwrap();
        assert_eq!(joined.rank, 1);
        let stored = state.store().find_group(group.id).await.unwrap().unwrap();
        assert_eq!(stored.current_participants, 1);

        let err = join_group(&state, Some(bob), group.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::CapacityExceeded));
        let stored = state.store().find_group(group.id).await.unwrap().unwrap();
        assert_eq!(stored.current_participants, 1);
    }

    #[tokio::test]
    async fn joiners_start_last() {
        let state = fixed_state(NOW);
        let group = insert_group(&state, GroupTag::Casual, 5).await;
        for (expected_rank, name) in (1..).zip(["a", "b", "c"]) {
            let user = register(&state, name).await;
            let joined = join_group(&state, Some(user), group.id).await.unwrap();
            assert_eq!(joined.rank, expected_rank);
            let row = state
                .store()
                .find_row(joined.record_id)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(row.previous_rank, expected_rank);
            let record = state
                .store()
                .find_record(joined.record_id)
                .await
                .unwrap()
                .unwrap();
            assert_eq!((record.distance_m, record.elapsed_secs), (0, 0));
        }
    }

    #[tokio::test]
    async fn join_rejections() {
        let state = fixed_state(NOW);
        let alice = register(&state, "alice").await;
        let group = insert_group(&state, GroupTag::Casual, 5).await;

        assert!(matches!(
            join_group(&state, None, group.id).await,
            Err(ServiceError::AuthRequired)
        ));
        assert!(matches!(
            join_group(&state, Some(alice), Uuid::new_v4()).await,
            Err(ServiceError::NotFound(_))
        ));

        join_group(&state, Some(alice), group.id).await.unwrap();
        assert!(matches!(
            join_group(&state, Some(alice), group.id).await,
            Err(ServiceError::AlreadyJoined)
        ));

        let mut closed = insert_group(&state, GroupTag::Casual, 5).await;
        closed.active = false;
        state.store().save_group(closed.clone()).await.unwrap();
        assert!(matches!(
            join_group(&state, Some(alice), closed.id).await,
            Err(ServiceError::GroupInactive)
        ));
    }

    #[tokio::test]
    async fn create_enrols_the_creator() {
        let state = fixed_state(NOW);
        let alice = register(&state, "alice").await;

        let created = create_group(&state, Some(alice), create_request(4))
            .await
            .unwrap();
        assert_eq!(created.group.current_participants, 1);
        assert_eq!(created.participation.rank, 1);
        assert_eq!(created.participation.group_id, created.group.id);

        let participants = group_participants(&state, created.group.id).await.unwrap();
        assert_eq!(participants.participants, vec!["alice".to_string()]);
    }

    #[tokio::test]
    async fn create_validation() {
        let state = fixed_state(NOW);
        let alice = register(&state, "alice").await;

        assert!(matches!(
            create_group(&state, None, create_request(4)).await,
            Err(ServiceError::AuthRequired)
        ));
        assert!(matches!(
            create_group(&state, Some(alice), create_request(0)).await,
            Err(ServiceError::InvalidInput(_))
        ));

        let mut quick = create_request(4);
        quick.tag = GroupTag::Quick;
        assert!(matches!(
            create_group(&state, Some(alice), quick).await,
            Err(ServiceError::InvalidInput(_))
        ));

        let mut inverted = create_request(4);
        std::mem::swap(&mut inverted.starts_at, &mut inverted.ends_at);
        assert!(matches!(
            create_group(&state, Some(alice), inverted).await,
            Err(ServiceError::InvalidInput(_))
        ));

        let mut garbled = create_request(4);
        garbled.starts_at = "tomorrow morning".into();
        assert!(matches!(
            create_group(&state, Some(alice), garbled).await,
            Err(ServiceError::InvalidInput(_))
        ));

        assert!(state.store().list_active_groups().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn leave_frees_the_seat_without_renumbering() {
        let state = fixed_state(NOW);
        let group = insert_group(&state, GroupTag::Casual, 3).await;
        let mut records = Vec::new();
        let mut users = Vec::new();
        for name in ["a", "b", "c"] {
            let user = register(&state, name).await;
            users.push(user);
            records.push(join_group(&state, Some(user), group.id).await.unwrap());
        }

        leave_group(&state, Some(users[1]), records[1].record_id)
            .await
            .unwrap();

        let stored = state.store().find_group(group.id).await.unwrap().unwrap();
        assert_eq!(stored.current_participants, 2);
        assert!(
            state
                .store()
                .find_record(records[1].record_id)
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(stored_ranks(&state, group.id).await, vec![1, 3]);

        assert!(matches!(
            leave_group(&state, Some(users[1]), records[1].record_id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn leave_requires_ownership_and_participants() {
        let state = fixed_state(NOW);
        let alice = register(&state, "alice").await;
        let bob = register(&state, "bob").await;
        let group = insert_group(&state, GroupTag::Casual, 3).await;
        let joined = join_group(&state, Some(alice), group.id).await.unwrap();

        assert!(matches!(
            leave_group(&state, None, joined.record_id).await,
            Err(ServiceError::AuthRequired)
        ));
        assert!(matches!(
            leave_group(&state, Some(bob), joined.record_id).await,
            Err(ServiceError::NotFound(_))
        ));

        let mut drained = state.store().find_group(group.id).await.unwrap().unwrap();
        drained.current_participants = 0;
        state.store().save_group(drained).await.unwrap();
        assert!(matches!(
            leave_group(&state, Some(alice), joined.record_id).await,
            Err(ServiceError::EmptyGroup)
        ));
    }

    #[tokio::test]
    async fn quick_match_requires_an_active_group() {
        let state = fixed_state(NOW);
        let alice = register(&state, "alice").await;
        assert!(matches!(
            join_quick_match(&state, Some(alice)).await,
            Err(ServiceError::NotFound(_))
        ));

        let quick = insert_group(&state, GroupTag::Quick, u32::MAX).await;
        let joined = join_quick_match(&state, Some(alice)).await.unwrap();
        assert_eq!(joined.group_id, quick.id);
        assert!(matches!(
            join_quick_match(&state, Some(alice)).await,
            Err(ServiceError::AlreadyJoined)
        ));
    }

    #[tokio::test]
    async fn browsing_filters_upcoming_groups() {
        let state = fixed_state(NOW);
        let alice = register(&state, "alice").await;
        for (hours, title, tag) in [
            (3, "Sunrise Marathon Prep", GroupTag::Marathon),
            (1, "Lunch jog", GroupTag::Casual),
            (2, "marathon long run", GroupTag::Marathon),
        ] {
            let mut request = create_request(10);
            request.title = title.into();
            request.tag = tag;
            request.starts_at = rfc3339(NOW + Duration::hours(hours));
            request.ends_at = rfc3339(NOW + Duration::hours(hours + 1));
            create_group(&state, Some(alice), request).await.unwrap();
        }
        // already started, never listed
        insert_group(&state, GroupTag::Casual, 5).await;

        let all = list_upcoming_groups(&state, GroupQuery::default())
            .await
            .unwrap();
        let listed: Vec<&str> = all.iter().map(|g| g.title.as_str()).collect();
        assert_eq!(
            listed,
            vec!["Lunch jog", "marathon long run", "Sunrise Marathon Prep"]
        );

        let search = list_upcoming_groups(
            &state,
            GroupQuery {
                tag: Some(GroupTag::Marathon),
                q: Some("MARATHON".into()),
            },
        )
        .await
        .unwrap();
        assert_eq!(search.len(), 2);

        let casual = list_upcoming_groups(
            &state,
            GroupQuery {
                tag: Some(GroupTag::Casual),
                q: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(casual.len(), 1);
    }

    #[tokio::test]
    async fn main_page_is_capped() {
        let state = fixed_state(NOW);
        let alice = register(&state, "alice").await;
        for hours in 1..=8 {
            let mut request = create_request(10);
            request.starts_at = rfc3339(NOW + Duration::hours(hours));
            request.ends_at = rfc3339(NOW + Duration::hours(hours + 1));
            create_group(&state, Some(alice), request).await.unwrap();
        }

        let groups = main_page_groups(&state).await.unwrap();
        assert_eq!(groups.len(), MAIN_PAGE_LIMIT);
    }

    #[tokio::test]
    async fn joiner_after_a_leave_ranks_behind_stale_rows() {
        let state = fixed_state(NOW);
        let group = insert_group(&state, GroupTag::Casual, 5).await;
        let mut joined = Vec::new();
        for name in ["a", "b", "c"] {
            let user = register(&state, name).await;
            joined.push((user, join_group(&state, Some(user), group.id).await.unwrap()));
        }
        let (leaver, participation) = &joined[0];
        leave_group(&state, Some(*leaver), participation.record_id)
            .await
            .unwrap();

        let late = register(&state, "d").await;
        let entry = join_group(&state, Some(late), group.id).await.unwrap();
        assert_eq!(entry.rank, 4);
        assert_eq!(stored_ranks(&state, group.id).await, vec![2, 3, 4]);
    }

    #[tokio::test]
    async fn failed_counter_write_undoes_the_join() {
        let store = Arc::new(FailingStore::default());
        let state = state_over(store.clone());
        let alice = register(&state, "alice").await;
        let group = insert_group(&state, GroupTag::Casual, 5).await;

        store.fail_save_group.store(true, Ordering::SeqCst);
        assert!(matches!(
            join_group(&state, Some(alice), group.id).await,
            Err(ServiceError::Unavailable(_))
        ));
        assert!(state.store().rows_for_group(group.id).await.unwrap().is_empty());
        assert!(state.store().records_for_user(alice).await.unwrap().is_empty());

        store.fail_save_group.store(false, Ordering::SeqCst);
        let joined = join_group(&state, Some(alice), group.id).await.unwrap();
        assert_eq!(joined.rank, 1);
    }

    #[tokio::test]
    async fn failed_row_write_undoes_the_join() {
        let store = Arc::new(FailingStore::default());
        let state = state_over(store.clone());
        let alice = register(&state, "alice").await;
        let group = insert_group(&state, GroupTag::Casual, 5).await;

        store.fail_save_rows.store(true, Ordering::SeqCst);
        assert!(join_group(&state, Some(alice), group.id).await.is_err());
        assert!(state.store().records_for_user(alice).await.unwrap().is_empty());
        let stored = state.store().find_group(group.id).await.unwrap().unwrap();
        assert_eq!(stored.current_participants, 0);
    }

    #[tokio::test]
    async fn failed_counter_write_restores_the_participation() {
        let store = Arc::new(FailingStore::default());
        let state = state_over(store.clone());
        let alice = register(&state, "alice").await;
        let group = insert_group(&state, GroupTag::Casual, 5).await;
        let joined = join_group(&state, Some(alice), group.id).await.unwrap();

        store.fail_save_group.store(true, Ordering::SeqCst);
        assert!(leave_group(&state, Some(alice), joined.record_id).await.is_err());
        assert!(
            state
                .store()
                .find_record(joined.record_id)
                .await
                .unwrap()
                .is_some()
        );
        assert_eq!(stored_ranks(&state, group.id).await, vec![1]);
        let stored = state.store().find_group(group.id).await.unwrap().unwrap();
        assert_eq!(stored.current_participants, 1);
    }
}
