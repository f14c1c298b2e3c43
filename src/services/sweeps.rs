//! Periodic maintenance of the group table: expiry and the daily quick match rotation.

use time::{Duration, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::models::{GroupEntity, GroupTag, UNBOUNDED_DISTANCE_M, UNBOUNDED_PARTICIPANTS},
    error::ServiceError,
    services::sse_events::broadcast_group_closed,
    state::SharedState,
};

/// Lifetime of a generated quick match group.
const QUICK_MATCH_SPAN: Duration = Duration::hours(24);

/// Outcome of one deactivation sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Groups flipped to inactive.
    pub deactivated: Vec<Uuid>,
    /// Groups whose deactivation failed; retried on the next sweep.
    pub failed: Vec<Uuid>,
}

/// Deactivate one group under its lock. Returns `false` when there was nothing to do.
async fn close_group(
    state: &SharedState,
    group_id: Uuid,
    still_due: impl Fn(&GroupEntity) -> bool,
) -> Result<bool, ServiceError> {
    let _guard = state.lock_group(group_id).await;
    let store = state.store();
    let Some(mut group) = store.find_group(group_id).await? else {
        return Ok(false);
    };
    if !group.active || !still_due(&group) {
        return Ok(false);
    }
    group.active = false;
    store.save_group(group).await?;
    broadcast_group_closed(state, group_id);
    Ok(true)
}

/// Flip every active group whose end time has passed to inactive.
///
/// One failing group never stops the sweep.
pub async fn deactivate_expired_groups(
    state: &SharedState,
    now: OffsetDateTime,
) -> Result<SweepReport, ServiceError> {
    let expired = state.store().find_expired_active_groups(now).await?;
    let mut report = SweepReport::default();

    for group in expired {
        match close_group(state, group.id, |group| group.ends_at < now).await {
            Ok(true) => {
                info!(group_id = %group.id, title = %group.title, "deactivated expired group");
                report.deactivated.push(group.id);
            }
            Ok(false) => {}
            Err(err) => {
                warn!(group_id = %group.id, error = %err, "failed to deactivate expired group");
                report.failed.push(group.id);
            }
        }
    }
    state.prune_group_locks();
    Ok(report)
}

/// Replace the active quick match group with a fresh one spanning the next 24 hours.
///
/// Rotations are serialized, so running twice in a row still leaves exactly one
/// active quick match group.
pub async fn rotate_quick_match(
    state: &SharedState,
    now: OffsetDateTime,
) -> Result<GroupEntity, ServiceError> {
    let _gate = state.rotation_gate().await;
    let store = state.store();

    for group in store.find_active_groups_by_tag(GroupTag::Quick).await? {
        match close_group(state, group.id, |_| true).await {
            Ok(true) => info!(group_id = %group.id, "retired quick match group"),
            Ok(false) => {}
            Err(err) => {
                warn!(group_id = %group.id, error = %err, "failed to retire quick match group")
            }
        }
    }

    let group = GroupEntity {
        id: Uuid::new_v4(),
        title: state.config().quick_match.title.clone(),
        tag: GroupTag::Quick,
        starts_at: now,
        ends_at: now + QUICK_MATCH_SPAN,
        target_distance_m: UNBOUNDED_DISTANCE_M,
        max_participants: UNBOUNDED_PARTICIPANTS,
        current_participants: 0,
        active: true,
    };
    store.save_group(group.clone()).await?;
    info!(group_id = %group.id, ends_at = %group.ends_at, "opened quick match group");
    Ok(group)
}
