//! Progress updates and leaderboard queries for a participation.

use std::collections::HashMap;

use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dto::running::{LeaderboardResponse, SubmitUpdateRequest, SubmitUpdateResponse},
    error::ServiceError,
    services::{
        calories::calculate_calories,
        commentary::{CommentaryInput, commentary},
        group_service::{compensate, owned_record},
        leaderboard::{BoardRow, board_rows, full_board, live_window},
        ranking::{Movement, Standing, join_standings, movement_of, rerank},
        sse_events::broadcast_leaderboard_updated,
    },
    state::SharedState,
};

/// Best distance among the user's sessions other than `record_id`, ignoring empty ones.
async fn personal_best(
    state: &SharedState,
    user_id: Uuid,
    record_id: Uuid,
) -> Result<Option<u32>, ServiceError> {
    let records = state.store().records_for_user(user_id).await?;
    Ok(records
        .iter()
        .filter(|record| record.id != record_id)
        .map(|record| record.distance_m)
        .find(|distance| *distance > 0))
}

/// Standings of a group with the nicknames of every participant.
async fn load_board(
    state: &SharedState,
    group_id: Uuid,
) -> Result<(Vec<Standing>, HashMap<Uuid, String>), ServiceError> {
    let store = state.store();
    let rows = store.rows_for_group(group_id).await?;
    let records = store.records_for_group(group_id).await?;
    let standings = join_standings(rows, records);

    let user_ids = standings.iter().map(|s| s.record.user_id).collect();
    let nicknames = store
        .find_users(user_ids)
        .await?
        .into_iter()
        .map(|user| (user.id, user.nickname))
        .collect();
    Ok((standings, nicknames))
}

/// Record cumulative progress, re-rank the group and describe the runner's position.
///
/// Distance and duration never decrease; resubmitting the stored values is accepted.
pub async fn submit_update(
    state: &SharedState,
    user: Option<Uuid>,
    record_id: Uuid,
    request: SubmitUpdateRequest,
) -> Result<SubmitUpdateResponse, ServiceError> {
    let user_id = user.ok_or(ServiceError::AuthRequired)?;
    let record = owned_record(state, user_id, record_id).await?;
    let profile = state
        .store()
        .find_user(user_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("user `{user_id}` not found")))?;
    let calories = if request.elapsed_secs == 0 {
        0.0
    } else {
        calculate_calories(request.distance_m, request.elapsed_secs, profile.weight_kg)?
    };
    let personal_best_m = personal_best(state, user_id, record_id).await?;
    let group_id = record.group_id;

    let _guard = state.lock_group(group_id).await;
    let store = state.store();
    let mut record = store
        .find_record(record_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("record `{record_id}` not found")))?;
    if request.distance_m < record.distance_m {
        return Err(ServiceError::InvalidInput(format!(
            "distance cannot decrease (stored {} m, got {} m)",
            record.distance_m, request.distance_m
        )));
    }
    if request.elapsed_secs < record.elapsed_secs {
        return Err(ServiceError::InvalidInput(format!(
            "elapsed time cannot decrease (stored {} s, got {} s)",
            record.elapsed_secs, request.elapsed_secs
        )));
    }

    let previous = record.clone();
    record.distance_m = request.distance_m;
    record.elapsed_secs = request.elapsed_secs;
    record.calories = calories;
    record.updated_at = state.now();

    let (mut standings, nicknames) = load_board(state, group_id).await?;
    if let Some(standing) = standings.iter_mut().find(|s| s.record.id == record_id) {
        standing.record = record.clone();
    }
    let previous_rows: Vec<_> = standings.iter().map(|s| s.row.clone()).collect();
    store.save_record(record.clone()).await?;

    let standings = rerank(standings);
    if let Err(err) = store
        .save_rows(standings.iter().map(|s| s.row.clone()).collect())
        .await
    {
        let store = store.clone();
        compensate("update", record_id, async move {
            store.save_record(previous).await?;
            store.save_rows(previous_rows).await
        })
        .await;
        return Err(err.into());
    }

    let movement = movement_of(&standings, record_id).unwrap_or(Movement::Same);
    let rows = board_rows(&standings, &nicknames);
    let rank = rows
        .iter()
        .find(|row| row.record_id == record_id)
        .map(|row| row.rank)
        .ok_or_else(|| ServiceError::NotFound(format!("record `{record_id}` not ranked")))?;
    broadcast_leaderboard_updated(state, group_id, &rows);
    drop(_guard);

    debug!(
        %group_id,
        %record_id,
        distance_m = record.distance_m,
        rank,
        ?movement,
        "re-ranked group after update"
    );
    if movement != Movement::Same {
        info!(%group_id, %record_id, rank, ?movement, "rank changed");
    }

    Ok(SubmitUpdateResponse {
        rank,
        movement,
        calories,
        commentary: commentary(CommentaryInput {
            movement,
            rank,
            distance_m: record.distance_m,
            board: &rows,
            personal_best_m,
        }),
        live_window: live_window(&rows, Some(record_id)),
    })
}

/// Full results table of the group `record_id` belongs to, padded to three rows.
pub async fn get_leaderboard(
    state: &SharedState,
    user: Option<Uuid>,
    record_id: Uuid,
) -> Result<LeaderboardResponse, ServiceError> {
    let user_id = user.ok_or(ServiceError::AuthRequired)?;
    let record = state
        .store()
        .find_record(record_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("record `{record_id}` not found")))?;

    let (standings, nicknames) = load_board(state, record.group_id).await?;
    let rows: Vec<BoardRow> = board_rows(&standings, &nicknames);
    Ok(LeaderboardResponse {
        group_id: record.group_id,
        entries: full_board(&rows, user_id),
    })
}
