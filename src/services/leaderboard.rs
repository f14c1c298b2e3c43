//! Projections of a ranked group into the live widget window and the padded results table.

use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    dto::running::{LeaderboardEntry, LiveEntry},
    services::ranking::{Movement, Standing},
};

/// Number of entries the UI always renders.
pub const VISIBLE_ROWS: usize = 3;
/// Nickname shown on synthetic padding rows.
pub const PLACEHOLDER_NICKNAME: &str = "-";
/// Shown when a participant's profile cannot be found.
const UNKNOWN_NICKNAME: &str = "unknown";

/// One ranked participant, ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardRow {
    /// Record ranked by this entry.
    pub record_id: Uuid,
    /// Owner of the record.
    pub user_id: Uuid,
    /// Display name of the owner.
    pub nickname: String,
    /// Current rank.
    pub rank: u32,
    /// Distance covered, in meters.
    pub distance_m: u32,
    /// Movement recorded by the latest re-rank.
    pub movement: Movement,
}

/// Flatten standings into rows ordered by rank.
///
/// Ties on stored rank (possible between a leave and the next update) fall back to join order.
pub fn board_rows(standings: &[Standing], nicknames: &HashMap<Uuid, String>) -> Vec<BoardRow> {
    let mut ordered: Vec<&Standing> = standings.iter().collect();
    ordered.sort_by(|a, b| {
        a.row
            .current_rank
            .cmp(&b.row.current_rank)
            .then(a.row.joined_at.cmp(&b.row.joined_at))
    });
    ordered
        .into_iter()
        .map(|standing| BoardRow {
            record_id: standing.record.id,
            user_id: standing.record.user_id,
            nickname: nicknames
                .get(&standing.record.user_id)
                .cloned()
                .unwrap_or_else(|| UNKNOWN_NICKNAME.to_owned()),
            rank: standing.row.current_rank,
            distance_m: standing.record.distance_m,
            movement: Movement::of(&standing.row),
        })
        .collect()
}

/// Placeholders continue after the last real rank, which may exceed the row count after a leave.
fn padding_start(rows: &[BoardRow]) -> u32 {
    rows.last().map_or(0, |row| row.rank) + 1
}

fn kilometers(distance_m: u32) -> f64 {
    f64::from(distance_m) / 1000.0
}

/// Window of three entries around `viewer`, padded when the group is smaller.
///
/// The window covers ranks 1..3 for the leader, N-2..N for the last runner and
/// the viewer's neighbours otherwise. Without a viewer the top of the board is shown.
pub fn live_window(rows: &[BoardRow], viewer: Option<Uuid>) -> Vec<LiveEntry> {
    let total = rows.len();
    let visible = if total < VISIBLE_ROWS {
        rows
    } else {
        let position = viewer
            .and_then(|record_id| rows.iter().position(|row| row.record_id == record_id))
            .unwrap_or(0);
        let start = if position == 0 {
            0
        } else if position == total - 1 {
            total - VISIBLE_ROWS
        } else {
            position - 1
        };
        &rows[start..start + VISIBLE_ROWS]
    };

    let mut entries: Vec<LiveEntry> = visible
        .iter()
        .map(|row| LiveEntry {
            nickname: row.nickname.clone(),
            rank: row.rank,
            is_my_record: Some(row.record_id) == viewer,
            movement: row.movement,
            distance_km: kilometers(row.distance_m),
        })
        .collect();

    let mut next_rank = padding_start(visible);
    while entries.len() < VISIBLE_ROWS {
        entries.push(LiveEntry {
            nickname: PLACEHOLDER_NICKNAME.to_owned(),
            rank: next_rank,
            is_my_record: false,
            movement: Movement::Same,
            distance_km: 0.0,
        });
        next_rank += 1;
    }
    entries
}

/// Every row by rank, flagging those owned by `requester`, padded to three entries.
pub fn full_board(rows: &[BoardRow], requester: Uuid) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = rows
        .iter()
        .map(|row| LeaderboardEntry {
            rank: row.rank,
            nickname: row.nickname.clone(),
            your_record: row.user_id == requester,
            distance_km: kilometers(row.distance_m),
        })
        .collect();

    let mut next_rank = padding_start(rows);
    while entries.len() < VISIBLE_ROWS {
        entries.push(LeaderboardEntry {
            rank: next_rank,
            nickname: PLACEHOLDER_NICKNAME.to_owned(),
            your_record: false,
            distance_km: 0.0,
        });
        next_rank += 1;
    }
    entries
}
