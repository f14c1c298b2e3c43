//! Dense re-ranking of a group's leaderboard rows.

use std::{cmp::Ordering, collections::HashMap};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dao::models::{LeaderboardRowEntity, RecordEntity};

/// Rank movement of a row between two re-ranks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Movement {
    /// Better rank than before.
    Up,
    /// Worse rank than before.
    Down,
    /// Unchanged rank.
    Same,
}

impl Movement {
    /// Classify the move from `previous_rank` to `current_rank`; lower is better.
    pub fn between(previous_rank: u32, current_rank: u32) -> Self {
        match current_rank.cmp(&previous_rank) {
            Ordering::Less => Movement::Up,
            Ordering::Greater => Movement::Down,
            Ordering::Equal => Movement::Same,
        }
    }

    /// Movement recorded on a row by its latest re-rank.
    pub fn of(row: &LeaderboardRowEntity) -> Self {
        Self::between(row.previous_rank, row.current_rank)
    }
}

/// A leaderboard row joined with the record it ranks.
#[derive(Debug, Clone, PartialEq)]
pub struct Standing {
    /// Ranking entry.
    pub row: LeaderboardRowEntity,
    /// Progress backing the entry.
    pub record: RecordEntity,
}

/// Pair each row with its record; rows whose record is missing are dropped.
pub fn join_standings(rows: Vec<LeaderboardRowEntity>, records: Vec<RecordEntity>) -> Vec<Standing> {
    let mut by_id: HashMap<Uuid, RecordEntity> =
        records.into_iter().map(|record| (record.id, record)).collect();
    rows.into_iter()
        .filter_map(|row| {
            by_id
                .remove(&row.record_id)
                .map(|record| Standing { row, record })
        })
        .collect()
}

/// Order: distance descending, then prior rank, then join time, then record id.
fn standing_order(a: &Standing, b: &Standing) -> Ordering {
    b.record
        .distance_m
        .cmp(&a.record.distance_m)
        .then(a.row.current_rank.cmp(&b.row.current_rank))
        .then(a.row.joined_at.cmp(&b.row.joined_at))
        .then(a.record.id.cmp(&b.record.id))
}

/// Re-sort the group and assign ranks `1..=N`.
///
/// Every row's `previous_rank` receives the rank it held before this call.
pub fn rerank(mut standings: Vec<Standing>) -> Vec<Standing> {
    standings.sort_by(standing_order);
    for (index, standing) in standings.iter_mut().enumerate() {
        standing.row.previous_rank = standing.row.current_rank;
        standing.row.current_rank = index as u32 + 1;
    }
    standings
}

/// Movement of `record_id` after a [`rerank`], if it belongs to the group.
pub fn movement_of(standings: &[Standing], record_id: Uuid) -> Option<Movement> {
    standings
        .iter()
        .find(|standing| standing.record.id == record_id)
        .map(|standing| Movement::of(&standing.row))
}

#[cfg(test)]
mod tests {
    use time::{Duration, OffsetDateTime, macros::datetime};

    use super::*;

    fn standing(distance_m: u32, rank: u32, joined_at: OffsetDateTime) -> Standing {
        let group_id = Uuid::nil();
        let mut record = RecordEntity::new(Uuid::new_v4(), group_id, joined_at);
        record.distance_m = distance_m;
        Standing {
            row: LeaderboardRowEntity {
                record_id: record.id,
                group_id,
                user_id: record.user_id,
                current_rank: rank,
                previous_rank: rank,
                joined_at,
            },
            record,
        }
    }

    fn group_of(distances: &[u32]) -> Vec<Standing> {
        let start = datetime!(2024-05-01 07:00 UTC);
        distances
            .iter()
            .enumerate()
            .map(|(index, distance)| {
                standing(
                    *distance,
                    index as u32 + 1,
                    start + Duration::seconds(index as i64),
                )
            })
            .collect()
    }

    fn ranks_and_distances(standings: &[Standing]) -> Vec<(u32, u32)> {
        standings
            .iter()
            .map(|s| (s.record.distance_m, s.row.current_rank))
            .collect()
    }

    #[test]
    fn orders_by_distance_descending() {
        let ranked = rerank(group_of(&[100, 300, 200, 50]));
        assert_eq!(
            ranks_and_distances(&ranked),
            vec![(300, 1), (200, 2), (100, 3), (50, 4)]
        );
    }

    #[test]
    fn ranks_are_dense_and_unique() {
        let ranked = rerank(group_of(&[0, 0, 700, 700, 20, 0]));
        let mut ranks: Vec<u32> = ranked.iter().map(|s| s.row.current_rank).collect();
        ranks.sort_unstable();
        assert_eq!(ranks, (1..=6).collect::<Vec<_>>());
    }

    #[test]
    fn ties_keep_prior_relative_order() {
        let mut standings = group_of(&[500, 500, 500]);
        // the third runner held rank 1 before the tie
        standings[0].row.current_rank = 2;
        standings[1].row.current_rank = 3;
        standings[2].row.current_rank = 1;
        let expected = vec![
            standings[2].record.id,
            standings[0].record.id,
            standings[1].record.id,
        ];

        let ranked = rerank(standings);
        let order: Vec<Uuid> = ranked.iter().map(|s| s.record.id).collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn equal_prior_rank_falls_back_to_join_time() {
        // freshly joined runners can share the last rank until their first update
        let start = datetime!(2024-05-01 07:00 UTC);
        let late = standing(0, 2, start + Duration::minutes(5));
        let early = standing(0, 2, start);
        let expected = vec![early.record.id, late.record.id];

        let ranked = rerank(vec![late, early]);
        let order: Vec<Uuid> = ranked.iter().map(|s| s.record.id).collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn rerank_is_idempotent() {
        let once = rerank(group_of(&[10, 900, 450, 450]));
        let twice = rerank(once.clone());
        assert_eq!(ranks_and_distances(&once), ranks_and_distances(&twice));
        assert!(twice.iter().all(|s| Movement::of(&s.row) == Movement::Same));
    }

    #[test]
    fn movement_tracks_the_mover() {
        let mut standings = group_of(&[300, 200, 100]);
        let mover = standings[2].record.id;
        standings[2].record.distance_m = 350;

        let ranked = rerank(standings);
        assert_eq!(movement_of(&ranked, mover), Some(Movement::Up));
        assert_eq!(
            movement_of(&ranked, ranked[1].record.id),
            Some(Movement::Down)
        );
        assert_eq!(movement_of(&ranked, Uuid::new_v4()), None);
    }

    #[test]
    fn single_row_is_rank_one_and_same() {
        let ranked = rerank(group_of(&[42]));
        assert_eq!(ranked[0].row.current_rank, 1);
        assert_eq!(Movement::of(&ranked[0].row), Movement::Same);
    }

    #[test]
    fn movement_classification() {
        assert_eq!(Movement::between(3, 1), Movement::Up);
        assert_eq!(Movement::between(1, 3), Movement::Down);
        assert_eq!(Movement::between(2, 2), Movement::Same);
    }

    #[test]
    fn join_drops_rows_without_records() {
        let standings = group_of(&[1, 2]);
        let rows = standings.iter().map(|s| s.row.clone()).collect();
        let records = vec![standings[1].record.clone()];
        let joined = join_standings(rows, records);
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].record.distance_m, 2);
    }
}
