//! One-line status messages shown to a runner after each update.

use crate::services::{leaderboard::BoardRow, ranking::Movement};

/// Everything the commentary needs about the runner who just submitted an update.
#[derive(Debug, Clone, Copy)]
pub struct CommentaryInput<'a> {
    /// Movement caused by the update.
    pub movement: Movement,
    /// Rank after the update.
    pub rank: u32,
    /// Distance after the update, in meters.
    pub distance_m: u32,
    /// Ranked rows of the whole group.
    pub board: &'a [BoardRow],
    /// Best distance over the runner's other sessions, if any.
    pub personal_best_m: Option<u32>,
}

fn distance_at(board: &[BoardRow], rank: u32) -> Option<u32> {
    board
        .iter()
        .find(|row| row.rank == rank)
        .map(|row| row.distance_m)
}

fn gap_to(board: &[BoardRow], rank: u32, distance_m: u32) -> u32 {
    distance_at(board, rank)
        .unwrap_or(distance_m)
        .saturating_sub(distance_m)
}

/// Build the status line; a personal record wins over every rank message.
pub fn commentary(input: CommentaryInput<'_>) -> String {
    let CommentaryInput {
        movement,
        rank,
        distance_m,
        board,
        personal_best_m,
    } = input;

    if personal_best_m.is_some_and(|best| best > 0 && distance_m >= best) {
        return format!("New personal record! You are currently at {distance_m} m.");
    }

    match movement {
        Movement::Up if rank == 1 => "You took first place. Hold the lead!".to_owned(),
        Movement::Up => format!(
            "Up to rank {rank}. {} m behind rank {}.",
            gap_to(board, rank - 1, distance_m),
            rank - 1
        ),
        Movement::Same if rank == 1 => match distance_at(board, 2) {
            Some(second) => format!(
                "Still leading, {} m ahead of rank 2.",
                distance_m.saturating_sub(second)
            ),
            None => "Leading the group, no other participants yet.".to_owned(),
        },
        Movement::Same => format!(
            "Holding rank {rank}. {} m behind rank {}.",
            gap_to(board, rank - 1, distance_m),
            rank - 1
        ),
        Movement::Down => format!("Dropped to rank {rank}."),
    }
}
