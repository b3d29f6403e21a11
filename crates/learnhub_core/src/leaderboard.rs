//! crates/learnhub_core/src/leaderboard.rs
//!
//! Leaderboard ranking. Real participants are padded with synthetic ones, and
//! everybody except the viewer gets a random point bonus. The random source is
//! always passed in, so a seeded rng gives a reproducible board.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::cmp::Ordering;
use uuid::Uuid;

pub const POINTS_PER_CERTIFICATE: u32 = 100;

const FILLER_NAMES: &[&str] = &[
    "ava_codes",
    "ben.learns",
    "chloe_dev",
    "diego_data",
    "emma.writes",
    "farah_ml",
    "george_ui",
    "hana_cloud",
];

/// A real participant as known from stored records.
#[derive(Debug, Clone)]
pub struct Participant {
    pub user_id: Uuid,
    pub username: String,
    pub certificates: u32,
    /// Average enrollment progress, 0-100.
    pub progress: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: Option<Uuid>,
    pub username: String,
    pub certificates: u32,
    pub points: u32,
    pub progress: u8,
    pub is_current_user: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leaderboard {
    /// Participants with at least one certificate, most points first.
    pub completed: Vec<LeaderboardEntry>,
    /// Participants still under 100%, least progress first.
    pub incomplete: Vec<LeaderboardEntry>,
}

/// Picks the random source: seeded when a seed is given, otherwise from entropy.
pub fn rng_for(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

pub fn build<R: Rng>(participants: &[Participant], current_user: Option<Uuid>, rng: &mut R) -> Leaderboard {
    let mut entries: Vec<LeaderboardEntry> = participants
        .iter()
        .map(|p| {
            let is_current_user = current_user == Some(p.user_id);
            let bonus = if is_current_user {
                0
            } else {
                rng.gen_range(0..POINTS_PER_CERTIFICATE)
            };
            LeaderboardEntry {
                rank: 0,
                user_id: Some(p.user_id),
                username: p.username.clone(),
                certificates: p.certificates,
                points: p.certificates * POINTS_PER_CERTIFICATE + bonus,
                progress: p.progress,
                is_current_user,
            }
        })
        .collect();

    for name in FILLER_NAMES {
        let certificates = rng.gen_range(0..=5);
        let progress = if certificates > 0 && rng.gen_bool(0.5) {
            100
        } else {
            rng.gen_range(0..100)
        };
        entries.push(LeaderboardEntry {
            rank: 0,
            user_id: None,
            username: name.to_string(),
            certificates,
            points: certificates * POINTS_PER_CERTIFICATE + rng.gen_range(0..POINTS_PER_CERTIFICATE),
            progress,
            is_current_user: false,
        });
    }

    let completed = entries.iter().filter(|e| e.certificates > 0).cloned().collect();
    let incomplete = entries.into_iter().filter(|e| e.progress < 100).collect();

    Leaderboard {
        completed: rank_completed(completed),
        incomplete: rank_incomplete(incomplete),
    }
}

/// Sorts by points, highest first, and assigns ranks. Ties fall back to username.
pub fn rank_completed(mut entries: Vec<LeaderboardEntry>) -> Vec<LeaderboardEntry> {
    entries.sort_by(|a, b| match b.points.cmp(&a.points) {
        Ordering::Equal => a.username.cmp(&b.username),
        other => other,
    });
    assign_ranks(entries)
}

/// Sorts by progress, lowest first, and assigns ranks.
pub fn rank_incomplete(mut entries: Vec<LeaderboardEntry>) -> Vec<LeaderboardEntry> {
    entries.sort_by(|a, b| match a.progress.cmp(&b.progress) {
        Ordering::Equal => a.username.cmp(&b.username),
        other => other,
    });
    assign_ranks(entries)
}

fn assign_ranks(mut entries: Vec<LeaderboardEntry>) -> Vec<LeaderboardEntry> {
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i + 1;
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, points: u32, progress: u8) -> LeaderboardEntry {
        LeaderboardEntry {
            rank: 0,
            user_id: None,
            username: name.to_string(),
            certificates: points / POINTS_PER_CERTIFICATE,
            points,
            progress,
            is_current_user: false,
        }
    }

    fn participant(name: &str, certificates: u32, progress: u8) -> Participant {
        Participant {
            user_id: Uuid::new_v4(),
            username: name.to_string(),
            certificates,
            progress,
        }
    }

    #[test]
    fn completed_view_is_non_increasing_in_points() {
        let ranked = rank_completed(vec![
            entry("a", 120, 100),
            entry("b", 480, 100),
            entry("c", 120, 40),
            entry("d", 300, 90),
        ]);
        assert!(ranked.windows(2).all(|w| w[0].points >= w[1].points));
        let ranks: Vec<usize> = ranked.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
        assert_eq!(ranked[0].username, "b");
        // tie broken by name
        assert_eq!(ranked[2].username, "a");
        assert_eq!(ranked[3].username, "c");
    }

    #[test]
    fn incomplete_view_is_non_decreasing_in_progress() {
        let ranked = rank_incomplete(vec![
            entry("a", 0, 75),
            entry("b", 0, 5),
            entry("c", 0, 50),
            entry("d", 0, 5),
        ]);
        assert!(ranked.windows(2).all(|w| w[0].progress <= w[1].progress));
        assert_eq!(ranked[0].username, "b");
    }

    #[test]
    fn same_seed_gives_same_board() {
        let people = vec![participant("me", 2, 60), participant("you", 1, 100)];
        let me = people[0].user_id;
        let first = build(&people, Some(me), &mut rng_for(Some(42)));
        let second = build(&people, Some(me), &mut rng_for(Some(42)));
        assert_eq!(first, second);
    }

    #[test]
    fn current_user_points_are_exact() {
        let people = vec![participant("me", 3, 100)];
        let me = people[0].user_id;
        let board = build(&people, Some(me), &mut rng_for(Some(7)));
        let mine = board
            .completed
            .iter()
            .find(|e| e.is_current_user)
            .expect("current user ranked");
        assert_eq!(mine.points, 3 * POINTS_PER_CERTIFICATE);
        assert!(board.incomplete.iter().all(|e| !e.is_current_user));
    }

    #[test]
    fn views_hold_their_invariants_for_any_seed() {
        let people = vec![participant("me", 0, 10), participant("you", 4, 80)];
        for seed in 0..25 {
            let board = build(&people, None, &mut rng_for(Some(seed)));
            assert!(board.completed.iter().all(|e| e.certificates > 0));
            assert!(board.incomplete.iter().all(|e| e.progress < 100));
            assert!(board.completed.windows(2).all(|w| w[0].points >= w[1].points));
            assert!(board.incomplete.windows(2).all(|w| w[0].progress <= w[1].progress));
        }
    }
}
