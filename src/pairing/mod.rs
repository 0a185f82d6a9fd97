//! Round pairing.
//!
//! Round 1 is a fixed bracket over the seating order: seat `i` plays seat
//! `i + n/2`. Later rounds are Swiss-style: players are ordered by their
//! standings in the tournament and greedily paired with the highest-ranked
//! opponent they have not met yet. When every remaining opponent is a
//! rematch, the rematch is accepted rather than leaving a player unpaired.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::calculate::rank_players;
use crate::error::{DraftError, Result};
use crate::models::{Match, PlayerId, Tournament, ROSTER_SIZES};

/// A head-to-head pairing for one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pairing {
    pub player1: PlayerId,
    pub player2: PlayerId,
}

impl Pairing {
    pub fn new(player1: PlayerId, player2: PlayerId) -> Self {
        Self { player1, player2 }
    }
}

/// Generate the pairings for `round_number` of `tournament`.
///
/// `matches` may contain matches from other tournaments; only this
/// tournament's history is considered.
pub fn generate_pairings(
    tournament: &Tournament,
    matches: &[Match],
    round_number: u32,
) -> Result<Vec<Pairing>> {
    if round_number <= 1 {
        return first_round_pairings(&tournament.seating);
    }

    let history: Vec<Match> = matches
        .iter()
        .filter(|m| m.tournament_id == tournament.id)
        .cloned()
        .collect();
    swiss_pairings(&tournament.players, &history)
}

/// Pair seat `i` with seat `i + n/2`.
pub fn first_round_pairings(seating: &[PlayerId]) -> Result<Vec<Pairing>> {
    let n = seating.len();
    if !ROSTER_SIZES.contains(&n) {
        return Err(DraftError::InvalidRosterSize(n));
    }

    let half = n / 2;
    let pairings: Vec<Pairing> = (0..half)
        .map(|i| Pairing::new(seating[i].clone(), seating[i + half].clone()))
        .collect();

    debug!("Generated {} first-round pairings", pairings.len());
    Ok(pairings)
}

/// Whether `a` and `b` have met in any of `matches`.
pub fn have_played(a: &PlayerId, b: &PlayerId, matches: &[Match]) -> bool {
    matches.iter().any(|m| m.is_between(a, b))
}

/// Standings-ordered greedy pairing that avoids rematches where it can.
///
/// `history` must already be limited to the tournament being paired.
pub fn swiss_pairings(roster: &[PlayerId], history: &[Match]) -> Result<Vec<Pairing>> {
    if roster.len() % 2 != 0 {
        return Err(DraftError::InvalidRosterSize(roster.len()));
    }

    let mut pool: Vec<PlayerId> = rank_players(roster, history)
        .into_iter()
        .map(|(id, _)| id)
        .collect();
    let mut pairings = Vec::with_capacity(pool.len() / 2);

    while !pool.is_empty() {
        let player1 = pool.remove(0);
        if pool.is_empty() {
            return Err(DraftError::InvalidRosterSize(roster.len()));
        }

        let opponent = match pool.iter().position(|q| !have_played(&player1, q, history)) {
            Some(idx) => idx,
            None => {
                warn!(
                    "Player {} has already played every remaining player, pairing a rematch",
                    player1
                );
                0
            }
        };

        let player2 = pool.remove(opponent);
        pairings.push(Pairing::new(player1, player2));
    }

    debug!("Generated {} Swiss pairings", pairings.len());
    Ok(pairings)
}
