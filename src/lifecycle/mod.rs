//! Round and tournament state machine.
//!
//! ```text
//! Tournament: pending ──start──▶ active ──complete final round──▶ completed
//! Round:      open ──complete (all matches decided)──▶ completed
//! ```
//!
//! Every transition is a pure function of the current snapshot. It returns
//! the updated entities and never touches storage; the service layer
//! persists whatever comes back.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{DraftError, Result};
use crate::models::{
    EntityId, Match, PlayerId, Round, Tournament, TournamentStatus, MAX_GAMES_PER_MATCH,
    ROSTER_SIZES, ROUND_COUNTS,
};
use crate::pairing::generate_pairings;

/// Input for creating a tournament.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTournament {
    pub name: String,
    pub description: Option<String>,
    pub cube_name: Option<String>,
    pub players: Vec<PlayerId>,
    pub total_rounds: u32,
}

/// Entities produced by a transition that generates or closes rounds.
#[derive(Debug, Clone)]
pub struct Transition {
    pub tournament: Tournament,

    /// Matches created for the newly opened round, if any
    pub new_matches: Vec<Match>,
}

/// Validate the roster and create a pending tournament with a random seating.
pub fn create_tournament<R: Rng + ?Sized>(
    new: NewTournament,
    rng: &mut R,
    now: DateTime<Utc>,
) -> Result<Tournament> {
    if !ROSTER_SIZES.contains(&new.players.len()) {
        return Err(DraftError::InvalidRosterSize(new.players.len()));
    }
    if !ROUND_COUNTS.contains(&new.total_rounds) {
        return Err(DraftError::InvalidRoundCount(new.total_rounds));
    }
    for (i, player) in new.players.iter().enumerate() {
        if new.players[..i].contains(player) {
            return Err(DraftError::InvalidRoster(format!(
                "player {} appears more than once",
                player
            )));
        }
    }

    let mut seating = new.players.clone();
    seating.shuffle(rng);

    let tournament = Tournament {
        id: EntityId::random(),
        name: new.name,
        description: new.description,
        cube_name: new.cube_name,
        players: new.players,
        seating,
        status: TournamentStatus::Pending,
        rounds: Vec::new(),
        total_rounds: new.total_rounds,
        current_round: 0,
        created_at: now,
        started_at: None,
        completed_at: None,
    };

    info!(
        "Created draft {} ({}) with {} players over {} rounds",
        tournament.name,
        tournament.id,
        tournament.players.len(),
        tournament.total_rounds
    );
    Ok(tournament)
}

/// Start a pending tournament by pairing round 1 from the seating.
pub fn start_tournament(tournament: &Tournament, now: DateTime<Utc>) -> Result<Transition> {
    if tournament.status != TournamentStatus::Pending {
        return Err(DraftError::InvalidTransition(format!(
            "draft {} is already {}",
            tournament.id, tournament.status
        )));
    }

    let mut updated = tournament.clone();
    let (round, new_matches) = open_round(&updated, &[], 1, now)?;
    updated.rounds.push(round);
    updated.status = TournamentStatus::Active;
    updated.current_round = 1;
    updated.started_at = Some(now);

    info!(
        "Started draft {} with {} round-1 matches",
        updated.id,
        new_matches.len()
    );
    Ok(Transition {
        tournament: updated,
        new_matches,
    })
}

/// Apply new scores to a match whose round is still open.
pub fn record_result(
    tournament: &Tournament,
    current: &Match,
    player1_score: u32,
    player2_score: u32,
    now: DateTime<Utc>,
) -> Result<Match> {
    if player1_score > MAX_GAMES_PER_MATCH || player2_score > MAX_GAMES_PER_MATCH {
        return Err(DraftError::InvalidScore {
            player1_score,
            player2_score,
            max: MAX_GAMES_PER_MATCH,
        });
    }

    let round = tournament
        .round_of(&current.id)
        .ok_or_else(|| DraftError::unknown("match", &current.id))?;
    if round.completed {
        return Err(DraftError::InvalidTransition(format!(
            "round {} of draft {} is completed, match {} can no longer be scored",
            round.number, tournament.id, current.id
        )));
    }

    let mut updated = current.clone();
    updated.set_scores(player1_score, player2_score, now);
    debug!(
        "Match {} scored {}-{} ({})",
        updated.id, player1_score, player2_score, updated.result
    );
    Ok(updated)
}

/// Close the current round and either pair the next one or finish the draft.
///
/// `matches` must include every match of the round being closed; other
/// matches of the tournament feed the Swiss pairing of the next round.
pub fn complete_round(
    tournament: &Tournament,
    matches: &[Match],
    round_number: u32,
    now: DateTime<Utc>,
) -> Result<Transition> {
    if tournament.status != TournamentStatus::Active {
        return Err(DraftError::InvalidTransition(format!(
            "draft {} is {}, only active drafts have rounds to complete",
            tournament.id, tournament.status
        )));
    }

    let round = tournament
        .round(round_number)
        .ok_or_else(|| DraftError::unknown("round", round_number))?;
    if round.completed {
        return Err(DraftError::InvalidTransition(format!(
            "round {} of draft {} is already completed",
            round_number, tournament.id
        )));
    }
    if round_number != tournament.current_round {
        return Err(DraftError::InvalidTransition(format!(
            "round {} is not the current round ({}) of draft {}",
            round_number, tournament.current_round, tournament.id
        )));
    }

    let mut pending = 0;
    for match_id in &round.matches {
        let m = matches
            .iter()
            .find(|m| &m.id == match_id)
            .ok_or_else(|| DraftError::unknown("match", match_id))?;
        if m.result.is_pending() {
            pending += 1;
        }
    }
    if pending > 0 {
        return Err(DraftError::RoundNotReady {
            round: round_number,
            pending,
        });
    }

    let mut updated = tournament.clone();
    if let Some(round) = updated.round_mut(round_number) {
        round.completed = true;
    }

    if round_number < updated.total_rounds {
        let next = round_number + 1;
        let (round, new_matches) = open_round(&updated, matches, next, now)?;
        updated.rounds.push(round);
        updated.current_round = next;

        info!(
            "Completed round {} of draft {}, paired round {}",
            round_number, updated.id, next
        );
        Ok(Transition {
            tournament: updated,
            new_matches,
        })
    } else {
        updated.status = TournamentStatus::Completed;
        updated.completed_at = Some(now);

        info!("Completed final round of draft {}", updated.id);
        Ok(Transition {
            tournament: updated,
            new_matches: Vec::new(),
        })
    }
}

/// Only completed tournaments may be deleted.
pub fn ensure_deletable(tournament: &Tournament) -> Result<()> {
    if tournament.is_finished() {
        Ok(())
    } else {
        Err(DraftError::DeleteNotAllowed(format!(
            "draft {} is {}",
            tournament.id, tournament.status
        )))
    }
}

fn open_round(
    tournament: &Tournament,
    matches: &[Match],
    number: u32,
    now: DateTime<Utc>,
) -> Result<(Round, Vec<Match>)> {
    let new_matches: Vec<Match> = generate_pairings(tournament, matches, number)?
        .into_iter()
        .map(|p| Match::new(tournament.id.clone(), number, p.player1, p.player2, now))
        .collect();
    let round = Round::new(number, new_matches.iter().map(|m| m.id.clone()).collect());
    Ok((round, new_matches))
}
