//! Match model — one head-to-head pairing within a round.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EntityId, MatchId, PlayerId, TournamentId};

/// Most games either player can win in one match.
pub const MAX_GAMES_PER_MATCH: u32 = 99;

/// Result of a match, derived from its scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchResult {
    #[default]
    Pending,
    Player1Win,
    Player2Win,
    Draw,
}

impl MatchResult {
    /// Derive the result from the two game scores.
    ///
    /// Equal scores are a draw only when at least one game was won; 0-0
    /// stays pending.
    pub fn from_scores(player1_score: u32, player2_score: u32) -> Self {
        if player1_score > player2_score {
            MatchResult::Player1Win
        } else if player2_score > player1_score {
            MatchResult::Player2Win
        } else if player1_score > 0 {
            MatchResult::Draw
        } else {
            MatchResult::Pending
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, MatchResult::Pending)
    }

    /// The outcome for whoever sat on `side`, or `None` while pending.
    pub fn outcome_for(&self, side: Side) -> Option<Outcome> {
        match (self, side) {
            (MatchResult::Pending, _) => None,
            (MatchResult::Draw, _) => Some(Outcome::Draw),
            (MatchResult::Player1Win, Side::Player1) | (MatchResult::Player2Win, Side::Player2) => {
                Some(Outcome::Win)
            }
            _ => Some(Outcome::Loss),
        }
    }
}

impl std::fmt::Display for MatchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchResult::Pending => write!(f, "pending"),
            MatchResult::Player1Win => write!(f, "player1_win"),
            MatchResult::Player2Win => write!(f, "player2_win"),
            MatchResult::Draw => write!(f, "draw"),
        }
    }
}

/// A decided match seen from one player's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Win,
    Loss,
    Draw,
}

/// Which seat of a match a player occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Player1,
    Player2,
}

/// A single match between two players in one round of a tournament.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    /// Unique identifier
    pub id: MatchId,

    /// Round number within the tournament (1-based)
    pub round: u32,

    /// Tournament this match belongs to
    pub tournament_id: TournamentId,

    pub player1: PlayerId,

    pub player2: PlayerId,

    /// Games won by player 1
    pub player1_score: u32,

    /// Games won by player 2
    pub player2_score: u32,

    pub result: MatchResult,

    /// When this match was paired
    pub created_at: DateTime<Utc>,

    /// When a non-pending result was last recorded
    pub completed_at: Option<DateTime<Utc>>,
}

impl Match {
    /// Create a new unscored match with a deterministic ID.
    pub fn new(
        tournament_id: TournamentId,
        round: u32,
        player1: PlayerId,
        player2: PlayerId,
        created_at: DateTime<Utc>,
    ) -> Self {
        let id = EntityId::generate(&[
            tournament_id.as_str(),
            &round.to_string(),
            player1.as_str(),
            player2.as_str(),
        ]);

        Self {
            id,
            round,
            tournament_id,
            player1,
            player2,
            player1_score: 0,
            player2_score: 0,
            result: MatchResult::Pending,
            created_at,
            completed_at: None,
        }
    }

    /// Overwrite both scores, recomputing result and completion time together.
    pub fn set_scores(&mut self, player1_score: u32, player2_score: u32, now: DateTime<Utc>) {
        self.player1_score = player1_score;
        self.player2_score = player2_score;
        self.result = MatchResult::from_scores(player1_score, player2_score);
        self.completed_at = if self.result.is_pending() {
            None
        } else {
            Some(now)
        };
    }

    /// The side `player_id` played on, if any.
    pub fn side_of(&self, player_id: &PlayerId) -> Option<Side> {
        if &self.player1 == player_id {
            Some(Side::Player1)
        } else if &self.player2 == player_id {
            Some(Side::Player2)
        } else {
            None
        }
    }

    /// Whether this match paired `a` and `b`, in either seat order.
    pub fn is_between(&self, a: &PlayerId, b: &PlayerId) -> bool {
        (&self.player1 == a && &self.player2 == b) || (&self.player1 == b && &self.player2 == a)
    }
}
