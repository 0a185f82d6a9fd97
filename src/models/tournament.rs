//! Tournament ("draft") and round models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{MatchId, PlayerId, TournamentId};

/// Roster sizes a tournament can be created with.
pub const ROSTER_SIZES: [usize; 3] = [4, 6, 8];

/// Round counts a tournament can be created with.
pub const ROUND_COUNTS: [u32; 2] = [3, 4];

/// Tournament lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    #[default]
    Pending,
    Active,
    Completed,
}

impl std::fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TournamentStatus::Pending => write!(f, "pending"),
            TournamentStatus::Active => write!(f, "active"),
            TournamentStatus::Completed => write!(f, "completed"),
        }
    }
}

/// One numbered cycle of matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    /// Round number (1-based)
    pub number: u32,

    /// Matches played in this round, in pairing order
    pub matches: Vec<MatchId>,

    pub completed: bool,
}

impl Round {
    pub fn new(number: u32, matches: Vec<MatchId>) -> Self {
        Self {
            number,
            matches,
            completed: false,
        }
    }
}

/// A draft tournament with a fixed roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    /// Unique identifier
    pub id: TournamentId,

    pub name: String,

    pub description: Option<String>,

    /// Cube the draft was played with
    pub cube_name: Option<String>,

    /// Roster in entry order
    pub players: Vec<PlayerId>,

    /// Seating order, a permutation of `players` used for round 1
    pub seating: Vec<PlayerId>,

    pub status: TournamentStatus,

    pub rounds: Vec<Round>,

    /// Number of rounds to play (3 or 4)
    pub total_rounds: u32,

    /// Round currently being played, 0 while pending
    pub current_round: u32,

    pub created_at: DateTime<Utc>,

    pub started_at: Option<DateTime<Utc>>,

    pub completed_at: Option<DateTime<Utc>>,
}

impl Tournament {
    /// Look up a round by number.
    pub fn round(&self, number: u32) -> Option<&Round> {
        self.rounds.iter().find(|r| r.number == number)
    }

    pub fn round_mut(&mut self, number: u32) -> Option<&mut Round> {
        self.rounds.iter_mut().find(|r| r.number == number)
    }

    /// Round number a match belongs to, if it is part of this tournament.
    pub fn round_of(&self, match_id: &MatchId) -> Option<&Round> {
        self.rounds.iter().find(|r| r.matches.contains(match_id))
    }

    pub fn has_player(&self, player_id: &PlayerId) -> bool {
        self.players.contains(player_id)
    }

    /// Pending and active tournaments are still in play.
    pub fn is_finished(&self) -> bool {
        self.status == TournamentStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityId;

    fn sample() -> Tournament {
        let players: Vec<PlayerId> = ["a", "b", "c", "d"].iter().map(|&p| p.into()).collect();
        Tournament {
            id: EntityId::from("draft-1"),
            name: "Friday Cube".to_string(),
            description: None,
            cube_name: Some("Vintage Cube".to_string()),
            seating: players.clone(),
            players,
            status: TournamentStatus::Active,
            rounds: vec![Round::new(1, vec!["m1".into(), "m2".into()])],
            total_rounds: 3,
            current_round: 1,
            created_at: Utc::now(),
            started_at: Some(Utc::now()),
            completed_at: None,
        }
    }

    #[test]
    fn test_round_lookup() {
        let t = sample();
        assert_eq!(t.round(1).map(|r| r.matches.len()), Some(2));
        assert!(t.round(2).is_none());
        assert_eq!(t.round_of(&"m2".into()).map(|r| r.number), Some(1));
        assert!(t.round_of(&"m9".into()).is_none());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&TournamentStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
        assert_eq!(TournamentStatus::default(), TournamentStatus::Pending);
    }

    #[test]
    fn test_tournament_serialization() {
        let t = sample();
        let json = serde_json::to_string(&t).unwrap();
        let back: Tournament = serde_json::from_str(&json).unwrap();
        assert_eq!(t, back);
    }
}
