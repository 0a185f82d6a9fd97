//! Player model — roster identity plus lifetime record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EntityId, PlayerId, PlayerStats};

/// Win/loss/draw counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
}

/// Results carried over from deleted drafts, whose matches are gone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchivedRecord {
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub games_won: u32,
    pub games_lost: u32,
}

/// A player in the pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Unique identifier
    pub id: PlayerId,

    /// Display name, unique ignoring case
    pub name: String,

    /// Lifetime match wins
    pub wins: u32,

    /// Lifetime match losses
    pub losses: u32,

    /// Lifetime match draws
    pub draws: u32,

    /// Global ranking, 1 = best
    pub ranking: u32,

    /// Results from deleted drafts, still counted toward the lifetime record
    /// and ranking
    #[serde(default)]
    pub archived: ArchivedRecord,

    /// When this player was added
    pub created_at: DateTime<Utc>,
}

impl Player {
    /// Create a new player with an empty record.
    pub fn new(name: String, ranking: u32) -> Self {
        Self {
            id: EntityId::random(),
            name,
            wins: 0,
            losses: 0,
            draws: 0,
            ranking,
            archived: ArchivedRecord::default(),
            created_at: Utc::now(),
        }
    }

    /// Lifetime points: 3 per win, 1 per draw.
    pub fn points(&self) -> u32 {
        self.wins * 3 + self.draws
    }

    pub fn record(&self) -> Record {
        Record {
            wins: self.wins,
            losses: self.losses,
            draws: self.draws,
        }
    }

    /// Whether `name` matches this player's name, ignoring case.
    pub fn has_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.trim().to_lowercase()
    }

    /// Set the lifetime record to the archived results plus `live`, the
    /// player's stats over every match still stored.
    ///
    /// Derived from scratch each time, so re-scoring a match or replaying a
    /// batch never double counts.
    pub fn refresh_record(&mut self, live: &PlayerStats) {
        self.wins = self.archived.wins + live.wins;
        self.losses = self.archived.losses + live.losses;
        self.draws = self.archived.draws + live.draws;
    }

    /// Fold the results of a draft that is about to be deleted into the
    /// archived record.
    pub fn archive(&mut self, stats: &PlayerStats) {
        self.archived.wins += stats.wins;
        self.archived.losses += stats.losses;
        self.archived.draws += stats.draws;
        self.archived.games_won = self.archived.games_won.saturating_add(stats.games_won);
        self.archived.games_lost = self.archived.games_lost.saturating_add(stats.games_lost);
    }
}
