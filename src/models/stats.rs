//! Derived statistics models.

use serde::{Deserialize, Serialize};

use super::PlayerId;

/// Match and game record for one player over a set of matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,

    /// Sum of the player's own game scores
    pub games_won: u32,

    /// Sum of opponents' game scores
    pub games_lost: u32,

    /// Match win percentage (0 to 100)
    pub match_win_pct: f64,

    /// Game win percentage (0 to 100)
    pub game_win_pct: f64,

    /// 3 per win, 1 per draw
    pub points: u32,
}

impl PlayerStats {
    pub fn matches_played(&self) -> u32 {
        self.wins + self.losses + self.draws
    }
}

/// One row of a tournament's standings table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingsEntry {
    /// 1-based position
    pub position: u32,
    pub player_id: PlayerId,
    pub stats: PlayerStats,
}

/// One row of the lifetime leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub ranking: u32,
    pub player_id: PlayerId,
    pub name: String,
    pub stats: PlayerStats,
}

/// Headline numbers for the leaderboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankingSummary {
    pub total_players: u32,

    /// Matches with a recorded result
    pub total_matches: u32,

    /// Mean match win percentage across all players
    pub average_win_pct: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_played() {
        let stats = PlayerStats {
            wins: 2,
            losses: 1,
            draws: 1,
            ..Default::default()
        };
        assert_eq!(stats.matches_played(), 4);
    }

    #[test]
    fn test_default_summary_is_empty() {
        let summary = RankingSummary::default();
        assert_eq!(summary.total_players, 0);
        assert_eq!(summary.average_win_pct, 0.0);
    }
}
