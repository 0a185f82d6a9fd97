//! Persistence for players, tournaments and matches.
//!
//! The engine only talks to storage through the [`Repository`] trait:
//! - [`JsonlRepository`] keeps one JSON Lines file per entity type
//! - [`MemoryRepository`] keeps everything in process, for tests and embedding
//!
//! Rounds are stored inside their tournament record.

mod jsonl;
mod memory;

pub use jsonl::*;
pub use memory::*;

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Match, MatchId, Player, PlayerId, Tournament, TournamentId};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse line {line} of {path:?}: {source}")]
    Parse {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },

    #[error("Record not found: {0}")]
    NotFound(String),
}

/// Configuration for storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Path of the JSONL file holding `entity`.
    pub fn entity_path(&self, entity: EntityType) -> PathBuf {
        self.data_dir.join(entity.filename())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("./data"))
    }
}

/// Entity types with their own storage file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityType {
    Player,
    Tournament,
    Match,
}

impl EntityType {
    /// Get the filename for this entity type.
    pub fn filename(&self) -> &'static str {
        match self {
            EntityType::Player => "players.jsonl",
            EntityType::Tournament => "tournaments.jsonl",
            EntityType::Match => "matches.jsonl",
        }
    }
}

/// Read and write operations the draft service needs from storage.
///
/// Implementations need not serialize writes per tournament; the service
/// does that before calling in.
#[async_trait]
pub trait Repository: Send + Sync {
    /// All players, in insertion order.
    async fn list_players(&self) -> Result<Vec<Player>, StorageError>;

    /// Insert or replace players by ID.
    async fn save_players(&self, players: &[Player]) -> Result<(), StorageError>;

    /// Remove a player. Returns whether it existed.
    async fn delete_player(&self, id: &PlayerId) -> Result<bool, StorageError>;

    /// All tournaments, in insertion order.
    async fn list_tournaments(&self) -> Result<Vec<Tournament>, StorageError>;

    /// Insert or replace a tournament (rounds included).
    async fn save_tournament(&self, tournament: &Tournament) -> Result<(), StorageError>;

    /// Remove a tournament. Returns whether it existed.
    async fn delete_tournament(&self, id: &TournamentId) -> Result<bool, StorageError>;

    /// Every match across all tournaments.
    async fn all_matches(&self) -> Result<Vec<Match>, StorageError>;

    /// Insert or replace matches by ID.
    async fn save_matches(&self, matches: &[Match]) -> Result<(), StorageError>;

    /// Remove every match of a tournament. Returns how many were removed.
    async fn delete_matches(&self, tournament_id: &TournamentId) -> Result<usize, StorageError>;

    /// Players with the given IDs, in storage order.
    async fn get_players(&self, ids: &[PlayerId]) -> Result<Vec<Player>, StorageError> {
        let players = self.list_players().await?;
        Ok(players.into_iter().filter(|p| ids.contains(&p.id)).collect())
    }

    async fn get_tournament(&self, id: &TournamentId) -> Result<Option<Tournament>, StorageError> {
        let tournaments = self.list_tournaments().await?;
        Ok(tournaments.into_iter().find(|t| &t.id == id))
    }

    /// Matches belonging to one tournament.
    async fn get_matches(&self, tournament_id: &TournamentId) -> Result<Vec<Match>, StorageError> {
        let matches = self.all_matches().await?;
        Ok(matches
            .into_iter()
            .filter(|m| &m.tournament_id == tournament_id)
            .collect())
    }

    async fn get_match(&self, id: &MatchId) -> Result<Option<Match>, StorageError> {
        let matches = self.all_matches().await?;
        Ok(matches.into_iter().find(|m| &m.id == id))
    }

    /// Write a player's lifetime record and ranking.
    async fn save_player_stats(
        &self,
        id: &PlayerId,
        wins: u32,
        losses: u32,
        draws: u32,
        ranking: u32,
    ) -> Result<(), StorageError> {
        let mut player = self
            .get_players(std::slice::from_ref(id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StorageError::NotFound(format!("player {}", id)))?;
        player.wins = wins;
        player.losses = losses;
        player.draws = draws;
        player.ranking = ranking;
        self.save_players(&[player]).await
    }
}

/// Replace items in `existing` that share an ID with `updates`, appending
/// the rest. Existing order is preserved.
pub fn upsert_by_id<T, F>(existing: &mut Vec<T>, updates: &[T], id_of: F)
where
    T: Clone,
    F: Fn(&T) -> &str,
{
    for update in updates {
        match existing.iter_mut().find(|e| id_of(e) == id_of(update)) {
            Some(slot) => *slot = update.clone(),
            None => existing.push(update.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_config_paths() {
        let config = StorageConfig::new(PathBuf::from("/data"));

        assert_eq!(
            config.entity_path(EntityType::Player),
            PathBuf::from("/data/players.jsonl")
        );
        assert_eq!(
            config.entity_path(EntityType::Tournament),
            PathBuf::from("/data/tournaments.jsonl")
        );
        assert_eq!(
            config.entity_path(EntityType::Match),
            PathBuf::from("/data/matches.jsonl")
        );
    }

    #[test]
    fn test_storage_config_default() {
        let config = StorageConfig::default();
        assert_eq!(config.data_dir, PathBuf::from("./data"));
    }

    #[test]
    fn test_upsert_by_id_replaces_and_appends() {
        let mut existing = vec![("a".to_string(), 1), ("b".to_string(), 2)];
        upsert_by_id(
            &mut existing,
            &[("b".to_string(), 20), ("c".to_string(), 3)],
            |e| e.0.as_str(),
        );
        assert_eq!(
            existing,
            vec![
                ("a".to_string(), 1),
                ("b".to_string(), 20),
                ("c".to_string(), 3)
            ]
        );
    }
}
