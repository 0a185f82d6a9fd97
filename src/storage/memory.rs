//! In-process repository.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{upsert_by_id, Repository, StorageError};
use crate::models::{Match, Player, PlayerId, Tournament, TournamentId};

#[derive(Debug, Default)]
struct MemoryState {
    players: Vec<Player>,
    tournaments: Vec<Tournament>,
    matches: Vec<Match>,
}

/// Repository holding every entity in memory.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: RwLock<MemoryState>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn list_players(&self) -> Result<Vec<Player>, StorageError> {
        Ok(self.state.read().await.players.clone())
    }

    async fn save_players(&self, players: &[Player]) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        upsert_by_id(&mut state.players, players, |p| p.id.as_str());
        Ok(())
    }

    async fn delete_player(&self, id: &PlayerId) -> Result<bool, StorageError> {
        let mut state = self.state.write().await;
        let before = state.players.len();
        state.players.retain(|p| &p.id != id);
        Ok(state.players.len() != before)
    }

    async fn list_tournaments(&self) -> Result<Vec<Tournament>, StorageError> {
        Ok(self.state.read().await.tournaments.clone())
    }

    async fn save_tournament(&self, tournament: &Tournament) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        upsert_by_id(
            &mut state.tournaments,
            std::slice::from_ref(tournament),
            |t| t.id.as_str(),
        );
        Ok(())
    }

    async fn delete_tournament(&self, id: &TournamentId) -> Result<bool, StorageError> {
        let mut state = self.state.write().await;
        let before = state.tournaments.len();
        state.tournaments.retain(|t| &t.id != id);
        Ok(state.tournaments.len() != before)
    }

    async fn all_matches(&self) -> Result<Vec<Match>, StorageError> {
        Ok(self.state.read().await.matches.clone())
    }

    async fn save_matches(&self, matches: &[Match]) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        upsert_by_id(&mut state.matches, matches, |m| m.id.as_str());
        Ok(())
    }

    async fn delete_matches(&self, tournament_id: &TournamentId) -> Result<usize, StorageError> {
        let mut state = self.state.write().await;
        let before = state.matches.len();
        state.matches.retain(|m| &m.tournament_id != tournament_id);
        Ok(before - state.matches.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_memory_repository_round_trip() {
        tokio_test::block_on(async {
            let repo = MemoryRepository::new();
            let alice = Player::new("Alice".to_string(), 1);
            repo.save_players(&[alice.clone()]).await.unwrap();

            let players = repo.get_players(&[alice.id.clone()]).await.unwrap();
            assert_eq!(players, vec![alice.clone()]);
            assert!(repo.delete_player(&alice.id).await.unwrap());
            assert!(repo.list_players().await.unwrap().is_empty());
        });
    }

    #[tokio::test]
    async fn test_memory_repository_matches() {
        let repo = MemoryRepository::new();
        let mut m = Match::new("d1".into(), 1, "a".into(), "b".into(), Utc::now());
        repo.save_matches(&[m.clone()]).await.unwrap();

        m.set_scores(2, 0, Utc::now());
        repo.save_matches(&[m.clone()]).await.unwrap();

        let stored = repo.all_matches().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].player1_score, 2);

        assert_eq!(repo.delete_matches(&"d1".into()).await.unwrap(), 1);
        assert_eq!(repo.delete_matches(&"d1".into()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_memory_repository_tournament_missing() {
        let repo = MemoryRepository::new();
        assert!(repo.get_tournament(&"nope".into()).await.unwrap().is_none());
        assert!(!repo.delete_tournament(&"nope".into()).await.unwrap());
    }
}
