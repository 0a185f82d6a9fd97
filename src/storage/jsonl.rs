//! JSONL (JSON Lines) storage.
//!
//! Each line is a valid JSON object representing one entity. Files are
//! rewritten whole on every save, through a temporary file and a rename, so
//! a crash mid-write leaves the previous contents in place.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{upsert_by_id, EntityType, Repository, StorageConfig, StorageError};
use crate::models::{Match, Player, PlayerId, Tournament, TournamentId};

/// JSONL file writer.
pub struct JsonlWriter<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: Serialize> JsonlWriter<T> {
    /// Create a new JSONL writer for the given path.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    /// Create a writer for a specific entity type.
    pub fn for_entity(config: &StorageConfig, entity: EntityType) -> Self {
        Self::new(config.entity_path(entity))
    }

    /// Ensure the parent directory exists.
    fn ensure_dir(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Write entities, replacing the entire file.
    pub fn write_all(&self, entities: &[T]) -> Result<usize, StorageError> {
        self.ensure_dir()?;

        let tmp_path = self.path.with_extension("jsonl.tmp");
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        let mut count = 0;

        for entity in entities {
            let json = serde_json::to_string(entity)?;
            writeln!(writer, "{}", json)?;
            count += 1;
        }

        writer.flush()?;
        fs::rename(&tmp_path, &self.path)?;
        debug!("Wrote {} entities to {:?}", count, self.path);

        Ok(count)
    }
}

/// JSONL file reader.
pub struct JsonlReader<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: DeserializeOwned> JsonlReader<T> {
    /// Create a new JSONL reader for the given path.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    /// Create a reader for a specific entity type.
    pub fn for_entity(config: &StorageConfig, entity: EntityType) -> Self {
        Self::new(config.entity_path(entity))
    }

    /// Check if the file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read all entities from the file.
    ///
    /// A missing file reads as empty. Blank lines are ignored; any other
    /// line that fails to parse fails the whole read, so a rewrite never
    /// drops records it could not understand.
    pub fn read_all(&self) -> Result<Vec<T>, StorageError> {
        if !self.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut entities = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let entity = serde_json::from_str(&line).map_err(|source| StorageError::Parse {
                path: self.path.clone(),
                line: idx + 1,
                source,
            })?;
            entities.push(entity);
        }

        debug!("Read {} entities from {:?}", entities.len(), self.path);
        Ok(entities)
    }
}

/// Repository backed by one JSONL file per entity type.
pub struct JsonlRepository {
    config: StorageConfig,
    lock: Mutex<()>,
}

impl JsonlRepository {
    pub fn new(config: StorageConfig) -> Self {
        info!("Using JSONL storage in {:?}", config.data_dir);
        Self {
            config,
            lock: Mutex::new(()),
        }
    }

    fn read<T: DeserializeOwned>(&self, entity: EntityType) -> Result<Vec<T>, StorageError> {
        JsonlReader::for_entity(&self.config, entity).read_all()
    }

    fn write<T: Serialize>(&self, entity: EntityType, items: &[T]) -> Result<(), StorageError> {
        JsonlWriter::for_entity(&self.config, entity).write_all(items)?;
        Ok(())
    }
}

#[async_trait]
impl Repository for JsonlRepository {
    async fn list_players(&self) -> Result<Vec<Player>, StorageError> {
        let _guard = self.lock.lock().await;
        self.read(EntityType::Player)
    }

    async fn save_players(&self, players: &[Player]) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut all: Vec<Player> = self.read(EntityType::Player)?;
        upsert_by_id(&mut all, players, |p| p.id.as_str());
        self.write(EntityType::Player, &all)
    }

    async fn delete_player(&self, id: &PlayerId) -> Result<bool, StorageError> {
        let _guard = self.lock.lock().await;
        let mut all: Vec<Player> = self.read(EntityType::Player)?;
        let before = all.len();
        all.retain(|p| &p.id != id);
        if all.len() == before {
            return Ok(false);
        }
        self.write(EntityType::Player, &all)?;
        Ok(true)
    }

    async fn list_tournaments(&self) -> Result<Vec<Tournament>, StorageError> {
        let _guard = self.lock.lock().await;
        self.read(EntityType::Tournament)
    }

    async fn save_tournament(&self, tournament: &Tournament) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut all: Vec<Tournament> = self.read(EntityType::Tournament)?;
        upsert_by_id(&mut all, std::slice::from_ref(tournament), |t| t.id.as_str());
        self.write(EntityType::Tournament, &all)
    }

    async fn delete_tournament(&self, id: &TournamentId) -> Result<bool, StorageError> {
        let _guard = self.lock.lock().await;
        let mut all: Vec<Tournament> = self.read(EntityType::Tournament)?;
        let before = all.len();
        all.retain(|t| &t.id != id);
        if all.len() == before {
            return Ok(false);
        }
        self.write(EntityType::Tournament, &all)?;
        Ok(true)
    }

    async fn all_matches(&self) -> Result<Vec<Match>, StorageError> {
        let _guard = self.lock.lock().await;
        self.read(EntityType::Match)
    }

    async fn save_matches(&self, matches: &[Match]) -> Result<(), StorageError> {
        if matches.is_empty() {
            return Ok(());
        }
        let _guard = self.lock.lock().await;
        let mut all: Vec<Match> = self.read(EntityType::Match)?;
        upsert_by_id(&mut all, matches, |m| m.id.as_str());
        self.write(EntityType::Match, &all)
    }

    async fn delete_matches(&self, tournament_id: &TournamentId) -> Result<usize, StorageError> {
        let _guard = self.lock.lock().await;
        let mut all: Vec<Match> = self.read(EntityType::Match)?;
        let before = all.len();
        all.retain(|m| &m.tournament_id != tournament_id);
        let removed = before - all.len();
        if removed > 0 {
            self.write(EntityType::Match, &all)?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct TestEntity {
        id: String,
        value: u32,
    }

    fn repo(temp_dir: &TempDir) -> JsonlRepository {
        JsonlRepository::new(StorageConfig::new(temp_dir.path().to_path_buf()))
    }

    #[test]
    fn test_jsonl_write_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("test.jsonl");

        let entities = vec![
            TestEntity {
                id: "1".to_string(),
                value: 100,
            },
            TestEntity {
                id: "2".to_string(),
                value: 200,
            },
        ];

        let writer: JsonlWriter<TestEntity> = JsonlWriter::new(path.clone());
        assert_eq!(writer.write_all(&entities).unwrap(), 2);

        let reader: JsonlReader<TestEntity> = JsonlReader::new(path.clone());
        assert!(reader.exists());
        assert_eq!(reader.read_all().unwrap(), entities);
        assert!(!path.with_extension("jsonl.tmp").exists());
    }

    #[test]
    fn test_jsonl_read_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let reader: JsonlReader<TestEntity> =
            JsonlReader::new(temp_dir.path().join("nonexistent.jsonl"));
        assert!(reader.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_jsonl_skips_blank_lines() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("blank.jsonl");
        fs::write(&path, "{\"id\":\"1\",\"value\":1}\n\n{\"id\":\"2\",\"value\":2}\n").unwrap();

        let reader: JsonlReader<TestEntity> = JsonlReader::new(path);
        let entities = reader.read_all().unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[1].id, "2");
    }

    #[test]
    fn test_jsonl_malformed_line_fails_read() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("mixed.jsonl");
        fs::write(&path, "{\"id\":\"1\",\"value\":1}\n\nnot json\n").unwrap();

        let reader: JsonlReader<TestEntity> = JsonlReader::new(path);
        match reader.read_all() {
            Err(StorageError::Parse { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_repository_save_keeps_unparsable_file_intact() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repo(&temp_dir);
        let ana = Player::new("Ana".to_string(), 1);
        repo.save_players(std::slice::from_ref(&ana)).await.unwrap();

        let path = temp_dir.path().join("players.jsonl");
        let mut contents = fs::read_to_string(&path).unwrap();
        contents.push_str("{\"id\":\"zed\",\"name\":\"Zed\",\"wins\":-1}\n");
        fs::write(&path, &contents).unwrap();

        let ben = Player::new("Ben".to_string(), 2);
        let err = repo.save_players(&[ben]).await.unwrap_err();
        assert!(matches!(err, StorageError::Parse { line: 2, .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), contents);
    }

    #[tokio::test]
    async fn test_repository_player_upsert_and_delete() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repo(&temp_dir);

        let mut alice = Player::new("Alice".to_string(), 1);
        let bob = Player::new("Bob".to_string(), 2);
        repo.save_players(&[alice.clone(), bob.clone()]).await.unwrap();

        alice.wins = 4;
        repo.save_players(&[alice.clone()]).await.unwrap();

        let players = repo.list_players().await.unwrap();
        assert_eq!(players.len(), 2);
        assert_eq!(players[0].wins, 4);
        assert_eq!(players[1].name, "Bob");

        assert!(repo.delete_player(&bob.id).await.unwrap());
        assert!(!repo.delete_player(&bob.id).await.unwrap());
        assert_eq!(repo.list_players().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_repository_save_player_stats() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repo(&temp_dir);
        let alice = Player::new("Alice".to_string(), 1);
        repo.save_players(&[alice.clone()]).await.unwrap();

        repo.save_player_stats(&alice.id, 3, 1, 1, 2).await.unwrap();
        let stored = repo.get_players(&[alice.id.clone()]).await.unwrap();
        assert_eq!(
            (stored[0].wins, stored[0].losses, stored[0].draws, stored[0].ranking),
            (3, 1, 1, 2)
        );

        let missing = repo
            .save_player_stats(&"ghost".into(), 0, 0, 0, 1)
            .await
            .unwrap_err();
        assert!(matches!(missing, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_repository_matches_by_tournament() {
        let temp_dir = TempDir::new().unwrap();
        let repo = repo(&temp_dir);

        let m1 = Match::new("d1".into(), 1, "a".into(), "b".into(), Utc::now());
        let m2 = Match::new("d2".into(), 1, "a".into(), "b".into(), Utc::now());
        repo.save_matches(&[m1.clone(), m2.clone()]).await.unwrap();

        assert_eq!(repo.get_matches(&"d1".into()).await.unwrap(), vec![m1.clone()]);
        assert_eq!(repo.get_match(&m2.id).await.unwrap(), Some(m2));

        assert_eq!(repo.delete_matches(&"d1".into()).await.unwrap(), 1);
        assert_eq!(repo.all_matches().await.unwrap().len(), 1);
        assert!(repo.get_match(&m1.id).await.unwrap().is_none());
    }
}
