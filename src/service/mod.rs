//! Draft service.
//!
//! The entry point collaborators call. Each use case reads a snapshot from
//! the [`Repository`], runs the pure lifecycle/pairing/standings code, writes
//! back every entity it touched and returns them as a [`Changeset`].
//!
//! Mutations of one draft are serialized through a per-draft lock, so two
//! round completions can never pair from the same stale match list. Player
//! records are shared between drafts and get their own lock, always taken
//! after the draft lock.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

use crate::calculate::ranking::{leaderboard, ranking_summary, recompute_global_rankings};
use crate::calculate::{player_stats, player_tournament_stats, tournament_standings};
use crate::error::{DraftError, Result};
use crate::lifecycle::{self, NewTournament};
use crate::models::{
    Match, MatchId, Player, PlayerId, RankingEntry, RankingSummary, StandingsEntry, Tournament,
    TournamentId, TournamentStatus,
};
use crate::storage::Repository;

/// Scores for one match in a batch submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchScore {
    pub match_id: MatchId,
    pub player1_score: u32,
    pub player2_score: u32,
}

impl MatchScore {
    pub fn new(match_id: MatchId, player1_score: u32, player2_score: u32) -> Self {
        Self {
            match_id,
            player1_score,
            player2_score,
        }
    }
}

/// Which drafts to list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentFilter {
    #[default]
    All,
    /// Pending or active
    Active,
    Completed,
}

impl TournamentFilter {
    pub fn matches(&self, tournament: &Tournament) -> bool {
        match self {
            TournamentFilter::All => true,
            TournamentFilter::Active => tournament.status != TournamentStatus::Completed,
            TournamentFilter::Completed => tournament.status == TournamentStatus::Completed,
        }
    }
}

impl std::str::FromStr for TournamentFilter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(TournamentFilter::All),
            "active" => Ok(TournamentFilter::Active),
            "completed" => Ok(TournamentFilter::Completed),
            other => Err(format!("unknown filter {:?} (all, active, completed)", other)),
        }
    }
}

/// Every entity written by one use case.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Changeset {
    /// The draft after the operation, unless it was deleted
    pub tournament: Option<Tournament>,

    /// Matches created or re-scored
    pub matches: Vec<Match>,

    /// Every player after re-ranking, best first
    pub players: Vec<Player>,

    /// Set when a draft was deleted
    pub deleted_tournament: Option<TournamentId>,

    /// Number of matches removed with a deleted draft
    pub deleted_matches: usize,
}

/// Use cases over a repository.
pub struct DraftService<R: Repository> {
    repo: Arc<R>,
    tournament_locks: Mutex<HashMap<TournamentId, Arc<Mutex<()>>>>,
    players_lock: Mutex<()>,
    seating_seed: Option<u64>,
}

impl<R: Repository> DraftService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self {
            repo,
            tournament_locks: Mutex::new(HashMap::new()),
            players_lock: Mutex::new(()),
            seating_seed: None,
        }
    }

    /// Use a fixed seed for seating shuffles.
    pub fn with_seating_seed(mut self, seed: Option<u64>) -> Self {
        self.seating_seed = seed;
        self
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    // ----- players -----

    /// Add a player. Names are unique ignoring case.
    pub async fn create_player(&self, name: &str) -> Result<Player> {
        let name = validate_name(name)?;
        let _players = self.players_lock.lock().await;

        let players = self.repo.list_players().await?;
        if players.iter().any(|p| p.has_name(&name)) {
            return Err(DraftError::DuplicatePlayerName(name));
        }

        let player = Player::new(name, players.len() as u32 + 1);
        self.repo.save_players(std::slice::from_ref(&player)).await?;
        info!("Added player {} ({})", player.name, player.id);

        let ranked = self.rerank().await?;
        Ok(ranked
            .into_iter()
            .find(|p| p.id == player.id)
            .unwrap_or(player))
    }

    /// Change a player's display name.
    pub async fn rename_player(&self, id: &PlayerId, name: &str) -> Result<Player> {
        let name = validate_name(name)?;
        let _players = self.players_lock.lock().await;

        let players = self.repo.list_players().await?;
        if players.iter().any(|p| &p.id != id && p.has_name(&name)) {
            return Err(DraftError::DuplicatePlayerName(name));
        }
        let mut player = players
            .into_iter()
            .find(|p| &p.id == id)
            .ok_or_else(|| DraftError::unknown("player", id))?;

        player.name = name;
        self.repo.save_players(std::slice::from_ref(&player)).await?;
        Ok(player)
    }

    /// Remove a player who is not on any unfinished draft's roster.
    pub async fn delete_player(&self, id: &PlayerId) -> Result<Changeset> {
        let _players = self.players_lock.lock().await;

        let tournaments = self.repo.list_tournaments().await?;
        if let Some(t) = tournaments
            .iter()
            .find(|t| !t.is_finished() && t.has_player(id))
        {
            return Err(DraftError::DeleteNotAllowed(format!(
                "player {} is on the roster of {} draft {}",
                id, t.status, t.id
            )));
        }

        if !self.repo.delete_player(id).await? {
            return Err(DraftError::unknown("player", id));
        }
        info!("Removed player {}", id);

        Ok(Changeset {
            players: self.rerank().await?,
            ..Default::default()
        })
    }

    /// All players, best ranked first.
    pub async fn list_players(&self) -> Result<Vec<Player>> {
        let mut players = self.repo.list_players().await?;
        players.sort_by_key(|p| p.ranking);
        Ok(players)
    }

    // ----- drafts -----

    /// Create a pending draft with a randomized seating.
    pub async fn create_tournament(&self, new: NewTournament) -> Result<Tournament> {
        let _players = self.players_lock.lock().await;

        let known = self.repo.get_players(&new.players).await?;
        if let Some(missing) = new.players.iter().find(|id| !known.iter().any(|p| &p.id == *id)) {
            return Err(DraftError::unknown("player", missing));
        }

        let tournament = match self.seating_seed {
            Some(seed) => {
                let mut rng = StdRng::seed_from_u64(seed);
                lifecycle::create_tournament(new, &mut rng, Utc::now())?
            }
            None => lifecycle::create_tournament(new, &mut rand::thread_rng(), Utc::now())?,
        };

        self.repo.save_tournament(&tournament).await?;
        Ok(tournament)
    }

    /// Start a pending draft and pair round 1.
    pub async fn start_tournament(&self, id: &TournamentId) -> Result<Changeset> {
        let _guard = self.lock_tournament(id).await;
        let tournament = self.load_tournament(id).await?;

        let transition = lifecycle::start_tournament(&tournament, Utc::now())?;
        self.repo.save_matches(&transition.new_matches).await?;
        self.repo.save_tournament(&transition.tournament).await?;

        Ok(Changeset {
            tournament: Some(transition.tournament),
            matches: transition.new_matches,
            ..Default::default()
        })
    }

    /// Record scores for a single match.
    pub async fn record_match_result(
        &self,
        match_id: &MatchId,
        player1_score: u32,
        player2_score: u32,
    ) -> Result<Changeset> {
        let m = self
            .repo
            .get_match(match_id)
            .await?
            .ok_or_else(|| DraftError::unknown("match", match_id))?;

        self.record_match_results(
            &m.tournament_id,
            &[MatchScore::new(match_id.clone(), player1_score, player2_score)],
        )
        .await
    }

    /// Record scores for several matches of one draft.
    ///
    /// The whole batch is validated before anything is written. Scoring is
    /// last-write-wins per match, so replaying a batch is harmless.
    pub async fn record_match_results(
        &self,
        tournament_id: &TournamentId,
        scores: &[MatchScore],
    ) -> Result<Changeset> {
        let _guard = self.lock_tournament(tournament_id).await;
        self.record_locked(tournament_id, scores).await
    }

    /// Close a round: pair the next one, or finish the draft after the last.
    pub async fn complete_round(
        &self,
        tournament_id: &TournamentId,
        round_number: u32,
    ) -> Result<Changeset> {
        let _guard = self.lock_tournament(tournament_id).await;
        self.complete_locked(tournament_id, round_number).await
    }

    /// Record a round's scores and close it in one step.
    ///
    /// Every score must belong to `round_number`.
    pub async fn submit_round(
        &self,
        tournament_id: &TournamentId,
        round_number: u32,
        scores: &[MatchScore],
    ) -> Result<Changeset> {
        let _guard = self.lock_tournament(tournament_id).await;

        let tournament = self.load_tournament(tournament_id).await?;
        let round = tournament
            .round(round_number)
            .ok_or_else(|| DraftError::unknown("round", round_number))?;
        for score in scores {
            if round.matches.contains(&score.match_id) {
                continue;
            }
            return Err(match tournament.round_of(&score.match_id) {
                Some(other) => DraftError::InvalidTransition(format!(
                    "match {} belongs to round {}, not round {}",
                    score.match_id, other.number, round_number
                )),
                None => DraftError::unknown("match", &score.match_id),
            });
        }

        let recorded = self.record_locked(tournament_id, scores).await?;
        let mut completed = self.complete_locked(tournament_id, round_number).await?;

        let mut matches = recorded.matches;
        matches.append(&mut completed.matches);
        completed.matches = matches;
        Ok(completed)
    }

    /// Delete a completed draft and its matches.
    ///
    /// Players keep the wins, losses and draws they earned in it.
    pub async fn delete_tournament(&self, id: &TournamentId) -> Result<Changeset> {
        let _guard = self.lock_tournament(id).await;
        let tournament = self.load_tournament(id).await?;
        lifecycle::ensure_deletable(&tournament)?;

        let matches = self.repo.get_matches(id).await?;
        let (players, deleted_matches) = {
            let _players = self.players_lock.lock().await;

            let mut roster = self.repo.get_players(&tournament.players).await?;
            for player in roster.iter_mut() {
                player.archive(&player_tournament_stats(&player.id, id, &matches));
            }
            self.repo.save_players(&roster).await?;

            let deleted_matches = self.repo.delete_matches(id).await?;
            self.repo.delete_tournament(id).await?;
            info!(
                "Deleted draft {} and {} matches",
                tournament.id, deleted_matches
            );

            (self.rerank().await?, deleted_matches)
        };

        self.tournament_locks.lock().await.remove(id);

        Ok(Changeset {
            players,
            deleted_tournament: Some(tournament.id),
            deleted_matches,
            ..Default::default()
        })
    }

    pub async fn get_tournament(&self, id: &TournamentId) -> Result<Tournament> {
        self.load_tournament(id).await
    }

    /// Matches of a draft, ordered by round.
    pub async fn tournament_matches(&self, id: &TournamentId) -> Result<Vec<Match>> {
        let tournament = self.load_tournament(id).await?;
        let matches = self.repo.get_matches(id).await?;

        let mut ordered = Vec::with_capacity(matches.len());
        for round in &tournament.rounds {
            for match_id in &round.matches {
                if let Some(m) = matches.iter().find(|m| &m.id == match_id) {
                    ordered.push(m.clone());
                }
            }
        }
        Ok(ordered)
    }

    /// Drafts passing `filter`, newest first.
    pub async fn list_tournaments(&self, filter: TournamentFilter) -> Result<Vec<Tournament>> {
        let mut tournaments: Vec<Tournament> = self
            .repo
            .list_tournaments()
            .await?
            .into_iter()
            .filter(|t| filter.matches(t))
            .collect();
        tournaments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tournaments)
    }

    // ----- standings and rankings -----

    /// Current standings of a draft.
    pub async fn standings(&self, id: &TournamentId) -> Result<Vec<StandingsEntry>> {
        let tournament = self.load_tournament(id).await?;
        let matches = self.repo.get_matches(id).await?;
        Ok(tournament_standings(&tournament, &matches))
    }

    /// Recompute and store global rankings, returning the leaderboard.
    pub async fn global_rankings(&self) -> Result<Vec<RankingEntry>> {
        let _players = self.players_lock.lock().await;
        let ranked = self.rerank().await?;
        let matches = self.repo.all_matches().await?;
        Ok(leaderboard(&ranked, &matches))
    }

    pub async fn ranking_summary(&self) -> Result<RankingSummary> {
        let players = self.repo.list_players().await?;
        let matches = self.repo.all_matches().await?;
        Ok(ranking_summary(&players, &matches))
    }

    // ----- internals -----

    async fn lock_tournament(&self, id: &TournamentId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.tournament_locks.lock().await;
            locks.entry(id.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }

    async fn load_tournament(&self, id: &TournamentId) -> Result<Tournament> {
        self.repo
            .get_tournament(id)
            .await?
            .ok_or_else(|| DraftError::unknown("tournament", id))
    }

    async fn record_locked(
        &self,
        tournament_id: &TournamentId,
        scores: &[MatchScore],
    ) -> Result<Changeset> {
        let tournament = self.load_tournament(tournament_id).await?;
        let mut working = self.repo.get_matches(tournament_id).await?;
        let now = Utc::now();

        let mut touched: Vec<MatchId> = Vec::new();
        for score in scores {
            let slot = working
                .iter_mut()
                .find(|m| m.id == score.match_id)
                .ok_or_else(|| DraftError::unknown("match", &score.match_id))?;
            *slot = lifecycle::record_result(
                &tournament,
                slot,
                score.player1_score,
                score.player2_score,
                now,
            )?;
            if !touched.contains(&score.match_id) {
                touched.push(score.match_id.clone());
            }
        }

        let updated: Vec<Match> = working
            .into_iter()
            .filter(|m| touched.contains(&m.id))
            .collect();
        self.repo.save_matches(&updated).await?;
        debug!(
            "Recorded {} result(s) in draft {}",
            updated.len(),
            tournament_id
        );

        let involved: Vec<PlayerId> = updated
            .iter()
            .flat_map(|m| [m.player1.clone(), m.player2.clone()])
            .collect();
        let players = {
            let _players = self.players_lock.lock().await;
            self.refresh_records(&involved).await?;
            self.rerank().await?
        };

        Ok(Changeset {
            tournament: Some(tournament),
            matches: updated,
            players,
            ..Default::default()
        })
    }

    async fn complete_locked(
        &self,
        tournament_id: &TournamentId,
        round_number: u32,
    ) -> Result<Changeset> {
        let tournament = self.load_tournament(tournament_id).await?;
        let matches = self.repo.get_matches(tournament_id).await?;

        let transition =
            lifecycle::complete_round(&tournament, &matches, round_number, Utc::now())?;
        self.repo.save_matches(&transition.new_matches).await?;
        self.repo.save_tournament(&transition.tournament).await?;

        let players = {
            let _players = self.players_lock.lock().await;
            self.rerank().await?
        };

        Ok(Changeset {
            tournament: Some(transition.tournament),
            matches: transition.new_matches,
            players,
            ..Default::default()
        })
    }

    /// Rebuild the lifetime record of `ids` from archived results plus every
    /// stored match. Caller holds the players lock.
    async fn refresh_records(&self, ids: &[PlayerId]) -> Result<()> {
        let matches = self.repo.all_matches().await?;
        let mut players = self.repo.get_players(ids).await?;
        for player in players.iter_mut() {
            player.refresh_record(&player_stats(&player.id, &matches));
        }
        self.repo.save_players(&players).await?;
        Ok(())
    }

    /// Recompute global rankings and store the ones that moved. Returns every
    /// player in ranking order. Caller holds the players lock.
    async fn rerank(&self) -> Result<Vec<Player>> {
        let mut players = self.repo.list_players().await?;
        // ties keep their previous order
        players.sort_by_key(|p| p.ranking);
        let matches = self.repo.all_matches().await?;
        let ranked = recompute_global_rankings(&players, &matches);

        let mut moved = 0;
        for p in &ranked {
            let changed = players
                .iter()
                .find(|old| old.id == p.id)
                .map_or(true, |old| old.ranking != p.ranking);
            if changed {
                self.repo
                    .save_player_stats(&p.id, p.wins, p.losses, p.draws, p.ranking)
                    .await?;
                moved += 1;
            }
        }
        if moved > 0 {
            debug!("Rankings changed for {} player(s)", moved);
        }

        Ok(ranked)
    }
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DraftError::InvalidRoster(
            "player name must not be empty".to_string(),
        ));
    }
    Ok(name.to_string())
}
