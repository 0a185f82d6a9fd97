//! Statistics calculation engine.
//!
//! Pure functions over match history:
//! - Per-player match and game records
//! - Tournament standings ordered by points, match-win% and game-win%
//! - Lifetime rankings across every tournament (see [`ranking`])

pub mod ranking;

use std::cmp::Ordering;

use crate::models::{
    Match, Outcome, PlayerId, PlayerStats, Side, StandingsEntry, Tournament, TournamentId,
};

/// Percentage of `part` in `total`, or 0 when nothing was played.
pub fn calculate_percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Compute a player's record over `matches`.
///
/// Pending matches and matches the player did not play are skipped. Game
/// counts are the raw per-game scores, whatever the match outcome.
pub fn player_stats<'a, I>(player_id: &PlayerId, matches: I) -> PlayerStats
where
    I: IntoIterator<Item = &'a Match>,
{
    let mut stats = PlayerStats::default();

    for m in matches {
        if m.result.is_pending() {
            continue;
        }
        let Some(side) = m.side_of(player_id) else {
            continue;
        };

        let (own, opponent) = match side {
            Side::Player1 => (m.player1_score, m.player2_score),
            Side::Player2 => (m.player2_score, m.player1_score),
        };
        stats.games_won = stats.games_won.saturating_add(own);
        stats.games_lost = stats.games_lost.saturating_add(opponent);

        match m.result.outcome_for(side) {
            Some(Outcome::Win) => stats.wins += 1,
            Some(Outcome::Loss) => stats.losses += 1,
            Some(Outcome::Draw) => stats.draws += 1,
            None => {}
        }
    }

    with_derived(stats)
}

/// Fill in match-win%, game-win% and points from the raw counts.
///
/// Game totals are summed in `u64`, so large scores cannot overflow.
pub fn with_derived(mut stats: PlayerStats) -> PlayerStats {
    stats.match_win_pct = calculate_percentage(stats.wins.into(), stats.matches_played().into());
    stats.game_win_pct = calculate_percentage(
        stats.games_won.into(),
        u64::from(stats.games_won) + u64::from(stats.games_lost),
    );
    stats.points = stats.wins * 3 + stats.draws;
    stats
}

/// Compute a player's record within one tournament.
pub fn player_tournament_stats(
    player_id: &PlayerId,
    tournament_id: &TournamentId,
    matches: &[Match],
) -> PlayerStats {
    player_stats(
        player_id,
        matches.iter().filter(|m| &m.tournament_id == tournament_id),
    )
}

/// Standings order: points, then match-win%, then game-win%, all descending.
pub fn compare_stats(a: &PlayerStats, b: &PlayerStats) -> Ordering {
    b.points
        .cmp(&a.points)
        .then_with(|| b.match_win_pct.total_cmp(&a.match_win_pct))
        .then_with(|| b.game_win_pct.total_cmp(&a.game_win_pct))
}

/// Order `players` by their record over `matches`.
///
/// The sort is stable, so players tied on every criterion keep their
/// input order.
pub fn rank_players<'a>(
    players: impl IntoIterator<Item = &'a PlayerId>,
    matches: &[Match],
) -> Vec<(PlayerId, PlayerStats)> {
    let mut ranked: Vec<(PlayerId, PlayerStats)> = players
        .into_iter()
        .map(|id| (id.clone(), player_stats(id, matches)))
        .collect();
    ranked.sort_by(|(_, a), (_, b)| compare_stats(a, b));
    ranked
}

/// Standings table for a tournament, in roster order for ties.
pub fn tournament_standings(tournament: &Tournament, matches: &[Match]) -> Vec<StandingsEntry> {
    let own: Vec<Match> = matches
        .iter()
        .filter(|m| m.tournament_id == tournament.id)
        .cloned()
        .collect();

    rank_players(&tournament.players, &own)
        .into_iter()
        .enumerate()
        .map(|(i, (player_id, stats))| StandingsEntry {
            position: i as u32 + 1,
            player_id,
            stats,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntityId, TournamentStatus};
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn scored(draft: &str, round: u32, p1: &str, p2: &str, s1: u32, s2: u32) -> Match {
        let mut m = Match::new(draft.into(), round, p1.into(), p2.into(), Utc::now());
        m.set_scores(s1, s2, Utc::now());
        m
    }

    fn tournament(players: &[&str]) -> Tournament {
        let players: Vec<PlayerId> = players.iter().map(|&p| p.into()).collect();
        Tournament {
            id: EntityId::from("d1"),
            name: "Test".to_string(),
            description: None,
            cube_name: None,
            seating: players.clone(),
            players,
            status: TournamentStatus::Active,
            rounds: Vec::new(),
            total_rounds: 3,
            current_round: 1,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn test_calculate_percentage() {
        assert_eq!(calculate_percentage(0, 0), 0.0);
        assert_eq!(calculate_percentage(1, 2), 50.0);
        assert!((calculate_percentage(2, 3) - 66.666).abs() < 0.01);
    }

    #[test]
    fn test_player_stats_counts_by_side() {
        let matches = vec![
            scored("d1", 1, "a", "b", 2, 0),
            scored("d1", 2, "c", "a", 2, 1),
            scored("d1", 3, "a", "d", 1, 1),
        ];
        let stats = player_stats(&"a".into(), &matches);

        assert_eq!((stats.wins, stats.losses, stats.draws), (1, 1, 1));
        assert_eq!((stats.games_won, stats.games_lost), (4, 3));
        assert_eq!(stats.points, 4);
        assert!((stats.match_win_pct - 33.333).abs() < 0.01);
        assert!((stats.game_win_pct - 57.142).abs() < 0.01);
    }

    #[test]
    fn test_huge_scores_do_not_overflow() {
        let mut m = Match::new("d1".into(), 1, "a".into(), "b".into(), Utc::now());
        m.set_scores(u32::MAX, 1, Utc::now());
        let again = m.clone();

        let stats = player_stats(&"a".into(), &[m, again]);
        assert_eq!(stats.wins, 2);
        assert_eq!(stats.games_won, u32::MAX);
        assert!(stats.game_win_pct > 99.9 && stats.game_win_pct <= 100.0);
    }

    #[test]
    fn test_pending_matches_ignored() {
        let matches = vec![Match::new("d1".into(), 1, "a".into(), "b".into(), Utc::now())];
        assert_eq!(player_stats(&"a".into(), &matches), PlayerStats::default());
    }

    #[test]
    fn test_no_matches_no_division_by_zero() {
        let stats = player_stats(&"a".into(), &Vec::<Match>::new());
        assert_eq!(stats.match_win_pct, 0.0);
        assert_eq!(stats.game_win_pct, 0.0);
    }

    #[test]
    fn test_tournament_filter() {
        let matches = vec![scored("d1", 1, "a", "b", 2, 0), scored("d2", 1, "a", "b", 2, 0)];
        let stats = player_tournament_stats(&"a".into(), &"d1".into(), &matches);
        assert_eq!(stats.wins, 1);
    }

    #[test]
    fn test_compare_stats_tie_breaks() {
        let high_game = PlayerStats {
            points: 3,
            match_win_pct: 50.0,
            game_win_pct: 60.0,
            ..Default::default()
        };
        let low_game = PlayerStats {
            game_win_pct: 40.0,
            ..high_game.clone()
        };
        let more_points = PlayerStats {
            points: 4,
            ..Default::default()
        };

        assert_eq!(compare_stats(&high_game, &low_game), Ordering::Less);
        assert_eq!(compare_stats(&more_points, &high_game), Ordering::Less);
        assert_eq!(compare_stats(&low_game, &low_game), Ordering::Equal);
    }

    #[test]
    fn test_standings_stable_for_ties() {
        let t = tournament(&["a", "b", "c", "d"]);
        let matches = vec![scored("d1", 1, "a", "c", 2, 0), scored("d1", 1, "b", "d", 2, 0)];

        let order: Vec<String> = tournament_standings(&t, &matches)
            .iter()
            .map(|e| e.player_id.to_string())
            .collect();
        assert_eq!(order, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_standings_game_win_tie_break() {
        let t = tournament(&["p1", "p2", "p3", "p4"]);
        let matches = vec![scored("d1", 1, "p1", "p3", 2, 0), scored("d1", 1, "p4", "p2", 2, 1)];

        let standings = tournament_standings(&t, &matches);
        let order: Vec<&str> = standings.iter().map(|e| e.player_id.as_str()).collect();
        assert_eq!(order, vec!["p1", "p4", "p2", "p3"]);
        assert_eq!(standings[0].position, 1);
        assert_eq!(standings[1].stats.points, 3);
        assert_eq!(standings[1].stats.match_win_pct, 100.0);
    }
}
