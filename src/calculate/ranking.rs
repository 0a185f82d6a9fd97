//! Lifetime rankings across every tournament.

use super::{calculate_percentage, compare_stats, player_stats, with_derived};
use crate::models::{Match, Player, PlayerStats, RankingEntry, RankingSummary};

/// A player's lifetime stats: results archived from deleted drafts plus
/// every stored match.
pub fn lifetime_stats(player: &Player, matches: &[Match]) -> PlayerStats {
    let live = player_stats(&player.id, matches);
    let past = &player.archived;
    with_derived(PlayerStats {
        wins: past.wins + live.wins,
        losses: past.losses + live.losses,
        draws: past.draws + live.draws,
        games_won: past.games_won.saturating_add(live.games_won),
        games_lost: past.games_lost.saturating_add(live.games_lost),
        ..Default::default()
    })
}

/// Rank every player over their lifetime stats.
///
/// Returns the players in ranked order with dense 1-based rankings. Ties on
/// points, match-win% and game-win% keep their input order; no two players
/// share a rank.
pub fn recompute_global_rankings(players: &[Player], matches: &[Match]) -> Vec<Player> {
    sorted_by_stats(players, matches)
        .into_iter()
        .enumerate()
        .map(|(i, (player, _))| Player {
            ranking: i as u32 + 1,
            ..player.clone()
        })
        .collect()
}

/// Leaderboard rows with lifetime stats, best first.
pub fn leaderboard(players: &[Player], matches: &[Match]) -> Vec<RankingEntry> {
    sorted_by_stats(players, matches)
        .into_iter()
        .enumerate()
        .map(|(i, (player, stats))| RankingEntry {
            ranking: i as u32 + 1,
            player_id: player.id.clone(),
            name: player.name.clone(),
            stats,
        })
        .collect()
}

fn sorted_by_stats<'a>(players: &'a [Player], matches: &[Match]) -> Vec<(&'a Player, PlayerStats)> {
    let mut rows: Vec<(&Player, PlayerStats)> = players
        .iter()
        .map(|p| (p, lifetime_stats(p, matches)))
        .collect();
    rows.sort_by(|(_, a), (_, b)| compare_stats(a, b));
    rows
}

/// Player count, decided match count and average match-win%.
pub fn ranking_summary(players: &[Player], matches: &[Match]) -> RankingSummary {
    let total_players = players.len() as u32;
    let total_matches = matches.iter().filter(|m| !m.result.is_pending()).count() as u32;

    let average_win_pct = if players.is_empty() {
        0.0
    } else {
        let sum: f64 = players
            .iter()
            .map(|p| lifetime_stats(p, matches).match_win_pct)
            .sum();
        sum / players.len() as f64
    };

    RankingSummary {
        total_players,
        total_matches,
        average_win_pct,
    }
}

/// Match-win% from a stored lifetime record.
pub fn lifetime_win_pct(player: &Player) -> f64 {
    let played = u64::from(player.wins) + u64::from(player.losses) + u64::from(player.draws);
    calculate_percentage(player.wins.into(), played)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn player(id: &str) -> Player {
        Player {
            id: id.into(),
            ..Player::new(id.to_uppercase(), 0)
        }
    }

    fn scored(draft: &str, p1: &str, p2: &str, s1: u32, s2: u32) -> Match {
        let mut m = Match::new(draft.into(), 1, p1.into(), p2.into(), Utc::now());
        m.set_scores(s1, s2, Utc::now());
        m
    }

    #[test]
    fn test_rankings_span_tournaments() {
        let players = vec![player("a"), player("b"), player("c")];
        let matches = vec![
            scored("d1", "a", "b", 0, 2),
            scored("d2", "b", "c", 2, 1),
            scored("d2", "c", "a", 2, 0),
        ];

        let ranked = recompute_global_rankings(&players, &matches);
        let order: Vec<(&str, u32)> = ranked.iter().map(|p| (p.id.as_str(), p.ranking)).collect();
        assert_eq!(order, vec![("b", 1), ("c", 2), ("a", 3)]);
    }

    #[test]
    fn test_rankings_count_archived_results() {
        let mut veteran = player("a");
        veteran.archived.wins = 3;
        veteran.archived.games_won = 6;
        let players = vec![veteran, player("b"), player("c")];
        let matches = vec![scored("d2", "c", "b", 2, 0)];

        let ranked = recompute_global_rankings(&players, &matches);
        let order: Vec<&str> = ranked.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(order, vec!["a", "c", "b"]);

        let board = leaderboard(&players, &matches);
        assert_eq!(board[0].stats.points, 9);
        assert_eq!(board[0].stats.match_win_pct, 100.0);
    }

    #[test]
    fn test_rankings_dense_without_shared_ranks() {
        let players = vec![player("a"), player("b"), player("c"), player("d")];
        let ranked = recompute_global_rankings(&players, &[]);

        let ranks: Vec<u32> = ranked.iter().map(|p| p.ranking).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
        let ids: Vec<&str> = ranked.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_rankings_keep_player_fields() {
        let mut a = player("a");
        a.wins = 7;
        let ranked = recompute_global_rankings(&[a.clone()], &[]);
        assert_eq!(ranked[0].wins, 7);
        assert_eq!(ranked[0].name, a.name);
    }

    #[test]
    fn test_leaderboard_stats() {
        let players = vec![player("a"), player("b")];
        let matches = vec![scored("d1", "a", "b", 2, 1)];
        let board = leaderboard(&players, &matches);

        assert_eq!(board[0].player_id.as_str(), "a");
        assert_eq!(board[0].stats.points, 3);
        assert_eq!(board[1].stats.losses, 1);
    }

    #[test]
    fn test_ranking_summary() {
        let players = vec![player("a"), player("b")];
        let matches = vec![
            scored("d1", "a", "b", 2, 0),
            Match::new("d1".into(), 2, "a".into(), "b".into(), Utc::now()),
        ];
        let summary = ranking_summary(&players, &matches);

        assert_eq!(summary.total_players, 2);
        assert_eq!(summary.total_matches, 1);
        assert_eq!(summary.average_win_pct, 50.0);
    }

    #[test]
    fn test_ranking_summary_empty() {
        assert_eq!(ranking_summary(&[], &[]), RankingSummary::default());
    }

    #[test]
    fn test_lifetime_win_pct() {
        let mut a = player("a");
        a.wins = 3;
        a.losses = 1;
        assert_eq!(lifetime_win_pct(&a), 75.0);
        assert_eq!(lifetime_win_pct(&player("b")), 0.0);
    }
}
