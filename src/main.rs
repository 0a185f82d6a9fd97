use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use draft_tracker::calculate::ranking::lifetime_win_pct;
use draft_tracker::config::AppConfig;
use draft_tracker::lifecycle::NewTournament;
use draft_tracker::models::{Match, Player, PlayerId, Tournament, TournamentId};
use draft_tracker::service::{Changeset, DraftService, MatchScore, TournamentFilter};
use draft_tracker::storage::{JsonlRepository, StorageConfig};

type Service = DraftService<JsonlRepository>;

#[derive(Parser)]
#[command(name = "draft-tracker")]
#[command(about = "Cube draft tracker with Swiss pairing, standings and lifetime rankings")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: PathBuf,

    /// Data directory path (overrides the config file)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the player pool
    Player {
        #[command(subcommand)]
        action: PlayerAction,
    },

    /// Run drafts
    Draft {
        #[command(subcommand)]
        action: DraftAction,
    },

    /// Show lifetime rankings
    Rankings {
        /// Only print the summary line
        #[arg(long)]
        summary: bool,
    },
}

#[derive(Subcommand)]
enum PlayerAction {
    /// Add a player
    Add { name: String },

    /// List players by ranking
    List,

    /// Rename a player (by ID or name)
    Rename { player: String, name: String },

    /// Remove a player (by ID or name)
    Remove { player: String },
}

#[derive(Subcommand)]
enum DraftAction {
    /// Create a pending draft
    Create {
        name: String,

        /// Player ID or name; repeat for each seat (4, 6 or 8)
        #[arg(long = "player", short = 'p', required = true)]
        players: Vec<String>,

        /// Rounds to play (3 or 4, default from config)
        #[arg(long)]
        rounds: Option<u32>,

        #[arg(long)]
        description: Option<String>,

        /// Cube used for the draft
        #[arg(long)]
        cube: Option<String>,
    },

    /// Start a pending draft and pair round 1
    Start { id: String },

    /// Record the games won by each player in a match
    Score {
        match_id: String,
        player1_score: u32,
        player2_score: u32,
    },

    /// Record a round's scores and close it
    Submit {
        id: String,

        round: u32,

        /// MATCH_ID=P1-P2, repeat for each match
        #[arg(long = "score", short = 's')]
        scores: Vec<String>,
    },

    /// Close a round whose matches are all decided
    CompleteRound { id: String, round: u32 },

    /// Show standings
    Standings { id: String },

    /// Show a draft with its rounds and matches
    Show { id: String },

    /// List drafts (all, active, completed)
    List {
        #[arg(long, default_value = "all")]
        filter: TournamentFilter,
    },

    /// Delete a completed draft
    Delete { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {:?}", cli.config))?;
    if let Some(dir) = cli.data_dir.clone() {
        config.data_dir = dir;
    }
    if let Some(level) = cli.log_level.clone() {
        config.log_level = level;
    }

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(cli.json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!cli.json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    tracing::debug!("Starting draft-tracker v{}", env!("CARGO_PKG_VERSION"));

    let repo = Arc::new(JsonlRepository::new(StorageConfig::new(
        config.data_dir.clone(),
    )));
    let service = DraftService::new(repo).with_seating_seed(config.tournament.seating_seed);
    let out = Output { json: cli.json };

    match cli.command {
        Commands::Player { action } => run_player(&service, &out, action).await,
        Commands::Draft { action } => run_draft(&service, &out, &config, action).await,
        Commands::Rankings { summary } => {
            let stats = service.ranking_summary().await?;
            if summary {
                return out.print(&stats, || {
                    println!(
                        "{} players, {} matches, average win {:.1}%",
                        stats.total_players, stats.total_matches, stats.average_win_pct
                    )
                });
            }

            let board = service.global_rankings().await?;
            out.print(&board, || {
                println!(
                    "{:>4}  {:<20} {:>3} {:>3} {:>3} {:>4} {:>7} {:>7}",
                    "#", "Player", "W", "L", "D", "Pts", "MW%", "GW%"
                );
                for row in &board {
                    println!(
                        "{:>4}  {:<20} {:>3} {:>3} {:>3} {:>4} {:>6.1}% {:>6.1}%",
                        row.ranking,
                        row.name,
                        row.stats.wins,
                        row.stats.losses,
                        row.stats.draws,
                        row.stats.points,
                        row.stats.match_win_pct,
                        row.stats.game_win_pct
                    );
                }
                println!(
                    "\n{} players, {} matches, average win {:.1}%",
                    stats.total_players, stats.total_matches, stats.average_win_pct
                );
            })
        }
    }
}

async fn run_player(service: &Service, out: &Output, action: PlayerAction) -> Result<()> {
    match action {
        PlayerAction::Add { name } => {
            let player = service.create_player(&name).await?;
            out.print(&player, || {
                println!("Added {} ({}), ranked #{}", player.name, player.id, player.ranking)
            })
        }
        PlayerAction::List => {
            let players = service.list_players().await?;
            out.print(&players, || {
                for p in &players {
                    println!(
                        "{:>4}  {:<20} {}W {}L {}D {:>4} pts {:>6.1}%  {}",
                        p.ranking,
                        p.name,
                        p.wins,
                        p.losses,
                        p.draws,
                        p.points(),
                        lifetime_win_pct(p),
                        p.id
                    );
                }
            })
        }
        PlayerAction::Rename { player, name } => {
            let id = resolve_player(service, &player).await?;
            let renamed = service.rename_player(&id, &name).await?;
            out.print(&renamed, || println!("Renamed {} to {}", renamed.id, renamed.name))
        }
        PlayerAction::Remove { player } => {
            let id = resolve_player(service, &player).await?;
            let changes = service.delete_player(&id).await?;
            out.print(&changes, || println!("Removed player {}", id))
        }
    }
}

async fn run_draft(
    service: &Service,
    out: &Output,
    config: &AppConfig,
    action: DraftAction,
) -> Result<()> {
    match action {
        DraftAction::Create {
            name,
            players,
            rounds,
            description,
            cube,
        } => {
            let mut roster = Vec::with_capacity(players.len());
            for p in &players {
                roster.push(resolve_player(service, p).await?);
            }

            let tournament = service
                .create_tournament(NewTournament {
                    name,
                    description,
                    cube_name: cube,
                    players: roster,
                    total_rounds: rounds.unwrap_or(config.tournament.default_total_rounds),
                })
                .await?;
            out.print(&tournament, || {
                println!(
                    "Created draft {} ({}), {} players, {} rounds",
                    tournament.name,
                    tournament.id,
                    tournament.players.len(),
                    tournament.total_rounds
                )
            })
        }
        DraftAction::Start { id } => {
            let changes = service.start_tournament(&id.into()).await?;
            let names = player_names(service).await?;
            out.print(&changes, || print_changeset(&changes, &names))
        }
        DraftAction::Score {
            match_id,
            player1_score,
            player2_score,
        } => {
            let changes = service
                .record_match_result(&match_id.into(), player1_score, player2_score)
                .await?;
            let names = player_names(service).await?;
            out.print(&changes, || print_changeset(&changes, &names))
        }
        DraftAction::Submit { id, round, scores } => {
            let scores = scores
                .iter()
                .map(|s| parse_score(s))
                .collect::<Result<Vec<_>>>()?;
            let changes = service.submit_round(&id.into(), round, &scores).await?;
            let names = player_names(service).await?;
            out.print(&changes, || print_changeset(&changes, &names))
        }
        DraftAction::CompleteRound { id, round } => {
            let changes = service.complete_round(&id.into(), round).await?;
            let names = player_names(service).await?;
            out.print(&changes, || print_changeset(&changes, &names))
        }
        DraftAction::Standings { id } => {
            let standings = service.standings(&id.into()).await?;
            let names = player_names(service).await?;
            out.print(&standings, || {
                println!(
                    "{:>3}  {:<20} {:>3} {:>3} {:>3} {:>4} {:>7} {:>7}",
                    "#", "Player", "W", "L", "D", "Pts", "MW%", "GW%"
                );
                for row in &standings {
                    println!(
                        "{:>3}  {:<20} {:>3} {:>3} {:>3} {:>4} {:>6.1}% {:>6.1}%",
                        row.position,
                        name_of(&names, &row.player_id),
                        row.stats.wins,
                        row.stats.losses,
                        row.stats.draws,
                        row.stats.points,
                        row.stats.match_win_pct,
                        row.stats.game_win_pct
                    );
                }
            })
        }
        DraftAction::Show { id } => {
            let id: TournamentId = id.into();
            let tournament = service.get_tournament(&id).await?;
            let matches = service.tournament_matches(&id).await?;
            let names = player_names(service).await?;

            #[derive(Serialize)]
            struct Detail<'a> {
                tournament: &'a Tournament,
                matches: &'a [Match],
            }

            out.print(
                &Detail {
                    tournament: &tournament,
                    matches: &matches,
                },
                || {
                    print_tournament(&tournament);
                    for round in &tournament.rounds {
                        let state = if round.completed { "completed" } else { "open" };
                        println!("\nRound {} ({})", round.number, state);
                        for m in matches.iter().filter(|m| m.round == round.number) {
                            print_match(m, &names);
                        }
                    }
                },
            )
        }
        DraftAction::List { filter } => {
            let tournaments = service.list_tournaments(filter).await?;
            out.print(&tournaments, || {
                if tournaments.is_empty() {
                    println!("No drafts");
                }
                for t in &tournaments {
                    print_tournament(t);
                }
            })
        }
        DraftAction::Delete { id } => {
            let changes = service.delete_tournament(&id.into()).await?;
            out.print(&changes, || {
                println!(
                    "Deleted draft {} and {} matches",
                    changes
                        .deleted_tournament
                        .as_ref()
                        .map(|id| id.as_str())
                        .unwrap_or("?"),
                    changes.deleted_matches
                )
            })
        }
    }
}

struct Output {
    json: bool,
}

impl Output {
    fn print<T: Serialize>(&self, value: &T, text: impl FnOnce()) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            text();
        }
        Ok(())
    }
}

/// Accept a player ID or a name, ignoring case.
async fn resolve_player(service: &Service, key: &str) -> Result<PlayerId> {
    let players = service.list_players().await?;
    if let Some(p) = players.iter().find(|p| p.id.as_str() == key) {
        return Ok(p.id.clone());
    }
    let mut named = players.iter().filter(|p| p.has_name(key));
    match (named.next(), named.next()) {
        (Some(p), None) => Ok(p.id.clone()),
        (Some(_), Some(_)) => bail!("more than one player named {:?}", key),
        (None, _) => bail!("no player with ID or name {:?}", key),
    }
}

async fn player_names(service: &Service) -> Result<Vec<Player>> {
    Ok(service.list_players().await?)
}

fn name_of<'a>(players: &'a [Player], id: &'a PlayerId) -> &'a str {
    players
        .iter()
        .find(|p| &p.id == id)
        .map(|p| p.name.as_str())
        .unwrap_or(id.as_str())
}

/// Parse `MATCH_ID=P1-P2`.
fn parse_score(s: &str) -> Result<MatchScore> {
    let (id, score) = s
        .split_once('=')
        .with_context(|| format!("expected MATCH_ID=P1-P2, got {:?}", s))?;
    let (p1, p2) = score
        .split_once('-')
        .with_context(|| format!("expected P1-P2 after '=', got {:?}", score))?;

    Ok(MatchScore::new(
        id.trim().into(),
        p1.trim().parse().context("player 1 score")?,
        p2.trim().parse().context("player 2 score")?,
    ))
}

fn print_tournament(t: &Tournament) {
    println!(
        "{}  {} [{}] round {}/{}, {} players{}",
        t.id,
        t.name,
        t.status,
        t.current_round,
        t.total_rounds,
        t.players.len(),
        t.cube_name
            .as_ref()
            .map(|c| format!(", cube {}", c))
            .unwrap_or_default()
    );
}

fn print_match(m: &Match, names: &[Player]) {
    println!(
        "  {}  {} {}-{} {}  ({})",
        m.id,
        name_of(names, &m.player1),
        m.player1_score,
        m.player2_score,
        name_of(names, &m.player2),
        m.result
    );
}

fn print_changeset(changes: &Changeset, names: &[Player]) {
    if let Some(t) = &changes.tournament {
        print_tournament(t);
    }
    for m in &changes.matches {
        print_match(m, names);
    }
}
