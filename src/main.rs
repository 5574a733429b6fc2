// Main entry point
use clap::Parser;
use colored::Colorize;
use league_admin::application::{command as store, query};
use league_admin::application::retry::{with_retry, RetryPolicy};
use league_admin::domain::app_error::AppError;
use league_admin::domain::error::LeagueError;
use league_admin::domain::model::{MatchFilter, PlayerFilter, PlayerForm, TeamForm};
use league_admin::infrastructure::config::{self, load_config};
use league_admin::infrastructure::logging::init_logging;
use league_admin::interfaces::cli::{Cli, Command};
use league_admin::presentation::{notify, render};
use league_admin::state::AppState;
use serde::Serialize;
use std::future::Future;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Setup graceful shutdown handler
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    // Spawn signal handler task
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("Failed to listen for shutdown signal: {}", e);
        } else {
            eprintln!("\nInterrupted, shutting down...");
            let _ = shutdown_tx.send(());
        }
    });

    let cli = Cli::parse();
    let mut config = load_config()?;
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }

    // Initialize logging
    if config.logging.enable {
        init_logging(&config.logging)?;
    }

    if cli.generate_config {
        config::generate_config_sample()?;
        return Ok(());
    }

    let enable_emoji = config.enable_emoji;
    let state = AppState::new(config)?;

    if cli.status {
        print_status(&state).await;
        return Ok(());
    }

    let Some(command) = cli.command.clone() else {
        eprintln!("{}", "Please provide a command (see --help)".red());
        std::process::exit(1);
    };

    let outcome = tokio::select! {
        result = run(&state, &cli, &command) => result,
        _ = shutdown_rx => {
            eprintln!("Request cancelled");
            return Ok(());
        }
    };

    match outcome {
        Ok(output) => print!("{}", output),
        Err(err) => {
            eprintln!("{}", notify::failure(&err, enable_emoji));
            std::process::exit(1);
        }
    }

    Ok(())
}

async fn run(state: &AppState, cli: &Cli, command: &Command) -> Result<String, AppError> {
    let refresh = cli.refresh;
    let emoji = state.config.read().await.enable_emoji;

    match command {
        Command::Teams => {
            let teams = fetch(state, cli, || query::fetch_teams(state, refresh)).await?;
            emit(state, cli.json, &teams, |t| render::teams(t))
        }
        Command::Team { id } => {
            let team = fetch(state, cli, || query::fetch_team(state, *id, refresh)).await?;
            emit(state, cli.json, &team, render::team)
        }
        Command::Players { team } => {
            let filter = PlayerFilter { team_id: *team };
            let players =
                fetch(state, cli, || query::fetch_players(state, &filter, refresh)).await?;
            emit(state, cli.json, &players, |p| render::players(p))
        }
        Command::Player { id } => {
            let player = fetch(state, cli, || query::fetch_player(state, *id, refresh)).await?;
            emit(state, cli.json, &player, render::player)
        }
        Command::Tournaments => {
            let items = fetch(state, cli, || query::fetch_tournaments(state, refresh)).await?;
            emit(state, cli.json, &items, |t| render::tournaments(t))
        }
        Command::Matches { tournament, team } => {
            let filter = MatchFilter {
                tournament_id: *tournament,
                team_id: *team,
            };
            let items =
                fetch(state, cli, || query::fetch_matches(state, &filter, refresh)).await?;
            emit(state, cli.json, &items, |m| render::matches(m))
        }
        Command::Participants { match_id } => {
            let items = fetch(state, cli, || {
                query::fetch_match_participants(state, *match_id, refresh)
            })
            .await?;
            emit(state, cli.json, &items, |p| render::participants(p))
        }
        Command::Events { match_id } => {
            let items = fetch(state, cli, || {
                query::fetch_match_events(state, *match_id, refresh)
            })
            .await?;
            emit(state, cli.json, &items, |e| render::events(e))
        }
        Command::Achievements { player_id } => {
            let items = fetch(state, cli, || {
                query::fetch_player_achievements(state, *player_id, refresh)
            })
            .await?;
            emit(state, cli.json, &items, |a| render::achievements(a))
        }
        Command::CreateTeam {
            name,
            short_name,
            city,
        } => {
            let form = TeamForm {
                name: name.clone(),
                short_name: short_name.clone(),
                city: city.clone(),
            };
            let team = store::create_team(state, &form).await?;
            let message = format!("Team #{} {} created", team.id, team.name);
            emit(state, cli.json, &team, |_| done(emoji, &message))
        }
        Command::DeleteTeam { id } => {
            store::delete_team(state, *id).await?;
            Ok(done(emoji, &format!("Team #{} deleted", id)))
        }
        Command::CreatePlayer {
            first_name,
            last_name,
            team,
            position,
            jersey,
        } => {
            let form = PlayerForm {
                first_name: first_name.clone(),
                last_name: last_name.clone(),
                team_id: *team,
                position: position.clone(),
                jersey_number: *jersey,
                birth_date: None,
            };
            let player = store::create_player(state, &form).await?;
            let message = format!("Player #{} {} created", player.id, player.full_name());
            emit(state, cli.json, &player, |_| done(emoji, &message))
        }
        Command::DeletePlayer { id } => {
            store::delete_player(state, *id).await?;
            Ok(done(emoji, &format!("Player #{} deleted", id)))
        }
    }
}

fn done(enable_emoji: bool, message: &str) -> String {
    format!("{}\n", notify::success(message, enable_emoji))
}

/// Run a store action, retrying transient failures when `--retry` is set.
async fn fetch<T, F, Fut>(state: &AppState, cli: &Cli, mut op: F) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    if !cli.retry {
        return op().await;
    }
    let policy = RetryPolicy::from(&state.config.read().await.retry);
    with_retry(policy, &state.classifier, op).await
}

fn emit<T: Serialize>(
    state: &AppState,
    json: bool,
    value: &T,
    render: impl Fn(&T) -> String,
) -> Result<String, AppError> {
    if !json {
        return Ok(render(value));
    }
    serde_json::to_string_pretty(value)
        .map(|s| s + "\n")
        .map_err(|e| state.classifier.handle(LeagueError::from(e), Some("render")))
}

async fn print_status(state: &AppState) {
    let config = state.config.read().await;

    println!("{}", "league Status".green().bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "{}",
        notify::success(
            &format!("API: {}", config.api.base_url),
            config.enable_emoji
        )
    );
    if config.api.token.is_some() {
        println!("API token: Configured");
    } else {
        println!("API token: Not configured");
    }
    println!("Request timeout: {} ms", config.api.timeout_ms);
    println!(
        "Cache TTL: {} ms (entities), {} ms (lists)",
        config.cache.default_ttl_ms, config.cache.list_ttl_ms
    );
    println!(
        "Retry: {} attempts, {} ms base delay",
        config.retry.max_attempts, config.retry.base_delay_ms
    );
    println!(
        "Memory Cache: {} entries, {} in flight",
        state.executor.cached_len(),
        state.executor.in_flight_len()
    );
    println!(
        "Config: {}",
        config::get_config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "Not found".to_string())
    );
}
