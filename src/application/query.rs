use crate::domain::app_error::AppError;
use crate::domain::error::LeagueError;
use crate::domain::model::{
    Achievement, Match, MatchEvent, MatchFilter, MatchParticipant, Player, PlayerFilter, Team,
    Tournament,
};
use crate::infrastructure::executor::ExecuteOptions;
use crate::infrastructure::storage::keys::{cache_key, keyed};
use crate::state::AppState;
use serde::de::DeserializeOwned;
use std::time::Duration;

// Operation names double as cache key prefixes for invalidation
pub const FETCH_TEAMS: &str = "fetchTeams";
pub const FETCH_TEAM: &str = "fetchTeam";
pub const FETCH_PLAYERS: &str = "fetchPlayers";
pub const FETCH_PLAYER: &str = "fetchPlayer";
pub const FETCH_TOURNAMENTS: &str = "fetchTournaments";
pub const FETCH_MATCHES: &str = "fetchMatches";
pub const FETCH_MATCH: &str = "fetchMatch";
pub const FETCH_MATCH_PARTICIPANTS: &str = "fetchMatchParticipants";
pub const FETCH_MATCH_EVENTS: &str = "fetchMatchEvents";
pub const FETCH_ACHIEVEMENTS: &str = "fetchPlayerAchievements";

#[derive(Clone, Copy)]
enum Ttl {
    List,
    Entity,
}

async fn ttl_for(state: &AppState, ttl: Ttl) -> Duration {
    let config = state.config.read().await;
    match ttl {
        Ttl::List => config.cache.list_ttl(),
        Ttl::Entity => config.cache.default_ttl(),
    }
}

/// GET `path` through the executor and decode it as `T`.
///
/// Failures are classified here, once, with `operation` as context.
async fn cached_get<T>(
    state: &AppState,
    operation: &str,
    key: String,
    path: String,
    ttl: Ttl,
    refresh: bool,
) -> Result<T, AppError>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    let options = ExecuteOptions::cached(ttl_for(state, ttl).await).with_force_refresh(refresh);
    let api = state.api.clone();

    state
        .executor
        .execute(
            move || async move {
                let value = api.get(&path).await?;
                Ok::<T, LeagueError>(serde_json::from_value(value)?)
            },
            &key,
            options,
        )
        .await
        .map_err(|e| state.classifier.handle(e, Some(operation)))
}

pub async fn fetch_teams(state: &AppState, refresh: bool) -> Result<Vec<Team>, AppError> {
    cached_get(
        state,
        FETCH_TEAMS,
        FETCH_TEAMS.to_string(),
        "/teams/public".to_string(),
        Ttl::List,
        refresh,
    )
    .await
}

pub async fn fetch_team(state: &AppState, id: u64, refresh: bool) -> Result<Team, AppError> {
    cached_get(
        state,
        FETCH_TEAM,
        keyed(FETCH_TEAM, id),
        format!("/teams/{}", id),
        Ttl::Entity,
        refresh,
    )
    .await
}

pub async fn fetch_players(
    state: &AppState,
    filter: &PlayerFilter,
    refresh: bool,
) -> Result<Vec<Player>, AppError> {
    let key = cache_key(FETCH_PLAYERS, filter)
        .map_err(|e| state.classifier.handle(e, Some(FETCH_PLAYERS)))?;
    let mut query = Vec::new();
    if let Some(team_id) = filter.team_id {
        query.push(format!("teamId={}", team_id));
    }

    cached_get(
        state,
        FETCH_PLAYERS,
        key,
        with_query("/players", &query),
        Ttl::List,
        refresh,
    )
    .await
}

pub async fn fetch_player(state: &AppState, id: u64, refresh: bool) -> Result<Player, AppError> {
    cached_get(
        state,
        FETCH_PLAYER,
        keyed(FETCH_PLAYER, id),
        format!("/players/{}", id),
        Ttl::Entity,
        refresh,
    )
    .await
}

pub async fn fetch_tournaments(
    state: &AppState,
    refresh: bool,
) -> Result<Vec<Tournament>, AppError> {
    cached_get(
        state,
        FETCH_TOURNAMENTS,
        FETCH_TOURNAMENTS.to_string(),
        "/tournaments".to_string(),
        Ttl::List,
        refresh,
    )
    .await
}

pub async fn fetch_matches(
    state: &AppState,
    filter: &MatchFilter,
    refresh: bool,
) -> Result<Vec<Match>, AppError> {
    let key = cache_key(FETCH_MATCHES, filter)
        .map_err(|e| state.classifier.handle(e, Some(FETCH_MATCHES)))?;
    let mut query = Vec::new();
    if let Some(tournament_id) = filter.tournament_id {
        query.push(format!("tournamentId={}", tournament_id));
    }
    if let Some(team_id) = filter.team_id {
        query.push(format!("teamId={}", team_id));
    }

    cached_get(
        state,
        FETCH_MATCHES,
        key,
        with_query("/matches", &query),
        Ttl::List,
        refresh,
    )
    .await
}

pub async fn fetch_match(state: &AppState, id: u64, refresh: bool) -> Result<Match, AppError> {
    cached_get(
        state,
        FETCH_MATCH,
        keyed(FETCH_MATCH, id),
        format!("/matches/{}", id),
        Ttl::Entity,
        refresh,
    )
    .await
}

pub async fn fetch_match_participants(
    state: &AppState,
    match_id: u64,
    refresh: bool,
) -> Result<Vec<MatchParticipant>, AppError> {
    cached_get(
        state,
        FETCH_MATCH_PARTICIPANTS,
        keyed(FETCH_MATCH_PARTICIPANTS, match_id),
        format!("/matches/{}/participants", match_id),
        Ttl::Entity,
        refresh,
    )
    .await
}

pub async fn fetch_match_events(
    state: &AppState,
    match_id: u64,
    refresh: bool,
) -> Result<Vec<MatchEvent>, AppError> {
    cached_get(
        state,
        FETCH_MATCH_EVENTS,
        keyed(FETCH_MATCH_EVENTS, match_id),
        format!("/matches/{}/events", match_id),
        Ttl::Entity,
        refresh,
    )
    .await
}

pub async fn fetch_player_achievements(
    state: &AppState,
    player_id: u64,
    refresh: bool,
) -> Result<Vec<Achievement>, AppError> {
    cached_get(
        state,
        FETCH_ACHIEVEMENTS,
        keyed(FETCH_ACHIEVEMENTS, player_id),
        format!("/players/{}/achievements", player_id),
        Ttl::Entity,
        refresh,
    )
    .await
}

fn with_query(path: &str, query: &[String]) -> String {
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, query.join("&"))
    }
}
