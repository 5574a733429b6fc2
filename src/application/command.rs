use crate::application::query::{
    FETCH_MATCH, FETCH_MATCHES, FETCH_MATCH_EVENTS, FETCH_PLAYER, FETCH_PLAYERS, FETCH_TEAM,
    FETCH_TEAMS,
};
use crate::domain::app_error::AppError;
use crate::domain::error::LeagueError;
use crate::domain::model::{MatchEvent, MatchEventForm, Player, PlayerForm, Team, TeamForm};
use crate::domain::validation::{validate_match_event, validate_player, validate_team};
use crate::infrastructure::storage::keys::keyed;
use crate::state::AppState;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

pub const CREATE_TEAM: &str = "createTeam";
pub const UPDATE_TEAM: &str = "updateTeam";
pub const DELETE_TEAM: &str = "deleteTeam";
pub const CREATE_PLAYER: &str = "createPlayer";
pub const UPDATE_PLAYER: &str = "updatePlayer";
pub const DELETE_PLAYER: &str = "deletePlayer";
pub const RECORD_MATCH_EVENT: &str = "recordMatchEvent";

fn encode<B: Serialize>(body: &B) -> Result<Value, LeagueError> {
    Ok(serde_json::to_value(body)?)
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, LeagueError> {
    Ok(serde_json::from_value(value)?)
}

pub async fn create_team(state: &AppState, form: &TeamForm) -> Result<Team, AppError> {
    let classify = |e: LeagueError| state.classifier.handle(e, Some(CREATE_TEAM));

    validate_team(form).map_err(|e| classify(e.into()))?;
    let created: Team = async {
        let value = state.api.post("/teams", encode(form)?).await?;
        decode(value)
    }
    .await
    .map_err(classify)?;

    state.executor.clear_cache(&[FETCH_TEAMS]);
    info!(team_id = created.id, "team created");
    Ok(created)
}

pub async fn update_team(state: &AppState, id: u64, form: &TeamForm) -> Result<Team, AppError> {
    let classify = |e: LeagueError| state.classifier.handle(e, Some(UPDATE_TEAM));

    validate_team(form).map_err(|e| classify(e.into()))?;
    let updated: Team = async {
        let value = state.api.put(&format!("/teams/{}", id), encode(form)?).await?;
        decode(value)
    }
    .await
    .map_err(classify)?;

    state
        .executor
        .clear_cache(&[FETCH_TEAMS.to_string(), keyed(FETCH_TEAM, id)]);
    info!(team_id = id, "team updated");
    Ok(updated)
}

pub async fn delete_team(state: &AppState, id: u64) -> Result<(), AppError> {
    state
        .api
        .delete(&format!("/teams/{}", id))
        .await
        .map_err(|e| state.classifier.handle(e, Some(DELETE_TEAM)))?;

    // Player lists filtered by this team are stale too
    state.executor.clear_cache(&[
        FETCH_TEAMS.to_string(),
        keyed(FETCH_TEAM, id),
        FETCH_PLAYERS.to_string(),
    ]);
    info!(team_id = id, "team deleted");
    Ok(())
}

pub async fn create_player(state: &AppState, form: &PlayerForm) -> Result<Player, AppError> {
    let classify = |e: LeagueError| state.classifier.handle(e, Some(CREATE_PLAYER));

    validate_player(form).map_err(|e| classify(e.into()))?;
    let created: Player = async {
        let value = state.api.post("/players", encode(form)?).await?;
        decode(value)
    }
    .await
    .map_err(classify)?;

    let mut keys = vec![FETCH_PLAYERS.to_string()];
    if let Some(team_id) = created.team_id {
        keys.push(keyed(FETCH_TEAM, team_id));
    }
    state.executor.clear_cache(keys.as_slice());
    info!(player_id = created.id, "player created");
    Ok(created)
}

pub async fn update_player(
    state: &AppState,
    id: u64,
    form: &PlayerForm,
) -> Result<Player, AppError> {
    let classify = |e: LeagueError| state.classifier.handle(e, Some(UPDATE_PLAYER));

    validate_player(form).map_err(|e| classify(e.into()))?;
    let updated: Player = async {
        let value = state
            .api
            .patch(&format!("/players/{}", id), encode(form)?)
            .await?;
        decode(value)
    }
    .await
    .map_err(classify)?;

    // The previous team is unknown here and its player count changes too
    state.executor.clear_cache(&[
        FETCH_PLAYERS.to_string(),
        keyed(FETCH_PLAYER, id),
        FETCH_TEAM.to_string(),
    ]);
    info!(player_id = id, "player updated");
    Ok(updated)
}

pub async fn delete_player(state: &AppState, id: u64) -> Result<(), AppError> {
    state
        .api
        .delete(&format!("/players/{}", id))
        .await
        .map_err(|e| state.classifier.handle(e, Some(DELETE_PLAYER)))?;

    state.executor.clear_cache(&[
        FETCH_PLAYERS.to_string(),
        keyed(FETCH_PLAYER, id),
        FETCH_TEAM.to_string(),
    ]);
    info!(player_id = id, "player deleted");
    Ok(())
}

pub async fn record_match_event(
    state: &AppState,
    match_id: u64,
    form: &MatchEventForm,
) -> Result<MatchEvent, AppError> {
    let classify = |e: LeagueError| state.classifier.handle(e, Some(RECORD_MATCH_EVENT));

    validate_match_event(form).map_err(|e| classify(e.into()))?;
    let event: MatchEvent = async {
        let value = state
            .api
            .post(&format!("/matches/{}/events", match_id), encode(form)?)
            .await?;
        decode(value)
    }
    .await
    .map_err(classify)?;

    // Goals change the score shown on the match itself
    state.executor.clear_cache(&[
        keyed(FETCH_MATCH_EVENTS, match_id),
        keyed(FETCH_MATCH, match_id),
        FETCH_MATCHES.to_string(),
    ]);
    info!(match_id, event_id = event.id, "match event recorded");
    Ok(event)
}
