use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    dto::lobby::{LeaderboardEntry, LobbySnapshot, SessionView},
    error::AppError,
    services::leaderboard,
    state::SharedState,
};

/// Scope selector for the leaderboard endpoint.
#[derive(Debug, Deserialize, IntoParams)]
pub struct LeaderboardQuery {
    /// `game` (default) ranks on totals; `round` ranks on one round's
    /// sub-scores and requires `round_id`.
    #[serde(rename = "type", default)]
    pub scope: Option<String>,
    /// Round to rank or annotate by.
    #[serde(default)]
    pub round_id: Option<String>,
}

#[utoipa::path(
    get,
    path = "/lobbies/{id}",
    tag = "lobby",
    params(("id" = String, Path, description = "Lobby identifier")),
    responses(
        (status = 200, description = "Sanitized lobby snapshot", body = LobbySnapshot),
        (status = 404, description = "Lobby not found"),
    )
)]
/// Read-model view of a lobby with the answer key stripped.
pub async fn get_lobby(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<LobbySnapshot>, AppError> {
    let store = state.require_store().await.map_err(AppError::from)?;
    let lobby = store
        .find_lobby(id.clone())
        .await
        .map_err(|err| AppError::ServiceUnavailable(err.to_string()))?
        .ok_or_else(|| AppError::NotFound(format!("lobby `{id}` not found")))?;
    Ok(Json(LobbySnapshot::sanitized(&lobby)))
}

#[utoipa::path(
    get,
    path = "/lobbies/{id}/leaderboard",
    tag = "lobby",
    params(
        ("id" = String, Path, description = "Lobby identifier"),
        LeaderboardQuery,
    ),
    responses(
        (status = 200, description = "Ranked leaderboard", body = [LeaderboardEntry]),
        (status = 400, description = "Round scope without a round id"),
        (status = 404, description = "Lobby not found"),
    )
)]
/// Current leaderboard, game-wide or narrowed to one round.
pub async fn get_leaderboard(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, AppError> {
    let store = state.require_store().await.map_err(AppError::from)?;
    let lobby = store
        .find_lobby(id.clone())
        .await
        .map_err(|err| AppError::ServiceUnavailable(err.to_string()))?
        .ok_or_else(|| AppError::NotFound(format!("lobby `{id}` not found")))?;

    let board = match query.scope.as_deref() {
        Some("round") => {
            let round_id = query.round_id.as_deref().ok_or_else(|| {
                AppError::BadRequest("round leaderboards require a round_id".into())
            })?;
            leaderboard::round_leaderboard(&lobby, round_id)
        }
        None | Some("game") => leaderboard::game_leaderboard(&lobby, query.round_id.as_deref()),
        Some(other) => {
            return Err(AppError::BadRequest(format!(
                "unknown leaderboard type `{other}`"
            )));
        }
    };
    Ok(Json(board))
}

#[utoipa::path(
    get,
    path = "/sessions/{id}",
    tag = "lobby",
    params(("id" = String, Path, description = "Archived session identifier")),
    responses(
        (status = 200, description = "Archived game session", body = SessionView),
        (status = 404, description = "Session not found"),
    )
)]
/// Archived record of a completed game.
pub async fn get_session(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    let store = state.require_store().await.map_err(AppError::from)?;
    let session = store
        .find_session(id.clone())
        .await
        .map_err(|err| AppError::ServiceUnavailable(err.to_string()))?
        .ok_or_else(|| AppError::NotFound(format!("session `{id}` not found")))?;
    Ok(Json(session.into()))
}

/// Configure the lobby read-model subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/lobbies/{id}", get(get_lobby))
        .route("/lobbies/{id}/leaderboard", get(get_leaderboard))
        .route("/sessions/{id}", get(get_session))
}
