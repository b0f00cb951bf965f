//! Lobby record lifecycle: lazy creation, the session cache, and resets.
//!
//! All reads and writes of the durable lobby record funnel through this
//! module so the per-session cache can never drift from the store: a write
//! persists first and only then replaces the cache.

use std::sync::Arc;

use tracing::info;

use crate::{
    dao::models::{GameState, LobbyEntity, LobbyStatus},
    error::ServiceError,
    state::{SharedState, lobby::LobbySession},
};

/// Load the lobby record, hitting the store only on a cold cache. A lobby
/// that has never been persisted is created with defaults, so referencing a
/// fresh lobby id is enough to bring it into existence.
///
/// Callers mutating the result must hold the session gate.
pub async fn load(
    state: &SharedState,
    session: &Arc<LobbySession>,
) -> Result<LobbyEntity, ServiceError> {
    if let Some(lobby) = session.cached().await {
        return Ok(lobby);
    }

    let store = state.require_store().await?;
    match store.find_lobby(session.id.clone()).await? {
        Some(lobby) => {
            session.set_cached(lobby.clone()).await;
            Ok(lobby)
        }
        None => {
            let lobby = LobbyEntity::with_defaults(
                session.id.clone(),
                state.config().default_max_players,
            );
            store.save_lobby(lobby.clone()).await?;
            session.set_cached(lobby.clone()).await;
            info!(lobby_id = %session.id, "created lobby with defaults");
            Ok(lobby)
        }
    }
}

/// Persist the lobby record, then refresh the session cache.
pub async fn persist(
    state: &SharedState,
    session: &Arc<LobbySession>,
    lobby: LobbyEntity,
) -> Result<LobbyEntity, ServiceError> {
    let store = state.require_store().await?;
    store.save_lobby(lobby.clone()).await?;
    session.set_cached(lobby.clone()).await;
    Ok(lobby)
}

/// Return a lobby record to its post-game defaults.
///
/// The players list is emptied entirely; participants of the next game join
/// fresh. The host identity stays on the record so the same host can run
/// another game without re-claiming the seat, but its socket binding is
/// cleared since every connection is dropped at game end.
pub fn reset_gameplay(lobby: &mut LobbyEntity) {
    lobby.status = LobbyStatus::Waiting;
    lobby.game_state = GameState::Lobby;
    lobby.countdown = 0;
    lobby.current_question_index = 0;
    lobby.current_round = -1;
    lobby.total_questions_in_round = 0;
    lobby.start_time = None;
    lobby.current_question = None;
    lobby.round_progress.clear();
    lobby.players.clear();
    if let Some(host) = &mut lobby.host {
        host.socket_id = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::PlayerEntity;

    #[test]
    fn reset_empties_players_and_keeps_host_identity() {
        let mut lobby = LobbyEntity::with_defaults("main".into(), 50);
        let mut player = PlayerEntity::new("u1".into(), "Ada".into(), None, "s1".into());
        player.add_points("round-a", 120);
        lobby.players.push(player);
        lobby.host = Some(crate::dao::models::HostEntity {
            user_id: "h1".into(),
            name: "Grace".into(),
            email: None,
            socket_id: Some("s0".into()),
            last_active: 0,
        });
        lobby.status = LobbyStatus::Completed;
        lobby.current_round = 2;
        lobby.round_progress.push(crate::dao::models::RoundProgressEntity {
            round_id: "round-a".into(),
            next_question_index: 3,
            is_completed: false,
        });

        reset_gameplay(&mut lobby);

        assert_eq!(lobby.status, LobbyStatus::Waiting);
        assert_eq!(lobby.current_round, -1);
        assert!(lobby.round_progress.is_empty());
        assert!(lobby.players.is_empty());
        let host = lobby.host.as_ref().unwrap();
        assert_eq!(host.user_id, "h1");
        assert!(host.socket_id.is_none());
    }
}
