//! WebSocket gateway: connection lifecycle, identification, and dispatch.
//!
//! Every connection must identify itself with a `join` frame before anything
//! else; the gateway trusts the identity it carries and enforces only
//! role-based authorization (host commands from the host connection only).
//! Request handling failures are reported to the offending connection and
//! never tear down the socket.

use std::{sync::Arc, time::Duration};

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::ws::{ClientMessage, JoinRequest, JoinRole},
    error::ServiceError,
    services::{events, orchestrator, scoring},
    state::{SharedState, lobby::LobbySession, lobby::RoomConnection},
};

const IDENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle the full lifecycle of one lobby WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps broadcasts flowing while we await inbound
    // frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let initial_message = match tokio::time::timeout(IDENT_TIMEOUT, receiver.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => text,
        Ok(Some(Ok(Message::Close(_)))) => {
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Ok(_))) => {
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Err(err))) => {
            warn!(error = %err, "websocket receive error");
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(None) | Err(_) => {
            warn!("websocket identification timed out");
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let join = match ClientMessage::from_json_str(&initial_message) {
        Ok(ClientMessage::Join(join)) => join,
        Ok(_) => {
            warn!("first websocket message was not a join");
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Err(err) => {
            warn!(error = %err, "failed to parse or validate join message");
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let session = state.session(&join.lobby_id);
    let socket_id = Uuid::new_v4().to_string();
    let is_host = join.role == JoinRole::Host;

    // Register before the connect operation so a displaced older socket can
    // be kicked and the join broadcast reaches this connection.
    session.room.insert(RoomConnection {
        socket_id: socket_id.clone(),
        user_id: join.user_id.clone(),
        is_host,
        tx: outbound_tx.clone(),
    });

    let joined = if is_host {
        orchestrator::host_connect(&state, &session, &socket_id, &join).await
    } else {
        orchestrator::player_connect(&state, &session, &socket_id, &join).await
    };

    match joined {
        Ok(payload) => {
            events::send_lobby_joined(&session.room, &socket_id, &payload);
            info!(
                lobby_id = %session.id,
                user_id = %join.user_id,
                socket_id = %socket_id,
                role = ?join.role,
                "websocket joined lobby"
            );
        }
        Err(err) => {
            warn!(lobby_id = %session.id, user_id = %join.user_id, error = %err, "join rejected");
            events::send_error(&session.room, &socket_id, err.to_string());
            session.room.remove(&socket_id);
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
    }

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                match ClientMessage::from_json_str(&text) {
                    Ok(ClientMessage::LeaveLobby) => {
                        info!(lobby_id = %session.id, user_id = %join.user_id, "client left lobby");
                        break;
                    }
                    Ok(parsed) => {
                        dispatch(&state, &session, &socket_id, &join, is_host, parsed).await;
                    }
                    Err(err) => {
                        warn!(socket_id = %socket_id, error = %err, "failed to parse client message");
                        events::send_error(&session.room, &socket_id, format!("invalid message: {err}"));
                    }
                }
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) | Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(socket_id = %socket_id, error = %err, "websocket error");
                break;
            }
        }
    }

    session.room.remove(&socket_id);
    orchestrator::handle_disconnect(&state, &session, &socket_id).await;
    finalize(writer_task, outbound_tx).await;
}

/// Route one identified client message to the matching service operation.
async fn dispatch(
    state: &SharedState,
    session: &Arc<LobbySession>,
    socket_id: &str,
    join: &JoinRequest,
    is_host: bool,
    message: ClientMessage,
) {
    let result = match message {
        ClientMessage::Join(_) => Err(ServiceError::InvalidState(
            "connection is already joined".into(),
        )),
        ClientMessage::HostStartCountdown(request) => {
            match host_only(is_host, session, &request.lobby_id) {
                Ok(()) => orchestrator::start_countdown(state, request).await,
                Err(err) => Err(err),
            }
        }
        ClientMessage::HostStartQuestion(request) => {
            match host_only(is_host, session, &request.lobby_id) {
                Ok(()) => orchestrator::start_question(state, request).await,
                Err(err) => Err(err),
            }
        }
        ClientMessage::HostEndQuestion { lobby_id } => {
            match host_only(is_host, session, &lobby_id) {
                Ok(()) => orchestrator::end_question(state, &lobby_id).await,
                Err(err) => Err(err),
            }
        }
        ClientMessage::HostEndGame { lobby_id } => match host_only(is_host, session, &lobby_id) {
            Ok(()) => orchestrator::end_game(state, &lobby_id).await,
            Err(err) => Err(err),
        },
        ClientMessage::HostChangeRound(request) => {
            match host_only(is_host, session, &request.lobby_id) {
                Ok(()) => orchestrator::change_round(state, request).await,
                Err(err) => Err(err),
            }
        }
        ClientMessage::HostStreamControl(request) => {
            match host_only(is_host, session, &request.lobby_id) {
                Ok(()) => orchestrator::stream_control(state, request).await,
                Err(err) => Err(err),
            }
        }
        ClientMessage::SubmitAnswer(request) => {
            if is_host {
                Err(ServiceError::Unauthorized(
                    "the host cannot submit answers".into(),
                ))
            } else {
                scoring::submit_answer(state, session, &join.user_id, request)
                    .await
                    .map(|outcome| {
                        events::send_answer_submitted(&session.room, socket_id, &outcome.ack);
                    })
            }
        }
        ClientMessage::LeaveLobby => Ok(()),
        ClientMessage::Unknown => {
            warn!(socket_id, "ignoring unknown client event");
            Ok(())
        }
    };

    if let Err(err) = result {
        warn!(
            lobby_id = %session.id,
            user_id = %join.user_id,
            error = %err,
            "client request failed"
        );
        events::send_error(&session.room, socket_id, err.to_string());
    }
}

/// Reject non-host callers and commands addressed to a different lobby.
fn host_only(
    is_host: bool,
    session: &Arc<LobbySession>,
    lobby_id: &str,
) -> Result<(), ServiceError> {
    if !is_host {
        return Err(ServiceError::Unauthorized(
            "host commands require the host connection".into(),
        ));
    }
    if lobby_id != session.id {
        return Err(ServiceError::InvalidInput(format!(
            "command addresses lobby `{lobby_id}` but this connection joined `{}`",
            session.id
        )));
    }
    Ok(())
}

/// Ensure the writer task winds down before we return from the handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
