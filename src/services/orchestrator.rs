//! Host-driven game lifecycle: countdowns, questions, rounds, and game end.
//!
//! Every operation here acquires the per-lobby gate first and releases it
//! only after the durable record has been persisted and the room notified,
//! so concurrent host commands, timer callbacks, and answer submissions
//! observe a consistent record. Timers never mutate state directly; a firing
//! timer re-enters through the same gated operations the host uses.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::models::{
        GameSessionEntity, LobbyEntity, LobbyStatus, QuestionSnapshotEntity, now_millis,
    },
    dto::{
        lobby::{
            CountdownStarted, GameEnded, LobbyJoined, LobbySnapshot, PlayerLeft, QuestionEnded,
            QuestionStarted, RoundChanged,
        },
        ws::{
            ChangeRoundRequest, JoinRequest, StartCountdownRequest, StartQuestionRequest,
            StreamControlRequest,
        },
    },
    error::ServiceError,
    services::{events, leaderboard, lobby_manager, rounds},
    state::{
        SharedState,
        lobby::LobbySession,
        phase::{LobbyPhase, PhaseEvent, compute_transition},
        timer::remaining_from_wall_clock,
    },
};

fn phase_of(lobby: &LobbyEntity) -> LobbyPhase {
    LobbyPhase {
        status: lobby.status,
        game_state: lobby.game_state,
    }
}

fn apply_phase(lobby: &mut LobbyEntity, event: PhaseEvent) -> Result<(), ServiceError> {
    let next = compute_transition(phase_of(lobby), event)?;
    lobby.status = next.status;
    lobby.game_state = next.game_state;
    Ok(())
}

/// Id of the round `lobby.current_round` points at in the canonical order.
async fn current_round_id(
    state: &SharedState,
    lobby: &LobbyEntity,
) -> Result<String, ServiceError> {
    if lobby.current_round < 0 {
        return Err(ServiceError::InvalidState(
            "no round is selected for this lobby".into(),
        ));
    }
    let rounds = rounds::rounds_ordered(state).await?;
    rounds
        .get(lobby.current_round as usize)
        .map(|round| round.id.clone())
        .ok_or_else(|| {
            ServiceError::InvalidState(format!(
                "current round index {} is out of range ({} rounds)",
                lobby.current_round,
                rounds.len()
            ))
        })
}

/// Set a round's resume entry outright, replacing any prior entry. This is
/// the end-question rule: the entry always reflects the question that just
/// ran, even if an earlier question was replayed.
fn set_progress(lobby: &mut LobbyEntity, round_id: &str, next_question_index: u32, total: u32) {
    let completed = total > 0 && next_question_index >= total;
    match lobby
        .round_progress
        .iter_mut()
        .find(|entry| entry.round_id == round_id)
    {
        Some(entry) => {
            entry.next_question_index = next_question_index;
            entry.is_completed = completed;
        }
        None => lobby
            .round_progress
            .push(crate::dao::models::RoundProgressEntity {
                round_id: round_id.to_owned(),
                next_question_index,
                is_completed: completed,
            }),
    }
}

/// Advance a round's resume entry, never moving it backwards. This is the
/// round-switch rule for the round being left: the saved pointer only grows,
/// so switching away right after replaying an old question loses nothing.
fn record_progress(lobby: &mut LobbyEntity, round_id: &str, next_question_index: u32, total: u32) {
    let completed = total > 0 && next_question_index >= total;
    match lobby
        .round_progress
        .iter_mut()
        .find(|entry| entry.round_id == round_id)
    {
        Some(entry) => {
            if next_question_index > entry.next_question_index {
                entry.next_question_index = next_question_index;
            }
            entry.is_completed = entry.is_completed || completed;
        }
        None => lobby
            .round_progress
            .push(crate::dao::models::RoundProgressEntity {
                round_id: round_id.to_owned(),
                next_question_index,
                is_completed: completed,
            }),
    }
}

/// Switch the lobby to another round while the session gate is held.
///
/// Reselecting the already-active round leaves question bookkeeping
/// untouched, and a round whose progress entry is completed cannot be
/// entered again. Otherwise progress of the round being left is saved (only
/// when a question of it actually ran), then the target round becomes the
/// single active round and the lobby resumes at that round's recorded next
/// question.
async fn switch_round_locked(
    state: &SharedState,
    session: &Arc<LobbySession>,
    lobby: &mut LobbyEntity,
    round_id: &str,
    round_index: u32,
    round_name: &str,
) -> Result<RoundChanged, ServiceError> {
    if lobby.current_round >= 0 && lobby.current_round == round_index as i32 {
        return Ok(RoundChanged {
            round_id: round_id.to_owned(),
            round_index,
            round_name: round_name.to_owned(),
            next_question_index: lobby.current_question_index,
            total_questions: lobby.total_questions_in_round,
        });
    }

    if lobby
        .progress_for(round_id)
        .is_some_and(|entry| entry.is_completed)
    {
        return Err(ServiceError::InvalidState(format!(
            "round `{round_id}` has already been completed and cannot be replayed"
        )));
    }

    // A round where no question ever started leaves no progress entry, so
    // resuming it later still begins at its first question.
    if let Some(snapshot) = &lobby.current_question {
        let prev_round_id = snapshot.round_id.clone();
        record_progress(
            lobby,
            &prev_round_id,
            lobby.current_question_index + 1,
            lobby.total_questions_in_round,
        );
    }

    rounds::activate_round(state, round_id).await?;
    let total_rounds = rounds::rounds_ordered(state).await?.len() as u32;
    let total_questions = rounds::count_questions(state, Some(round_id)).await? as u32;
    let resume_at = lobby
        .progress_for(round_id)
        .map(|entry| entry.next_question_index)
        .unwrap_or(0);

    apply_phase(lobby, PhaseEvent::ChangeRound)?;
    lobby.current_round = round_index as i32;
    lobby.total_rounds = total_rounds;
    lobby.total_questions_in_round = total_questions;
    lobby.current_question_index = resume_at;
    lobby.current_question = None;
    lobby.start_time = None;
    lobby.countdown = 0;
    for player in &mut lobby.players {
        player.reset_answer_state();
    }
    state.timers().clear(&session.id);

    info!(
        lobby_id = %session.id,
        round_id,
        resume_at,
        total_questions,
        "switched round"
    );

    Ok(RoundChanged {
        round_id: round_id.to_owned(),
        round_index,
        round_name: round_name.to_owned(),
        next_question_index: resume_at,
        total_questions,
    })
}

/// Round the next question operation targets: the lobby's current round, or
/// the first round in the canonical order when none has been selected yet.
async fn resolve_or_default_round(
    state: &SharedState,
    session: &Arc<LobbySession>,
    lobby: &mut LobbyEntity,
) -> Result<(String, Option<RoundChanged>), ServiceError> {
    if lobby.current_round >= 0 {
        return Ok((current_round_id(state, lobby).await?, None));
    }
    let rounds = rounds::rounds_ordered(state).await?;
    let first = rounds
        .first()
        .cloned()
        .ok_or_else(|| ServiceError::NotFound("no rounds are defined".into()))?;
    let change = switch_round_locked(state, session, lobby, &first.id, 0, &first.name).await?;
    Ok((first.id, Some(change)))
}

/// Start the pre-question countdown towards a question of the current (or a
/// newly selected) round.
pub async fn start_countdown(
    state: &SharedState,
    request: StartCountdownRequest,
) -> Result<(), ServiceError> {
    let session = state.session(&request.lobby_id);
    let _guard = session.gate().await;

    let mut lobby = lobby_manager::load(state, &session).await?;

    let mut round_change = None;
    let round_id = match &request.round_id {
        Some(requested) => {
            let current = current_round_id(state, &lobby).await.ok();
            if current.as_deref() != Some(requested.as_str()) {
                let round = rounds::round_by_id(state, requested).await?;
                let index = round_position(state, requested).await?;
                round_change = Some(
                    switch_round_locked(state, &session, &mut lobby, requested, index, &round.name)
                        .await?,
                );
            }
            requested.clone()
        }
        None => {
            let (round_id, change) =
                resolve_or_default_round(state, &session, &mut lobby).await?;
            round_change = change;
            round_id
        }
    };

    // Reject before the countdown starts rather than when it expires. The
    // index is raw wire input, so the 1-based conversion must not overflow.
    let position = request.question_index.checked_add(1).ok_or_else(|| {
        ServiceError::InvalidInput(format!(
            "question index {} is out of range",
            request.question_index
        ))
    })?;
    rounds::question_at(state, &round_id, position).await?;

    apply_phase(&mut lobby, PhaseEvent::StartCountdown)?;
    let seconds = request
        .countdown_seconds
        .unwrap_or(state.config().default_countdown_secs);
    lobby.countdown = seconds;
    lobby.current_question_index = request.question_index;
    lobby.current_question = None;
    lobby.start_time = None;

    let lobby = lobby_manager::persist(state, &session, lobby).await?;

    if let Some(change) = &round_change {
        events::broadcast_round_changed(&session.room, change);
    }
    events::broadcast_countdown_started(
        &session.room,
        &CountdownStarted {
            seconds,
            question_index: request.question_index,
            round_index: lobby.current_round,
        },
    );
    info!(lobby_id = %session.id, seconds, question_index = request.question_index, "countdown started");

    let tick_session = Arc::clone(&session);
    let complete_state = Arc::clone(state);
    let complete_id = session.id.clone();
    let question_index = request.question_index;
    state.timers().start_countdown(
        &session.id,
        seconds,
        move |remaining| {
            let tick_session = Arc::clone(&tick_session);
            async move {
                events::broadcast_countdown_update(&tick_session.room, remaining);
            }
        },
        move || async move {
            // Re-enter through the gated operation on a fresh task so the
            // deadline can be armed without racing this callback.
            tokio::spawn(async move {
                if let Err(err) =
                    start_question_at(&complete_state, &complete_id, question_index, None).await
                {
                    warn!(lobby_id = %complete_id, error = %err, "countdown completion failed to start question");
                }
            });
        },
    );

    Ok(())
}

/// Host command: start a question immediately, skipping the countdown.
pub async fn start_question(
    state: &SharedState,
    request: StartQuestionRequest,
) -> Result<(), ServiceError> {
    start_question_at(
        state,
        &request.lobby_id,
        request.question_index,
        request.round_id,
    )
    .await
}

/// Put a question live: snapshot it onto the lobby record, reset everyone's
/// answer state, and arm the server-side deadline.
async fn start_question_at(
    state: &SharedState,
    lobby_id: &str,
    question_index: u32,
    round_override: Option<String>,
) -> Result<(), ServiceError> {
    let session = state.session(lobby_id);
    let _guard = session.gate().await;

    let mut lobby = lobby_manager::load(state, &session).await?;

    let mut round_change = None;
    let round_id = match round_override {
        Some(requested) => {
            let current = current_round_id(state, &lobby).await.ok();
            if current.as_deref() != Some(requested.as_str()) {
                let round = rounds::round_by_id(state, &requested).await?;
                let index = round_position(state, &requested).await?;
                round_change = Some(
                    switch_round_locked(state, &session, &mut lobby, &requested, index, &round.name)
                        .await?,
                );
            }
            requested
        }
        None => {
            let (round_id, change) =
                resolve_or_default_round(state, &session, &mut lobby).await?;
            round_change = change;
            round_id
        }
    };

    let questions = rounds::questions_in_round(state, &round_id).await?;
    let question = questions
        .get(question_index as usize)
        .cloned()
        .ok_or_else(|| {
            ServiceError::NotFound(format!(
                "round `{round_id}` has no question at index {question_index}"
            ))
        })?;
    let correct_answer = rounds::resolve_correct_answer(&question)?;

    apply_phase(&mut lobby, PhaseEvent::StartQuestion)?;
    lobby.countdown = 0;
    lobby.current_question_index = question_index;
    lobby.total_questions_in_round = questions.len() as u32;
    let start_time = now_millis();
    lobby.start_time = Some(start_time);
    lobby.current_question = Some(QuestionSnapshotEntity {
        question_id: question.id.clone(),
        text: question.text.clone(),
        choices: question.choices.clone(),
        correct_answer: correct_answer.clone(),
        time_limit: question.time_limit,
        points: question.points,
        round_id: round_id.clone(),
    });
    for player in &mut lobby.players {
        player.reset_answer_state();
    }

    let lobby = lobby_manager::persist(state, &session, lobby).await?;

    if let Some(change) = &round_change {
        events::broadcast_round_changed(&session.room, change);
    }
    let started = QuestionStarted {
        question: (&question).into(),
        time_limit: question.time_limit,
        start_time,
        correct_answer: None,
    };
    events::broadcast_question_started(&session.room, &started);
    events::send_host_question_started(
        &session.room,
        &QuestionStarted {
            correct_answer: Some(correct_answer),
            ..started
        },
    );
    info!(
        lobby_id = %session.id,
        question_id = %question.id,
        question_index,
        time_limit = question.time_limit,
        "question started"
    );

    arm_question_deadline(state, &session.id, question.time_limit);

    Ok(())
}

/// End the live question: reveal the answer, publish the leaderboard and
/// analytics, and advance the round's resume progress.
pub async fn end_question(state: &SharedState, lobby_id: &str) -> Result<(), ServiceError> {
    let session = state.session(lobby_id);
    let _guard = session.gate().await;

    let mut lobby = lobby_manager::load(state, &session).await?;
    apply_phase(&mut lobby, PhaseEvent::EndQuestion)?;
    state.timers().clear(&session.id);

    let snapshot = lobby.current_question.clone().ok_or_else(|| {
        ServiceError::InvalidState("lobby has no live question snapshot".into())
    })?;

    let next_index = lobby.current_question_index + 1;
    let total_questions_in_round = lobby.total_questions_in_round;
    let is_round_over = next_index >= total_questions_in_round;
    set_progress(
        &mut lobby,
        &snapshot.round_id,
        next_index,
        total_questions_in_round,
    );
    lobby.start_time = None;

    let lobby = lobby_manager::persist(state, &session, lobby).await?;

    let payload = QuestionEnded {
        correct_answer: snapshot.correct_answer.clone(),
        leaderboard: leaderboard::game_leaderboard(&lobby, Some(&snapshot.round_id)),
        is_round_over,
        analytics: leaderboard::question_analytics(&lobby, &snapshot.choices),
    };
    events::broadcast_question_ended(&session.room, &payload);
    info!(
        lobby_id = %session.id,
        question_id = %snapshot.question_id,
        answered = payload.analytics.answered_count,
        is_round_over,
        "question ended"
    );

    Ok(())
}

/// Deadline-timer entry point. The host ending the question first is not an
/// error here; the transition check already rejected the duplicate.
pub async fn end_question_from_timer(state: SharedState, lobby_id: String) {
    match end_question(&state, &lobby_id).await {
        Ok(()) => {}
        Err(ServiceError::InvalidState(reason)) => {
            debug!(lobby_id, reason, "deadline fired after the question already ended");
        }
        Err(err) => {
            warn!(lobby_id, error = %err, "deadline-driven end of question failed");
        }
    }
}

/// Host command: switch to another round.
pub async fn change_round(
    state: &SharedState,
    request: ChangeRoundRequest,
) -> Result<(), ServiceError> {
    let session = state.session(&request.lobby_id);
    let _guard = session.gate().await;

    let mut lobby = lobby_manager::load(state, &session).await?;
    let change = switch_round_locked(
        state,
        &session,
        &mut lobby,
        &request.round_id,
        request.round_index,
        &request.round_name,
    )
    .await?;
    lobby_manager::persist(state, &session, lobby).await?;

    events::broadcast_round_changed(&session.room, &change);
    Ok(())
}

/// Host command: end the game.
///
/// The final leaderboard is archived as an immutable session record before
/// any gameplay state is wiped, so a crash between the two writes loses
/// nothing. After the room hears `game-ended` every connection is dropped
/// and the lobby record returns to defaults with an empty players list; only
/// the host identity survives the reset.
pub async fn end_game(state: &SharedState, lobby_id: &str) -> Result<(), ServiceError> {
    let session = state.session(lobby_id);
    let _guard = session.gate().await;

    let mut lobby = lobby_manager::load(state, &session).await?;
    apply_phase(&mut lobby, PhaseEvent::EndGame)?;
    state.timers().clear(&session.id);

    let final_board = leaderboard::game_leaderboard(&lobby, None);
    let archive = GameSessionEntity {
        id: Uuid::new_v4().to_string(),
        lobby_id: lobby.id.clone(),
        game_name: lobby.name.clone(),
        host_id: lobby.host.as_ref().map(|h| h.user_id.clone()),
        host_name: lobby.host.as_ref().map(|h| h.name.clone()),
        ended_at: now_millis(),
        players: leaderboard::session_players(&lobby),
    };
    let session_id = archive.id.clone();

    let store = state.require_store().await?;
    store.save_session(archive).await?;

    events::broadcast_game_ended(
        &session.room,
        &GameEnded {
            leaderboard: final_board,
            session_id: session_id.clone(),
        },
    );
    session.room.kick_all("game ended");

    apply_phase(&mut lobby, PhaseEvent::Reset)?;
    lobby_manager::reset_gameplay(&mut lobby);
    lobby_manager::persist(state, &session, lobby).await?;

    info!(lobby_id = %session.id, session_id = %session_id, "game ended and archived");
    Ok(())
}

/// Host command: relay a non-gameplay stream-control action to the room.
/// `set-stream-url` additionally persists the URL so reconnecting clients
/// pick it up from the snapshot.
pub async fn stream_control(
    state: &SharedState,
    request: StreamControlRequest,
) -> Result<(), ServiceError> {
    let session = state.session(&request.lobby_id);
    let _guard = session.gate().await;

    if request.action == "set-stream-url" {
        let mut lobby = lobby_manager::load(state, &session).await?;
        lobby.stream_url = request.value.clone();
        lobby_manager::persist(state, &session, lobby).await?;
    }

    events::broadcast_stream_control(
        &session.room,
        &serde_json::json!({
            "action": request.action,
            "value": request.value,
        }),
    );
    Ok(())
}

/// Bind a host connection to the lobby, recovering an in-progress game.
///
/// The first host to join claims the seat permanently; a different user id
/// is rejected. The same host reconnecting displaces its previous socket.
pub async fn host_connect(
    state: &SharedState,
    session: &Arc<LobbySession>,
    socket_id: &str,
    join: &JoinRequest,
) -> Result<LobbyJoined, ServiceError> {
    let _guard = session.gate().await;

    let mut lobby = lobby_manager::load(state, session).await?;

    let is_new_host = match &lobby.host {
        Some(host) if host.user_id != join.user_id => {
            return Err(ServiceError::Unauthorized(
                "lobby already has a different host".into(),
            ));
        }
        Some(host) => {
            if let Some(old_socket) = &host.socket_id
                && old_socket != socket_id
            {
                session.room.kick(old_socket, "host session opened elsewhere");
            }
            false
        }
        None => true,
    };

    lobby.host = Some(crate::dao::models::HostEntity {
        user_id: join.user_id.clone(),
        name: join.name.clone(),
        email: join.email.clone(),
        socket_id: Some(socket_id.to_owned()),
        last_active: now_millis(),
    });

    let remaining_time = resume_live_question(state, &lobby);
    let game_in_progress =
        lobby.status != LobbyStatus::Waiting || lobby.current_round >= 0;

    let lobby = lobby_manager::persist(state, session, lobby).await?;

    info!(
        lobby_id = %session.id,
        user_id = %join.user_id,
        is_new_host,
        game_in_progress,
        "host connected"
    );
    events::broadcast_player_joined(&session.room, &LobbySnapshot::sanitized(&lobby));

    Ok(LobbyJoined {
        lobby: LobbySnapshot::for_host(&lobby),
        is_new_host,
        is_reconnect: !is_new_host,
        game_in_progress,
        remaining_time,
    })
}

/// Bind a player connection to the lobby, reclaiming an existing record on
/// reconnect or creating a fresh one under the player cap.
pub async fn player_connect(
    state: &SharedState,
    session: &Arc<LobbySession>,
    socket_id: &str,
    join: &JoinRequest,
) -> Result<LobbyJoined, ServiceError> {
    let _guard = session.gate().await;

    let mut lobby = lobby_manager::load(state, session).await?;

    let is_reconnect = match lobby.player_mut(&join.user_id) {
        Some(player) => {
            if let Some(old_socket) = &player.socket_id
                && old_socket != socket_id
            {
                session.room.kick(old_socket, "session opened elsewhere");
            }
            player.socket_id = Some(socket_id.to_owned());
            player.name = join.name.clone();
            player.email = join.email.clone();
            true
        }
        None => {
            if lobby.players.len() as u32 >= lobby.max_players {
                return Err(ServiceError::InvalidState("lobby is full".into()));
            }
            lobby.players.push(crate::dao::models::PlayerEntity::new(
                join.user_id.clone(),
                join.name.clone(),
                join.email.clone(),
                socket_id.to_owned(),
            ));
            false
        }
    };

    let remaining_time = resume_live_question(state, &lobby);
    let game_in_progress =
        lobby.status != LobbyStatus::Waiting || lobby.current_round >= 0;

    let lobby = lobby_manager::persist(state, session, lobby).await?;

    info!(
        lobby_id = %session.id,
        user_id = %join.user_id,
        is_reconnect,
        players = lobby.players.len(),
        "player connected"
    );
    events::broadcast_player_joined(&session.room, &LobbySnapshot::sanitized(&lobby));

    Ok(LobbyJoined {
        lobby: LobbySnapshot::sanitized(&lobby),
        is_new_host: false,
        is_reconnect,
        game_in_progress,
        remaining_time,
    })
}

/// Clear the socket binding a closed connection held. The identity and all
/// scores survive for reconnection.
pub async fn handle_disconnect(state: &SharedState, session: &Arc<LobbySession>, socket_id: &str) {
    let _guard = session.gate().await;

    let mut lobby = match lobby_manager::load(state, session).await {
        Ok(lobby) => lobby,
        Err(err) => {
            warn!(lobby_id = %session.id, error = %err, "disconnect bookkeeping skipped");
            return;
        }
    };

    let mut left_user = None;
    if let Some(host) = &mut lobby.host
        && host.socket_id.as_deref() == Some(socket_id)
    {
        host.socket_id = None;
        info!(lobby_id = %session.id, user_id = %host.user_id, "host disconnected");
    } else if let Some(player) = lobby
        .players
        .iter_mut()
        .find(|p| p.socket_id.as_deref() == Some(socket_id))
    {
        player.socket_id = None;
        left_user = Some(player.user_id.clone());
        info!(lobby_id = %session.id, user_id = %player.user_id, "player disconnected");
    } else {
        return;
    }

    match lobby_manager::persist(state, session, lobby).await {
        Ok(_) => {
            if let Some(user_id) = left_user {
                events::broadcast_player_left(&session.room, &PlayerLeft { user_id });
            }
        }
        Err(err) => {
            warn!(lobby_id = %session.id, error = %err, "failed to persist disconnect");
        }
    }
}

/// Position of a round within the canonical order.
async fn round_position(state: &SharedState, round_id: &str) -> Result<u32, ServiceError> {
    let rounds = rounds::rounds_ordered(state).await?;
    rounds
        .iter()
        .position(|round| round.id == round_id)
        .map(|index| index as u32)
        .ok_or_else(|| ServiceError::NotFound(format!("round `{round_id}` not found")))
}

/// Remaining seconds of a live question, rebuilding the deadline timer from
/// the durable record when this process has none (host crash recovery).
fn resume_live_question(state: &SharedState, lobby: &LobbyEntity) -> Option<u64> {
    if !phase_of(lobby).question_live() {
        return None;
    }
    let snapshot = lobby.current_question.as_ref()?;

    match state.timers().elapsed(&lobby.id) {
        Some(elapsed) => {
            // The armed limit, not the question's, is what is left to run: a
            // deadline rebuilt after a crash was armed with the remaining
            // seconds only.
            let armed = state
                .timers()
                .deadline_limit(&lobby.id)
                .unwrap_or(snapshot.time_limit);
            let remaining = (armed as f64 - elapsed).max(0.0);
            Some(remaining.ceil() as u64)
        }
        None => {
            let start = lobby.start_time?;
            let remaining = remaining_from_wall_clock(start, snapshot.time_limit, now_millis());
            info!(
                lobby_id = %lobby.id,
                remaining,
                "re-arming question deadline from the durable record"
            );
            arm_question_deadline(state, &lobby.id, remaining);
            Some(remaining)
        }
    }
}

fn arm_question_deadline(state: &SharedState, lobby_id: &str, seconds: u64) {
    let timer_state = Arc::clone(state);
    let timer_lobby = lobby_id.to_owned();
    state
        .timers()
        .start_question_deadline(lobby_id, seconds, move || async move {
            end_question_from_timer(timer_state, timer_lobby).await;
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lobby() -> LobbyEntity {
        LobbyEntity::with_defaults("main".into(), 50)
    }

    #[test]
    fn progress_is_monotonic() {
        let mut lobby = lobby();
        record_progress(&mut lobby, "round-a", 3, 5);
        record_progress(&mut lobby, "round-a", 1, 5);
        let entry = lobby.progress_for("round-a").unwrap();
        assert_eq!(entry.next_question_index, 3);
        assert!(!entry.is_completed);
    }

    #[test]
    fn completion_locks_in() {
        let mut lobby = lobby();
        record_progress(&mut lobby, "round-a", 5, 5);
        assert!(lobby.progress_for("round-a").unwrap().is_completed);

        // Replaying an earlier question never clears the flag.
        record_progress(&mut lobby, "round-a", 2, 5);
        let entry = lobby.progress_for("round-a").unwrap();
        assert!(entry.is_completed);
        assert_eq!(entry.next_question_index, 5);
    }

    #[test]
    fn empty_rounds_never_complete() {
        let mut lobby = lobby();
        record_progress(&mut lobby, "round-a", 0, 0);
        assert!(!lobby.progress_for("round-a").unwrap().is_completed);
    }

    #[test]
    fn ending_a_question_replaces_the_resume_entry() {
        let mut lobby = lobby();
        set_progress(&mut lobby, "round-a", 4, 5);
        let entry = lobby.progress_for("round-a").unwrap();
        assert_eq!(entry.next_question_index, 4);
        assert!(!entry.is_completed);

        set_progress(&mut lobby, "round-a", 5, 5);
        assert!(lobby.progress_for("round-a").unwrap().is_completed);

        // Replaying an earlier question rewrites the entry outright.
        set_progress(&mut lobby, "round-a", 2, 5);
        let entry = lobby.progress_for("round-a").unwrap();
        assert_eq!(entry.next_question_index, 2);
        assert!(!entry.is_completed);
    }
}
