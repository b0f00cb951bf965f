//! Event vocabulary and broadcast helpers for the lobby room.
//!
//! The outbound contract is small: `lobby-joined` (join ack), `lobby-update`
//! carrying a `type` discriminator for every room-wide state delta,
//! `countdown-update` for the lightweight per-second tick, `answer-submitted`
//! for the private scoring ack, and `error`. Every frame pushed to clients
//! goes through one of these helpers, so the vocabulary and which audience
//! sees which payload live in one place; the host-only helper is the only
//! room path that carries the answer key.

use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{
        lobby::{
            AnswerAck, AnsweredCount, CountdownStarted, CountdownTick, ErrorMessage, GameEnded,
            LobbyJoined, LobbySnapshot, PlayerLeft, QuestionEnded, QuestionStarted, RoundChanged,
            ScoreUpdated,
        },
        ws::ServerMessage,
    },
    state::Room,
};

const EVENT_LOBBY_JOINED: &str = "lobby-joined";
const EVENT_LOBBY_UPDATE: &str = "lobby-update";
const EVENT_COUNTDOWN_UPDATE: &str = "countdown-update";
const EVENT_ANSWER_SUBMITTED: &str = "answer-submitted";
const EVENT_ERROR: &str = "error";

const UPDATE_PLAYER_JOINED: &str = "player-joined";
const UPDATE_PLAYER_LEFT: &str = "player-left";
const UPDATE_SCORE_UPDATED: &str = "score-updated";
const UPDATE_ANSWERED_COUNT: &str = "answered-count-updated";
const UPDATE_COUNTDOWN_STARTED: &str = "countdown-started";
const UPDATE_QUESTION_STARTED: &str = "question-started";
const UPDATE_QUESTION_ENDED: &str = "question-ended";
const UPDATE_ROUND_CHANGED: &str = "round-changed";
const UPDATE_GAME_ENDED: &str = "game-ended";
const UPDATE_STREAM_CONTROL: &str = "stream-control";

fn envelope<T: Serialize>(event: &str, payload: &T) -> Option<ServerMessage> {
    match ServerMessage::json(event, payload) {
        Ok(message) => Some(message),
        Err(err) => {
            warn!(event, error = %err, "failed to serialize event payload");
            None
        }
    }
}

/// Wrap a payload in the `lobby-update` envelope with its `type` tag.
fn update_envelope<T: Serialize>(update_type: &str, payload: &T) -> Option<ServerMessage> {
    let mut data = match serde_json::to_value(payload) {
        Ok(serde_json::Value::Object(map)) => map,
        Ok(_) => {
            warn!(update_type, "lobby-update payload must serialize to an object");
            return None;
        }
        Err(err) => {
            warn!(update_type, error = %err, "failed to serialize lobby-update payload");
            return None;
        }
    };
    data.insert("type".into(), update_type.into());
    Some(ServerMessage {
        event: EVENT_LOBBY_UPDATE.into(),
        data: serde_json::Value::Object(data),
    })
}

fn broadcast_update<T: Serialize>(room: &Room, update_type: &str, payload: &T) {
    if let Some(message) = update_envelope(update_type, payload) {
        room.broadcast(&message);
    }
}

/// Acknowledge a successful join to the joining connection only.
pub fn send_lobby_joined(room: &Room, socket_id: &str, payload: &LobbyJoined) {
    if let Some(message) = envelope(EVENT_LOBBY_JOINED, payload) {
        room.send_to(socket_id, &message);
    }
}

/// Push a refreshed sanitized snapshot after a join or reconnect.
pub fn broadcast_player_joined(room: &Room, snapshot: &LobbySnapshot) {
    broadcast_update(room, UPDATE_PLAYER_JOINED, snapshot);
}

/// Announce a player's socket binding being cleared.
pub fn broadcast_player_left(room: &Room, payload: &PlayerLeft) {
    broadcast_update(room, UPDATE_PLAYER_LEFT, payload);
}

/// Announce the start of a pre-question countdown.
pub fn broadcast_countdown_started(room: &Room, payload: &CountdownStarted) {
    broadcast_update(room, UPDATE_COUNTDOWN_STARTED, payload);
}

/// Per-second countdown tick, outside the `lobby-update` envelope to keep
/// it cheap.
pub fn broadcast_countdown_update(room: &Room, remaining: u32) {
    if let Some(message) = envelope(EVENT_COUNTDOWN_UPDATE, &CountdownTick { remaining }) {
        room.broadcast(&message);
    }
}

/// Announce a question going live to the players. The payload must be the
/// sanitized variant; the host is skipped here and gets exactly one copy,
/// with the answer key, through [`send_host_question_started`].
pub fn broadcast_question_started(room: &Room, payload: &QuestionStarted) {
    if let Some(message) = update_envelope(UPDATE_QUESTION_STARTED, payload) {
        room.broadcast_to_players(&message);
    }
}

/// Hand the host its copy of the question start, answer key included.
pub fn send_host_question_started(room: &Room, payload: &QuestionStarted) {
    if let Some(message) = update_envelope(UPDATE_QUESTION_STARTED, payload) {
        room.send_to_host(&message);
    }
}

/// Reveal the answer and the updated leaderboard at question end.
pub fn broadcast_question_ended(room: &Room, payload: &QuestionEnded) {
    broadcast_update(room, UPDATE_QUESTION_ENDED, payload);
}

/// Announce a round switch.
pub fn broadcast_round_changed(room: &Room, payload: &RoundChanged) {
    broadcast_update(room, UPDATE_ROUND_CHANGED, payload);
}

/// Announce the end of the game with the final leaderboard.
pub fn broadcast_game_ended(room: &Room, payload: &GameEnded) {
    broadcast_update(room, UPDATE_GAME_ENDED, payload);
}

/// Push one player's new score to the room.
pub fn broadcast_score_updated(room: &Room, payload: &ScoreUpdated) {
    broadcast_update(room, UPDATE_SCORE_UPDATED, payload);
}

/// Push the how-many-answered counter to the room.
pub fn broadcast_answered_count(room: &Room, payload: &AnsweredCount) {
    broadcast_update(room, UPDATE_ANSWERED_COUNT, payload);
}

/// Relay a non-gameplay stream-control action verbatim.
pub fn broadcast_stream_control(room: &Room, payload: &serde_json::Value) {
    broadcast_update(room, UPDATE_STREAM_CONTROL, payload);
}

/// Private scoring acknowledgement for the submitting connection.
pub fn send_answer_submitted(room: &Room, socket_id: &str, payload: &AnswerAck) {
    if let Some(message) = envelope(EVENT_ANSWER_SUBMITTED, payload) {
        room.send_to(socket_id, &message);
    }
}

/// Report a request failure to the originating connection only.
pub fn send_error(room: &Room, socket_id: &str, message: impl Into<String>) {
    if let Some(frame) = envelope(
        EVENT_ERROR,
        &ErrorMessage {
            message: message.into(),
        },
    ) {
        room.send_to(socket_id, &frame);
    }
}

#[cfg(test)]
mod tests {
    use axum::extract::ws::Message;
    use tokio::sync::mpsc;

    use super::*;
    use crate::{dto::lobby::PublicQuestion, state::RoomConnection};

    fn received_json(rx: &mut mpsc::UnboundedReceiver<Message>) -> serde_json::Value {
        match rx.try_recv() {
            Ok(Message::Text(text)) => serde_json::from_str(&text).unwrap(),
            other => panic!("expected a text frame, got {other:?}"),
        }
    }

    #[test]
    fn question_start_gives_each_role_exactly_one_copy() {
        let room = Room::default();
        let (host_tx, mut host_rx) = mpsc::unbounded_channel();
        let (player_tx, mut player_rx) = mpsc::unbounded_channel();
        room.insert(RoomConnection {
            socket_id: "h".into(),
            user_id: "host".into(),
            is_host: true,
            tx: host_tx,
        });
        room.insert(RoomConnection {
            socket_id: "p".into(),
            user_id: "ada".into(),
            is_host: false,
            tx: player_tx,
        });

        let sanitized = QuestionStarted {
            question: PublicQuestion {
                id: "q1".into(),
                text: "Capital of France?".into(),
                choices: vec!["Paris".into(), "Berlin".into()],
                time_limit: 30,
                points: 100,
                round_id: "r1".into(),
                round_index: 1,
            },
            time_limit: 30,
            start_time: 0,
            correct_answer: None,
        };
        broadcast_question_started(&room, &sanitized);
        send_host_question_started(
            &room,
            &QuestionStarted {
                correct_answer: Some("Paris".into()),
                ..sanitized
            },
        );

        let frame = received_json(&mut player_rx);
        assert_eq!(frame["event"], "lobby-update");
        assert_eq!(frame["data"]["type"], "question-started");
        assert!(frame["data"]["correct_answer"].is_null());
        assert!(player_rx.try_recv().is_err());

        let frame = received_json(&mut host_rx);
        assert_eq!(frame["data"]["type"], "question-started");
        assert_eq!(frame["data"]["correct_answer"], "Paris");
        assert!(host_rx.try_recv().is_err());
    }

    #[test]
    fn lobby_update_payloads_carry_the_type_tag() {
        let message = update_envelope(
            UPDATE_ANSWERED_COUNT,
            &AnsweredCount {
                answered: 2,
                total_players: 5,
            },
        )
        .unwrap();
        assert_eq!(message.event, "lobby-update");
        assert_eq!(message.data["type"], "answered-count-updated");
        assert_eq!(message.data["answered"], 2);
        assert_eq!(message.data["total_players"], 5);
    }
}
