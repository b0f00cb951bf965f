//! Wire types exchanged over the lobby WebSocket channel.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::dto::validation::{validate_display_name, validate_identifier};

/// Role a connection joins a lobby as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JoinRole {
    /// The single privileged connection driving state transitions.
    Host,
    /// A regular participant.
    Player,
}

/// First message every connection must send: the verified identity and the
/// lobby it wants to join. The gateway trusts the identity fields; credential
/// verification happens upstream.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, Validate)]
pub struct JoinRequest {
    /// Stable lobby identifier to join.
    #[validate(custom(function = "validate_identifier"))]
    pub lobby_id: String,
    /// Trusted user identifier.
    #[validate(custom(function = "validate_identifier"))]
    pub user_id: String,
    /// Display name shown to other participants.
    #[validate(custom(function = "validate_display_name"))]
    pub name: String,
    /// Optional contact address.
    #[serde(default)]
    pub email: Option<String>,
    /// Whether this connection drives the game.
    pub role: JoinRole,
}

/// Host command starting the pre-question countdown.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct StartCountdownRequest {
    /// Lobby to act on.
    pub lobby_id: String,
    /// Countdown length; the configured default applies when omitted.
    #[serde(default)]
    pub countdown_seconds: Option<u32>,
    /// Question index (0-based) the countdown leads into.
    pub question_index: u32,
    /// Round to activate first; the current round is kept when omitted.
    #[serde(default)]
    pub round_id: Option<String>,
}

/// Host command starting a question immediately.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct StartQuestionRequest {
    /// Lobby to act on.
    pub lobby_id: String,
    /// Question index (0-based) within the current round.
    pub question_index: u32,
    /// Round to activate first; the current round is kept when omitted.
    #[serde(default)]
    pub round_id: Option<String>,
}

/// Host command switching the lobby to a different round.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ChangeRoundRequest {
    /// Lobby to act on.
    pub lobby_id: String,
    /// Round to switch to.
    pub round_id: String,
    /// Index of that round in the canonical order, for display bookkeeping.
    pub round_index: u32,
    /// Display name of the round.
    pub round_name: String,
}

/// Non-gameplay broadcast passthrough (stream URL, mute, and the like).
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct StreamControlRequest {
    /// Lobby to act on.
    pub lobby_id: String,
    /// Free-form action discriminator understood by clients.
    pub action: String,
    /// Optional action argument.
    #[serde(default)]
    pub value: Option<String>,
}

/// A player's answer to the live question.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct SubmitAnswerRequest {
    /// Question the answer is for, used to detect late submissions.
    pub question_id: String,
    /// Literal text of the chosen answer.
    pub answer: String,
}

/// Messages accepted from lobby WebSocket clients.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(tag = "event", content = "data")]
pub enum ClientMessage {
    /// Identification; must be the first message on every connection.
    #[serde(rename = "join")]
    Join(JoinRequest),
    /// Begin the countdown transition.
    #[serde(rename = "host-start-countdown")]
    HostStartCountdown(StartCountdownRequest),
    /// Begin a question immediately.
    #[serde(rename = "host-start-question")]
    HostStartQuestion(StartQuestionRequest),
    /// Force the end-question transition.
    #[serde(rename = "host-end-question")]
    HostEndQuestion {
        /// Lobby to act on.
        lobby_id: String,
    },
    /// Force the end-game transition.
    #[serde(rename = "host-end-game")]
    HostEndGame {
        /// Lobby to act on.
        lobby_id: String,
    },
    /// Switch rounds.
    #[serde(rename = "host-change-round")]
    HostChangeRound(ChangeRoundRequest),
    /// Non-gameplay broadcast passthrough.
    #[serde(rename = "host-stream-control")]
    HostStreamControl(StreamControlRequest),
    /// Scoring attempt for the calling player.
    #[serde(rename = "submit-answer")]
    SubmitAnswer(SubmitAnswerRequest),
    /// Clear the caller's socket binding.
    #[serde(rename = "leave-lobby")]
    LeaveLobby,
    /// Anything unrecognized; ignored with a warning.
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Parse a frame and run DTO validation where it applies.
    pub fn from_json_str(text: &str) -> Result<Self, String> {
        let message: Self = serde_json::from_str(text).map_err(|err| err.to_string())?;
        if let ClientMessage::Join(request) = &message {
            request.validate().map_err(|err| err.to_string())?;
        }
        Ok(message)
    }
}

/// Envelope pushed to clients: an event name plus a JSON payload.
#[derive(Debug, Clone, Serialize)]
pub struct ServerMessage {
    /// Event discriminator.
    pub event: String,
    /// Serialized payload.
    pub data: serde_json::Value,
}

impl ServerMessage {
    /// Convenience wrapper that serialises `payload` into the data field.
    pub fn json<T: Serialize>(event: impl Into<String>, payload: &T) -> serde_json::Result<Self> {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_value(payload)?,
        })
    }

    /// Final wire text of the envelope.
    pub fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{\"event\":\"error\"}".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_client_messages() {
        let msg = ClientMessage::from_json_str(
            r#"{"event":"submit-answer","data":{"question_id":"q1","answer":"Paris"}}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::SubmitAnswer(req) => {
                assert_eq!(req.question_id, "q1");
                assert_eq!(req.answer, "Paris");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn join_requests_are_validated() {
        let err = ClientMessage::from_json_str(
            r#"{"event":"join","data":{"lobby_id":"has space","user_id":"u1","name":"Ada","role":"player"}}"#,
        )
        .unwrap_err();
        assert!(err.contains("identifier"));
    }

    #[test]
    fn unknown_events_fall_through() {
        let msg =
            ClientMessage::from_json_str(r#"{"event":"something-new","data":{}}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Unknown));
    }

    #[test]
    fn server_message_envelope_is_stable() {
        let message = ServerMessage::json("countdown-update", &serde_json::json!({"remaining": 3}))
            .unwrap();
        assert_eq!(
            message.to_text(),
            r#"{"event":"countdown-update","data":{"remaining":3}}"#
        );
    }
}
