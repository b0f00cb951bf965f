//! Read-model projections of lobby state: snapshots, leaderboards, and the
//! payloads carried by room broadcasts.

use indexmap::IndexMap;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dao::models::{
        EpochMillis, GameSessionEntity, GameState, HostEntity, LobbyEntity, LobbyStatus,
        PlayerEntity, QuestionEntity, QuestionSnapshotEntity, RoundEntity, RoundProgressEntity,
        SessionPlayerEntity,
    },
    dto::format_epoch_millis,
};

/// Player-facing projection of a question. This is the single sanitization
/// path: every player-visible surface goes through here, so the answer key
/// can never leak through an ad-hoc field exclusion.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublicQuestion {
    /// Question identifier.
    pub id: String,
    /// Question text.
    pub text: String,
    /// Ordered answer choices.
    pub choices: Vec<String>,
    /// Seconds allowed to answer.
    pub time_limit: u64,
    /// Base points for an instant correct answer.
    pub points: u32,
    /// Owning round.
    pub round_id: String,
    /// Position within the round (1-based).
    pub round_index: u32,
}

impl From<&QuestionEntity> for PublicQuestion {
    fn from(question: &QuestionEntity) -> Self {
        Self {
            id: question.id.clone(),
            text: question.text.clone(),
            choices: question.choices.clone(),
            time_limit: question.time_limit,
            points: question.points,
            round_id: question.round_id.clone(),
            round_index: question.round_index,
        }
    }
}

/// Sanitized projection of the denormalized question snapshot on a lobby.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuestionSnapshotView {
    /// Question identifier.
    pub question_id: String,
    /// Question text.
    pub text: String,
    /// Ordered answer choices.
    pub choices: Vec<String>,
    /// Seconds allowed to answer.
    pub time_limit: u64,
    /// Base points for an instant correct answer.
    pub points: u32,
    /// Resolved answer literal; present only on host-facing snapshots.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
}

impl QuestionSnapshotView {
    fn sanitized(snapshot: &QuestionSnapshotEntity) -> Self {
        Self {
            question_id: snapshot.question_id.clone(),
            text: snapshot.text.clone(),
            choices: snapshot.choices.clone(),
            time_limit: snapshot.time_limit,
            points: snapshot.points,
            correct_answer: None,
        }
    }

    fn for_host(snapshot: &QuestionSnapshotEntity) -> Self {
        Self {
            correct_answer: Some(snapshot.correct_answer.clone()),
            ..Self::sanitized(snapshot)
        }
    }
}

/// Public projection of a player record.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerSummary {
    /// Trusted user identifier.
    pub user_id: String,
    /// Display name.
    pub name: String,
    /// Total score in the current game.
    pub score: u32,
    /// Whether the player answered the live question.
    pub has_answered_current_question: bool,
    /// Whether a connection is currently bound.
    pub connected: bool,
}

impl From<&PlayerEntity> for PlayerSummary {
    fn from(player: &PlayerEntity) -> Self {
        Self {
            user_id: player.user_id.clone(),
            name: player.name.clone(),
            score: player.score,
            has_answered_current_question: player.has_answered_current_question,
            connected: player.socket_id.is_some(),
        }
    }
}

/// Public projection of the host identity.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HostSummary {
    /// Trusted user identifier.
    pub user_id: String,
    /// Display name.
    pub name: String,
    /// Whether a connection is currently bound.
    pub connected: bool,
}

impl From<&HostEntity> for HostSummary {
    fn from(host: &HostEntity) -> Self {
        Self {
            user_id: host.user_id.clone(),
            name: host.name.clone(),
            connected: host.socket_id.is_some(),
        }
    }
}

/// Full lobby snapshot pushed on join and served by the read-model routes.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LobbySnapshot {
    /// Stable lobby identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Maximum concurrent players.
    pub max_players: u32,
    /// Coarse lifecycle status.
    pub status: LobbyStatus,
    /// Fine-grained presentation state.
    pub game_state: GameState,
    /// Countdown display snapshot.
    pub countdown: u32,
    /// Current question index (0-based) within the current round.
    pub current_question_index: u32,
    /// Current round index (0-based); -1 when none is active.
    pub current_round: i32,
    /// Active question count of the current round.
    pub total_questions_in_round: u32,
    /// Total rounds defined.
    pub total_rounds: u32,
    /// Wall clock (epoch ms) the live question started at, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<EpochMillis>,
    /// Projection of the live question, sanitized unless host-facing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_question: Option<QuestionSnapshotView>,
    /// Optional media stream URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_url: Option<String>,
    /// Resume bookkeeping per visited round.
    pub round_progress: Vec<RoundProgressEntity>,
    /// Host identity, if assigned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<HostSummary>,
    /// Participating players.
    pub players: Vec<PlayerSummary>,
}

impl LobbySnapshot {
    fn build(lobby: &LobbyEntity, host_view: bool) -> Self {
        Self {
            id: lobby.id.clone(),
            name: lobby.name.clone(),
            max_players: lobby.max_players,
            status: lobby.status,
            game_state: lobby.game_state,
            countdown: lobby.countdown,
            current_question_index: lobby.current_question_index,
            current_round: lobby.current_round,
            total_questions_in_round: lobby.total_questions_in_round,
            total_rounds: lobby.total_rounds,
            start_time: lobby.start_time,
            current_question: lobby.current_question.as_ref().map(|snapshot| {
                if host_view {
                    QuestionSnapshotView::for_host(snapshot)
                } else {
                    QuestionSnapshotView::sanitized(snapshot)
                }
            }),
            stream_url: lobby.stream_url.clone(),
            round_progress: lobby.round_progress.clone(),
            host: lobby.host.as_ref().map(Into::into),
            players: lobby.players.iter().map(Into::into).collect(),
        }
    }

    /// Player-facing snapshot with the answer key stripped.
    pub fn sanitized(lobby: &LobbyEntity) -> Self {
        Self::build(lobby, false)
    }

    /// Host-facing snapshot carrying the answer key for recovery.
    pub fn for_host(lobby: &LobbyEntity) -> Self {
        Self::build(lobby, true)
    }
}

/// One ranked line of a leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LeaderboardEntry {
    /// Trusted user identifier.
    pub user_id: String,
    /// Display name.
    pub name: String,
    /// Score the ranking is computed over.
    pub score: u32,
    /// Rank, 1-based, best score first.
    pub rank: u32,
    /// Sub-score earned in the round the leaderboard annotates, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_score: Option<u32>,
}

/// Public projection of a round definition.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoundSummary {
    /// Stable round identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Longer description.
    pub description: String,
    /// Canonical sort key.
    pub order: u32,
    /// Whether this is the single active round.
    pub is_active: bool,
    /// Number of questions seeded.
    pub total_questions: u32,
}

impl From<RoundEntity> for RoundSummary {
    fn from(round: RoundEntity) -> Self {
        Self {
            id: round.id,
            name: round.name,
            description: round.description,
            order: round.order,
            is_active: round.is_active,
            total_questions: round.total_questions,
        }
    }
}

/// Acknowledgement sent to the submitting connection only.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AnswerAck {
    /// Whether the submission was accepted for scoring.
    pub success: bool,
    /// Whether the answer matched the answer key.
    pub is_correct: bool,
    /// Points credited for this answer.
    pub points_earned: u32,
    /// Seconds between question start and the submission.
    pub time_taken: f64,
}

/// Payload of the `lobby-joined` acknowledgement.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LobbyJoined {
    /// Reconstructed lobby view.
    pub lobby: LobbySnapshot,
    /// Whether this join assigned a brand-new host identity.
    pub is_new_host: bool,
    /// Whether an existing player record was reclaimed.
    pub is_reconnect: bool,
    /// Whether a game was already in progress at join time.
    pub game_in_progress: bool,
    /// Recomputed seconds left on the live question, if one is running.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_time: Option<u64>,
}

/// Payload of the `countdown-started` room update.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CountdownStarted {
    /// Countdown length in seconds.
    pub seconds: u32,
    /// Question index (0-based) the countdown leads into.
    pub question_index: u32,
    /// Round index the countdown belongs to.
    pub round_index: i32,
}

/// Payload of the lightweight periodic `countdown-update` tick.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CountdownTick {
    /// Seconds remaining.
    pub remaining: u32,
}

/// Payload of the `question-started` room update.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuestionStarted {
    /// Sanitized question payload.
    pub question: PublicQuestion,
    /// Seconds allowed to answer.
    pub time_limit: u64,
    /// Literal start timestamp (epoch ms) so clients compute their own
    /// remaining time independent of network latency.
    pub start_time: EpochMillis,
    /// Resolved answer literal; present only on the host's copy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
}

/// Per-question analytics computed at end-question.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuestionAnalytics {
    /// How many players answered.
    pub answered_count: u32,
    /// Votes per choice, keyed by choice text, zero-initialized for every
    /// defined choice.
    #[schema(value_type = Object)]
    pub choice_tallies: IndexMap<String, u32>,
}

/// Payload of the `question-ended` room update.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuestionEnded {
    /// Resolved answer literal, revealed to everyone.
    pub correct_answer: String,
    /// Full ranked leaderboard annotated with this round's sub-scores.
    pub leaderboard: Vec<LeaderboardEntry>,
    /// Whether the round has no further questions.
    pub is_round_over: bool,
    /// Answer analytics.
    pub analytics: QuestionAnalytics,
}

/// Payload of the `round-changed` room update.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoundChanged {
    /// Round switched to.
    pub round_id: String,
    /// Index of that round in the canonical order.
    pub round_index: u32,
    /// Display name of the round.
    pub round_name: String,
    /// Question index (0-based) play resumes at.
    pub next_question_index: u32,
    /// Active question count of the round.
    pub total_questions: u32,
}

/// Payload of the `game-ended` room update.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GameEnded {
    /// Final ranked leaderboard.
    pub leaderboard: Vec<LeaderboardEntry>,
    /// Identifier of the archival session record.
    pub session_id: String,
}

/// Payload of the `score-updated` room update.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScoreUpdated {
    /// Player whose score changed.
    pub user_id: String,
    /// Display name.
    pub name: String,
    /// New total score.
    pub score: u32,
    /// New sub-score within the active round.
    pub round_score: u32,
}

/// Payload of the `answered-count-updated` room update.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AnsweredCount {
    /// Players who answered the live question so far.
    pub answered: u32,
    /// Total players in the lobby.
    pub total_players: u32,
}

/// Payload of the `player-left` room update.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerLeft {
    /// Player whose socket binding was cleared.
    pub user_id: String,
}

/// Error payload sent to the originating connection only.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorMessage {
    /// Human-readable description.
    pub message: String,
}

/// Archived leaderboard line as served over HTTP.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionPlayerView {
    /// Trusted user identifier.
    pub user_id: String,
    /// Display name at game end.
    pub name: String,
    /// Final score.
    pub score: u32,
    /// Final rank, 1-based.
    pub rank: u32,
}

impl From<SessionPlayerEntity> for SessionPlayerView {
    fn from(player: SessionPlayerEntity) -> Self {
        Self {
            user_id: player.user_id,
            name: player.name,
            score: player.score,
            rank: player.rank,
        }
    }
}

/// Archived game session as served over HTTP.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionView {
    /// Archive record identifier.
    pub id: String,
    /// Lobby the game was played in.
    pub lobby_id: String,
    /// Lobby display name at game end.
    pub game_name: String,
    /// Host display name, if a host was assigned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
    /// RFC 3339 timestamp of game end.
    pub ended_at: String,
    /// Final ranked leaderboard.
    pub players: Vec<SessionPlayerView>,
}

impl From<GameSessionEntity> for SessionView {
    fn from(session: GameSessionEntity) -> Self {
        Self {
            id: session.id,
            lobby_id: session.lobby_id,
            game_name: session.game_name,
            host_name: session.host_name,
            ended_at: format_epoch_millis(session.ended_at),
            players: session.players.into_iter().map(Into::into).collect(),
        }
    }
}
