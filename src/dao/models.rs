use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Milliseconds since the Unix epoch, the wall-clock representation persisted
/// alongside lobby records so timing survives a process restart.
pub type EpochMillis = i64;

/// Current wall-clock time as epoch milliseconds.
pub fn now_millis() -> EpochMillis {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as EpochMillis)
        .unwrap_or(0)
}

/// Coarse lifecycle status of a lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum LobbyStatus {
    /// Players can join; no question is running.
    Waiting,
    /// A countdown towards the next question is ticking.
    Countdown,
    /// A question is live and accepting answers.
    InProgress,
    /// The game has been archived and the lobby awaits a reset.
    Completed,
}

/// Fine-grained presentation state within a lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum GameState {
    /// Pre-game or between-round screen.
    Lobby,
    /// The current question is displayed and answerable.
    Question,
    /// The correct answer is being revealed.
    Answer,
    /// Per-question results and the leaderboard are displayed.
    Results,
}

/// Host identity attached to a lobby. The socket binding is cleared on
/// disconnect while the identity survives so a host can reconnect and recover
/// an in-progress game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostEntity {
    /// Trusted user identifier of the host.
    pub user_id: String,
    /// Display name of the host.
    pub name: String,
    /// Optional contact address.
    #[serde(default)]
    pub email: Option<String>,
    /// Identifier of the currently bound connection, if any.
    #[serde(default)]
    pub socket_id: Option<String>,
    /// Last time this host was seen (epoch ms).
    pub last_active: EpochMillis,
}

/// Per-round sub-score recorded on a player.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundScoreEntity {
    /// Round the score was earned in.
    pub round_id: String,
    /// Points accumulated within that round.
    pub score: u32,
}

/// Player record inside a lobby. `user_id` is unique within the list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerEntity {
    /// Trusted user identifier.
    pub user_id: String,
    /// Display name.
    pub name: String,
    /// Optional contact address.
    #[serde(default)]
    pub email: Option<String>,
    /// Total score across all rounds of the current game.
    pub score: u32,
    /// Sub-scores keyed by round.
    #[serde(default)]
    pub round_scores: Vec<RoundScoreEntity>,
    /// When the player first joined this lobby (epoch ms).
    pub joined_at: EpochMillis,
    /// Identifier of the currently bound connection, if any.
    #[serde(default)]
    pub socket_id: Option<String>,
    /// Whether the player already answered the live question.
    #[serde(default)]
    pub has_answered_current_question: bool,
    /// Seconds taken to answer the live question, if answered.
    #[serde(default)]
    pub last_answer_time: Option<f64>,
    /// Whether the last submitted answer was correct.
    #[serde(default)]
    pub last_answer_correct: Option<bool>,
    /// Literal text of the last submitted answer.
    #[serde(default)]
    pub last_answer: Option<String>,
}

impl PlayerEntity {
    /// Fresh player record with zeroed progress.
    pub fn new(user_id: String, name: String, email: Option<String>, socket_id: String) -> Self {
        Self {
            user_id,
            name,
            email,
            score: 0,
            round_scores: Vec::new(),
            joined_at: now_millis(),
            socket_id: Some(socket_id),
            has_answered_current_question: false,
            last_answer_time: None,
            last_answer_correct: None,
            last_answer: None,
        }
    }

    /// Clear the per-question answer bookkeeping. Invoked exactly once per
    /// question start for every player.
    pub fn reset_answer_state(&mut self) {
        self.has_answered_current_question = false;
        self.last_answer_time = None;
        self.last_answer_correct = None;
        self.last_answer = None;
    }

    /// Sub-score for a given round, zero when the round was never scored.
    pub fn round_score(&self, round_id: &str) -> u32 {
        self.round_scores
            .iter()
            .find(|entry| entry.round_id == round_id)
            .map(|entry| entry.score)
            .unwrap_or(0)
    }

    /// Add points to both the total and the per-round sub-score, creating the
    /// round entry when absent.
    pub fn add_points(&mut self, round_id: &str, points: u32) {
        self.score += points;
        match self
            .round_scores
            .iter_mut()
            .find(|entry| entry.round_id == round_id)
        {
            Some(entry) => entry.score += points,
            None => self.round_scores.push(RoundScoreEntity {
                round_id: round_id.to_owned(),
                score: points,
            }),
        }
    }
}

/// Resume bookkeeping for one round ever visited by a lobby.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct RoundProgressEntity {
    /// Round this entry tracks.
    pub round_id: String,
    /// Next question index (0-based) to resume at.
    pub next_question_index: u32,
    /// Whether the round has been played to completion.
    pub is_completed: bool,
}

/// Denormalized snapshot of the live question kept on the lobby record,
/// answer key included, so a reconnecting host can recover mid-question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionSnapshotEntity {
    /// Identifier of the source question.
    pub question_id: String,
    /// Question text.
    pub text: String,
    /// Ordered answer choices.
    pub choices: Vec<String>,
    /// Resolved correct answer literal.
    pub correct_answer: String,
    /// Seconds allowed to answer.
    pub time_limit: u64,
    /// Base points awarded for an instant correct answer.
    pub points: u32,
    /// Round the question belongs to, so scoring credits the right sub-score.
    pub round_id: String,
}

/// One active game session container, addressed by a stable human-chosen id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LobbyEntity {
    /// Stable lobby identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Maximum number of concurrent players.
    pub max_players: u32,
    /// Coarse lifecycle status.
    pub status: LobbyStatus,
    /// Fine-grained presentation state.
    pub game_state: GameState,
    /// Display snapshot of the countdown seconds remaining.
    pub countdown: u32,
    /// Index (0-based) of the current question within the current round.
    pub current_question_index: u32,
    /// Index (0-based) into the ordered round list; -1 means no round active.
    pub current_round: i32,
    /// Number of active questions in the current round.
    pub total_questions_in_round: u32,
    /// Total number of rounds defined.
    pub total_rounds: u32,
    /// Wall clock of the current question's start, for recovery.
    #[serde(default)]
    pub start_time: Option<EpochMillis>,
    /// Snapshot of the active question, answer key included.
    #[serde(default)]
    pub current_question: Option<QuestionSnapshotEntity>,
    /// Optional media stream URL shown alongside the game.
    #[serde(default)]
    pub stream_url: Option<String>,
    /// Resume bookkeeping, one entry per round ever visited.
    #[serde(default)]
    pub round_progress: Vec<RoundProgressEntity>,
    /// At most one host per lobby.
    #[serde(default)]
    pub host: Option<HostEntity>,
    /// Player records, unique by `user_id`.
    #[serde(default)]
    pub players: Vec<PlayerEntity>,
}

impl LobbyEntity {
    /// Default record created lazily on first reference to a lobby id.
    pub fn with_defaults(id: String, max_players: u32) -> Self {
        Self {
            name: id.clone(),
            id,
            max_players,
            status: LobbyStatus::Waiting,
            game_state: GameState::Lobby,
            countdown: 0,
            current_question_index: 0,
            current_round: -1,
            total_questions_in_round: 0,
            total_rounds: 0,
            start_time: None,
            current_question: None,
            stream_url: None,
            round_progress: Vec::new(),
            host: None,
            players: Vec::new(),
        }
    }

    /// Find a player record by trusted user id.
    pub fn player(&self, user_id: &str) -> Option<&PlayerEntity> {
        self.players.iter().find(|p| p.user_id == user_id)
    }

    /// Mutable access to a player record by trusted user id.
    pub fn player_mut(&mut self, user_id: &str) -> Option<&mut PlayerEntity> {
        self.players.iter_mut().find(|p| p.user_id == user_id)
    }

    /// Resume entry for a round, if the round was ever visited.
    pub fn progress_for(&self, round_id: &str) -> Option<&RoundProgressEntity> {
        self.round_progress
            .iter()
            .find(|entry| entry.round_id == round_id)
    }
}

/// An ordered, named grouping of questions. Seeded externally; only
/// `is_active` is mutated by the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundEntity {
    /// Stable round identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Longer description shown on round intro screens.
    #[serde(default)]
    pub description: String,
    /// Sort key defining the canonical round sequence.
    pub order: u32,
    /// Exactly zero or one round is active at a time.
    pub is_active: bool,
    /// Number of questions seeded into this round.
    pub total_questions: u32,
}

/// Default per-question time limit in seconds.
pub const DEFAULT_TIME_LIMIT_SECS: u64 = 30;
/// Default base points for a question.
pub const DEFAULT_BASE_POINTS: u32 = 100;

fn default_time_limit() -> u64 {
    DEFAULT_TIME_LIMIT_SECS
}

fn default_points() -> u32 {
    DEFAULT_BASE_POINTS
}

fn default_true() -> bool {
    true
}

/// A single question. Immutable during gameplay and read-only to the core.
/// Exactly one of `correct_index` / `correct_answers` is populated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct QuestionEntity {
    /// Stable question identifier.
    pub id: String,
    /// Question text.
    pub text: String,
    /// Ordered answer choices.
    pub choices: Vec<String>,
    /// Index of the single correct choice, for single-answer questions.
    #[serde(default)]
    pub correct_index: Option<usize>,
    /// Indices of all correct choices, for multi-answer questions.
    #[serde(default)]
    pub correct_answers: Option<Vec<usize>>,
    /// Seconds allowed to answer.
    #[serde(default = "default_time_limit")]
    pub time_limit: u64,
    /// Base points awarded for an instant correct answer.
    #[serde(default = "default_points")]
    pub points: u32,
    /// Inactive questions are invisible to gameplay.
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Owning round.
    pub round_id: String,
    /// Position within the round (1-based, display ordering).
    pub round_index: u32,
}

/// Leaderboard line archived on a completed game session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionPlayerEntity {
    /// Trusted user identifier.
    pub user_id: String,
    /// Display name at game end.
    pub name: String,
    /// Final total score.
    pub score: u32,
    /// Final rank, 1-based.
    pub rank: u32,
    /// Per-round sub-scores at game end.
    pub round_scores: Vec<RoundScoreEntity>,
}

/// Archival record written exactly once per completed game, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameSessionEntity {
    /// Identifier of the archive record.
    pub id: String,
    /// Lobby the game was played in.
    pub lobby_id: String,
    /// Lobby display name at game end.
    pub game_name: String,
    /// Host user id, if a host was assigned.
    #[serde(default)]
    pub host_id: Option<String>,
    /// Host display name, if a host was assigned.
    #[serde(default)]
    pub host_name: Option<String>,
    /// When the game ended (epoch ms).
    pub ended_at: EpochMillis,
    /// Final ranked leaderboard.
    pub players: Vec<SessionPlayerEntity>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_points_upserts_round_sub_score() {
        let mut player = PlayerEntity::new("u1".into(), "Ada".into(), None, "s1".into());
        player.add_points("round-a", 75);
        player.add_points("round-a", 25);
        player.add_points("round-b", 10);

        assert_eq!(player.score, 110);
        assert_eq!(player.round_score("round-a"), 100);
        assert_eq!(player.round_score("round-b"), 10);
        assert_eq!(player.round_score("round-c"), 0);
    }

    #[test]
    fn reset_answer_state_clears_only_answer_fields() {
        let mut player = PlayerEntity::new("u1".into(), "Ada".into(), None, "s1".into());
        player.add_points("round-a", 50);
        player.has_answered_current_question = true;
        player.last_answer = Some("Paris".into());
        player.last_answer_correct = Some(true);
        player.last_answer_time = Some(3.2);

        player.reset_answer_state();

        assert!(!player.has_answered_current_question);
        assert!(player.last_answer.is_none());
        assert!(player.last_answer_correct.is_none());
        assert!(player.last_answer_time.is_none());
        assert_eq!(player.score, 50);
        assert_eq!(player.round_score("round-a"), 50);
    }

    #[test]
    fn default_lobby_starts_waiting_with_no_round() {
        let lobby = LobbyEntity::with_defaults("main".into(), 50);
        assert_eq!(lobby.status, LobbyStatus::Waiting);
        assert_eq!(lobby.game_state, GameState::Lobby);
        assert_eq!(lobby.current_round, -1);
        assert!(lobby.current_question.is_none());
        assert!(lobby.players.is_empty());
    }
}
