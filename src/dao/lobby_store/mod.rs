//! Persistence abstraction for lobby, round, question, and session records.

pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use futures::future::BoxFuture;

use crate::dao::{
    models::{GameSessionEntity, LobbyEntity, QuestionEntity, RoundEntity},
    storage::StorageResult,
};

/// Abstraction over the durable document store. Single-document writes are
/// treated as atomic; cross-document consistency is the coordinator's
/// responsibility via ordered writes.
pub trait LobbyStore: Send + Sync {
    /// Fetch a lobby record by its stable id.
    fn find_lobby(&self, id: String) -> BoxFuture<'static, StorageResult<Option<LobbyEntity>>>;
    /// Upsert the full lobby record.
    fn save_lobby(&self, lobby: LobbyEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// All rounds sorted by `order` ascending, the canonical round sequence.
    fn list_rounds(&self) -> BoxFuture<'static, StorageResult<Vec<RoundEntity>>>;
    /// Fetch one round by id.
    fn find_round(&self, id: String) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>>;
    /// Flip the `is_active` flag of one round.
    fn set_round_active(
        &self,
        id: String,
        active: bool,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Deactivate every round; the first half of the single-active invariant.
    fn deactivate_all_rounds(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Active questions of a round sorted by `round_index` ascending.
    fn list_questions(
        &self,
        round_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>>;
    /// Fetch one question by id regardless of its active flag.
    fn find_question(
        &self,
        id: String,
    ) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>>;
    /// Count active questions, optionally narrowed to a round.
    fn count_questions(
        &self,
        round_id: Option<String>,
    ) -> BoxFuture<'static, StorageResult<u64>>;
    /// Write the archival record of a completed game. Write-once.
    fn save_session(&self, session: GameSessionEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch an archived session by id.
    fn find_session(
        &self,
        id: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameSessionEntity>>>;
    /// Cheap connectivity probe used by the supervisor and health route.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Attempt to re-establish the backend connection after a failed probe.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
