//! In-memory [`LobbyStore`] used by tests and by local development without a
//! database. Mirrors the MongoDB backend's sorting and filtering contracts.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use futures::future::BoxFuture;

use crate::dao::{
    lobby_store::LobbyStore,
    models::{GameSessionEntity, LobbyEntity, QuestionEntity, RoundEntity},
    storage::StorageResult,
};

#[derive(Default)]
struct MemoryInner {
    lobbies: HashMap<String, LobbyEntity>,
    rounds: HashMap<String, RoundEntity>,
    questions: HashMap<String, QuestionEntity>,
    sessions: HashMap<String, GameSessionEntity>,
}

/// Process-local store keeping every collection in a mutex-guarded map.
#[derive(Clone, Default)]
pub struct MemoryLobbyStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryLobbyStore {
    /// Fresh empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a round definition, replacing any previous one with the same id.
    pub fn seed_round(&self, round: RoundEntity) {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        inner.rounds.insert(round.id.clone(), round);
    }

    /// Seed a question definition.
    pub fn seed_question(&self, question: QuestionEntity) {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        inner.questions.insert(question.id.clone(), question);
    }

    /// Number of archived sessions, used by tests to assert write-once.
    pub fn session_count(&self) -> usize {
        let inner = self.inner.lock().expect("memory store poisoned");
        inner.sessions.len()
    }
}

impl LobbyStore for MemoryLobbyStore {
    fn find_lobby(&self, id: String) -> BoxFuture<'static, StorageResult<Option<LobbyEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let inner = store.inner.lock().expect("memory store poisoned");
            Ok(inner.lobbies.get(&id).cloned())
        })
    }

    fn save_lobby(&self, lobby: LobbyEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut inner = store.inner.lock().expect("memory store poisoned");
            inner.lobbies.insert(lobby.id.clone(), lobby);
            Ok(())
        })
    }

    fn list_rounds(&self) -> BoxFuture<'static, StorageResult<Vec<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let inner = store.inner.lock().expect("memory store poisoned");
            let mut rounds: Vec<_> = inner.rounds.values().cloned().collect();
            rounds.sort_by_key(|round| round.order);
            Ok(rounds)
        })
    }

    fn find_round(&self, id: String) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let inner = store.inner.lock().expect("memory store poisoned");
            Ok(inner.rounds.get(&id).cloned())
        })
    }

    fn set_round_active(&self, id: String, active: bool) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut inner = store.inner.lock().expect("memory store poisoned");
            if let Some(round) = inner.rounds.get_mut(&id) {
                round.is_active = active;
            }
            Ok(())
        })
    }

    fn deactivate_all_rounds(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut inner = store.inner.lock().expect("memory store poisoned");
            for round in inner.rounds.values_mut() {
                round.is_active = false;
            }
            Ok(())
        })
    }

    fn list_questions(
        &self,
        round_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let inner = store.inner.lock().expect("memory store poisoned");
            let mut questions: Vec<_> = inner
                .questions
                .values()
                .filter(|q| q.round_id == round_id && q.is_active)
                .cloned()
                .collect();
            questions.sort_by_key(|q| q.round_index);
            Ok(questions)
        })
    }

    fn find_question(
        &self,
        id: String,
    ) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let inner = store.inner.lock().expect("memory store poisoned");
            Ok(inner.questions.get(&id).cloned())
        })
    }

    fn count_questions(&self, round_id: Option<String>) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move {
            let inner = store.inner.lock().expect("memory store poisoned");
            let count = inner
                .questions
                .values()
                .filter(|q| q.is_active)
                .filter(|q| round_id.as_deref().is_none_or(|id| q.round_id == id))
                .count();
            Ok(count as u64)
        })
    }

    fn save_session(&self, session: GameSessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut inner = store.inner.lock().expect("memory store poisoned");
            inner.sessions.insert(session.id.clone(), session);
            Ok(())
        })
    }

    fn find_session(
        &self,
        id: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameSessionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let inner = store.inner.lock().expect("memory store poisoned");
            Ok(inner.sessions.get(&id).cloned())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
