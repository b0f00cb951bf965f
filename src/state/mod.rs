//! Shared application state: the store slot, the per-lobby session registry,
//! and the timer registry.

pub mod lobby;
pub mod phase;
pub mod timer;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{RwLock, watch};

use crate::{
    config::AppConfig,
    dao::lobby_store::LobbyStore,
    error::ServiceError,
    state::{lobby::LobbySession, timer::TimerRegistry},
};

pub use self::lobby::{Room, RoomConnection};

/// Cheaply clonable handle to the application state.
pub type SharedState = Arc<AppState>;

/// Central application state storing the storage handle, per-lobby sessions,
/// and timers.
pub struct AppState {
    config: AppConfig,
    store: RwLock<Option<Arc<dyn LobbyStore>>>,
    degraded: watch::Sender<bool>,
    lobbies: DashMap<String, Arc<LobbySession>>,
    timers: Arc<TimerRegistry>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`].
    ///
    /// The application starts in degraded mode until a storage backend is
    /// installed by the supervisor.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            config,
            store: RwLock::new(None),
            degraded: degraded_tx,
            lobbies: DashMap::new(),
            timers: Arc::new(TimerRegistry::new()),
        })
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Handle to the current store, if one is installed.
    pub async fn store(&self) -> Option<Arc<dyn LobbyStore>> {
        let guard = self.store.read().await;
        guard.as_ref().cloned()
    }

    /// Handle to the current store, or [`ServiceError::Degraded`] when the
    /// backend is unavailable.
    pub async fn require_store(&self) -> Result<Arc<dyn LobbyStore>, ServiceError> {
        self.store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a storage backend and leave degraded mode.
    pub async fn set_store(&self, store: Arc<dyn LobbyStore>) {
        {
            let mut guard = self.store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the storage backend and enter degraded mode.
    pub async fn clear_store(&self) {
        {
            let mut guard = self.store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Whether the application is currently running without storage.
    pub async fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    /// Session bundle for a lobby id, created on first reference.
    pub fn session(&self, lobby_id: &str) -> Arc<LobbySession> {
        self.lobbies
            .entry(lobby_id.to_owned())
            .or_insert_with(|| Arc::new(LobbySession::new(lobby_id.to_owned())))
            .clone()
    }

    /// Registry owning all countdown and question-deadline timers.
    pub fn timers(&self) -> &Arc<TimerRegistry> {
        &self.timers
    }
}
