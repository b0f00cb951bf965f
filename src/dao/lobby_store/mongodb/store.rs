use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{Client, Collection, Database, bson::doc, options::IndexOptions};
use tokio::sync::RwLock;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
};
use crate::dao::{
    lobby_store::LobbyStore,
    models::{GameSessionEntity, LobbyEntity, QuestionEntity, RoundEntity},
    storage::StorageResult,
};

const LOBBY_COLLECTION: &str = "lobbies";
const ROUND_COLLECTION: &str = "rounds";
const QUESTION_COLLECTION: &str = "questions";
const SESSION_COLLECTION: &str = "sessions";

/// MongoDB-backed [`LobbyStore`]. Cheap to clone; the connection is shared.
#[derive(Clone)]
pub struct MongoLobbyStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoLobbyStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        let unique_id = |name: &'static str| {
            mongodb::IndexModel::builder()
                .keys(doc! { "id": 1 })
                .options(
                    IndexOptions::builder()
                        .name(Some(format!("{name}_id_idx")))
                        .unique(Some(true))
                        .build(),
                )
                .build()
        };

        for collection_name in [LOBBY_COLLECTION, ROUND_COLLECTION, SESSION_COLLECTION] {
            database
                .collection::<mongodb::bson::Document>(collection_name)
                .create_index(unique_id(collection_name))
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection: collection_name,
                    index: "id",
                    source,
                })?;
        }

        // Questions are always fetched per round in display order.
        let question_index = mongodb::IndexModel::builder()
            .keys(doc! { "round_id": 1, "round_index": 1 })
            .options(
                IndexOptions::builder()
                    .name(Some("question_round_idx".to_owned()))
                    .build(),
            )
            .build();

        database
            .collection::<QuestionEntity>(QUESTION_COLLECTION)
            .create_index(question_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: QUESTION_COLLECTION,
                index: "round_id,round_index",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn lobbies(&self) -> Collection<LobbyEntity> {
        self.database().await.collection(LOBBY_COLLECTION)
    }

    async fn rounds(&self) -> Collection<RoundEntity> {
        self.database().await.collection(ROUND_COLLECTION)
    }

    async fn questions(&self) -> Collection<QuestionEntity> {
        self.database().await.collection(QUESTION_COLLECTION)
    }

    async fn sessions(&self) -> Collection<GameSessionEntity> {
        self.database().await.collection(SESSION_COLLECTION)
    }
}

impl LobbyStore for MongoLobbyStore {
    fn find_lobby(&self, id: String) -> BoxFuture<'static, StorageResult<Option<LobbyEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let lobby = store
                .lobbies()
                .await
                .find_one(doc! { "id": &id })
                .await
                .map_err(|source| MongoDaoError::Operation {
                    operation: "find_lobby",
                    source,
                })?;
            Ok(lobby)
        })
    }

    fn save_lobby(&self, lobby: LobbyEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .lobbies()
                .await
                .replace_one(doc! { "id": &lobby.id }, &lobby)
                .upsert(true)
                .await
                .map_err(|source| MongoDaoError::Operation {
                    operation: "save_lobby",
                    source,
                })?;
            Ok(())
        })
    }

    fn list_rounds(&self) -> BoxFuture<'static, StorageResult<Vec<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let rounds: Vec<RoundEntity> = store
                .rounds()
                .await
                .find(doc! {})
                .sort(doc! { "order": 1 })
                .await
                .map_err(|source| MongoDaoError::Operation {
                    operation: "list_rounds",
                    source,
                })?
                .try_collect()
                .await
                .map_err(|source| MongoDaoError::Operation {
                    operation: "list_rounds",
                    source,
                })?;
            Ok(rounds)
        })
    }

    fn find_round(&self, id: String) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let round = store
                .rounds()
                .await
                .find_one(doc! { "id": &id })
                .await
                .map_err(|source| MongoDaoError::Operation {
                    operation: "find_round",
                    source,
                })?;
            Ok(round)
        })
    }

    fn set_round_active(&self, id: String, active: bool) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .rounds()
                .await
                .update_one(
                    doc! { "id": &id },
                    doc! { "$set": { "is_active": active } },
                )
                .await
                .map_err(|source| MongoDaoError::Operation {
                    operation: "set_round_active",
                    source,
                })?;
            Ok(())
        })
    }

    fn deactivate_all_rounds(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .rounds()
                .await
                .update_many(doc! {}, doc! { "$set": { "is_active": false } })
                .await
                .map_err(|source| MongoDaoError::Operation {
                    operation: "deactivate_all_rounds",
                    source,
                })?;
            Ok(())
        })
    }

    fn list_questions(
        &self,
        round_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let questions: Vec<QuestionEntity> = store
                .questions()
                .await
                .find(doc! { "round_id": &round_id, "is_active": true })
                .sort(doc! { "round_index": 1 })
                .await
                .map_err(|source| MongoDaoError::Operation {
                    operation: "list_questions",
                    source,
                })?
                .try_collect()
                .await
                .map_err(|source| MongoDaoError::Operation {
                    operation: "list_questions",
                    source,
                })?;
            Ok(questions)
        })
    }

    fn find_question(
        &self,
        id: String,
    ) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let question = store
                .questions()
                .await
                .find_one(doc! { "id": &id })
                .await
                .map_err(|source| MongoDaoError::Operation {
                    operation: "find_question",
                    source,
                })?;
            Ok(question)
        })
    }

    fn count_questions(&self, round_id: Option<String>) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move {
            let filter = match round_id {
                Some(round_id) => doc! { "round_id": round_id, "is_active": true },
                None => doc! { "is_active": true },
            };
            let count = store
                .questions()
                .await
                .count_documents(filter)
                .await
                .map_err(|source| MongoDaoError::Operation {
                    operation: "count_questions",
                    source,
                })?;
            Ok(count)
        })
    }

    fn save_session(&self, session: GameSessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .sessions()
                .await
                .insert_one(&session)
                .await
                .map_err(|source| MongoDaoError::Operation {
                    operation: "save_session",
                    source,
                })?;
            Ok(())
        })
    }

    fn find_session(
        &self,
        id: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameSessionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let session = store
                .sessions()
                .await
                .find_one(doc! { "id": &id })
                .await
                .map_err(|source| MongoDaoError::Operation {
                    operation: "find_session",
                    source,
                })?;
            Ok(session)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
