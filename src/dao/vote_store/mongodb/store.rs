use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Collection, Database, IndexModel,
    bson::doc,
    options::{IndexOptions, ReturnDocument},
};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult, is_duplicate_key},
    models::{
        MongoGameDocument, MongoGameIdDocument, MongoUserDocument, doc_id, from_bson_uuid,
        new_game_fields,
    },
};
use crate::dao::{
    models::{GameEntity, GameId, GameRegistration, UserEntity, VoteOutcome},
    storage::StorageResult,
    vote_store::VoteStore,
};

const GAME_COLLECTION_NAME: &str = "games";
const USER_COLLECTION_NAME: &str = "users";

/// MongoDB backend. Each game document carries both its `votes` counter and
/// the `voters` array it counts, so every membership change is a single
/// conditional document update.
#[derive(Clone)]
pub struct MongoVoteStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
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
        let (_client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.database = database;
        Ok(())
    }
}

impl MongoVoteStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> StorageResult<Self> {
        let (_client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let games = self.games().await;

        // The unique key index is what turns the registration upsert into a
        // set-if-absent primitive.
        let key_index = IndexModel::builder()
            .keys(doc! {"key": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("game_key_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        games
            .create_index(key_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: GAME_COLLECTION_NAME,
                index: "key",
                source,
            })?;

        let voters_index = IndexModel::builder()
            .keys(doc! {"voters": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("game_voters_idx".to_owned()))
                    .build(),
            )
            .build();
        games
            .create_index(voters_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: GAME_COLLECTION_NAME,
                index: "voters",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn games(&self) -> Collection<MongoGameDocument> {
        self.database()
            .await
            .collection::<MongoGameDocument>(GAME_COLLECTION_NAME)
    }

    async fn users(&self) -> Collection<MongoUserDocument> {
        self.database()
            .await
            .collection::<MongoUserDocument>(USER_COLLECTION_NAME)
    }

    async fn insert_game_if_absent(&self, key: String, name: String) -> MongoResult<GameRegistration> {
        let games = self.games().await;
        let id = Uuid::new_v4();

        let upserted = games
            .find_one_and_update(
                doc! {"key": key.as_str()},
                doc! {"$setOnInsert": new_game_fields(id, &name)},
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .projection(doc! {"voters": 0})
            .await;

        let document = match upserted {
            Ok(document) => document,
            // Two upserts of one key can both miss the filter; the unique
            // index rejects the loser, which then reads the winner's document.
            Err(err) if is_duplicate_key(&err) => {
                debug!(%key, "lost game registration race; reading existing game");
                games
                    .find_one(doc! {"key": key.as_str()})
                    .projection(doc! {"voters": 0})
                    .await
                    .map_err(|source| MongoDaoError::LoadGameByKey {
                        key: key.clone(),
                        source,
                    })?
            }
            Err(source) => {
                return Err(MongoDaoError::RegisterGame { key, source });
            }
        };

        let game: GameEntity = document
            .ok_or_else(|| MongoDaoError::RegistrationMissing { key: key.clone() })?
            .into();
        let created = game.id == id;
        Ok(GameRegistration { game, created })
    }

    async fn find_game_by_key(&self, key: String) -> MongoResult<Option<GameEntity>> {
        let games = self.games().await;
        let document = games
            .find_one(doc! {"key": key.as_str()})
            .projection(doc! {"voters": 0})
            .await
            .map_err(|source| MongoDaoError::LoadGameByKey { key, source })?;
        Ok(document.map(Into::into))
    }

    async fn find_game(&self, id: GameId) -> MongoResult<Option<GameEntity>> {
        let games = self.games().await;
        let document = games
            .find_one(doc_id(id))
            .projection(doc! {"voters": 0})
            .await
            .map_err(|source| MongoDaoError::LoadGame { id, source })?;
        Ok(document.map(Into::into))
    }

    async fn list_games(&self) -> MongoResult<Vec<GameEntity>> {
        let games = self.games().await;
        let documents: Vec<MongoGameDocument> = games
            .find(doc! {})
            .projection(doc! {"voters": 0})
            .await
            .map_err(|source| MongoDaoError::ListGames { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListGames { source })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }

    /// Apply `update` to the game only when `membership` matches, then tell an
    /// idempotent no-op apart from an unknown game.
    async fn update_votes(
        &self,
        id: GameId,
        membership: mongodb::bson::Document,
        update: mongodb::bson::Document,
    ) -> MongoResult<VoteOutcome> {
        let games = self.games().await;
        let mut filter = doc_id(id);
        filter.extend(membership);

        let result = games
            .update_one(filter, update)
            .await
            .map_err(|source| MongoDaoError::UpdateVotes { id, source })?;
        if result.matched_count > 0 {
            return Ok(VoteOutcome::Applied);
        }

        let exists = games
            .count_documents(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadGame { id, source })?;
        if exists > 0 {
            Ok(VoteOutcome::Unchanged)
        } else {
            Ok(VoteOutcome::UnknownGame)
        }
    }

    async fn add_vote(&self, user_id: String, id: GameId) -> MongoResult<VoteOutcome> {
        self.update_votes(
            id,
            doc! {"voters": {"$ne": user_id.as_str()}},
            doc! {"$push": {"voters": user_id.as_str()}, "$inc": {"votes": 1_i64}},
        )
        .await
    }

    async fn remove_vote(&self, user_id: String, id: GameId) -> MongoResult<VoteOutcome> {
        self.update_votes(
            id,
            doc! {"voters": user_id.as_str()},
            doc! {"$pull": {"voters": user_id.as_str()}, "$inc": {"votes": -1_i64}},
        )
        .await
    }

    async fn user_game_ids(&self, user_id: String) -> MongoResult<Vec<GameId>> {
        let games = self
            .database()
            .await
            .collection::<MongoGameIdDocument>(GAME_COLLECTION_NAME);
        let documents: Vec<MongoGameIdDocument> = games
            .find(doc! {"voters": user_id.as_str()})
            .projection(doc! {"_id": 1})
            .await
            .map_err(|source| MongoDaoError::ListUserGames {
                user_id: user_id.clone(),
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListUserGames {
                user_id: user_id.clone(),
                source,
            })?;

        Ok(documents
            .into_iter()
            .map(|document| from_bson_uuid(document.id))
            .collect())
    }

    async fn save_user(&self, user: UserEntity) -> MongoResult<UserEntity> {
        let users = self.users().await;
        let document: MongoUserDocument = user.clone().into();
        users
            .replace_one(doc! {"_id": user.id.as_str()}, &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveUser {
                id: user.id.clone(),
                source,
            })?;
        Ok(user)
    }

    async fn find_user(&self, id: String) -> MongoResult<Option<UserEntity>> {
        let users = self.users().await;
        let document = users
            .find_one(doc! {"_id": id.as_str()})
            .await
            .map_err(|source| MongoDaoError::LoadUser { id, source })?;
        Ok(document.map(Into::into))
    }
}

impl VoteStore for MongoVoteStore {
    fn insert_game_if_absent(
        &self,
        key: String,
        name: String,
    ) -> BoxFuture<'static, StorageResult<GameRegistration>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .insert_game_if_absent(key, name)
                .await
                .map_err(Into::into)
        })
    }

    fn find_game_by_key(&self, key: String) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_game_by_key(key).await.map_err(Into::into) })
    }

    fn find_game(&self, id: GameId) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_game(id).await.map_err(Into::into) })
    }

    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_games().await.map_err(Into::into) })
    }

    fn add_vote(
        &self,
        user_id: String,
        game_id: GameId,
    ) -> BoxFuture<'static, StorageResult<VoteOutcome>> {
        let store = self.clone();
        Box::pin(async move { store.add_vote(user_id, game_id).await.map_err(Into::into) })
    }

    fn remove_vote(
        &self,
        user_id: String,
        game_id: GameId,
    ) -> BoxFuture<'static, StorageResult<VoteOutcome>> {
        let store = self.clone();
        Box::pin(async move { store.remove_vote(user_id, game_id).await.map_err(Into::into) })
    }

    fn user_game_ids(&self, user_id: String) -> BoxFuture<'static, StorageResult<Vec<GameId>>> {
        let store = self.clone();
        Box::pin(async move { store.user_game_ids(user_id).await.map_err(Into::into) })
    }

    fn save_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<UserEntity>> {
        let store = self.clone();
        Box::pin(async move { store.save_user(user).await.map_err(Into::into) })
    }

    fn find_user(&self, id: String) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_user(id).await.map_err(Into::into) })
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
