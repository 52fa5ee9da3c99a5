use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use rand::{Rng, rng};
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::from_value;
use tokio::time::sleep;
use tracing::debug;
use uuid::Uuid;

use crate::dao::{
    models::{GameEntity, GameId, GameRegistration, UserEntity, VoteOutcome},
    storage::StorageResult,
    vote_store::VoteStore,
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        AllDocsResponse, CouchGameDocument, CouchGameKeyDocument, CouchUserDocument, END_SUFFIX,
        GAME_PREFIX, GameBody, WriteResponse, game_doc_id, game_key_doc_id, user_doc_id,
    },
};

/// Upper bound on revision-checked write attempts before reporting contention.
const MAX_WRITE_ATTEMPTS: u32 = 8;

enum PutOutcome {
    Stored,
    /// Another writer holds a newer revision (or already created the document).
    Conflict,
}

/// CouchDB backend. Membership changes are read-modify-write cycles on the
/// game document guarded by its `_rev`, retried on conflict.
#[derive(Clone)]
pub struct CouchVoteStore {
    client: Client,
    database_url: Arc<Url>,
    database: Arc<str>,
    auth: Option<Arc<(String, String)>>,
}

impl CouchVoteStore {
    /// Connect to CouchDB and make sure the database exists.
    pub async fn connect(config: CouchConfig) -> StorageResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let invalid_url = || CouchDaoError::InvalidBaseUrl {
            url: config.base_url.clone(),
        };
        let mut database_url =
            Url::parse(config.base_url.trim_end_matches('/')).map_err(|_| invalid_url())?;
        database_url
            .path_segments_mut()
            .map_err(|_| invalid_url())?
            .pop_if_empty()
            .push(&config.database);

        let store = Self {
            client,
            database_url: Arc::new(database_url),
            database: Arc::from(config.database.as_str()),
            auth: config.credentials.map(Arc::new),
        };

        store.ensure_database().await?;
        Ok(store)
    }

    fn with_auth(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.auth.as_deref() {
            Some((user, pass)) => builder.basic_auth(user, Some(pass)),
            None => builder,
        }
    }

    fn request(&self, method: Method, doc_id: &str) -> CouchResult<RequestBuilder> {
        let mut url = (*self.database_url).clone();
        url.path_segments_mut()
            .map_err(|_| CouchDaoError::InvalidBaseUrl {
                url: self.database_url.to_string(),
            })?
            .push(doc_id);
        Ok(self.with_auth(self.client.request(method, url)))
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let url = (*self.database_url).clone();

        let response = self
            .with_auth(self.client.get(url.clone()))
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: database.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .with_auth(self.client.put(url))
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::RequestSend {
                        path: database.clone(),
                        source,
                    })?;
                // 412: someone else created it in between.
                if create.status().is_success() || create.status() == StatusCode::PRECONDITION_FAILED
                {
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database,
                status: other,
            }),
        }
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, doc_id)?
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_owned(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                response.json::<T>().await.map(Some).map_err(|source| {
                    CouchDaoError::DecodeResponse {
                        path: doc_id.to_owned(),
                        source,
                    }
                })
            }
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_owned(),
                status: other,
            }),
        }
    }

    /// PUT a document. Without `_rev` this only succeeds when the id is free;
    /// with `_rev` only when that revision is still current.
    async fn put_document<T>(&self, doc_id: &str, document: &T) -> CouchResult<PutOutcome>
    where
        T: ?Sized + Serialize,
    {
        let response = self
            .request(Method::PUT, doc_id)?
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_owned(),
                source,
            })?;

        match response.status() {
            StatusCode::CONFLICT => Ok(PutOutcome::Conflict),
            status if status.is_success() => {
                let written = response.json::<WriteResponse>().await.map_err(|source| {
                    CouchDaoError::DecodeResponse {
                        path: doc_id.to_owned(),
                        source,
                    }
                })?;
                debug!(doc_id, rev = %written.rev, "stored CouchDB document");
                Ok(PutOutcome::Stored)
            }
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_owned(),
                status: other,
            }),
        }
    }

    async fn list_documents<T>(&self, prefix: &str) -> CouchResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        const ALL_DOCS: &str = "_all_docs";
        let query = [
            ("include_docs", "true".to_owned()),
            ("startkey", format!("\"{prefix}\"")),
            ("endkey", format!("\"{prefix}{END_SUFFIX}\"")),
        ];

        let response = self
            .request(Method::GET, ALL_DOCS)?
            .query(&query)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: ALL_DOCS.to_owned(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: ALL_DOCS.to_owned(),
                status: response.status(),
            });
        }

        let payload = response.json::<AllDocsResponse>().await.map_err(|source| {
            CouchDaoError::DecodeResponse {
                path: ALL_DOCS.to_owned(),
                source,
            }
        })?;

        payload
            .rows
            .into_iter()
            .filter_map(|row| row.doc)
            .map(|doc| {
                from_value(doc).map_err(|source| CouchDaoError::DeserializeValue {
                    path: ALL_DOCS.to_owned(),
                    source,
                })
            })
            .collect()
    }

    async fn insert_game_if_absent(&self, key: String, name: String) -> CouchResult<GameRegistration> {
        let claim_path = game_key_doc_id(&key);

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            if let Some(claim) = self
                .get_document::<CouchGameKeyDocument>(&claim_path)
                .await?
            {
                let game = self.load_claimed_game(&key, claim).await?;
                return Ok(GameRegistration {
                    game,
                    created: false,
                });
            }

            let claim = CouchGameKeyDocument::claim(&key, Uuid::new_v4(), name.clone());
            match self.put_document(&claim_path, &claim).await? {
                PutOutcome::Stored => {
                    let game = self.load_claimed_game(&key, claim).await?;
                    return Ok(GameRegistration {
                        game,
                        created: true,
                    });
                }
                PutOutcome::Conflict => {
                    debug!(%key, attempt, "key already claimed; reading the winner");
                }
            }
        }

        Err(CouchDaoError::Contention {
            path: claim_path,
            attempts: MAX_WRITE_ATTEMPTS,
        })
    }

    /// Read the game a key claim points to, writing the game document from the
    /// claim when the claimant has not (yet) done so.
    async fn load_claimed_game(&self, key: &str, claim: CouchGameKeyDocument) -> CouchResult<GameEntity> {
        let path = game_doc_id(claim.game_id);
        if let Some(document) = self.get_document::<CouchGameDocument>(&path).await? {
            return document.try_into_entity();
        }

        let document = CouchGameDocument::new(claim.game_id, GameBody::new(key.to_owned(), claim.name));
        match self.put_document(&path, &document).await? {
            PutOutcome::Stored => document.try_into_entity(),
            PutOutcome::Conflict => self
                .get_document::<CouchGameDocument>(&path)
                .await?
                .ok_or_else(|| CouchDaoError::DanglingKey {
                    key: key.to_owned(),
                    path,
                })?
                .try_into_entity(),
        }
    }

    async fn find_game_by_key(&self, key: String) -> CouchResult<Option<GameEntity>> {
        let claim_path = game_key_doc_id(&key);
        match self
            .get_document::<CouchGameKeyDocument>(&claim_path)
            .await?
        {
            Some(claim) => self.load_claimed_game(&key, claim).await.map(Some),
            None => Ok(None),
        }
    }

    async fn find_game(&self, id: GameId) -> CouchResult<Option<GameEntity>> {
        self.get_document::<CouchGameDocument>(&game_doc_id(id))
            .await?
            .map(CouchGameDocument::try_into_entity)
            .transpose()
    }

    async fn list_games(&self) -> CouchResult<Vec<GameEntity>> {
        self.list_documents::<CouchGameDocument>(GAME_PREFIX)
            .await?
            .into_iter()
            .map(CouchGameDocument::try_into_entity)
            .collect()
    }

    /// Revision-checked read-modify-write of one game document. `mutate`
    /// returns `false` when the document already has the requested shape.
    async fn update_game<F>(&self, id: GameId, mut mutate: F) -> CouchResult<VoteOutcome>
    where
        F: FnMut(&mut GameBody) -> bool,
    {
        let path = game_doc_id(id);

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let Some(mut document) = self.get_document::<CouchGameDocument>(&path).await? else {
                return Ok(VoteOutcome::UnknownGame);
            };
            if !mutate(&mut document.game) {
                return Ok(VoteOutcome::Unchanged);
            }
            match self.put_document(&path, &document).await? {
                PutOutcome::Stored => return Ok(VoteOutcome::Applied),
                PutOutcome::Conflict => {
                    debug!(%path, attempt, "game revision changed underneath; retrying");
                    back_off(attempt).await;
                }
            }
        }

        Err(CouchDaoError::Contention {
            path,
            attempts: MAX_WRITE_ATTEMPTS,
        })
    }

    async fn user_game_ids(&self, user_id: String) -> CouchResult<Vec<GameId>> {
        self.list_documents::<CouchGameDocument>(GAME_PREFIX)
            .await?
            .into_iter()
            .filter(|document| document.game.has_voter(&user_id))
            .map(|document| document.game_id())
            .collect()
    }

    async fn save_user(&self, user: UserEntity) -> CouchResult<UserEntity> {
        let path = user_doc_id(&user.id);

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let rev = self
                .get_document::<CouchUserDocument>(&path)
                .await?
                .and_then(|existing| existing.rev);
            let document: CouchUserDocument = (user.clone(), rev).into();
            match self.put_document(&path, &document).await? {
                PutOutcome::Stored => return Ok(user),
                PutOutcome::Conflict => {
                    debug!(%path, attempt, "user revision changed underneath; retrying");
                    back_off(attempt).await;
                }
            }
        }

        Err(CouchDaoError::Contention {
            path,
            attempts: MAX_WRITE_ATTEMPTS,
        })
    }

    async fn find_user(&self, id: String) -> CouchResult<Option<UserEntity>> {
        let document = self
            .get_document::<CouchUserDocument>(&user_doc_id(&id))
            .await?;
        Ok(document.map(|document| document.user))
    }

    async fn health_check(&self) -> CouchResult<()> {
        let path = self.database.to_string();
        let response = self
            .with_auth(self.client.get((*self.database_url).clone()))
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: path.clone(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CouchDaoError::RequestStatus {
                path,
                status: response.status(),
            })
        }
    }
}

/// Short randomized pause so conflicting writers do not retry in lockstep.
async fn back_off(attempt: u32) {
    let pause = Duration::from_millis(rng().random_range(5..=20_u64) * u64::from(attempt));
    sleep(pause).await;
}

impl VoteStore for CouchVoteStore {
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
        Box::pin(async move {
            store
                .update_game(game_id, |game| game.add_voter(&user_id))
                .await
                .map_err(Into::into)
        })
    }

    fn remove_vote(
        &self,
        user_id: String,
        game_id: GameId,
    ) -> BoxFuture<'static, StorageResult<VoteOutcome>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .update_game(game_id, |game| game.remove_voter(&user_id))
                .await
                .map_err(Into::into)
        })
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
        Box::pin(async move { store.health_check().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}
