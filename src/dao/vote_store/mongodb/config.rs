use mongodb::options::ClientOptions;

use super::error::MongoDaoError;
use crate::dao::storage::StorageResult;

const DEFAULT_URI: &str = "mongodb://localhost:27017";
const DEFAULT_DB: &str = "game_votes";

/// Parsed connection settings for the MongoDB backend.
#[derive(Clone)]
pub struct MongoConfig {
    pub(super) options: ClientOptions,
    pub(super) database_name: String,
}

impl MongoConfig {
    /// Parse `uri`; `db_name` falls back to `game_votes`.
    pub async fn from_uri(uri: &str, db_name: Option<&str>) -> StorageResult<Self> {
        let database_name = db_name.unwrap_or(DEFAULT_DB).to_owned();
        let mut options =
            ClientOptions::parse(uri)
                .await
                .map_err(|source| MongoDaoError::InvalidUri {
                    uri: uri.to_owned(),
                    source,
                })?;
        if options.app_name.is_none() {
            options.app_name = Some("game-vote-back".to_owned());
        }

        Ok(Self {
            options,
            database_name,
        })
    }

    /// Read `MONGO_URI` (defaults to a local server) and `MONGO_DB`.
    pub async fn from_env() -> StorageResult<Self> {
        let uri = std::env::var("MONGO_URI").unwrap_or_else(|_| DEFAULT_URI.to_owned());
        let db = std::env::var("MONGO_DB").ok();
        Self::from_uri(&uri, db.as_deref()).await
    }
}
