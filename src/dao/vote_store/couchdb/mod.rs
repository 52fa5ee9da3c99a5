mod config;
mod error;
mod models;
mod store;

pub use config::CouchConfig;
pub use store::CouchVoteStore;

use self::error::CouchDaoError;
use crate::dao::storage::StorageError;

impl From<CouchDaoError> for StorageError {
    fn from(err: CouchDaoError) -> Self {
        match err {
            CouchDaoError::Contention { .. } => StorageError::Contention {
                message: err.to_string(),
            },
            CouchDaoError::DanglingKey { .. } => StorageError::inconsistent(err.to_string()),
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
