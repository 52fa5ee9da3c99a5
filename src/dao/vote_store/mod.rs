/// CouchDB backend.
#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;
/// MongoDB backend.
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{GameEntity, GameId, GameRegistration, UserEntity, VoteOutcome};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;

/// Abstraction over the persistence layer for the game registry, vote
/// memberships and user profiles.
///
/// Every method is a single atomic primitive at the storage layer:
/// - `insert_game_if_absent` is a set-if-absent on the normalized key, so two
///   racing registrations of one key always observe the same game id.
/// - `add_vote` / `remove_vote` change a membership and the matching counter
///   together, or change neither.
pub trait VoteStore: Send + Sync {
    /// Return the game registered under `key`, creating it with `name` as
    /// display name when the key is free.
    fn insert_game_if_absent(
        &self,
        key: String,
        name: String,
    ) -> BoxFuture<'static, StorageResult<GameRegistration>>;
    /// Game registered under an exact normalized key.
    fn find_game_by_key(&self, key: String) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    /// Game by id.
    fn find_game(&self, id: GameId) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    /// Every registered game, in no particular order.
    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>>;
    /// Add `game_id` to the user's selection and bump its counter. A no-op
    /// when the game is already selected.
    fn add_vote(&self, user_id: String, game_id: GameId)
    -> BoxFuture<'static, StorageResult<VoteOutcome>>;
    /// Drop `game_id` from the user's selection and lower its counter. A
    /// no-op when the game is not selected.
    fn remove_vote(
        &self,
        user_id: String,
        game_id: GameId,
    ) -> BoxFuture<'static, StorageResult<VoteOutcome>>;
    /// Ids of the games the user currently votes for.
    fn user_game_ids(&self, user_id: String) -> BoxFuture<'static, StorageResult<Vec<GameId>>>;
    /// Insert or overwrite a user profile.
    fn save_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<UserEntity>>;
    /// Profile by user id.
    fn find_user(&self, id: String) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;
    /// Cheap liveness check against the backend.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the connection in place after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
