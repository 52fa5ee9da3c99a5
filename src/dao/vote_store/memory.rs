//! In-process backend used for local runs and tests.

use std::{collections::HashSet, sync::Arc, time::SystemTime};

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    models::{GameEntity, GameId, GameRegistration, UserEntity, VoteOutcome},
    storage::{StorageError, StorageResult},
    vote_store::VoteStore,
};

/// Game row holding the counter next to the voters it counts. Both are only
/// touched while the owning map entry is locked.
#[derive(Debug)]
struct GameRecord {
    key: String,
    name: String,
    votes: u64,
    voters: HashSet<String>,
    created_at: SystemTime,
}

impl GameRecord {
    fn to_entity(&self, id: GameId) -> GameEntity {
        GameEntity {
            id,
            key: self.key.clone(),
            name: self.name.clone(),
            votes: self.votes,
            created_at: self.created_at,
        }
    }
}

#[derive(Default)]
struct MemoryInner {
    keys: DashMap<String, GameId>,
    games: DashMap<GameId, GameRecord>,
    users: DashMap<String, UserEntity>,
}

/// `DashMap`-backed store; clones share the same maps.
#[derive(Clone, Default)]
pub struct MemoryVoteStore {
    inner: Arc<MemoryInner>,
}

impl MemoryVoteStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn insert_game_if_absent(&self, key: String, name: String) -> StorageResult<GameRegistration> {
        // The key entry stays locked until the game row exists, so a racing
        // registration of the same key waits and then sees the occupied slot.
        match self.inner.keys.entry(key) {
            Entry::Occupied(slot) => {
                let id = *slot.get();
                let game = self
                    .inner
                    .games
                    .get(&id)
                    .map(|record| record.to_entity(id))
                    .ok_or_else(|| {
                        StorageError::inconsistent(format!(
                            "key `{}` points to missing game `{id}`",
                            slot.key()
                        ))
                    })?;
                Ok(GameRegistration {
                    game,
                    created: false,
                })
            }
            Entry::Vacant(slot) => {
                let id = Uuid::new_v4();
                let record = GameRecord {
                    key: slot.key().clone(),
                    name,
                    votes: 0,
                    voters: HashSet::new(),
                    created_at: SystemTime::now(),
                };
                let game = record.to_entity(id);
                self.inner.games.insert(id, record);
                slot.insert(id);
                Ok(GameRegistration {
                    game,
                    created: true,
                })
            }
        }
    }

    fn find_game_by_key(&self, key: &str) -> Option<GameEntity> {
        let id = *self.inner.keys.get(key)?;
        self.find_game(id)
    }

    fn find_game(&self, id: GameId) -> Option<GameEntity> {
        self.inner
            .games
            .get(&id)
            .map(|record| record.to_entity(id))
    }

    fn list_games(&self) -> Vec<GameEntity> {
        self.inner
            .games
            .iter()
            .map(|entry| entry.value().to_entity(*entry.key()))
            .collect()
    }

    fn add_vote(&self, user_id: String, game_id: GameId) -> VoteOutcome {
        let Some(mut record) = self.inner.games.get_mut(&game_id) else {
            return VoteOutcome::UnknownGame;
        };
        if record.voters.insert(user_id) {
            record.votes += 1;
            VoteOutcome::Applied
        } else {
            VoteOutcome::Unchanged
        }
    }

    fn remove_vote(&self, user_id: &str, game_id: GameId) -> VoteOutcome {
        let Some(mut record) = self.inner.games.get_mut(&game_id) else {
            return VoteOutcome::UnknownGame;
        };
        if record.voters.remove(user_id) {
            record.votes -= 1;
            VoteOutcome::Applied
        } else {
            VoteOutcome::Unchanged
        }
    }

    fn user_game_ids(&self, user_id: &str) -> Vec<GameId> {
        self.inner
            .games
            .iter()
            .filter(|entry| entry.value().voters.contains(user_id))
            .map(|entry| *entry.key())
            .collect()
    }

    fn save_user(&self, user: UserEntity) -> UserEntity {
        self.inner.users.insert(user.id.clone(), user.clone());
        user
    }
}

impl VoteStore for MemoryVoteStore {
    fn insert_game_if_absent(
        &self,
        key: String,
        name: String,
    ) -> BoxFuture<'static, StorageResult<GameRegistration>> {
        let store = self.clone();
        Box::pin(async move { store.insert_game_if_absent(key, name) })
    }

    fn find_game_by_key(&self, key: String) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.find_game_by_key(&key)) })
    }

    fn find_game(&self, id: GameId) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.find_game(id)) })
    }

    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.list_games()) })
    }

    fn add_vote(
        &self,
        user_id: String,
        game_id: GameId,
    ) -> BoxFuture<'static, StorageResult<VoteOutcome>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.add_vote(user_id, game_id)) })
    }

    fn remove_vote(
        &self,
        user_id: String,
        game_id: GameId,
    ) -> BoxFuture<'static, StorageResult<VoteOutcome>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.remove_vote(&user_id, game_id)) })
    }

    fn user_game_ids(&self, user_id: String) -> BoxFuture<'static, StorageResult<Vec<GameId>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.user_game_ids(&user_id)) })
    }

    fn save_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<UserEntity>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.save_user(user)) })
    }

    fn find_user(&self, id: String) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.users.get(&id).map(|user| user.value().clone())) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn registration_is_set_if_absent() {
        let store = MemoryVoteStore::new();

        let first = VoteStore::insert_game_if_absent(&store, "chess".into(), "Chess".into())
            .await
            .unwrap();
        let second = VoteStore::insert_game_if_absent(&store, "chess".into(), "CHESS!".into())
            .await
            .unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.game.id, second.game.id);
        assert_eq!(second.game.name, "Chess");
        assert_eq!(second.game.votes, 0);
    }

    #[tokio::test]
    async fn concurrent_registrations_share_one_id() {
        let store = MemoryVoteStore::new();

        let tasks: Vec<_> = (0..32)
            .map(|n| {
                let store = store.clone();
                tokio::spawn(async move {
                    VoteStore::insert_game_if_absent(&store, "go".into(), format!("Go {n}"))
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut ids = HashSet::new();
        let mut created = 0;
        for task in tasks {
            let registration = task.await.unwrap();
            ids.insert(registration.game.id);
            created += usize::from(registration.created);
        }

        assert_eq!(ids.len(), 1);
        assert_eq!(created, 1);
        assert_eq!(VoteStore::list_games(&store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn votes_move_counter_and_membership_together() {
        let store = MemoryVoteStore::new();
        let game = VoteStore::insert_game_if_absent(&store, "poker".into(), "Poker".into())
            .await
            .unwrap()
            .game;

        assert_eq!(
            VoteStore::add_vote(&store, "alice".into(), game.id).await.unwrap(),
            VoteOutcome::Applied
        );
        assert_eq!(
            VoteStore::add_vote(&store, "alice".into(), game.id).await.unwrap(),
            VoteOutcome::Unchanged
        );
        assert_eq!(store.find_game(game.id).unwrap().votes, 1);
        assert_eq!(store.user_game_ids("alice"), vec![game.id]);

        assert_eq!(
            VoteStore::remove_vote(&store, "bob".into(), game.id).await.unwrap(),
            VoteOutcome::Unchanged
        );
        assert_eq!(
            VoteStore::remove_vote(&store, "alice".into(), game.id).await.unwrap(),
            VoteOutcome::Applied
        );
        assert_eq!(store.find_game(game.id).unwrap().votes, 0);
        assert!(store.user_game_ids("alice").is_empty());
    }

    #[tokio::test]
    async fn unknown_game_is_reported() {
        let store = MemoryVoteStore::new();
        let missing = Uuid::new_v4();

        assert_eq!(
            VoteStore::add_vote(&store, "alice".into(), missing).await.unwrap(),
            VoteOutcome::UnknownGame
        );
        assert_eq!(
            VoteStore::remove_vote(&store, "alice".into(), missing).await.unwrap(),
            VoteOutcome::UnknownGame
        );
    }

    #[tokio::test]
    async fn concurrent_voters_keep_counter_exact() {
        let store = MemoryVoteStore::new();
        let game = store
            .insert_game_if_absent("tetris".into(), "Tetris".into())
            .unwrap()
            .game;

        let tasks: Vec<_> = (0..50)
            .map(|n| {
                let store = store.clone();
                tokio::spawn(async move {
                    let user = format!("user-{}", n % 25);
                    VoteStore::add_vote(&store, user, game.id).await.unwrap()
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(store.find_game(game.id).unwrap().votes, 25);
    }

    #[tokio::test]
    async fn users_are_upserted() {
        let store = MemoryVoteStore::new();
        let mut user = UserEntity {
            id: "discord:42".into(),
            display_name: "Ada".into(),
            avatar_ref: None,
            updated_at: SystemTime::now(),
        };
        VoteStore::save_user(&store, user.clone()).await.unwrap();
        user.display_name = "Ada L.".into();
        user.avatar_ref = Some("a1b2".into());
        VoteStore::save_user(&store, user.clone()).await.unwrap();

        let stored = VoteStore::find_user(&store, "discord:42".into())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, user);
        assert!(
            VoteStore::find_user(&store, "discord:7".into())
                .await
                .unwrap()
                .is_none()
        );
    }
}
