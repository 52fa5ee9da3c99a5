//! Game registry: maps user-typed names onto stable game ids.

use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    config::NameMatching,
    dao::{models::GameEntity, vote_store::VoteStore},
    error::ServiceError,
    services::normalizer::{keys_are_prefix_compatible, normalize},
    state::SharedState,
};

/// Resolve `raw_name` to its game, registering it on first sight.
pub async fn resolve_or_create(
    state: &SharedState,
    raw_name: &str,
) -> Result<GameEntity, ServiceError> {
    let store = state.require_vote_store().await?;
    resolve_or_create_with(&store, state.config().name_matching, raw_name).await
}

/// Resolve `raw_name` to an existing game without registering anything.
pub async fn lookup(state: &SharedState, raw_name: &str) -> Result<GameEntity, ServiceError> {
    let store = state.require_vote_store().await?;
    lookup_with(&store, state.config().name_matching, raw_name).await
}

/// Every registered game. Order is not meaningful.
pub async fn list_all(state: &SharedState) -> Result<Vec<GameEntity>, ServiceError> {
    let store = state.require_vote_store().await?;
    Ok(store.list_games().await?)
}

pub(crate) async fn resolve_or_create_with(
    store: &Arc<dyn VoteStore>,
    matching: NameMatching,
    raw_name: &str,
) -> Result<GameEntity, ServiceError> {
    let key = matching_key(raw_name)?;

    if let Some(game) = find_match(store, matching, &key).await? {
        return Ok(game);
    }

    let registration = store.insert_game_if_absent(key, raw_name.to_owned()).await?;
    if registration.created {
        info!(
            game_id = %registration.game.id,
            key = %registration.game.key,
            name = %registration.game.name,
            "registered game"
        );
    } else {
        debug!(game_id = %registration.game.id, "game registered concurrently; reusing it");
    }
    Ok(registration.game)
}

pub(crate) async fn lookup_with(
    store: &Arc<dyn VoteStore>,
    matching: NameMatching,
    raw_name: &str,
) -> Result<GameEntity, ServiceError> {
    let key = matching_key(raw_name)?;
    find_match(store, matching, &key)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{raw_name}` not found")))
}

fn matching_key(raw_name: &str) -> Result<String, ServiceError> {
    let key = normalize(raw_name);
    if key.is_empty() {
        return Err(ServiceError::InvalidInput(format!(
            "game name `{raw_name}` has no letters or digits"
        )));
    }
    Ok(key)
}

async fn find_match(
    store: &Arc<dyn VoteStore>,
    matching: NameMatching,
    key: &str,
) -> Result<Option<GameEntity>, ServiceError> {
    if let Some(game) = store.find_game_by_key(key.to_owned()).await? {
        return Ok(Some(game));
    }

    match matching {
        NameMatching::Exact => Ok(None),
        NameMatching::Prefix => {
            let games = store.list_games().await?;
            Ok(best_prefix_match(games, key))
        }
    }
}

/// Longest shared key wins; ties go to the lowest id.
fn best_prefix_match(games: Vec<GameEntity>, key: &str) -> Option<GameEntity> {
    games
        .into_iter()
        .filter(|game| keys_are_prefix_compatible(&game.key, key))
        .min_by(|left, right| {
            let shared = |game: &GameEntity| game.key.len().min(key.len());
            shared(right)
                .cmp(&shared(left))
                .then_with(|| left.id.cmp(&right.id))
        })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::{config::AppConfig, dao::vote_store::memory::MemoryVoteStore, state::AppState};

    fn state_with(matching: NameMatching) -> SharedState {
        let config = AppConfig {
            name_matching: matching,
            ..AppConfig::default()
        };
        AppState::with_store(config, Arc::new(MemoryVoteStore::new()))
    }

    #[tokio::test]
    async fn spelling_variants_resolve_to_one_game() {
        let state = state_with(NameMatching::Exact);

        let first = resolve_or_create(&state, "Counter-Strike").await.unwrap();
        let second = resolve_or_create(&state, "counterstrike").await.unwrap();
        let third = resolve_or_create(&state, "Counter Strike").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.id, third.id);
        assert_eq!(third.name, "Counter-Strike");
        assert_eq!(list_all(&state).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn display_name_is_kept_verbatim() {
        let state = state_with(NameMatching::Exact);
        let game = resolve_or_create(&state, "  Tetris 99 ").await.unwrap();
        assert_eq!(game.name, "  Tetris 99 ");
        assert_eq!(game.key, "tetris9");
    }

    #[tokio::test]
    async fn empty_keys_are_rejected_before_registration() {
        let state = state_with(NameMatching::Exact);

        assert!(matches!(
            resolve_or_create(&state, " -- ").await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(list_all(&state).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn lookup_never_registers() {
        let state = state_with(NameMatching::Exact);

        assert!(matches!(
            lookup(&state, "Chess").await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(list_all(&state).await.unwrap().is_empty());

        let created = resolve_or_create(&state, "Chess").await.unwrap();
        assert_eq!(lookup(&state, "CHESS").await.unwrap().id, created.id);
    }

    #[tokio::test]
    async fn exact_mode_ignores_prefixes() {
        let state = state_with(NameMatching::Exact);
        let short = resolve_or_create(&state, "Counter").await.unwrap();
        let long = resolve_or_create(&state, "Counter Strike").await.unwrap();
        assert_ne!(short.id, long.id);
    }

    #[tokio::test]
    async fn prefix_mode_matches_longest_shared_key() {
        let state = state_with(NameMatching::Prefix);
        let counter = resolve_or_create(&state, "Counter").await.unwrap();

        let strike = resolve_or_create(&state, "Counter-Strike: GO").await.unwrap();
        assert_eq!(strike.id, counter.id);
        assert_eq!(lookup(&state, "Count").await.unwrap().id, counter.id);
        assert!(matches!(
            lookup(&state, "Chess").await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn concurrent_first_registrations_share_one_id() {
        let state = state_with(NameMatching::Exact);

        let handles: Vec<_> = (0..32)
            .map(|index| {
                let state = state.clone();
                let name = if index % 2 == 0 { "Dune" } else { "DUNE!" };
                tokio::spawn(async move { resolve_or_create(&state, name).await.unwrap().id })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            ids.insert(handle.await.unwrap());
        }
        assert_eq!(ids.len(), 1);
    }

    #[test]
    fn prefix_ties_go_to_lowest_id() {
        let make = |id: u128, key: &str| GameEntity {
            id: uuid::Uuid::from_u128(id),
            key: key.into(),
            name: key.into(),
            votes: 0,
            created_at: std::time::SystemTime::UNIX_EPOCH,
        };
        let games = vec![make(3, "halo"), make(1, "halo"), make(2, "ha")];

        let best = best_prefix_match(games, "halo3").unwrap();
        assert_eq!(best.id, uuid::Uuid::from_u128(1));
    }
}
