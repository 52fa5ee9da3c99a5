//! Per-user game selections and the vote counters they drive.
//!
//! Every membership change goes through one atomic store primitive that moves
//! the counter with it. Nothing here holds a lock across calls; a replace that
//! fails midway leaves a partial result which a retry with the same target
//! completes.

use std::{collections::HashSet, sync::Arc};

use tracing::{debug, info, warn};

use crate::{
    dao::{
        models::{GameEntity, GameId, VoteOutcome},
        vote_store::VoteStore,
    },
    dto::validation::validate_game_name,
    error::ServiceError,
    services::registry_service::{lookup_with, resolve_or_create_with},
    state::SharedState,
};

/// Result of adding or removing a single game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteChange {
    /// Game the name resolved to.
    pub game: GameEntity,
    /// `false` when the selection already had the requested shape.
    pub applied: bool,
}

/// Counts reported by a full selection replacement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceSummary {
    /// Games newly selected.
    pub added: usize,
    /// Games dropped from the selection.
    pub removed: usize,
    /// Entries that were invalid or no longer resolve, and were left out.
    pub skipped: usize,
}

/// Add `game_id` to the user's selection. No-op when already present.
pub async fn add_vote(
    state: &SharedState,
    user_id: &str,
    game_id: GameId,
) -> Result<bool, ServiceError> {
    let store = state.require_vote_store().await?;
    add_vote_with(&store, user_id, game_id).await
}

/// Drop `game_id` from the user's selection. No-op when absent.
pub async fn remove_vote(
    state: &SharedState,
    user_id: &str,
    game_id: GameId,
) -> Result<bool, ServiceError> {
    let store = state.require_vote_store().await?;
    remove_vote_with(&store, user_id, game_id).await
}

/// Make the user's selection equal to `game_ids`, touching only the difference.
pub async fn replace_all_votes(
    state: &SharedState,
    user_id: &str,
    game_ids: Vec<GameId>,
) -> Result<ReplaceSummary, ServiceError> {
    let store = state.require_vote_store().await?;
    replace_all_votes_with(&store, user_id, game_ids).await
}

/// Display names of the games the user currently votes for, sorted.
pub async fn user_game_names(
    state: &SharedState,
    user_id: &str,
) -> Result<Vec<String>, ServiceError> {
    let store = state.require_vote_store().await?;
    let ids = store.user_game_ids(user_id.to_owned()).await?;

    let mut names = Vec::with_capacity(ids.len());
    for id in ids {
        match store.find_game(id).await? {
            Some(game) => names.push(game.name),
            None => debug!(game_id = %id, user_id, "selected game no longer resolves; skipping"),
        }
    }
    names.sort_by_key(|name| name.to_lowercase());
    Ok(names)
}

/// Resolve (registering if needed) and add one game by name.
pub async fn add_game_by_name(
    state: &SharedState,
    user_id: &str,
    raw_name: &str,
) -> Result<VoteChange, ServiceError> {
    let store = state.require_vote_store().await?;
    let game = resolve_or_create_with(&store, state.config().name_matching, raw_name).await?;
    let applied = add_vote_with(&store, user_id, game.id).await?;
    Ok(VoteChange { game, applied })
}

/// Remove one game by name. Unknown names are [`ServiceError::NotFound`].
pub async fn remove_game_by_name(
    state: &SharedState,
    user_id: &str,
    raw_name: &str,
) -> Result<VoteChange, ServiceError> {
    let store = state.require_vote_store().await?;
    let game = lookup_with(&store, state.config().name_matching, raw_name).await?;
    let applied = remove_vote_with(&store, user_id, game.id).await?;
    Ok(VoteChange { game, applied })
}

/// Replace the user's whole selection with the given names.
///
/// Names that fail the same checks as a single add (blank, oversized, no
/// usable key) are skipped one by one; the rest of the batch still applies.
pub async fn replace_games_by_name(
    state: &SharedState,
    user_id: &str,
    raw_names: Vec<String>,
) -> Result<ReplaceSummary, ServiceError> {
    let limit = state.config().replace_limit;
    if raw_names.len() > limit {
        return Err(ServiceError::InvalidInput(format!(
            "at most {limit} games can be submitted at once (got {})",
            raw_names.len()
        )));
    }

    let store = state.require_vote_store().await?;
    let matching = state.config().name_matching;

    let mut skipped = 0;
    let mut game_ids = Vec::with_capacity(raw_names.len());
    for raw_name in &raw_names {
        if let Err(err) = validate_game_name(raw_name) {
            warn!(
                user_id,
                name_len = raw_name.chars().count(),
                code = %err.code,
                "skipping invalid game name"
            );
            skipped += 1;
            continue;
        }
        match resolve_or_create_with(&store, matching, raw_name).await {
            Ok(game) => game_ids.push(game.id),
            Err(ServiceError::InvalidInput(reason)) => {
                warn!(user_id, name = %raw_name, %reason, "skipping unusable game name");
                skipped += 1;
            }
            Err(err) => return Err(err),
        }
    }

    let mut summary = replace_all_votes_with(&store, user_id, game_ids).await?;
    summary.skipped += skipped;
    Ok(summary)
}

async fn add_vote_with(
    store: &Arc<dyn VoteStore>,
    user_id: &str,
    game_id: GameId,
) -> Result<bool, ServiceError> {
    match store.add_vote(user_id.to_owned(), game_id).await? {
        VoteOutcome::Applied => {
            debug!(user_id, game_id = %game_id, "vote added");
            Ok(true)
        }
        VoteOutcome::Unchanged => Ok(false),
        VoteOutcome::UnknownGame => Err(unknown_game(game_id)),
    }
}

async fn remove_vote_with(
    store: &Arc<dyn VoteStore>,
    user_id: &str,
    game_id: GameId,
) -> Result<bool, ServiceError> {
    match store.remove_vote(user_id.to_owned(), game_id).await? {
        VoteOutcome::Applied => {
            debug!(user_id, game_id = %game_id, "vote removed");
            Ok(true)
        }
        VoteOutcome::Unchanged => Ok(false),
        VoteOutcome::UnknownGame => Err(unknown_game(game_id)),
    }
}

async fn replace_all_votes_with(
    store: &Arc<dyn VoteStore>,
    user_id: &str,
    game_ids: Vec<GameId>,
) -> Result<ReplaceSummary, ServiceError> {
    let target: HashSet<GameId> = game_ids.into_iter().collect();
    let current: HashSet<GameId> = store
        .user_game_ids(user_id.to_owned())
        .await?
        .into_iter()
        .collect();

    let mut summary = ReplaceSummary::default();

    for &game_id in current.difference(&target) {
        match remove_vote_with(store, user_id, game_id).await {
            Ok(true) => summary.removed += 1,
            Ok(false) => {}
            Err(ServiceError::NotFound(reason)) => {
                warn!(user_id, game_id = %game_id, %reason, "skipping removal of unknown game");
                summary.skipped += 1;
            }
            Err(err) => return Err(err),
        }
    }

    for &game_id in target.difference(&current) {
        match add_vote_with(store, user_id, game_id).await {
            Ok(true) => summary.added += 1,
            Ok(false) => {}
            Err(ServiceError::NotFound(reason)) => {
                warn!(user_id, game_id = %game_id, %reason, "skipping unknown game");
                summary.skipped += 1;
            }
            Err(err) => return Err(err),
        }
    }

    info!(
        user_id,
        added = summary.added,
        removed = summary.removed,
        skipped = summary.skipped,
        "replaced game selection"
    );
    Ok(summary)
}

fn unknown_game(game_id: GameId) -> ServiceError {
    ServiceError::NotFound(format!("game `{game_id}` not found"))
}
