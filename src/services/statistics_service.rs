use crate::{dao::models::GameEntity, error::ServiceError, state::SharedState};

/// Vote totals per game, most voted first; ties by ascending game id.
///
/// Zero-vote games are reported when the configured policy asks for it.
/// `min_votes` filters further on top of that.
pub async fn global_statistics(
    state: &SharedState,
    min_votes: Option<u64>,
) -> Result<Vec<GameEntity>, ServiceError> {
    let store = state.require_vote_store().await?;
    let policy = state.config().statistics;

    let floor = match (policy.include_zero_votes, min_votes) {
        (_, Some(min)) if min > 0 => min,
        (false, _) => 1,
        (true, _) => 0,
    };

    let mut games: Vec<GameEntity> = store
        .list_games()
        .await?
        .into_iter()
        .filter(|game| game.votes >= floor)
        .collect();
    games.sort_by(|left, right| right.votes.cmp(&left.votes).then(left.id.cmp(&right.id)));
    Ok(games)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::{AppConfig, StatisticsPolicy},
        dao::vote_store::memory::MemoryVoteStore,
        services::vote_service,
        state::AppState,
    };

    async fn seeded(include_zero_votes: bool) -> SharedState {
        let config = AppConfig {
            statistics: StatisticsPolicy { include_zero_votes },
            ..AppConfig::default()
        };
        let state = AppState::with_store(config, Arc::new(MemoryVoteStore::new()));

        for user in ["u1", "u2", "u3"] {
            vote_service::add_game_by_name(&state, user, "Chess").await.unwrap();
        }
        vote_service::add_game_by_name(&state, "u1", "Go").await.unwrap();
        vote_service::add_game_by_name(&state, "u2", "Go").await.unwrap();
        vote_service::add_game_by_name(&state, "u3", "Nim").await.unwrap();
        vote_service::remove_game_by_name(&state, "u3", "Nim").await.unwrap();
        state
    }

    fn summary(games: &[GameEntity]) -> Vec<(&str, u64)> {
        games.iter().map(|game| (game.name.as_str(), game.votes)).collect()
    }

    #[tokio::test]
    async fn sorted_by_votes_with_zero_vote_games_included() {
        let state = seeded(true).await;
        let stats = global_statistics(&state, None).await.unwrap();
        assert_eq!(summary(&stats), vec![("Chess", 3), ("Go", 2), ("Nim", 0)]);
    }

    #[tokio::test]
    async fn zero_vote_games_hidden_by_policy() {
        let state = seeded(false).await;
        let stats = global_statistics(&state, None).await.unwrap();
        assert_eq!(summary(&stats), vec![("Chess", 3), ("Go", 2)]);
    }

    #[tokio::test]
    async fn min_votes_filters_on_request() {
        let state = seeded(true).await;
        let stats = global_statistics(&state, Some(3)).await.unwrap();
        assert_eq!(summary(&stats), vec![("Chess", 3)]);
    }

    #[tokio::test]
    async fn a_voter_leaving_lowers_the_count() {
        let state = seeded(true).await;
        vote_service::remove_game_by_name(&state, "u2", "Chess").await.unwrap();

        let stats = global_statistics(&state, None).await.unwrap();
        let chess = stats.iter().find(|game| game.name == "Chess").unwrap();
        assert_eq!(chess.votes, 2);
        assert_eq!(stats.iter().map(|game| game.votes).collect::<Vec<_>>(), vec![2, 2, 0]);
    }

    #[tokio::test]
    async fn ties_are_ordered_by_id() {
        let state = seeded(true).await;
        vote_service::add_game_by_name(&state, "u3", "Go").await.unwrap();

        let stats = global_statistics(&state, Some(3)).await.unwrap();
        assert_eq!(stats.len(), 2);
        assert!(stats[0].id < stats[1].id);
    }
}
