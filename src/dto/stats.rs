use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::dao::models::GameEntity;

/// One row of the global statistics.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameStatistic {
    /// Display name of the game.
    pub name: String,
    /// Current number of voters.
    pub votes: u64,
}

impl From<GameEntity> for GameStatistic {
    fn from(game: GameEntity) -> Self {
        Self {
            name: game.name,
            votes: game.votes,
        }
    }
}

/// Query string of `GET /stats`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatsQuery {
    /// Only report games with at least this many votes.
    pub min_votes: Option<u64>,
}
