use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::stats::{GameStatistic, StatsQuery},
    error::AppError,
    services::statistics_service,
    state::SharedState,
};

/// Routes serving the global statistics.
pub fn router() -> Router<SharedState> {
    Router::new().route("/stats", get(global_statistics))
}

/// Vote totals per game, most voted first.
#[utoipa::path(
    get,
    path = "/stats",
    tag = "stats",
    params(StatsQuery),
    responses((status = 200, description = "Vote totals", body = [GameStatistic]))
)]
pub async fn global_statistics(
    State(state): State<SharedState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<Vec<GameStatistic>>, AppError> {
    let games = statistics_service::global_statistics(&state, query.min_votes).await?;
    Ok(Json(games.into_iter().map(GameStatistic::from).collect()))
}
