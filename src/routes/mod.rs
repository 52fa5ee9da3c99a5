use axum::Router;

use crate::state::SharedState;

/// Swagger UI and the OpenAPI document.
pub mod docs;
/// Registry and per-user selection routes.
pub mod games;
/// `/healthcheck`.
pub mod health;
/// Caller identity extraction.
pub mod identity;
/// `/stats`.
pub mod stats;
/// User profile routes.
pub mod users;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(games::router())
        .merge(stats::router())
        .merge(users::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
