use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI document for the game voting API.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::games::list_games,
        crate::routes::games::list_my_games,
        crate::routes::games::replace_my_games,
        crate::routes::games::add_my_game,
        crate::routes::games::remove_my_game,
        crate::routes::stats::global_statistics,
        crate::routes::users::get_user,
        crate::routes::users::upsert_user,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::games::AddGameRequest,
            crate::dto::games::ReplaceGamesRequest,
            crate::dto::games::ActionResponse,
            crate::dto::games::ReplaceGamesResponse,
            crate::dto::stats::GameStatistic,
            crate::dto::users::UserPayload,
            crate::dto::users::UserResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "games", description = "Game registry and per-user selections"),
        (name = "stats", description = "Vote totals"),
        (name = "users", description = "User directory"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/healthcheck",
            "/games",
            "/games/mine",
            "/games/mine/{name}",
            "/stats",
            "/users",
            "/users/{id}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
