use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    routing::{delete, get},
};
use validator::Validate;

use crate::{
    dto::games::{ActionResponse, AddGameRequest, ReplaceGamesRequest, ReplaceGamesResponse},
    error::AppError,
    routes::identity::UserIdentity,
    services::{registry_service, vote_service},
    state::SharedState,
};

/// Game registry and per-user selection endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games", get(list_games))
        .route(
            "/games/mine",
            get(list_my_games).put(replace_my_games).post(add_my_game),
        )
        .route("/games/mine/{name}", delete(remove_my_game))
}

/// List the display names of every registered game.
#[utoipa::path(
    get,
    path = "/games",
    tag = "games",
    responses((status = 200, description = "Known games", body = [String]))
)]
pub async fn list_games(State(state): State<SharedState>) -> Result<Json<Vec<String>>, AppError> {
    let mut names: Vec<String> = registry_service::list_all(&state)
        .await?
        .into_iter()
        .map(|game| game.name)
        .collect();
    names.sort_by_key(|name| name.to_lowercase());
    Ok(Json(names))
}

/// List the caller's selected games.
#[utoipa::path(
    get,
    path = "/games/mine",
    tag = "games",
    params(("x-user-id" = String, Header, description = "Authenticated user id")),
    responses(
        (status = 200, description = "Caller's games", body = [String]),
        (status = 401, description = "Missing identity")
    )
)]
pub async fn list_my_games(
    State(state): State<SharedState>,
    UserIdentity(user_id): UserIdentity,
) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(vote_service::user_game_names(&state, &user_id).await?))
}

/// Replace the caller's whole selection.
#[utoipa::path(
    put,
    path = "/games/mine",
    tag = "games",
    params(("x-user-id" = String, Header, description = "Authenticated user id")),
    request_body = ReplaceGamesRequest,
    responses(
        (status = 200, description = "Selection replaced", body = ReplaceGamesResponse),
        (status = 400, description = "Body is not a list of names"),
        (status = 401, description = "Missing identity")
    )
)]
pub async fn replace_my_games(
    State(state): State<SharedState>,
    UserIdentity(user_id): UserIdentity,
    payload: Result<Json<ReplaceGamesRequest>, JsonRejection>,
) -> Result<Json<ReplaceGamesResponse>, AppError> {
    let Json(request) = payload?;
    let summary = vote_service::replace_games_by_name(&state, &user_id, request.games).await?;
    Ok(Json(summary.into()))
}

/// Add one game to the caller's selection, registering it if new.
#[utoipa::path(
    post,
    path = "/games/mine",
    tag = "games",
    params(("x-user-id" = String, Header, description = "Authenticated user id")),
    request_body = AddGameRequest,
    responses(
        (status = 200, description = "Game added", body = ActionResponse),
        (status = 400, description = "Missing or empty name"),
        (status = 401, description = "Missing identity")
    )
)]
pub async fn add_my_game(
    State(state): State<SharedState>,
    UserIdentity(user_id): UserIdentity,
    payload: Result<Json<AddGameRequest>, JsonRejection>,
) -> Result<Json<ActionResponse>, AppError> {
    let Json(request) = payload?;
    request.validate()?;
    let change = vote_service::add_game_by_name(&state, &user_id, &request.game).await?;
    let message = if change.applied {
        format!("added `{}`", change.game.name)
    } else {
        format!("`{}` was already selected", change.game.name)
    };
    Ok(Json(ActionResponse { message }))
}

/// Remove one game from the caller's selection.
#[utoipa::path(
    delete,
    path = "/games/mine/{name}",
    tag = "games",
    params(
        ("x-user-id" = String, Header, description = "Authenticated user id"),
        ("name" = String, Path, description = "Game name in any spelling")
    ),
    responses(
        (status = 200, description = "Game removed", body = ActionResponse),
        (status = 401, description = "Missing identity"),
        (status = 404, description = "No such game")
    )
)]
pub async fn remove_my_game(
    State(state): State<SharedState>,
    UserIdentity(user_id): UserIdentity,
    Path(name): Path<String>,
) -> Result<Json<ActionResponse>, AppError> {
    let change = vote_service::remove_game_by_name(&state, &user_id, &name).await?;
    let message = if change.applied {
        format!("removed `{}`", change.game.name)
    } else {
        format!("`{}` was not selected", change.game.name)
    };
    Ok(Json(ActionResponse { message }))
}
