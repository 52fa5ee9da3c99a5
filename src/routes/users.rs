use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use axum_valid::Valid;

use crate::{
    dto::users::{UserPayload, UserResponse},
    error::AppError,
    services::user_service,
    state::SharedState,
};

/// User directory used by the authentication layer.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/users", put(upsert_user))
        .route("/users/{id}", get(get_user))
}

/// Fetch a stored user profile.
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    params(("id" = String, Path, description = "Identity provider user id")),
    responses(
        (status = 200, description = "User profile", body = UserResponse),
        (status = 404, description = "Unknown user")
    )
)]
pub async fn get_user(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    Ok(Json(user_service::get_user_by_id(&state, &id).await?.into()))
}

/// Create or overwrite a user profile.
#[utoipa::path(
    put,
    path = "/users",
    tag = "users",
    request_body = UserPayload,
    responses(
        (status = 200, description = "Stored profile", body = UserResponse),
        (status = 400, description = "Invalid profile")
    )
)]
pub async fn upsert_user(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<UserPayload>>,
) -> Result<Json<UserResponse>, AppError> {
    let user = user_service::add_or_update_user(&state, payload.into()).await?;
    Ok(Json(user.into()))
}
