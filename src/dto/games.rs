use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{dto::validation::validate_game_name, services::vote_service::ReplaceSummary};

/// Body of `POST /games/mine`.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AddGameRequest {
    /// Game name as typed by the user.
    #[validate(custom(function = "validate_game_name"))]
    pub game: String,
}

/// Body of `PUT /games/mine`. The list becomes the caller's whole selection.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReplaceGamesRequest {
    /// Game names as typed; duplicates and unusable names are skipped.
    pub games: Vec<String>,
}

/// Generic acknowledgement message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    /// Human readable result.
    pub message: String,
}

/// Outcome of a full selection replacement.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReplaceGamesResponse {
    /// Human readable result.
    pub message: String,
    /// Games newly added to the selection.
    pub added: usize,
    /// Games dropped from the selection.
    pub removed: usize,
    /// Entries ignored as unusable.
    pub skipped: usize,
}

impl From<ReplaceSummary> for ReplaceGamesResponse {
    fn from(summary: ReplaceSummary) -> Self {
        Self {
            message: "games updated".into(),
            added: summary.added,
            removed: summary.removed,
            skipped: summary.skipped,
        }
    }
}
