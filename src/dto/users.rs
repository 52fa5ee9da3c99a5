use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dao::models::UserEntity,
    dto::{format_system_time, validation::validate_not_blank},
    services::user_service::UserProfile,
};

/// Profile pushed by the authentication layer after a successful login.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UserPayload {
    /// Identity provider user id.
    #[validate(custom(function = "validate_not_blank"), length(max = 128))]
    pub id: String,
    /// Name shown to other users.
    #[validate(custom(function = "validate_not_blank"), length(max = 100))]
    pub display_name: String,
    /// Avatar hash or URL.
    #[serde(default)]
    #[validate(length(max = 2048))]
    pub avatar_ref: Option<String>,
}

impl From<UserPayload> for UserProfile {
    fn from(payload: UserPayload) -> Self {
        Self {
            id: payload.id,
            display_name: payload.display_name,
            avatar_ref: payload.avatar_ref,
        }
    }
}

/// Stored user profile.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    /// Identity provider user id.
    pub id: String,
    /// Name shown to other users.
    pub display_name: String,
    /// Avatar hash or URL, when one was provided.
    pub avatar_ref: Option<String>,
    /// RFC 3339 timestamp of the last upsert.
    pub updated_at: String,
}

impl From<UserEntity> for UserResponse {
    fn from(user: UserEntity) -> Self {
        Self {
            id: user.id,
            display_name: user.display_name,
            avatar_ref: user.avatar_ref,
            updated_at: format_system_time(user.updated_at),
        }
    }
}
