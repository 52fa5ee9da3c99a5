use std::time::SystemTime;

use tracing::info;

use crate::{dao::models::UserEntity, error::ServiceError, state::SharedState};

/// Profile fields accepted from the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    /// Identity provider user id.
    pub id: String,
    /// Name shown to other users.
    pub display_name: String,
    /// Avatar hash or URL; empty strings are stored as absent.
    pub avatar_ref: Option<String>,
}

/// Stored profile for `id`, or [`ServiceError::NotFound`].
pub async fn get_user_by_id(state: &SharedState, id: &str) -> Result<UserEntity, ServiceError> {
    let store = state.require_vote_store().await?;
    store
        .find_user(id.to_owned())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("user `{id}` not found")))
}

/// Upsert a profile; the last write wins.
pub async fn add_or_update_user(
    state: &SharedState,
    profile: UserProfile,
) -> Result<UserEntity, ServiceError> {
    if profile.id.trim().is_empty() {
        return Err(ServiceError::InvalidInput("user id must not be empty".into()));
    }

    let store = state.require_vote_store().await?;
    let saved = store
        .save_user(UserEntity {
            id: profile.id,
            display_name: profile.display_name,
            avatar_ref: profile.avatar_ref.filter(|avatar| !avatar.is_empty()),
            updated_at: SystemTime::now(),
        })
        .await?;

    info!(user_id = %saved.id, "saved user profile");
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{config::AppConfig, dao::vote_store::memory::MemoryVoteStore, state::AppState};

    fn profile(id: &str, name: &str) -> UserProfile {
        UserProfile {
            id: id.into(),
            display_name: name.into(),
            avatar_ref: Some(String::new()),
        }
    }

    #[tokio::test]
    async fn last_write_wins() {
        let state = AppState::with_store(AppConfig::default(), Arc::new(MemoryVoteStore::new()));

        add_or_update_user(&state, profile("42", "Ada")).await.unwrap();
        add_or_update_user(&state, profile("42", "Ada L.")).await.unwrap();

        let user = get_user_by_id(&state, "42").await.unwrap();
        assert_eq!(user.display_name, "Ada L.");
        assert_eq!(user.avatar_ref, None);
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let state = AppState::with_store(AppConfig::default(), Arc::new(MemoryVoteStore::new()));
        assert!(matches!(
            get_user_by_id(&state, "nobody").await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn blank_ids_are_rejected() {
        let state = AppState::with_store(AppConfig::default(), Arc::new(MemoryVoteStore::new()));
        assert!(matches!(
            add_or_update_user(&state, profile("  ", "Ghost")).await,
            Err(ServiceError::InvalidInput(_))
        ));
    }
}
