use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::{config::AppConfig, dao::vote_store::VoteStore, error::ServiceError};

/// Reference-counted handle passed to every handler.
pub type SharedState = Arc<AppState>;

/// Central application state holding the installed storage backend and configuration.
pub struct AppState {
    vote_store: RwLock<Option<Arc<dyn VoteStore>>>,
    config: AppConfig,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            vote_store: RwLock::new(None),
            config,
            degraded: degraded_tx,
        })
    }

    /// Build a state that already has a backend installed and is not degraded.
    pub fn with_store(config: AppConfig, store: Arc<dyn VoteStore>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(false);
        Arc::new(Self {
            vote_store: RwLock::new(Some(store)),
            config,
            degraded: degraded_tx,
        })
    }

    /// Configuration loaded at startup.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current vote store, if one is installed.
    pub async fn vote_store(&self) -> Option<Arc<dyn VoteStore>> {
        let guard = self.vote_store.read().await;
        guard.as_ref().cloned()
    }

    /// Current vote store, or [`ServiceError::Degraded`] when none is installed.
    pub async fn require_vote_store(&self) -> Result<Arc<dyn VoteStore>, ServiceError> {
        self.vote_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new vote store implementation and leave degraded mode.
    pub async fn install_vote_store(&self, store: Arc<dyn VoteStore>) {
        {
            let mut guard = self.vote_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current vote store and enter degraded mode.
    pub async fn clear_vote_store(&self) {
        {
            let mut guard = self.vote_store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::vote_store::memory::MemoryVoteStore;

    #[tokio::test]
    async fn starts_degraded_until_a_store_is_installed() {
        let state = AppState::new(AppConfig::default());
        assert!(state.is_degraded().await);
        assert!(matches!(
            state.require_vote_store().await,
            Err(ServiceError::Degraded)
        ));

        state
            .install_vote_store(Arc::new(MemoryVoteStore::new()))
            .await;
        assert!(!state.is_degraded().await);
        assert!(state.require_vote_store().await.is_ok());
    }

    #[tokio::test]
    async fn clearing_the_store_notifies_watchers() {
        let state = AppState::with_store(AppConfig::default(), Arc::new(MemoryVoteStore::new()));
        let mut watcher = state.degraded_watcher();
        assert!(!*watcher.borrow_and_update());

        state.clear_vote_store().await;

        assert!(watcher.has_changed().unwrap());
        assert!(*watcher.borrow_and_update());
        assert!(state.vote_store().await.is_none());
    }
}
