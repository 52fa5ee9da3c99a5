//! game-vote-back binary entrypoint wiring the REST layer to the selected storage backend.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use game_vote_back::{
    config::{AppConfig, StorageBackend},
    dao::vote_store::memory::MemoryVoteStore,
    routes,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let backend = StorageBackend::from_env();
    let app_state = AppState::new(config);

    start_storage(app_state.clone(), backend).await?;
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, ?backend, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Install the in-memory store directly, or spawn the supervisor that keeps a
/// database-backed store connected.
async fn start_storage(state: SharedState, backend: StorageBackend) -> anyhow::Result<()> {
    match backend {
        StorageBackend::Memory => {
            state
                .install_vote_store(Arc::new(MemoryVoteStore::new()))
                .await;
            info!("using in-memory storage; data is lost on restart");
        }
        StorageBackend::Mongo => spawn_mongo_supervisor(state)?,
        StorageBackend::Couch => spawn_couch_supervisor(state)?,
    }
    Ok(())
}

#[cfg(feature = "mongo-store")]
fn spawn_mongo_supervisor(state: SharedState) -> anyhow::Result<()> {
    use game_vote_back::{
        dao::{
            storage::StorageError,
            vote_store::{
                VoteStore,
                mongodb::{MongoConfig, MongoVoteStore},
            },
        },
        services::storage_supervisor,
    };

    tokio::spawn(storage_supervisor::run(state, || async {
        let config = MongoConfig::from_env().await?;
        let store = MongoVoteStore::connect(config).await?;
        Ok::<_, StorageError>(Arc::new(store) as Arc<dyn VoteStore>)
    }));
    Ok(())
}

#[cfg(not(feature = "mongo-store"))]
fn spawn_mongo_supervisor(_state: SharedState) -> anyhow::Result<()> {
    anyhow::bail!("MongoDB backend requested but the `mongo-store` feature is disabled")
}

#[cfg(feature = "couch-store")]
fn spawn_couch_supervisor(state: SharedState) -> anyhow::Result<()> {
    use game_vote_back::{
        dao::{
            storage::StorageError,
            vote_store::{
                VoteStore,
                couchdb::{CouchConfig, CouchVoteStore},
            },
        },
        services::storage_supervisor,
    };

    // Fail fast on a missing base URL rather than retrying forever.
    let config = CouchConfig::from_env().context("reading CouchDB configuration")?;
    tokio::spawn(storage_supervisor::run(state, move || {
        let config = config.clone();
        async move {
            let store = CouchVoteStore::connect(config).await?;
            Ok::<_, StorageError>(Arc::new(store) as Arc<dyn VoteStore>)
        }
    }));
    Ok(())
}

#[cfg(not(feature = "couch-store"))]
fn spawn_couch_supervisor(_state: SharedState) -> anyhow::Result<()> {
    anyhow::bail!("CouchDB backend requested but the `couch-store` feature is disabled")
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
