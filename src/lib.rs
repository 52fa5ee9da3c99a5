//! Library crate for game-vote-back, exposing modules for binaries and integration tests.

pub mod config;
/// Persistence layer: models, storage errors and backends.
pub mod dao;
/// HTTP request and response bodies.
pub mod dto;
/// Service and HTTP error types.
pub mod error;
/// Axum route trees.
pub mod routes;
/// Business logic on top of the vote store.
pub mod services;
/// Shared application state.
pub mod state;
