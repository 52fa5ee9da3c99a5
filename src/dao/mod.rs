/// Database model definitions.
pub mod models;
/// Storage abstraction layer for database operations.
pub mod storage;
/// Game registry, membership and counter persistence.
pub mod vote_store;
