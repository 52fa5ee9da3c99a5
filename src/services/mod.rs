/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Game name to matching key folding.
pub mod normalizer;
/// Game registration and name resolution.
pub mod registry_service;
/// Read-only vote totals.
pub mod statistics_service;
/// Storage connection supervisor with reconnect backoff.
pub mod storage_supervisor;
/// User profile directory.
pub mod user_service;
/// Per-user game selections and vote counters.
pub mod vote_service;
