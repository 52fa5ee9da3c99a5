use serde::Serialize;
use utoipa::ToSchema;

/// Payload of the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `ok` while a storage backend answers, `degraded` otherwise.
    pub status: String,
}

impl HealthResponse {
    /// A backend is installed and healthy.
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }

    /// No usable backend right now.
    pub fn degraded() -> Self {
        Self {
            status: "degraded".to_string(),
        }
    }
}
