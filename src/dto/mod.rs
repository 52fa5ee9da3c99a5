use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Selection and registry bodies.
pub mod games;
/// Health check body.
pub mod health;
/// Statistics rows and query.
pub mod stats;
/// User profile bodies.
pub mod users;
/// Custom `validator` checks.
pub mod validation;

fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
