use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// Identifier allocated once per normalized game key.
pub type GameId = Uuid;

/// Registered game together with its cached vote counter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEntity {
    /// Stable identifier, never reassigned.
    pub id: GameId,
    /// Normalized matching key the game was registered under.
    pub key: String,
    /// First submitted spelling, kept verbatim for presentation.
    pub name: String,
    /// Number of distinct users currently holding the game in their selection.
    pub votes: u64,
    /// Registration timestamp.
    pub created_at: SystemTime,
}

/// Result of an atomic set-if-absent registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRegistration {
    /// The game stored under the requested key.
    pub game: GameEntity,
    /// `true` when this call allocated the game, `false` when it already existed.
    pub created: bool,
}

/// Outcome of a single membership transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Membership and counter were both changed.
    Applied,
    /// Membership already had the requested shape; nothing changed.
    Unchanged,
    /// The target game id does not exist.
    UnknownGame,
}

/// Minimal profile of an authenticated user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserEntity {
    /// External identity provider id.
    pub id: String,
    /// Name shown to other users.
    pub display_name: String,
    /// Avatar hash or URL as handed over by the identity provider.
    pub avatar_ref: Option<String>,
    /// Last time the profile was written.
    pub updated_at: SystemTime,
}
