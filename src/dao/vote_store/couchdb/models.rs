use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::dao::models::{GameEntity, GameId, UserEntity};

use super::error::CouchDaoError;

pub const GAME_PREFIX: &str = "game::";
pub const GAME_KEY_PREFIX: &str = "gamekey::";
pub const USER_PREFIX: &str = "user::";
pub const END_SUFFIX: &str = "\u{ffff}";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    #[serde(default)]
    pub doc: Option<Value>,
}

/// Body returned by CouchDB for a successful write.
#[derive(Debug, Deserialize)]
pub struct WriteResponse {
    pub rev: String,
}

/// Unique claim on a normalized key. Created without a revision, so only the
/// first writer of a given key succeeds. The claimed display name travels
/// with it so a missing game document can be rebuilt from the winner's data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchGameKeyDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    pub game_id: GameId,
    pub name: String,
}

impl CouchGameKeyDocument {
    pub fn claim(key: &str, game_id: GameId, name: String) -> Self {
        Self {
            id: game_key_doc_id(key),
            rev: None,
            game_id,
            name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchGameDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub game: GameBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameBody {
    pub key: String,
    pub name: String,
    pub votes: u64,
    /// Kept sorted so membership checks are a binary search.
    pub voters: Vec<String>,
    pub created_at: SystemTime,
}

impl GameBody {
    pub fn new(key: String, name: String) -> Self {
        Self {
            key,
            name,
            votes: 0,
            voters: Vec::new(),
            created_at: SystemTime::now(),
        }
    }

    /// Insert the voter and bump the counter; `false` when already present.
    pub fn add_voter(&mut self, user_id: &str) -> bool {
        match self.voters.binary_search_by(|voter| voter.as_str().cmp(user_id)) {
            Ok(_) => false,
            Err(position) => {
                self.voters.insert(position, user_id.to_owned());
                self.votes += 1;
                true
            }
        }
    }

    /// Drop the voter and decrement the counter; `false` when absent.
    pub fn remove_voter(&mut self, user_id: &str) -> bool {
        match self.voters.binary_search_by(|voter| voter.as_str().cmp(user_id)) {
            Ok(position) => {
                self.voters.remove(position);
                self.votes = self.votes.saturating_sub(1);
                true
            }
            Err(_) => false,
        }
    }

    pub fn has_voter(&self, user_id: &str) -> bool {
        self.voters
            .binary_search_by(|voter| voter.as_str().cmp(user_id))
            .is_ok()
    }
}

impl CouchGameDocument {
    pub fn new(id: GameId, body: GameBody) -> Self {
        Self {
            id: game_doc_id(id),
            rev: None,
            game: body,
        }
    }

    pub fn game_id(&self) -> Result<GameId, CouchDaoError> {
        extract_uuid(&self.id)
    }

    pub fn try_into_entity(self) -> Result<GameEntity, CouchDaoError> {
        Ok(GameEntity {
            id: self.game_id()?,
            key: self.game.key,
            name: self.game.name,
            votes: self.game.votes,
            created_at: self.game.created_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchUserDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub user: UserEntity,
}

impl From<(UserEntity, Option<String>)> for CouchUserDocument {
    fn from((user, rev): (UserEntity, Option<String>)) -> Self {
        Self {
            id: user_doc_id(&user.id),
            rev,
            user,
        }
    }
}

pub fn game_doc_id(id: GameId) -> String {
    format!("{GAME_PREFIX}{id}")
}

pub fn game_key_doc_id(key: &str) -> String {
    format!("{GAME_KEY_PREFIX}{key}")
}

pub fn user_doc_id(id: &str) -> String {
    format!("{USER_PREFIX}{id}")
}

pub fn extract_uuid(doc_id: &str) -> Result<Uuid, CouchDaoError> {
    let (_, id) = doc_id
        .split_once("::")
        .ok_or_else(|| CouchDaoError::InvalidDocId {
            doc_id: doc_id.to_owned(),
            kind: "missing separator",
        })?;

    Uuid::parse_str(id).map_err(|_| CouchDaoError::InvalidDocId {
        doc_id: doc_id.to_owned(),
        kind: "invalid UUID",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voters_and_counter_move_together() {
        let mut body = GameBody::new("chess".into(), "Chess".into());

        assert!(body.add_voter("bob"));
        assert!(body.add_voter("alice"));
        assert!(!body.add_voter("bob"));
        assert_eq!(body.votes, 2);
        assert_eq!(body.voters, vec!["alice".to_owned(), "bob".to_owned()]);

        assert!(!body.remove_voter("carol"));
        assert!(body.remove_voter("alice"));
        assert_eq!(body.votes, 1);
        assert!(body.has_voter("bob"));
        assert!(!body.has_voter("alice"));
    }

    #[test]
    fn game_ids_round_trip_through_document_ids() {
        let id = Uuid::new_v4();
        let doc = CouchGameDocument::new(id, GameBody::new("go".into(), "Go".into()));

        assert_eq!(doc.id, format!("game::{id}"));
        assert_eq!(doc.game_id().unwrap(), id);
    }

    #[test]
    fn malformed_document_ids_are_rejected() {
        assert!(matches!(
            extract_uuid("game-123"),
            Err(CouchDaoError::InvalidDocId {
                kind: "missing separator",
                ..
            })
        ));
        assert!(matches!(
            extract_uuid("game::nope"),
            Err(CouchDaoError::InvalidDocId {
                kind: "invalid UUID",
                ..
            })
        ));
    }

    #[test]
    fn key_documents_serialize_without_revision() {
        let claim = CouchGameKeyDocument::claim("tetris", Uuid::nil(), "Tetris".into());
        let value = serde_json::to_value(&claim).unwrap();

        assert_eq!(value["_id"], "gamekey::tetris");
        assert!(value.get("_rev").is_none());
        assert_eq!(value["name"], "Tetris");
    }
}
