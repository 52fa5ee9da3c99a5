use mongodb::bson::{self, DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{GameEntity, UserEntity};

/// Game document as read back from the `games` collection. The `voters`
/// array lives in the same document but is projected away on reads.
#[derive(Debug, Clone, Deserialize)]
pub struct MongoGameDocument {
    #[serde(rename = "_id")]
    id: bson::Uuid,
    key: String,
    name: String,
    #[serde(default)]
    votes: i64,
    created_at: DateTime,
}

impl From<MongoGameDocument> for GameEntity {
    fn from(value: MongoGameDocument) -> Self {
        Self {
            id: from_bson_uuid(value.id),
            key: value.key,
            name: value.name,
            votes: u64::try_from(value.votes).unwrap_or(0),
            created_at: value.created_at.to_system_time(),
        }
    }
}

/// Id-only projection used when listing a user's selection.
#[derive(Debug, Deserialize)]
pub struct MongoGameIdDocument {
    #[serde(rename = "_id")]
    pub id: bson::Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoUserDocument {
    #[serde(rename = "_id")]
    id: String,
    display_name: String,
    avatar_ref: Option<String>,
    updated_at: DateTime,
}

impl From<UserEntity> for MongoUserDocument {
    fn from(value: UserEntity) -> Self {
        Self {
            id: value.id,
            display_name: value.display_name,
            avatar_ref: value.avatar_ref,
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl From<MongoUserDocument> for UserEntity {
    fn from(value: MongoUserDocument) -> Self {
        Self {
            id: value.id,
            display_name: value.display_name,
            avatar_ref: value.avatar_ref,
            updated_at: value.updated_at.to_system_time(),
        }
    }
}

/// Fields written only when an upsert creates the game document.
pub fn new_game_fields(id: Uuid, name: &str) -> Document {
    doc! {
        "_id": to_bson_uuid(id),
        "name": name,
        "votes": 0_i64,
        "voters": [],
        "created_at": DateTime::now(),
    }
}

pub fn to_bson_uuid(id: Uuid) -> bson::Uuid {
    bson::Uuid::from_bytes(id.into_bytes())
}

pub fn from_bson_uuid(id: bson::Uuid) -> Uuid {
    Uuid::from_bytes(id.bytes())
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": to_bson_uuid(id)}
}
