//! DAO, bookmark and chat-group link models

use serde::{Deserialize, Serialize};
use shared::Visibility;
use surrealdb::RecordId;

/// A community: owner, profile, follower count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dao {
    pub id: Option<RecordId>,
    /// Owner wallet address
    pub address: String,
    /// Unique among non-deleted DAOs
    pub name: String,
    pub visibility: Visibility,
    #[serde(default)]
    pub introduction: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub banner: String,
    #[serde(default)]
    pub follow_count: i64,
    #[serde(default)]
    pub is_del: bool,
    pub created_on: i64,
    pub modified_on: i64,
    #[serde(default)]
    pub deleted_on: i64,
}

/// (follower, DAO) follow record
///
/// Re-follow restores the soft-deleted row instead of inserting a new
/// one; the unique (address, dao_id) index holds across both states.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaoBookmark {
    pub id: Option<RecordId>,
    pub address: String,
    pub dao_id: String,
    #[serde(default)]
    pub is_del: bool,
    pub created_on: i64,
    pub modified_on: i64,
    #[serde(default)]
    pub deleted_on: i64,
}

/// 1:1 binding of a DAO to its external chat group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatGroup {
    pub id: Option<RecordId>,
    pub dao_id: String,
    /// Deterministic group id at the chat gateway
    pub group_id: String,
    /// Owner wallet address
    pub address: String,
    pub created_on: i64,
}
