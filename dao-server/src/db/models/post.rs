//! Post models: the post row, its ordered content parts and the
//! per-wallet engagement rows

use serde::{Deserialize, Serialize};
use shared::{ContentCategory, PostType, RefType, Visibility};
use surrealdb::RecordId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Option<RecordId>,
    /// Author wallet address
    pub address: String,
    pub dao_id: String,
    /// Set by the client, never derived (kept as the source does)
    #[serde(default)]
    pub member: i64,
    #[serde(rename = "type")]
    pub post_type: PostType,
    pub visibility: Visibility,
    /// Comma-joined tag names; the Tag collection carries quote counts
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub view_count: i64,
    #[serde(default)]
    pub collection_count: i64,
    #[serde(default)]
    pub upvote_count: i64,
    #[serde(default)]
    pub comment_count: i64,
    #[serde(default)]
    pub ref_count: i64,
    /// Sticky flag; forced to 0 when visibility turns private
    #[serde(default)]
    pub is_top: i64,
    /// When the post was pinned (for the auto-unpin sweep)
    #[serde(default)]
    pub pinned_on: i64,
    /// Referenced entity for retweets
    #[serde(default)]
    pub ref_id: Option<String>,
    #[serde(default)]
    pub ref_type: Option<RefType>,
    pub latest_replied_on: i64,
    #[serde(default)]
    pub is_del: bool,
    pub created_on: i64,
    pub modified_on: i64,
    #[serde(default)]
    pub deleted_on: i64,
}

/// One ordered content part of a post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostContent {
    pub id: Option<RecordId>,
    pub post_id: String,
    pub address: String,
    pub content: String,
    pub category: ContentCategory,
    /// Sort index inside the post
    pub sort: i64,
    pub created_on: i64,
}

/// (post, wallet) upvote row; unique pair index makes Star idempotent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostStar {
    pub id: Option<RecordId>,
    pub post_id: String,
    pub address: String,
    #[serde(default)]
    pub is_del: bool,
    pub created_on: i64,
    #[serde(default)]
    pub deleted_on: i64,
}

/// (post, wallet) bookmark row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostCollection {
    pub id: Option<RecordId>,
    pub post_id: String,
    pub address: String,
    #[serde(default)]
    pub is_del: bool,
    pub created_on: i64,
    #[serde(default)]
    pub deleted_on: i64,
}
