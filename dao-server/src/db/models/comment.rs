//! Comment thread models

use serde::{Deserialize, Serialize};
use shared::ContentCategory;
use surrealdb::RecordId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Option<RecordId>,
    pub post_id: String,
    pub address: String,
    #[serde(default)]
    pub reply_count: i64,
    #[serde(default)]
    pub is_del: bool,
    pub created_on: i64,
    pub modified_on: i64,
    #[serde(default)]
    pub deleted_on: i64,
}

/// Ordered content part of a comment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentContent {
    pub id: Option<RecordId>,
    pub comment_id: String,
    pub address: String,
    pub content: String,
    pub category: ContentCategory,
    pub sort: i64,
    pub created_on: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentReply {
    pub id: Option<RecordId>,
    pub comment_id: String,
    pub address: String,
    pub content: String,
    /// Wallet the reply is addressed at, if any
    #[serde(default)]
    pub at_address: String,
    #[serde(default)]
    pub is_del: bool,
    pub created_on: i64,
    #[serde(default)]
    pub deleted_on: i64,
}
