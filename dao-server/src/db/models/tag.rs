//! Tag model

use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

/// Tag rows exist only for accounting: `quote_num` counts the public
/// posts currently carrying the tag, clamped at zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: Option<RecordId>,
    /// Wallet that first used the tag
    pub address: String,
    /// Tag name, unique
    pub tag: String,
    #[serde(default)]
    pub quote_num: i64,
    pub created_on: i64,
    pub modified_on: i64,
}
