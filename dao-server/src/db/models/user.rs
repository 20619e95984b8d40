//! User model

use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

/// A wallet-identified user, created on first successful login.
///
/// Cancellation flips `is_del`; the background sweeper later hard
/// deletes the row together with everything the user owns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Option<RecordId>,
    /// Wallet address, lowercase, unique
    pub address: String,
    pub nickname: String,
    #[serde(default)]
    pub avatar: String,
    /// Chat-gateway auth token, issued when the chat identity is created
    #[serde(default)]
    pub chat_token: String,
    /// Last successful login (Unix seconds)
    #[serde(default)]
    pub login_on: i64,
    #[serde(default)]
    pub is_del: bool,
    pub created_on: i64,
    pub modified_on: i64,
    #[serde(default)]
    pub deleted_on: i64,
}

impl User {
    pub fn new(address: String, now: i64) -> Self {
        // Default nickname is the truncated address
        let nickname = if address.len() > 10 {
            format!("{}…{}", &address[..6], &address[address.len() - 4..])
        } else {
            address.clone()
        };
        Self {
            id: None,
            address,
            nickname,
            avatar: String::new(),
            chat_token: String::new(),
            login_on: now,
            is_del: false,
            created_on: now,
            modified_on: now,
            deleted_on: 0,
        }
    }
}
