//! Notification models
//!
//! `Msg` holds a body; `MsgSend` is the per-recipient fan-out row so
//! recipient-scoped queries never scan the msg collection. `MsgRead`
//! is the per-(sender, recipient) last-read watermark. `MsgSys` backs
//! organ broadcasts, which carry no `Msg` body.

use serde::{Deserialize, Serialize};
use shared::MsgFromType;
use surrealdb::RecordId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Msg {
    pub id: Option<RecordId>,
    /// Author wallet for user messages, DAO id for dao messages
    pub from_address: String,
    #[serde(default)]
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub is_del: bool,
    pub created_on: i64,
}

/// Fan-out row: one per (message, recipient)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MsgSend {
    pub id: Option<RecordId>,
    /// Body key: msg for user/dao senders, msg_sys for organ senders
    #[serde(default)]
    pub msg_id: String,
    pub from_address: String,
    pub to_address: String,
    pub from_type: MsgFromType,
    pub created_on: i64,
}

/// Last-read watermark for a (sender, recipient) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MsgRead {
    pub id: Option<RecordId>,
    pub from_address: String,
    pub to_address: String,
    pub read_on: i64,
}

/// System broadcast body, sender resolved from the organ record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MsgSys {
    pub id: Option<RecordId>,
    pub organ_id: String,
    #[serde(default)]
    pub title: String,
    pub content: String,
    pub created_on: i64,
}

/// System sender identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organ {
    pub id: Option<RecordId>,
    pub name: String,
    #[serde(default)]
    pub avatar: String,
    pub created_on: i64,
}
