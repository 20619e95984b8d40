//! Red-packet models
//!
//! Amounts are on-chain integer denominations; they are stored as
//! decimal strings and computed as `u128` in the engine.

use serde::{Deserialize, Serialize};
use shared::{PayStatus, RedpacketType};
use surrealdb::RecordId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Redpacket {
    pub id: Option<RecordId>,
    /// Sender wallet address
    pub address: String,
    pub title: String,
    #[serde(rename = "type")]
    pub packet_type: RedpacketType,
    /// Total number of shares
    pub total: i64,
    /// Paid amount (for average packets: avg_amount * total)
    pub amount: String,
    /// Per-share amount for average packets, "0" for lucky
    pub avg_amount: String,
    /// Remaining unclaimed balance
    pub balance: String,
    /// Remaining unclaimed shares, decreasing from `total` to 0
    pub claim_count: i64,
    /// Outgoing payment tx id (sender -> platform)
    #[serde(default)]
    pub tx_id: String,
    /// Refund tx id (platform -> sender), set once
    #[serde(default)]
    pub refund_tx_id: String,
    pub pay_status: PayStatus,
    #[serde(default)]
    pub refund_status: Option<PayStatus>,
    #[serde(default)]
    pub is_timeout: bool,
    pub created_on: i64,
    pub modified_on: i64,
}

/// One wallet's claim on a red packet; (redpacket_id, address) unique
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedpacketClaim {
    pub id: Option<RecordId>,
    pub redpacket_id: String,
    pub address: String,
    pub amount: String,
    /// Inbound payment tx id (platform -> claimer)
    #[serde(default)]
    pub tx_id: String,
    pub pay_status: PayStatus,
    pub created_on: i64,
    pub modified_on: i64,
}
