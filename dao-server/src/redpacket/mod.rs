//! Red-Packet Engine
//!
//! Lifecycle: submit (payment pending) -> success (claimable) ->
//! timeout refund. A claim is gated twice: an atomic KV share counter
//! keeps the fast path contention-free, and a per-packet mutex
//! serializes the balance split so lucky amounts always conserve the
//! paid total.

pub mod pubsub;

use dashmap::DashMap;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;
use validator::Validate;

use crate::cache::{redpacket_key, KvStore};
use crate::db::models::{Redpacket, RedpacketClaim};
use crate::db::repository::{RedpacketRepository, RepoError};
use crate::pay::{SharedGateway, TransferPurpose, TransferRequest};
use crate::utils::time::now_ts;
use crate::utils::{AppError, AppResult};
use pubsub::PaySignals;
use shared::{Paged, Pagination, PayStatus, RedpacketType};

/// Order ids carry a purpose prefix so the webhook can route
const ORDER_SEND: &str = "rp_";
const ORDER_CLAIM: &str = "rc_";
const ORDER_REFUND: &str = "rf_";

/// How long the create call waits for the gateway webhook before
/// handing back a still-pending packet
const SETTLE_WAIT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, serde::Deserialize, Validate)]
pub struct CreatePacketInput {
    #[validate(length(min = 1, max = 120))]
    pub title: String,
    #[serde(rename = "type")]
    pub packet_type: RedpacketType,
    /// Number of shares
    #[validate(range(min = 1, max = 1000))]
    pub total: i64,
    /// Lucky: the full amount to split. Average: the per-share amount.
    pub amount: String,
}

#[derive(Clone)]
pub struct RedpacketEngine {
    repo: RedpacketRepository,
    kv: Arc<dyn KvStore>,
    gateway: SharedGateway,
    signals: Arc<PaySignals>,
    /// Serializes the balance split per packet
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
    platform_address: String,
    ttl_secs: i64,
}

impl RedpacketEngine {
    pub fn new(
        repo: RedpacketRepository,
        kv: Arc<dyn KvStore>,
        gateway: SharedGateway,
        platform_address: String,
        ttl_secs: i64,
    ) -> Self {
        Self {
            repo,
            kv,
            gateway,
            signals: Arc::new(PaySignals::new()),
            locks: Arc::new(DashMap::new()),
            platform_address,
            ttl_secs,
        }
    }

    pub fn signals(&self) -> Arc<PaySignals> {
        self.signals.clone()
    }

    // ========== Create ==========

    pub async fn create(&self, sender: &str, input: CreatePacketInput) -> AppResult<Redpacket> {
        input
            .validate()
            .map_err(|e| AppError::invalid(e.to_string()))?;
        let per_or_total = parse_amount(&input.amount)?;
        let total = input.total as u128;
        let (paid, avg) = match input.packet_type {
            RedpacketType::Average => {
                let paid = per_or_total
                    .checked_mul(total)
                    .ok_or_else(|| AppError::invalid("Amount overflow"))?;
                (paid, per_or_total)
            }
            RedpacketType::Lucky => {
                // Every share must be at least one unit
                if per_or_total < total {
                    return Err(AppError::invalid(
                        "Lucky packet amount must cover one unit per share",
                    ));
                }
                (per_or_total, per_or_total / total)
            }
        };

        let now = now_ts();
        let key = Uuid::new_v4().simple().to_string();
        let packet = Redpacket {
            id: None,
            address: sender.to_string(),
            title: input.title,
            packet_type: input.packet_type,
            total: input.total,
            amount: paid.to_string(),
            avg_amount: avg.to_string(),
            balance: paid.to_string(),
            claim_count: input.total,
            tx_id: String::new(),
            refund_tx_id: String::new(),
            pay_status: PayStatus::Submit,
            refund_status: None,
            is_timeout: false,
            created_on: now,
            modified_on: now,
        };
        self.repo.create(&key, packet).await?;

        // Register before submitting so a fast webhook cannot race us
        let order_id = format!("{ORDER_SEND}{key}");
        let rx = self.signals.register(&order_id);
        let tx_id = self
            .gateway
            .transfer(TransferRequest {
                order_id: order_id.clone(),
                from: sender.to_string(),
                to: self.platform_address.clone(),
                amount: paid.to_string(),
                purpose: TransferPurpose::SendRedpacket,
                notify_url: String::new(),
            })
            .await;
        let tx_id = match tx_id {
            Ok(tx_id) => tx_id,
            Err(e) => {
                self.signals.forget(&order_id);
                self.repo
                    .set_pay_status(&key, PayStatus::Failed, "")
                    .await?;
                return Err(e);
            }
        };
        // Only the tx id; a fast webhook may already have flipped the status
        self.repo.set_tx(&key, &tx_id).await?;

        // Hand back a confirmed packet when settlement is quick
        if let Some(status) = self.signals.wait(&order_id, rx, SETTLE_WAIT).await {
            if status == PayStatus::Failed {
                return Err(AppError::PayNotify("Red packet payment failed".to_string()));
            }
        }
        self.repo
            .find_by_id(&key)
            .await?
            .ok_or_else(|| AppError::not_found("Red packet not found"))
    }

    // ========== Claim ==========

    pub async fn claim(&self, claimer: &str, packet_key: &str) -> AppResult<RedpacketClaim> {
        let packet = self
            .repo
            .find_by_id(packet_key)
            .await?
            .ok_or_else(|| AppError::not_found("Red packet not found"))?;
        if packet.pay_status != PayStatus::Success || packet.is_timeout {
            return Err(AppError::RedpacketFinished);
        }
        if let Some(existing) = self.repo.find_claim(packet_key, claimer).await? {
            return Ok(existing);
        }

        // Fast gate: atomic share counter
        let counter = redpacket_key(packet_key);
        if self.kv.incr_by(&counter, -1).await < 0 {
            self.kv.incr_by(&counter, 1).await;
            return Err(AppError::RedpacketFinished);
        }

        match self.claim_locked(claimer, packet_key).await {
            Ok(claim) => Ok(claim),
            Err(e) => {
                // Give the share back on any failure past the gate
                self.kv.incr_by(&counter, 1).await;
                Err(e)
            }
        }
    }

    /// The split itself, serialized per packet
    async fn claim_locked(&self, claimer: &str, packet_key: &str) -> AppResult<RedpacketClaim> {
        let lock = self
            .locks
            .entry(packet_key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let packet = self
            .repo
            .find_by_id(packet_key)
            .await?
            .ok_or_else(|| AppError::not_found("Red packet not found"))?;
        let balance = parse_amount(&packet.balance)?;
        let remaining = packet.claim_count.max(0) as u128;
        if remaining == 0 || balance == 0 {
            return Err(AppError::RedpacketFinished);
        }

        let amount = split_amount(packet.packet_type, balance, remaining, &packet.avg_amount)?;
        let new_balance = balance - amount;

        let now = now_ts();
        let claim = RedpacketClaim {
            id: None,
            redpacket_id: packet_key.to_string(),
            address: claimer.to_string(),
            amount: amount.to_string(),
            tx_id: String::new(),
            pay_status: PayStatus::Submit,
            created_on: now,
            modified_on: now,
        };
        let claim = match self
            .repo
            .insert_claim(claim, &new_balance.to_string())
            .await
        {
            Ok(claim) => claim,
            Err(RepoError::Duplicate(_)) => {
                // Lost a race with ourselves; the existing claim wins
                return self
                    .repo
                    .find_claim(packet_key, claimer)
                    .await?
                    .ok_or_else(|| AppError::internal("duplicate claim vanished"));
            }
            Err(e) => return Err(e.into()),
        };

        // Payout; the webhook flips the claim to Success
        let claim_key = crate::db::models::key_of(&claim.id);
        let order_id = format!("{ORDER_CLAIM}{claim_key}");
        match self
            .gateway
            .transfer(TransferRequest {
                order_id,
                from: self.platform_address.clone(),
                to: claimer.to_string(),
                amount: amount.to_string(),
                purpose: TransferPurpose::ClaimRedpacket,
                notify_url: String::new(),
            })
            .await
        {
            Ok(tx_id) => {
                self.repo.set_claim_tx(&claim_key, &tx_id).await?;
            }
            Err(e) => {
                // Claim stands; payout retries through reconciliation
                tracing::warn!(packet = %packet_key, claim = %claim_key, error = %e,
                    "Red packet payout submission failed");
            }
        }
        Ok(claim)
    }

    // ========== Webhook ==========

    /// Route a gateway settlement by its order id prefix
    pub async fn handle_notify(
        &self,
        order_id: &str,
        tx_id: &str,
        succeeded: bool,
    ) -> AppResult<()> {
        if let Some(key) = order_id.strip_prefix(ORDER_SEND) {
            let status = if succeeded {
                PayStatus::Success
            } else {
                PayStatus::Failed
            };
            let packet = self
                .repo
                .find_by_id(key)
                .await?
                .ok_or_else(|| AppError::PayNotify(format!("Unknown order {order_id}")))?;
            self.repo.set_pay_status(key, status, tx_id).await?;
            if succeeded {
                // Shares become claimable only now
                let counter = redpacket_key(key);
                self.kv.del(&counter).await;
                self.kv.incr_by(&counter, packet.total).await;
            }
            self.signals.notify(order_id, status);
            Ok(())
        } else if order_id.starts_with(ORDER_CLAIM) {
            let status = if succeeded {
                PayStatus::Success
            } else {
                PayStatus::Failed
            };
            self.repo.set_claim_status_by_tx(tx_id, status).await?;
            Ok(())
        } else if let Some(key) = order_id.strip_prefix(ORDER_REFUND) {
            let status = if succeeded {
                PayStatus::Refund
            } else {
                PayStatus::Failed
            };
            self.repo.set_refund_status(key, status).await?;
            Ok(())
        } else {
            Err(AppError::PayNotify(format!("Unknown order {order_id}")))
        }
    }

    // ========== Timeout refunds ==========

    /// Expire claimable packets past the TTL and refund what is left.
    /// Returns the number of packets expired.
    pub async fn expire_and_refund(&self) -> AppResult<usize> {
        let cutoff = now_ts() - self.ttl_secs;
        let expired = self.repo.timed_out(cutoff).await?;
        let mut count = 0;
        for packet in expired {
            let key = crate::db::models::key_of(&packet.id);
            self.repo.mark_timeout(&key).await?;
            self.kv.del(&redpacket_key(&key)).await;
            count += 1;

            let balance = parse_amount(&packet.balance).unwrap_or(0);
            if balance == 0 {
                continue;
            }
            let order_id = format!("{ORDER_REFUND}{key}");
            // set_refund_request is the once-only guard
            if !self.repo.set_refund_request(&key, &order_id).await? {
                continue;
            }
            if let Err(e) = self
                .gateway
                .transfer(TransferRequest {
                    order_id,
                    from: self.platform_address.clone(),
                    to: packet.address.clone(),
                    amount: balance.to_string(),
                    purpose: TransferPurpose::RefundRedpacket,
                    notify_url: String::new(),
                })
                .await
            {
                tracing::warn!(packet = %key, error = %e, "Refund submission failed");
            }
        }
        Ok(count)
    }

    // ========== Queries ==========

    pub async fn detail(&self, packet_key: &str) -> AppResult<(Redpacket, Vec<RedpacketClaim>)> {
        let packet = self
            .repo
            .find_by_id(packet_key)
            .await?
            .ok_or_else(|| AppError::not_found("Red packet not found"))?;
        let claims = self.repo.claims_of(packet_key).await?;
        Ok((packet, claims))
    }

    pub async fn sent_by(
        &self,
        address: &str,
        pager: Pagination,
    ) -> AppResult<Paged<Redpacket>> {
        let (rows, total) = self
            .repo
            .sent_by(address, pager.offset(), pager.limit())
            .await?;
        Ok(Paged::new(rows, pager, total))
    }

    pub async fn claimed_by(
        &self,
        address: &str,
        pager: Pagination,
    ) -> AppResult<Paged<RedpacketClaim>> {
        let (rows, total) = self
            .repo
            .claimed_by(address, pager.offset(), pager.limit())
            .await?;
        Ok(Paged::new(rows, pager, total))
    }
}

fn parse_amount(s: &str) -> AppResult<u128> {
    let value: u128 = s
        .parse()
        .map_err(|_| AppError::invalid(format!("Bad amount: {s}")))?;
    if value == 0 {
        return Err(AppError::invalid("Amount must be positive"));
    }
    Ok(value)
}

/// One share of the remaining balance. Invariants: every share is at
/// least 1 unit, the last share takes the whole balance, and shares
/// never dip into what later claims minimally need.
fn split_amount(
    packet_type: RedpacketType,
    balance: u128,
    remaining: u128,
    avg_amount: &str,
) -> AppResult<u128> {
    if remaining == 1 {
        return Ok(balance);
    }
    match packet_type {
        RedpacketType::Average => {
            let avg = parse_amount(avg_amount)?;
            Ok(avg.min(balance - (remaining - 1)))
        }
        RedpacketType::Lucky => {
            let reserve = remaining - 1;
            let max_take = balance - reserve;
            // Classic doubled-average upper bound
            let upper = ((balance / remaining) * 2).clamp(1, max_take);
            let amount = if upper <= 1 {
                1
            } else {
                rand::thread_rng().gen_range(1..=upper)
            };
            Ok(amount)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lucky_split_conserves_total() {
        for seed_total in [10u128, 1000, 123_456] {
            let shares = 7u128;
            let mut balance = seed_total;
            let mut remaining = shares;
            let mut sum = 0u128;
            while remaining > 0 {
                let amount =
                    split_amount(RedpacketType::Lucky, balance, remaining, "0").unwrap();
                assert!(amount >= 1);
                assert!(amount <= balance - (remaining - 1));
                sum += amount;
                balance -= amount;
                remaining -= 1;
            }
            assert_eq!(sum, seed_total);
            assert_eq!(balance, 0);
        }
    }

    #[test]
    fn average_split_is_exact() {
        let avg = 25u128;
        let shares = 4u128;
        let mut balance = avg * shares;
        for remaining in (1..=shares).rev() {
            let amount =
                split_amount(RedpacketType::Average, balance, remaining, "25").unwrap();
            assert_eq!(amount, avg);
            balance -= amount;
        }
        assert_eq!(balance, 0);
    }

    #[test]
    fn minimal_lucky_packet_gives_units() {
        // balance == remaining forces 1 unit each
        let mut balance = 5u128;
        for remaining in (1..=5u128).rev() {
            let amount = split_amount(RedpacketType::Lucky, balance, remaining, "0").unwrap();
            assert_eq!(amount, 1);
            balance -= amount;
        }
        assert_eq!(balance, 0);
    }

    #[test]
    fn bad_amounts_rejected() {
        assert!(parse_amount("0").is_err());
        assert!(parse_amount("-5").is_err());
        assert!(parse_amount("1.5").is_err());
        assert!(parse_amount("abc").is_err());
        assert_eq!(parse_amount("1000").unwrap(), 1000);
    }
}
