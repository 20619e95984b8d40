//! Red-packet Repository

use super::{BaseRepository, CountRow, RepoError, RepoResult, record_id};
use crate::db::models::{Redpacket, RedpacketClaim};
use crate::utils::time::now_ts;
use shared::PayStatus;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const TABLE: &str = "redpacket";
const CLAIM: &str = "redpacket_claim";

#[derive(Clone)]
pub struct RedpacketRepository {
    base: BaseRepository,
}

impl RedpacketRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn create(&self, key: &str, packet: Redpacket) -> RepoResult<Redpacket> {
        let mut result = self
            .base
            .db()
            .query("CREATE $rid CONTENT $packet")
            .bind(("rid", record_id(TABLE, key)))
            .bind(("packet", packet))
            .await?;
        let rows: Vec<Redpacket> = result.take(0)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| RepoError::Database("Failed to create red packet".to_string()))
    }

    pub async fn find_by_id(&self, key: &str) -> RepoResult<Option<Redpacket>> {
        let packet: Option<Redpacket> = self.base.db().select((TABLE, key)).await?;
        Ok(packet)
    }

    /// Record the outcome of the send-payment webhook
    pub async fn set_pay_status(
        &self,
        key: &str,
        status: PayStatus,
        tx_id: &str,
    ) -> RepoResult<()> {
        self.base
            .db()
            .query("UPDATE $rid SET pay_status = $status, tx_id = $tx, modified_on = $now")
            .bind(("rid", record_id(TABLE, key)))
            .bind(("status", status))
            .bind(("tx", tx_id.to_string()))
            .bind(("now", now_ts()))
            .await?;
        Ok(())
    }

    /// Record the gateway tx id only; the webhook owns `pay_status`
    /// once the transfer is submitted
    pub async fn set_tx(&self, key: &str, tx_id: &str) -> RepoResult<()> {
        self.base
            .db()
            .query("UPDATE $rid SET tx_id = $tx, modified_on = $now")
            .bind(("rid", record_id(TABLE, key)))
            .bind(("tx", tx_id.to_string()))
            .bind(("now", now_ts()))
            .await?;
        Ok(())
    }

    pub async fn set_refund_status(&self, key: &str, status: PayStatus) -> RepoResult<()> {
        self.base
            .db()
            .query("UPDATE $rid SET refund_status = $status, modified_on = $now")
            .bind(("rid", record_id(TABLE, key)))
            .bind(("status", status))
            .bind(("now", now_ts()))
            .await?;
        Ok(())
    }

    pub async fn mark_timeout(&self, key: &str) -> RepoResult<()> {
        self.base
            .db()
            .query("UPDATE $rid SET is_timeout = true, modified_on = $now")
            .bind(("rid", record_id(TABLE, key)))
            .bind(("now", now_ts()))
            .await?;
        Ok(())
    }

    /// Record the refund request exactly once; returns false when a
    /// refund tx id is already present.
    pub async fn set_refund_request(&self, key: &str, refund_tx_id: &str) -> RepoResult<bool> {
        let mut result = self
            .base
            .db()
            .query(
                "UPDATE $rid SET refund_tx_id = $tx, refund_status = $submit, modified_on = $now \
                 WHERE refund_tx_id = '' RETURN AFTER",
            )
            .bind(("rid", record_id(TABLE, key)))
            .bind(("tx", refund_tx_id.to_string()))
            .bind(("submit", PayStatus::Submit))
            .bind(("now", now_ts()))
            .await?;
        let rows: Vec<Redpacket> = result.take(0)?;
        Ok(!rows.is_empty())
    }

    /// Insert the claim and move the packet's balance and remaining
    /// share count in one transaction. The unique
    /// (redpacket_id, address) index rejects double claims.
    pub async fn insert_claim(
        &self,
        claim: RedpacketClaim,
        new_balance: &str,
    ) -> RepoResult<RedpacketClaim> {
        let packet_rid = record_id(TABLE, &claim.redpacket_id);
        let mut result = self
            .base
            .db()
            .query(
                "BEGIN TRANSACTION; \
                 CREATE redpacket_claim CONTENT $claim; \
                 UPDATE $packet SET balance = $balance, claim_count = math::max(claim_count - 1, 0), modified_on = $now; \
                 COMMIT TRANSACTION;",
            )
            .bind(("claim", claim))
            .bind(("packet", packet_rid))
            .bind(("balance", new_balance.to_string()))
            .bind(("now", now_ts()))
            .await?;
        let rows: Vec<RedpacketClaim> = result.take(0)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| RepoError::Database("Failed to insert claim".to_string()))
    }

    pub async fn find_claim(
        &self,
        packet_key: &str,
        address: &str,
    ) -> RepoResult<Option<RedpacketClaim>> {
        let mut result = self
            .base
            .db()
            .query(
                "SELECT * FROM redpacket_claim WHERE redpacket_id = $pid AND address = $address LIMIT 1",
            )
            .bind(("pid", packet_key.to_string()))
            .bind(("address", address.to_string()))
            .await?;
        let rows: Vec<RedpacketClaim> = result.take(0)?;
        Ok(rows.into_iter().next())
    }

    pub async fn set_claim_tx(&self, claim_key: &str, tx_id: &str) -> RepoResult<()> {
        self.base
            .db()
            .query("UPDATE $rid SET tx_id = $tx, modified_on = $now")
            .bind(("rid", record_id(CLAIM, claim_key)))
            .bind(("tx", tx_id.to_string()))
            .bind(("now", now_ts()))
            .await?;
        Ok(())
    }

    /// The claim-payment webhook resolves a claim by its outgoing tx id
    pub async fn set_claim_status_by_tx(&self, tx_id: &str, status: PayStatus) -> RepoResult<()> {
        self.base
            .db()
            .query("UPDATE redpacket_claim SET pay_status = $status, modified_on = $now WHERE tx_id = $tx")
            .bind(("status", status))
            .bind(("tx", tx_id.to_string()))
            .bind(("now", now_ts()))
            .await?;
        Ok(())
    }

    pub async fn claims_of(&self, packet_key: &str) -> RepoResult<Vec<RedpacketClaim>> {
        let mut result = self
            .base
            .db()
            .query(
                "SELECT * FROM redpacket_claim WHERE redpacket_id = $pid ORDER BY created_on ASC",
            )
            .bind(("pid", packet_key.to_string()))
            .await?;
        Ok(result.take(0)?)
    }

    /// Successful packets whose claim window expired and which have
    /// not been flagged yet
    pub async fn timed_out(&self, cutoff: i64) -> RepoResult<Vec<Redpacket>> {
        let mut result = self
            .base
            .db()
            .query(
                "SELECT * FROM redpacket WHERE pay_status = $success AND is_timeout = false AND created_on < $cutoff",
            )
            .bind(("success", PayStatus::Success))
            .bind(("cutoff", cutoff))
            .await?;
        Ok(result.take(0)?)
    }

    pub async fn sent_by(
        &self,
        address: &str,
        offset: u64,
        limit: u64,
    ) -> RepoResult<(Vec<Redpacket>, u64)> {
        let mut result = self
            .base
            .db()
            .query(
                "SELECT * FROM redpacket WHERE address = $address \
                 ORDER BY created_on DESC LIMIT $limit START $offset; \
                 SELECT count() FROM redpacket WHERE address = $address GROUP ALL;",
            )
            .bind(("address", address.to_string()))
            .bind(("limit", limit))
            .bind(("offset", offset))
            .await?;
        let rows: Vec<Redpacket> = result.take(0)?;
        let counts: Vec<CountRow> = result.take(1)?;
        let total = counts.first().map(|r| r.count as u64).unwrap_or(0);
        Ok((rows, total))
    }

    pub async fn claimed_by(
        &self,
        address: &str,
        offset: u64,
        limit: u64,
    ) -> RepoResult<(Vec<RedpacketClaim>, u64)> {
        let mut result = self
            .base
            .db()
            .query(
                "SELECT * FROM redpacket_claim WHERE address = $address \
                 ORDER BY created_on DESC LIMIT $limit START $offset; \
                 SELECT count() FROM redpacket_claim WHERE address = $address GROUP ALL;",
            )
            .bind(("address", address.to_string()))
            .bind(("limit", limit))
            .bind(("offset", offset))
            .await?;
        let rows: Vec<RedpacketClaim> = result.take(0)?;
        let counts: Vec<CountRow> = result.take(1)?;
        let total = counts.first().map(|r| r.count as u64).unwrap_or(0);
        Ok((rows, total))
    }
}
