//! Notification Repository
//!
//! Msg bodies, the per-recipient fan-out rows, read watermarks and
//! organ broadcasts.

use super::{BaseRepository, CountRow, RepoError, RepoResult, record_id};
use crate::db::models::{Msg, MsgRead, MsgSend, MsgSys, Organ};
use crate::utils::time::now_ts;
use shared::MsgFromType;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

#[derive(Clone)]
pub struct MsgRepository {
    base: BaseRepository,
}

impl MsgRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Persist a message body and its fan-out rows in one transaction
    pub async fn create_with_fanout(
        &self,
        msg_key: &str,
        msg: Msg,
        sends: Vec<MsgSend>,
    ) -> RepoResult<Msg> {
        let mut result = self
            .base
            .db()
            .query(
                "BEGIN TRANSACTION; \
                 CREATE $rid CONTENT $msg; \
                 INSERT INTO msg_send $sends; \
                 COMMIT TRANSACTION;",
            )
            .bind(("rid", record_id("msg", msg_key)))
            .bind(("msg", msg))
            .bind(("sends", sends))
            .await?;
        let rows: Vec<Msg> = result.take(0)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| RepoError::Database("Failed to create message".to_string()))
    }

    /// Persist a system broadcast and its fan-out rows
    pub async fn create_sys_with_fanout(
        &self,
        sys_key: &str,
        sys: MsgSys,
        sends: Vec<MsgSend>,
    ) -> RepoResult<MsgSys> {
        let mut result = self
            .base
            .db()
            .query(
                "BEGIN TRANSACTION; \
                 CREATE $rid CONTENT $sys; \
                 INSERT INTO msg_send $sends; \
                 COMMIT TRANSACTION;",
            )
            .bind(("rid", record_id("msg_sys", sys_key)))
            .bind(("sys", sys))
            .bind(("sends", sends))
            .await?;
        let rows: Vec<MsgSys> = result.take(0)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| RepoError::Database("Failed to create system message".to_string()))
    }

    /// Fan-out rows for a recipient, newest first
    pub async fn sends_to(&self, to: &str) -> RepoResult<Vec<MsgSend>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM msg_send WHERE to_address = $to ORDER BY created_on DESC")
            .bind(("to", to.to_string()))
            .await?;
        Ok(result.take(0)?)
    }

    pub async fn unread_count(&self, from: &str, to: &str, read_on: i64) -> RepoResult<i64> {
        let mut result = self
            .base
            .db()
            .query(
                "SELECT count() FROM msg_send \
                 WHERE from_address = $from AND to_address = $to AND created_on > $read_on \
                 GROUP ALL",
            )
            .bind(("from", from.to_string()))
            .bind(("to", to.to_string()))
            .bind(("read_on", read_on))
            .await?;
        let rows: Vec<CountRow> = result.take(0)?;
        Ok(rows.first().map(|r| r.count).unwrap_or(0))
    }

    pub async fn find_read(&self, from: &str, to: &str) -> RepoResult<Option<MsgRead>> {
        let mut result = self
            .base
            .db()
            .query(
                "SELECT * FROM msg_read WHERE from_address = $from AND to_address = $to LIMIT 1",
            )
            .bind(("from", from.to_string()))
            .bind(("to", to.to_string()))
            .await?;
        let rows: Vec<MsgRead> = result.take(0)?;
        Ok(rows.into_iter().next())
    }

    /// Upsert the read watermark to now
    pub async fn put_read(&self, from: &str, to: &str) -> RepoResult<()> {
        let now = now_ts();
        match self.find_read(from, to).await? {
            Some(row) => {
                let rid = row
                    .id
                    .ok_or_else(|| RepoError::Database("msg_read row without id".to_string()))?;
                self.base
                    .db()
                    .query("UPDATE $rid SET read_on = $now")
                    .bind(("rid", rid))
                    .bind(("now", now))
                    .await?;
            }
            None => {
                let row = MsgRead {
                    id: None,
                    from_address: from.to_string(),
                    to_address: to.to_string(),
                    read_on: now,
                };
                let _: Option<MsgRead> = self.base.db().create("msg_read").content(row).await?;
            }
        }
        Ok(())
    }

    /// Delete a (sender, recipient) thread: fan-out rows, the read
    /// watermark, and the bodies when the sender is a user.
    pub async fn delete_pair(&self, from: &str, to: &str, from_type: MsgFromType) -> RepoResult<()> {
        let delete_bodies = from_type == MsgFromType::User;
        self.base
            .db()
            .query(
                "BEGIN TRANSACTION; \
                 LET $mids = (SELECT VALUE msg_id FROM msg_send \
                              WHERE from_address = $from AND to_address = $to AND from_type = $ft); \
                 IF $bodies THEN DELETE msg WHERE record::id(id) IN $mids END; \
                 DELETE msg_send WHERE from_address = $from AND to_address = $to AND from_type = $ft; \
                 DELETE msg_read WHERE from_address = $from AND to_address = $to; \
                 COMMIT TRANSACTION;",
            )
            .bind(("from", from.to_string()))
            .bind(("to", to.to_string()))
            .bind(("ft", from_type))
            .bind(("bodies", delete_bodies))
            .await?;
        Ok(())
    }

    /// Delete one message for a recipient
    pub async fn delete_one(&self, send_key: &str, to: &str) -> RepoResult<()> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM msg_send WHERE id = $rid AND to_address = $to LIMIT 1")
            .bind(("rid", record_id("msg_send", send_key)))
            .bind(("to", to.to_string()))
            .await?;
        let rows: Vec<MsgSend> = result.take(0)?;
        let send = rows
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::NotFound(format!("message {} not found", send_key)))?;

        let delete_body = send.from_type == MsgFromType::User && !send.msg_id.is_empty();
        self.base
            .db()
            .query(
                "BEGIN TRANSACTION; \
                 IF $body THEN DELETE $msg END; \
                 DELETE $send; \
                 COMMIT TRANSACTION;",
            )
            .bind(("body", delete_body))
            .bind(("msg", record_id("msg", &send.msg_id)))
            .bind(("send", record_id("msg_send", send_key)))
            .await?;
        Ok(())
    }

    pub async fn find_msgs(&self, keys: Vec<String>) -> RepoResult<Vec<Msg>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let rids: Vec<_> = keys.iter().map(|k| record_id("msg", k)).collect();
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM msg WHERE id IN $rids")
            .bind(("rids", rids))
            .await?;
        Ok(result.take(0)?)
    }

    pub async fn find_sys_msgs(&self, keys: Vec<String>) -> RepoResult<Vec<MsgSys>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let rids: Vec<_> = keys.iter().map(|k| record_id("msg_sys", k)).collect();
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM msg_sys WHERE id IN $rids")
            .bind(("rids", rids))
            .await?;
        Ok(result.take(0)?)
    }

    pub async fn find_organ(&self, key: &str) -> RepoResult<Option<Organ>> {
        let organ: Option<Organ> = self.base.db().select(("organ", key)).await?;
        Ok(organ)
    }
}
