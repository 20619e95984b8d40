//! Notification Aggregator
//!
//! Bodies are written once; a fan-out row per recipient keeps inbox
//! queries off the body collections. Unread state is a per
//! (sender, recipient) watermark: anything fanned out after the
//! watermark counts as unread.

use std::collections::HashMap;
use uuid::Uuid;

use crate::db::models::{Msg, MsgSend, MsgSys};
use crate::db::repository::{DaoRepository, MsgRepository, UserRepository};
use crate::utils::time::now_ts;
use crate::utils::{AppError, AppResult};
use serde::Serialize;
use shared::{MsgFromType, Paged, Pagination};

/// One inbox row: a sender with its latest message and unread count
#[derive(Debug, Clone, Serialize)]
pub struct MsgGroup {
    pub from_address: String,
    pub from_type: MsgFromType,
    pub name: String,
    pub avatar: String,
    pub unread: i64,
    pub total: i64,
    pub latest_title: String,
    pub latest_content: String,
    pub latest_on: i64,
}

/// One message inside a conversation
#[derive(Debug, Clone, Serialize)]
pub struct MsgItem {
    pub send_id: String,
    pub title: String,
    pub content: String,
    pub created_on: i64,
    pub read: bool,
}

#[derive(Clone)]
pub struct NotifyAggregator {
    msgs: MsgRepository,
    users: UserRepository,
    daos: DaoRepository,
}

impl NotifyAggregator {
    pub fn new(msgs: MsgRepository, users: UserRepository, daos: DaoRepository) -> Self {
        Self { msgs, users, daos }
    }

    // ========== Fan-out ==========

    /// Write one body and fan it out to every recipient
    pub async fn send(
        &self,
        from: &str,
        from_type: MsgFromType,
        title: &str,
        content: &str,
        recipients: &[String],
    ) -> AppResult<()> {
        if recipients.is_empty() {
            return Ok(());
        }
        if from_type == MsgFromType::Organ {
            return Err(AppError::invalid("Organ broadcasts use send_sys"));
        }
        let now = now_ts();
        let msg_key = Uuid::new_v4().simple().to_string();
        let msg = Msg {
            id: None,
            from_address: from.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            is_del: false,
            created_on: now,
        };
        let sends = self.fanout_rows(&msg_key, from, from_type, recipients, now);
        self.msgs.create_with_fanout(&msg_key, msg, sends).await?;
        Ok(())
    }

    /// System broadcast in the name of an organ
    pub async fn send_sys(
        &self,
        organ_key: &str,
        title: &str,
        content: &str,
        recipients: &[String],
    ) -> AppResult<()> {
        if recipients.is_empty() {
            return Ok(());
        }
        self.msgs
            .find_organ(organ_key)
            .await?
            .ok_or_else(|| AppError::not_found("Organ not found"))?;
        let now = now_ts();
        let sys_key = Uuid::new_v4().simple().to_string();
        let sys = MsgSys {
            id: None,
            organ_id: organ_key.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            created_on: now,
        };
        let sends = self.fanout_rows(&sys_key, organ_key, MsgFromType::Organ, recipients, now);
        self.msgs.create_sys_with_fanout(&sys_key, sys, sends).await?;
        Ok(())
    }

    fn fanout_rows(
        &self,
        body_key: &str,
        from: &str,
        from_type: MsgFromType,
        recipients: &[String],
        now: i64,
    ) -> Vec<MsgSend> {
        recipients
            .iter()
            .map(|to| MsgSend {
                id: None,
                msg_id: body_key.to_string(),
                from_address: from.to_string(),
                to_address: to.to_string(),
                from_type,
                created_on: now,
            })
            .collect()
    }

    // ========== Inbox ==========

    /// Inbox grouped by sender, newest group first
    pub async fn group_list(&self, to: &str) -> AppResult<Vec<MsgGroup>> {
        let sends = self.msgs.sends_to(to).await?;
        // sends arrive newest first; the first row of a group is its latest
        let mut order: Vec<(String, MsgFromType)> = Vec::new();
        let mut grouped: HashMap<(String, MsgFromType), Vec<&MsgSend>> = HashMap::new();
        for send in &sends {
            let key = (send.from_address.clone(), send.from_type);
            if !grouped.contains_key(&key) {
                order.push(key.clone());
            }
            grouped.entry(key).or_default().push(send);
        }

        let mut groups = Vec::with_capacity(order.len());
        for key in order {
            let rows = &grouped[&key];
            let (from, from_type) = (&key.0, key.1);
            let read_on = self
                .msgs
                .find_read(from, to)
                .await?
                .map(|r| r.read_on)
                .unwrap_or(0);
            let unread = self.msgs.unread_count(from, to, read_on).await?;
            let latest = rows[0];
            let (title, content) = self.resolve_body(latest).await?;
            let (name, avatar) = self.resolve_sender(from, from_type).await?;
            groups.push(MsgGroup {
                from_address: from.clone(),
                from_type,
                name,
                avatar,
                unread,
                total: rows.len() as i64,
                latest_title: title,
                latest_content: content,
                latest_on: latest.created_on,
            });
        }
        Ok(groups)
    }

    /// Messages of one conversation, newest first
    pub async fn list_pair(
        &self,
        to: &str,
        from: &str,
        from_type: MsgFromType,
        pager: Pagination,
    ) -> AppResult<Paged<MsgItem>> {
        let sends: Vec<MsgSend> = self
            .msgs
            .sends_to(to)
            .await?
            .into_iter()
            .filter(|s| s.from_address == from && s.from_type == from_type)
            .collect();
        let total = sends.len() as u64;
        let read_on = self
            .msgs
            .find_read(from, to)
            .await?
            .map(|r| r.read_on)
            .unwrap_or(0);

        let page: Vec<MsgSend> = sends
            .into_iter()
            .skip(pager.offset() as usize)
            .take(pager.limit() as usize)
            .collect();
        let body_keys: Vec<String> = page.iter().map(|s| s.msg_id.clone()).collect();
        let bodies: HashMap<String, (String, String)> = if from_type == MsgFromType::Organ {
            self.msgs
                .find_sys_msgs(body_keys)
                .await?
                .into_iter()
                .map(|m| {
                    (
                        crate::db::models::key_of(&m.id),
                        (m.title, m.content),
                    )
                })
                .collect()
        } else {
            self.msgs
                .find_msgs(body_keys)
                .await?
                .into_iter()
                .map(|m| {
                    (
                        crate::db::models::key_of(&m.id),
                        (m.title, m.content),
                    )
                })
                .collect()
        };

        let list = page
            .into_iter()
            .map(|send| {
                let (title, content) = bodies
                    .get(&send.msg_id)
                    .cloned()
                    .unwrap_or_default();
                MsgItem {
                    send_id: crate::db::models::key_of(&send.id),
                    title,
                    content,
                    created_on: send.created_on,
                    read: send.created_on <= read_on,
                }
            })
            .collect();
        Ok(Paged::new(list, pager, total))
    }

    /// Total unread across every sender
    pub async fn unread_total(&self, to: &str) -> AppResult<i64> {
        let groups = self.group_list(to).await?;
        Ok(groups.iter().map(|g| g.unread).sum())
    }

    /// Move the watermark; everything from this sender is now read
    pub async fn put_read(&self, to: &str, from: &str) -> AppResult<()> {
        self.msgs.put_read(from, to).await?;
        Ok(())
    }

    // ========== Deletion ==========

    /// Drop an entire conversation for this recipient
    pub async fn delete_pair(
        &self,
        to: &str,
        from: &str,
        from_type: MsgFromType,
    ) -> AppResult<()> {
        self.msgs.delete_pair(from, to, from_type).await?;
        Ok(())
    }

    /// Drop one fan-out row for this recipient
    pub async fn delete_one(&self, to: &str, send_key: &str) -> AppResult<()> {
        self.msgs.delete_one(send_key, to).await?;
        Ok(())
    }

    async fn resolve_body(&self, send: &MsgSend) -> AppResult<(String, String)> {
        if send.from_type == MsgFromType::Organ {
            let bodies = self.msgs.find_sys_msgs(vec![send.msg_id.clone()]).await?;
            Ok(bodies
                .into_iter()
                .next()
                .map(|m| (m.title, m.content))
                .unwrap_or_default())
        } else {
            let bodies = self.msgs.find_msgs(vec![send.msg_id.clone()]).await?;
            Ok(bodies
                .into_iter()
                .next()
                .map(|m| (m.title, m.content))
                .unwrap_or_default())
        }
    }

    async fn resolve_sender(
        &self,
        from: &str,
        from_type: MsgFromType,
    ) -> AppResult<(String, String)> {
        match from_type {
            MsgFromType::User => Ok(self
                .users
                .find_by_address(from)
                .await?
                .map(|u| (u.nickname, u.avatar))
                .unwrap_or_else(|| (from.to_string(), String::new()))),
            MsgFromType::Dao => Ok(self
                .daos
                .find_by_id(from)
                .await?
                .map(|d| (d.name, d.avatar))
                .unwrap_or_else(|| (from.to_string(), String::new()))),
            MsgFromType::Organ => Ok(self
                .msgs
                .find_organ(from)
                .await?
                .map(|o| (o.name, o.avatar))
                .unwrap_or_else(|| (from.to_string(), String::new()))),
        }
    }
}
