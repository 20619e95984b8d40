//! Chat Link Manager
//!
//! Keeps the external chat service in step with local state: users get
//! a chat identity on first login, every DAO gets a group, and
//! subscription changes move the membership. Group ids are derived
//! from the DAO key so a re-link always lands on the same group.

pub mod gateway;

use sha2::{Digest, Sha256};

use crate::db::models::ChatGroup;
use crate::db::repository::{DaoRepository, UserRepository};
use crate::utils::time::now_ts;
use crate::utils::{AppError, AppResult};
use gateway::SharedChatGateway;

/// Deterministic chat group id, derived from the DAO name so a
/// re-link always lands on the same group
pub fn group_id_for(dao_name: &str) -> String {
    let digest = hex::encode(Sha256::digest(dao_name.to_lowercase().as_bytes()));
    format!("grp_{}", &digest[..16])
}

#[derive(Clone)]
pub struct ChatLinkManager {
    gateway: SharedChatGateway,
    daos: DaoRepository,
    users: UserRepository,
}

impl ChatLinkManager {
    pub fn new(gateway: SharedChatGateway, daos: DaoRepository, users: UserRepository) -> Self {
        Self {
            gateway,
            daos,
            users,
        }
    }

    /// Create the chat identity and persist its token on the user row
    pub async fn link_user(
        &self,
        user_key: &str,
        address: &str,
        nickname: &str,
    ) -> AppResult<String> {
        let token = self.gateway.create_user(address, nickname).await?;
        self.users.set_chat_token(user_key, token.clone()).await?;
        Ok(token)
    }

    pub async fn unlink_user(&self, address: &str) -> AppResult<()> {
        self.gateway.delete_user(address).await
    }

    /// Create the DAO's group and record the link. The gateway call
    /// goes first; if the local write fails the group is torn down so
    /// a retry starts clean.
    pub async fn link_dao(&self, dao_key: &str, name: &str, owner: &str) -> AppResult<String> {
        if let Some(existing) = self.daos.find_chat_group(dao_key).await? {
            return Ok(existing.group_id);
        }
        let group_id = group_id_for(name);
        self.gateway.create_group(&group_id, name, owner).await?;
        let link = ChatGroup {
            id: None,
            dao_id: dao_key.to_string(),
            group_id: group_id.clone(),
            address: owner.to_string(),
            created_on: now_ts(),
        };
        if let Err(e) = self.daos.save_chat_group(link).await {
            if let Err(del) = self.gateway.delete_group(&group_id).await {
                tracing::warn!(group = %group_id, error = %del,
                    "Orphaned chat group after failed link");
            }
            return Err(e.into());
        }
        Ok(group_id)
    }

    pub async fn unlink_dao(&self, dao_key: &str) -> AppResult<()> {
        let Some(link) = self.daos.find_chat_group(dao_key).await? else {
            return Ok(());
        };
        self.gateway.delete_group(&link.group_id).await
    }

    pub async fn join(&self, dao_key: &str, address: &str) -> AppResult<()> {
        let link = self
            .daos
            .find_chat_group(dao_key)
            .await?
            .ok_or_else(|| AppError::not_found("Chat group not linked"))?;
        self.gateway.add_member(&link.group_id, address).await
    }

    pub async fn leave(&self, dao_key: &str, address: &str) -> AppResult<()> {
        let Some(link) = self.daos.find_chat_group(dao_key).await? else {
            return Ok(());
        };
        self.gateway.remove_member(&link.group_id, address).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_id_is_deterministic() {
        let a = group_id_for("dao-1");
        let b = group_id_for("dao-1");
        let c = group_id_for("dao-2");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("grp_"));
        assert_eq!(a.len(), 20);
    }
}
