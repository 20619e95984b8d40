//! Orchestration façade
//!
//! The one layer permitted to touch more than one engine per call.
//! Handlers talk to this surface only; it owns no state of its own
//! and translates repository errors into the API taxonomy.

use validator::Validate;

use crate::auth::AuthService;
use crate::chat::ChatLinkManager;
use crate::db::models::{key_of, Dao, User};
use crate::db::repository::{DaoRepository, RepoError, UserRepository};
use crate::notify::NotifyAggregator;
use crate::pay::{SharedGateway, TransferPurpose, TransferRequest};
use crate::posts::comments::CommentEngine;
use crate::posts::PostEngine;
use crate::redpacket::RedpacketEngine;
use crate::utils::time::now_ts;
use crate::utils::{AppError, AppResult};
use shared::{MsgFromType, Visibility};

const ORDER_SUB: &str = "sub_";

#[derive(Debug, Clone, serde::Deserialize, Validate)]
pub struct CreateDaoInput {
    #[validate(length(min = 1, max = 60))]
    pub name: String,
    pub visibility: Visibility,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub introduction: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub banner: String,
}

#[derive(Debug, Clone, serde::Deserialize, Validate)]
pub struct UpdateDaoInput {
    pub introduction: Option<String>,
    pub avatar: Option<String>,
    pub banner: Option<String>,
    pub visibility: Option<Visibility>,
}

/// DAO detail plus the caller's relationship to it
#[derive(Debug, Clone, serde::Serialize)]
pub struct DaoView {
    pub id: String,
    #[serde(flatten)]
    pub dao: Dao,
    pub followed: bool,
    pub group_id: String,
}

#[derive(Clone)]
pub struct Facade {
    pub auth: AuthService,
    pub posts: PostEngine,
    pub comments: CommentEngine,
    pub redpackets: RedpacketEngine,
    pub notify: NotifyAggregator,
    chat: ChatLinkManager,
    daos: DaoRepository,
    users: UserRepository,
    gateway: SharedGateway,
    platform_address: String,
}

impl Facade {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        auth: AuthService,
        posts: PostEngine,
        comments: CommentEngine,
        redpackets: RedpacketEngine,
        notify: NotifyAggregator,
        chat: ChatLinkManager,
        daos: DaoRepository,
        users: UserRepository,
        gateway: SharedGateway,
        platform_address: String,
    ) -> Self {
        Self {
            auth,
            posts,
            comments,
            redpackets,
            notify,
            chat,
            daos,
            users,
            gateway,
            platform_address,
        }
    }

    // ========== Users ==========

    pub async fn user_profile(&self, address: &str) -> AppResult<User> {
        let address = crate::utils::validation::normalize_address(address);
        self.users
            .find_by_address(&address)
            .await?
            .filter(|u| !u.is_del)
            .ok_or(AppError::NoExistUser(address))
    }

    pub async fn update_user(
        &self,
        user_key: &str,
        nickname: Option<String>,
        avatar: Option<String>,
    ) -> AppResult<User> {
        Ok(self.users.update_profile(user_key, nickname, avatar).await?)
    }

    // ========== DAOs ==========

    /// Create the DAO and its chat group, then fan a welcome note to
    /// the owner
    pub async fn create_dao(&self, owner: &str, input: CreateDaoInput) -> AppResult<DaoView> {
        input
            .validate()
            .map_err(|e| AppError::invalid(e.to_string()))?;
        let now = now_ts();
        let dao = Dao {
            id: None,
            address: owner.to_string(),
            name: input.name.clone(),
            visibility: input.visibility,
            introduction: input.introduction,
            avatar: input.avatar,
            banner: input.banner,
            follow_count: 0,
            is_del: false,
            created_on: now,
            modified_on: now,
            deleted_on: 0,
        };
        let dao = match self.daos.create(dao).await {
            Ok(dao) => dao,
            Err(RepoError::Duplicate(_)) => {
                return Err(AppError::DaoNameDuplicated(input.name));
            }
            Err(e) => return Err(e.into()),
        };
        let dao_key = key_of(&dao.id);
        let group_id = self.chat.link_dao(&dao_key, &dao.name, owner).await?;
        if let Err(e) = self
            .notify
            .send(
                &dao_key,
                MsgFromType::Dao,
                &dao.name,
                "Community created",
                &[owner.to_string()],
            )
            .await
        {
            tracing::warn!(dao = %dao_key, error = %e, "DAO welcome notification failed");
        }
        Ok(DaoView {
            id: dao_key,
            dao,
            followed: false,
            group_id,
        })
    }

    pub async fn get_dao(&self, viewer: Option<&str>, dao_key: &str) -> AppResult<DaoView> {
        let dao = self
            .daos
            .find_by_id(dao_key)
            .await?
            .ok_or_else(|| AppError::not_found("DAO not found"))?;
        let followed = match viewer {
            Some(address) => self
                .daos
                .find_bookmark(address, dao_key)
                .await?
                .is_some_and(|b| !b.is_del),
            None => false,
        };
        let group_id = self
            .daos
            .find_chat_group(dao_key)
            .await?
            .map(|g| g.group_id)
            .unwrap_or_default();
        Ok(DaoView {
            id: dao_key.to_string(),
            dao,
            followed,
            group_id,
        })
    }

    pub async fn update_dao(
        &self,
        caller: &str,
        dao_key: &str,
        input: UpdateDaoInput,
    ) -> AppResult<Dao> {
        let dao = self
            .daos
            .find_by_id(dao_key)
            .await?
            .ok_or_else(|| AppError::not_found("DAO not found"))?;
        if dao.address != caller {
            return Err(AppError::no_permission("Not the DAO owner"));
        }
        Ok(self
            .daos
            .update_profile(
                dao_key,
                input.introduction,
                input.avatar,
                input.banner,
                input.visibility,
            )
            .await?)
    }

    pub async fn my_daos(&self, owner: &str) -> AppResult<Vec<Dao>> {
        Ok(self.daos.list_by_owner(owner).await?)
    }

    pub async fn suggest_daos(&self, query: &str, limit: u64) -> AppResult<Vec<Dao>> {
        Ok(self.daos.suggest(query, limit).await?)
    }

    pub async fn bookmarked_daos(&self, address: &str) -> AppResult<Vec<Dao>> {
        let bookmarks = self.daos.bookmarks_of(address).await?;
        let keys = bookmarks.into_iter().map(|b| b.dao_id).collect();
        Ok(self.daos.find_by_ids(keys).await?)
    }

    /// Follow. Public DAOs complete immediately; private DAOs submit
    /// a subscription payment and complete on the `sub_dao` webhook.
    pub async fn follow_dao(&self, address: &str, dao_key: &str) -> AppResult<bool> {
        let dao = self
            .daos
            .find_by_id(dao_key)
            .await?
            .ok_or_else(|| AppError::not_found("DAO not found"))?;
        if self
            .daos
            .find_bookmark(address, dao_key)
            .await?
            .is_some_and(|b| !b.is_del)
        {
            return Err(AppError::AlreadySubscribed(dao.name));
        }
        if dao.visibility.is_public() {
            self.complete_follow(address, dao_key).await?;
            return Ok(true);
        }
        // Paid subscription; membership lands when the webhook fires
        let order_id = format!("{ORDER_SUB}{dao_key}_{address}");
        self.gateway
            .transfer(TransferRequest {
                order_id,
                from: address.to_string(),
                to: self.platform_address.clone(),
                amount: "0".to_string(),
                purpose: TransferPurpose::SubscribeDao,
                notify_url: String::new(),
            })
            .await?;
        Ok(false)
    }

    /// Chat membership and the bookmark row move in lockstep: the
    /// gateway call goes first and a failed local write rolls the
    /// membership back.
    pub async fn complete_follow(&self, address: &str, dao_key: &str) -> AppResult<()> {
        self.chat.join(dao_key, address).await?;
        if let Err(e) = self.daos.follow(address, dao_key).await {
            if let Err(leave) = self.chat.leave(dao_key, address).await {
                tracing::warn!(dao = %dao_key, error = %leave,
                    "Orphaned chat membership after failed follow");
            }
            return match e {
                RepoError::Duplicate(msg) => Err(AppError::AlreadySubscribed(msg)),
                other => Err(other.into()),
            };
        }
        Ok(())
    }

    pub async fn unfollow_dao(&self, address: &str, dao_key: &str) -> AppResult<()> {
        self.chat.leave(dao_key, address).await?;
        if let Err(e) = self.daos.unfollow(address, dao_key).await {
            if let Err(join) = self.chat.join(dao_key, address).await {
                tracing::warn!(dao = %dao_key, error = %join,
                    "Chat membership diverged after failed unfollow");
            }
            return Err(e.into());
        }
        Ok(())
    }

    // ========== Payment webhook ==========

    /// Dispatch a settled payment by method
    pub async fn handle_pay_notify(
        &self,
        method: &str,
        order_id: &str,
        tx_id: &str,
        succeeded: bool,
    ) -> AppResult<()> {
        match method {
            "send_redpacket" | "claim_redpacket" | "refund_redpacket" => {
                self.redpackets
                    .handle_notify(order_id, tx_id, succeeded)
                    .await
            }
            "sub_dao" => {
                let rest = order_id
                    .strip_prefix(ORDER_SUB)
                    .ok_or_else(|| AppError::PayNotify(format!("Bad order {order_id}")))?;
                let (dao_key, address) = rest
                    .split_once('_')
                    .ok_or_else(|| AppError::PayNotify(format!("Bad order {order_id}")))?;
                if succeeded {
                    self.complete_follow(address, dao_key).await?;
                }
                Ok(())
            }
            other => Err(AppError::PayNotify(format!("Unknown method {other}"))),
        }
    }

    // ========== Cancellation sweep ==========

    /// Tear down everything a cancelled user owns. Runs from the
    /// background sweeper; each user is processed independently so a
    /// failure does not stall the batch.
    pub async fn sweep_cancelled(&self, batch: u64) -> AppResult<usize> {
        let pending = self.users.find_cancelled(batch).await?;
        let mut swept = 0;
        for user in pending {
            let user_key = key_of(&user.id);
            if let Err(e) = self.teardown_user(&user_key, &user.address).await {
                tracing::error!(address = %user.address, error = %e, "User teardown failed");
                continue;
            }
            swept += 1;
        }
        Ok(swept)
    }

    async fn teardown_user(&self, user_key: &str, address: &str) -> AppResult<()> {
        self.posts.purge_author(address).await?;
        // Owned DAOs go away with their chat groups
        let dao_keys = self.daos.hard_delete_by_owner(address).await?;
        for dao_key in &dao_keys {
            if let Err(e) = self.chat.unlink_dao(dao_key).await {
                tracing::warn!(dao = %dao_key, error = %e, "Chat group teardown failed");
            }
        }
        self.daos.hard_delete_bookmarks_of(address).await?;
        if let Err(e) = self.chat.unlink_user(address).await {
            tracing::warn!(address = %address, error = %e, "Chat identity teardown failed");
        }
        self.users.hard_delete(user_key).await?;
        tracing::info!(address = %address, daos = dao_keys.len(), "Cancelled user swept");
        Ok(())
    }
}
