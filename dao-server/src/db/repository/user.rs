//! User Repository

use super::{BaseRepository, RepoError, RepoResult, record_id};
use crate::db::models::User;
use crate::utils::time::now_ts;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const TABLE: &str = "user";

#[derive(Clone)]
pub struct UserRepository {
    base: BaseRepository,
}

impl UserRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find a user by wallet address, including cancelled ones.
    /// Callers decide how `is_del` maps to WaitForDelete.
    pub async fn find_by_address(&self, address: &str) -> RepoResult<Option<User>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM user WHERE address = $address LIMIT 1")
            .bind(("address", address.to_string()))
            .await?;
        let users: Vec<User> = result.take(0)?;
        Ok(users.into_iter().next())
    }

    /// Create the user on first login
    pub async fn create(&self, user: User) -> RepoResult<User> {
        let created: Option<User> = self.base.db().create(TABLE).content(user).await?;
        created.ok_or_else(|| RepoError::Database("Failed to create user".to_string()))
    }

    /// Record a successful login
    pub async fn touch_login(&self, key: &str) -> RepoResult<()> {
        let rid = record_id(TABLE, key);
        self.base
            .db()
            .query("UPDATE $rid SET login_on = $now, modified_on = $now")
            .bind(("rid", rid))
            .bind(("now", now_ts()))
            .await?;
        Ok(())
    }

    /// Update profile fields (empty strings leave the field untouched)
    pub async fn update_profile(
        &self,
        key: &str,
        nickname: Option<String>,
        avatar: Option<String>,
    ) -> RepoResult<User> {
        let rid = record_id(TABLE, key);
        let mut result = self
            .base
            .db()
            .query(
                "UPDATE $rid SET \
                 nickname = IF $nickname != NONE THEN $nickname ELSE nickname END, \
                 avatar = IF $avatar != NONE THEN $avatar ELSE avatar END, \
                 modified_on = $now \
                 RETURN AFTER",
            )
            .bind(("rid", rid))
            .bind(("nickname", nickname))
            .bind(("avatar", avatar))
            .bind(("now", now_ts()))
            .await?;
        let users: Vec<User> = result.take(0)?;
        users
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::NotFound(format!("User {} not found", key)))
    }

    /// Persist the chat-gateway auth token
    pub async fn set_chat_token(&self, key: &str, token: String) -> RepoResult<()> {
        let rid = record_id(TABLE, key);
        self.base
            .db()
            .query("UPDATE $rid SET chat_token = $token, modified_on = $now")
            .bind(("rid", rid))
            .bind(("token", token))
            .bind(("now", now_ts()))
            .await?;
        Ok(())
    }

    /// Mark a user as cancelled; the sweeper hard-deletes later
    pub async fn mark_cancelled(&self, key: &str) -> RepoResult<()> {
        let rid = record_id(TABLE, key);
        self.base
            .db()
            .query("UPDATE $rid SET is_del = true, deleted_on = $now, modified_on = $now")
            .bind(("rid", rid))
            .bind(("now", now_ts()))
            .await?;
        Ok(())
    }

    /// Users waiting for the cancellation sweep
    pub async fn find_cancelled(&self, limit: u64) -> RepoResult<Vec<User>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM user WHERE is_del = true LIMIT $limit")
            .bind(("limit", limit))
            .await?;
        Ok(result.take(0)?)
    }

    /// Final hard delete at the end of the sweep
    pub async fn hard_delete(&self, key: &str) -> RepoResult<()> {
        let rid = record_id(TABLE, key);
        self.base
            .db()
            .query("DELETE $rid")
            .bind(("rid", rid))
            .await?;
        Ok(())
    }

    /// Batch-resolve users for post/message formatting
    pub async fn find_by_addresses(&self, addresses: Vec<String>) -> RepoResult<Vec<User>> {
        if addresses.is_empty() {
            return Ok(Vec::new());
        }
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM user WHERE address IN $addresses")
            .bind(("addresses", addresses))
            .await?;
        Ok(result.take(0)?)
    }
}
