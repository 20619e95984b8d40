//! DAO Repository
//!
//! DAOs, follow bookmarks and the chat-group link. Follow/unfollow
//! mutate the bookmark row and the DAO's follower count in one
//! transaction.

use super::{BaseRepository, CountRow, RepoError, RepoResult, record_id};
use crate::db::models::{ChatGroup, Dao, DaoBookmark};
use crate::utils::time::now_ts;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const TABLE: &str = "dao";
const BOOKMARK: &str = "dao_bookmark";
const CHAT_GROUP: &str = "chat_group";

#[derive(Clone)]
pub struct DaoRepository {
    base: BaseRepository,
}

impl DaoRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Create a DAO; the name must be unique among non-deleted DAOs
    pub async fn create(&self, dao: Dao) -> RepoResult<Dao> {
        if self.find_by_name(&dao.name).await?.is_some() {
            return Err(RepoError::Duplicate(format!(
                "DAO '{}' already exists",
                dao.name
            )));
        }
        let created: Option<Dao> = self.base.db().create(TABLE).content(dao).await?;
        created.ok_or_else(|| RepoError::Database("Failed to create DAO".to_string()))
    }

    pub async fn find_by_id(&self, key: &str) -> RepoResult<Option<Dao>> {
        let dao: Option<Dao> = self.base.db().select((TABLE, key)).await?;
        Ok(dao.filter(|d| !d.is_del))
    }

    pub async fn find_by_name(&self, name: &str) -> RepoResult<Option<Dao>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM dao WHERE name = $name AND is_del = false LIMIT 1")
            .bind(("name", name.to_string()))
            .await?;
        let daos: Vec<Dao> = result.take(0)?;
        Ok(daos.into_iter().next())
    }

    /// Batch-resolve DAOs for post formatting
    pub async fn find_by_ids(&self, keys: Vec<String>) -> RepoResult<Vec<Dao>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let rids: Vec<_> = keys.iter().map(|k| record_id(TABLE, k)).collect();
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM dao WHERE id IN $rids AND is_del = false")
            .bind(("rids", rids))
            .await?;
        Ok(result.take(0)?)
    }

    pub async fn list_by_owner(&self, address: &str) -> RepoResult<Vec<Dao>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM dao WHERE address = $address AND is_del = false ORDER BY created_on DESC")
            .bind(("address", address.to_string()))
            .await?;
        Ok(result.take(0)?)
    }

    /// Name-prefix suggestion for the suggest endpoint
    pub async fn suggest(&self, query: &str, limit: u64) -> RepoResult<Vec<Dao>> {
        let mut result = self
            .base
            .db()
            .query(
                "SELECT * FROM dao WHERE is_del = false AND string::contains(string::lowercase(name), string::lowercase($q)) \
                 ORDER BY follow_count DESC LIMIT $limit",
            )
            .bind(("q", query.to_string()))
            .bind(("limit", limit))
            .await?;
        Ok(result.take(0)?)
    }

    pub async fn update_profile(
        &self,
        key: &str,
        introduction: Option<String>,
        avatar: Option<String>,
        banner: Option<String>,
        visibility: Option<shared::Visibility>,
    ) -> RepoResult<Dao> {
        let rid = record_id(TABLE, key);
        let mut result = self
            .base
            .db()
            .query(
                "UPDATE $rid SET \
                 introduction = IF $introduction != NONE THEN $introduction ELSE introduction END, \
                 avatar = IF $avatar != NONE THEN $avatar ELSE avatar END, \
                 banner = IF $banner != NONE THEN $banner ELSE banner END, \
                 visibility = IF $visibility != NONE THEN $visibility ELSE visibility END, \
                 modified_on = $now \
                 RETURN AFTER",
            )
            .bind(("rid", rid))
            .bind(("introduction", introduction))
            .bind(("avatar", avatar))
            .bind(("banner", banner))
            .bind(("visibility", visibility))
            .bind(("now", now_ts()))
            .await?;
        let daos: Vec<Dao> = result.take(0)?;
        daos.into_iter()
            .next()
            .ok_or_else(|| RepoError::NotFound(format!("DAO {} not found", key)))
    }

    // ========== Bookmarks (follow) ==========

    /// Bookmark row for (address, dao), deleted or not
    pub async fn find_bookmark(
        &self,
        address: &str,
        dao_key: &str,
    ) -> RepoResult<Option<DaoBookmark>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM dao_bookmark WHERE address = $address AND dao_id = $dao LIMIT 1")
            .bind(("address", address.to_string()))
            .bind(("dao", dao_key.to_string()))
            .await?;
        let rows: Vec<DaoBookmark> = result.take(0)?;
        Ok(rows.into_iter().next())
    }

    /// Follow: insert the bookmark and bump the follower count together.
    /// Re-follow restores the soft-deleted row instead of inserting.
    pub async fn follow(&self, address: &str, dao_key: &str) -> RepoResult<DaoBookmark> {
        let now = now_ts();
        let dao_rid = record_id(TABLE, dao_key);

        match self.find_bookmark(address, dao_key).await? {
            Some(bm) if !bm.is_del => Err(RepoError::Duplicate(format!(
                "already subscribed to DAO {}",
                dao_key
            ))),
            Some(bm) => {
                let bm_rid = bm.id.clone().ok_or_else(|| {
                    RepoError::Database("bookmark row without id".to_string())
                })?;
                let mut result = self
                    .base
                    .db()
                    .query(
                        "BEGIN TRANSACTION; \
                         UPDATE $bm SET is_del = false, deleted_on = 0, modified_on = $now RETURN AFTER; \
                         UPDATE $dao SET follow_count += 1, modified_on = $now; \
                         COMMIT TRANSACTION;",
                    )
                    .bind(("bm", bm_rid))
                    .bind(("dao", dao_rid))
                    .bind(("now", now))
                    .await?;
                let rows: Vec<DaoBookmark> = result.take(0)?;
                rows.into_iter()
                    .next()
                    .ok_or_else(|| RepoError::Database("Failed to restore bookmark".to_string()))
            }
            None => {
                let bookmark = DaoBookmark {
                    id: None,
                    address: address.to_string(),
                    dao_id: dao_key.to_string(),
                    is_del: false,
                    created_on: now,
                    modified_on: now,
                    deleted_on: 0,
                };
                let mut result = self
                    .base
                    .db()
                    .query(
                        "BEGIN TRANSACTION; \
                         CREATE dao_bookmark CONTENT $bm; \
                         UPDATE $dao SET follow_count += 1, modified_on = $now; \
                         COMMIT TRANSACTION;",
                    )
                    .bind(("bm", bookmark))
                    .bind(("dao", dao_rid))
                    .bind(("now", now))
                    .await?;
                let rows: Vec<DaoBookmark> = result.take(0)?;
                rows.into_iter()
                    .next()
                    .ok_or_else(|| RepoError::Database("Failed to create bookmark".to_string()))
            }
        }
    }

    /// Unfollow: soft-delete the bookmark and drop the follower count
    pub async fn unfollow(&self, address: &str, dao_key: &str) -> RepoResult<()> {
        let bm = self
            .find_bookmark(address, dao_key)
            .await?
            .filter(|b| !b.is_del)
            .ok_or_else(|| RepoError::NotFound(format!("not subscribed to DAO {}", dao_key)))?;
        let bm_rid = bm
            .id
            .ok_or_else(|| RepoError::Database("bookmark row without id".to_string()))?;
        let now = now_ts();
        self.base
            .db()
            .query(
                "BEGIN TRANSACTION; \
                 UPDATE $bm SET is_del = true, deleted_on = $now, modified_on = $now; \
                 UPDATE $dao SET follow_count = math::max(follow_count - 1, 0), modified_on = $now; \
                 COMMIT TRANSACTION;",
            )
            .bind(("bm", bm_rid))
            .bind(("dao", record_id(TABLE, dao_key)))
            .bind(("now", now))
            .await?;
        Ok(())
    }

    /// Active bookmarks of a follower (for the focus timeline)
    pub async fn bookmarks_of(&self, address: &str) -> RepoResult<Vec<DaoBookmark>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM dao_bookmark WHERE address = $address AND is_del = false ORDER BY created_on DESC")
            .bind(("address", address.to_string()))
            .await?;
        Ok(result.take(0)?)
    }

    pub async fn follower_count(&self, dao_key: &str) -> RepoResult<i64> {
        let mut result = self
            .base
            .db()
            .query("SELECT count() FROM dao_bookmark WHERE dao_id = $dao AND is_del = false GROUP ALL")
            .bind(("dao", dao_key.to_string()))
            .await?;
        let rows: Vec<CountRow> = result.take(0)?;
        Ok(rows.first().map(|r| r.count).unwrap_or(0))
    }

    // ========== Chat-group link ==========

    pub async fn save_chat_group(&self, link: ChatGroup) -> RepoResult<ChatGroup> {
        let created: Option<ChatGroup> = self.base.db().create(CHAT_GROUP).content(link).await?;
        created.ok_or_else(|| RepoError::Database("Failed to save chat group link".to_string()))
    }

    pub async fn find_chat_group(&self, dao_key: &str) -> RepoResult<Option<ChatGroup>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM chat_group WHERE dao_id = $dao LIMIT 1")
            .bind(("dao", dao_key.to_string()))
            .await?;
        let rows: Vec<ChatGroup> = result.take(0)?;
        Ok(rows.into_iter().next())
    }

    // ========== Cancellation sweep ==========

    /// Hard-delete every DAO the address owns, with bookmarks and
    /// chat-group links, in one transaction. Returns the swept keys.
    pub async fn hard_delete_by_owner(&self, address: &str) -> RepoResult<Vec<String>> {
        let daos = self.list_by_owner(address).await?;
        let keys: Vec<String> = daos
            .iter()
            .map(|d| crate::db::models::key_of(&d.id))
            .collect();
        if keys.is_empty() {
            return Ok(keys);
        }
        let rids: Vec<_> = keys.iter().map(|k| record_id(TABLE, k)).collect();
        self.base
            .db()
            .query(
                "BEGIN TRANSACTION; \
                 DELETE dao_bookmark WHERE dao_id IN $keys; \
                 DELETE chat_group WHERE dao_id IN $keys; \
                 DELETE $rids; \
                 COMMIT TRANSACTION;",
            )
            .bind(("keys", keys.clone()))
            .bind(("rids", rids))
            .await?;
        Ok(keys)
    }

    /// Hard-delete the address's own follow rows (sweep step)
    pub async fn hard_delete_bookmarks_of(&self, address: &str) -> RepoResult<()> {
        self.base
            .db()
            .query(
                "BEGIN TRANSACTION; \
                 UPDATE dao SET follow_count = math::max(follow_count - 1, 0) \
                   WHERE id IN (SELECT VALUE type::thing('dao', dao_id) FROM dao_bookmark \
                                WHERE address = $address AND is_del = false); \
                 DELETE dao_bookmark WHERE address = $address; \
                 COMMIT TRANSACTION;",
            )
            .bind(("address", address.to_string()))
            .await?;
        Ok(())
    }
}
