//! Tag Repository
//!
//! Quote-count accounting. Rows are created lazily on the first
//! public post carrying the tag; decrements floor at zero.

use super::{BaseRepository, RepoResult};
use crate::db::models::Tag;
use crate::utils::time::now_ts;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

#[derive(Clone)]
pub struct TagRepository {
    base: BaseRepository,
}

impl TagRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn find_by_name(&self, name: &str) -> RepoResult<Option<Tag>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM tag WHERE tag = $tag LIMIT 1")
            .bind(("tag", name.to_string()))
            .await?;
        let tags: Vec<Tag> = result.take(0)?;
        Ok(tags.into_iter().next())
    }

    /// Increment quote counts, creating missing tag rows
    pub async fn incr(&self, names: &[String], address: &str) -> RepoResult<()> {
        let now = now_ts();
        for name in names {
            let mut result = self
                .base
                .db()
                .query("UPDATE tag SET quote_num += 1, modified_on = $now WHERE tag = $tag RETURN AFTER")
                .bind(("tag", name.clone()))
                .bind(("now", now))
                .await?;
            let updated: Vec<Tag> = result.take(0)?;
            if updated.is_empty() {
                let tag = Tag {
                    id: None,
                    address: address.to_string(),
                    tag: name.clone(),
                    quote_num: 1,
                    created_on: now,
                    modified_on: now,
                };
                let _: Option<Tag> = self.base.db().create("tag").content(tag).await?;
            }
        }
        Ok(())
    }

    /// Decrement quote counts, floored at zero
    pub async fn decr(&self, names: &[String]) -> RepoResult<()> {
        if names.is_empty() {
            return Ok(());
        }
        self.base
            .db()
            .query(
                "UPDATE tag SET quote_num = math::max(quote_num - 1, 0), modified_on = $now \
                 WHERE tag IN $tags",
            )
            .bind(("tags", names.to_vec()))
            .bind(("now", now_ts()))
            .await?;
        Ok(())
    }

    /// Most-quoted tags first
    pub async fn hot(&self, limit: u64) -> RepoResult<Vec<Tag>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM tag WHERE quote_num > 0 ORDER BY quote_num DESC LIMIT $limit")
            .bind(("limit", limit))
            .await?;
        Ok(result.take(0)?)
    }
}
