//! Post Repository
//!
//! Post rows, content parts, engagement rows and the cascading
//! delete. Multi-collection writes run as single transactions; tag
//! quote accounting that must move with the post does too.

use super::{BaseRepository, CountRow, RepoError, RepoResult, record_id};
use crate::db::models::{Post, PostCollection, PostContent, PostStar, key_of};
use crate::utils::time::now_ts;
use shared::Visibility;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const TABLE: &str = "post";

/// Filter describing which posts a caller may see
#[derive(Debug, Clone, Default)]
pub struct PostQuery {
    /// Restrict to one DAO
    pub dao_key: Option<String>,
    /// Restrict to one author
    pub author: Option<String>,
    /// Viewer address; `None` means anonymous (public only)
    pub viewer: Option<String>,
    pub offset: u64,
    pub limit: u64,
}

#[derive(Clone)]
pub struct PostRepository {
    base: BaseRepository,
}

impl PostRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Persist a post and its content parts in one transaction.
    /// The caller pre-generates the post key so content rows can
    /// reference it inside the same transaction.
    pub async fn create_with_contents(
        &self,
        post_key: &str,
        post: Post,
        contents: Vec<PostContent>,
    ) -> RepoResult<Post> {
        let rid = record_id(TABLE, post_key);
        let mut result = self
            .base
            .db()
            .query(
                "BEGIN TRANSACTION; \
                 CREATE $rid CONTENT $post; \
                 INSERT INTO post_content $contents; \
                 COMMIT TRANSACTION;",
            )
            .bind(("rid", rid))
            .bind(("post", post))
            .bind(("contents", contents))
            .await?;
        let rows: Vec<Post> = result.take(0)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| RepoError::Database("Failed to create post".to_string()))
    }

    pub async fn find_by_id(&self, key: &str) -> RepoResult<Option<Post>> {
        let post: Option<Post> = self.base.db().select((TABLE, key)).await?;
        Ok(post.filter(|p| !p.is_del))
    }

    pub async fn find_by_ids(&self, keys: Vec<String>) -> RepoResult<Vec<Post>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let rids: Vec<_> = keys.iter().map(|k| record_id(TABLE, k)).collect();
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM post WHERE id IN $rids AND is_del = false")
            .bind(("rids", rids))
            .await?;
        Ok(result.take(0)?)
    }

    /// Ordered content parts for a batch of posts
    pub async fn contents_of(&self, post_keys: Vec<String>) -> RepoResult<Vec<PostContent>> {
        if post_keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM post_content WHERE post_id IN $keys ORDER BY sort")
            .bind(("keys", post_keys))
            .await?;
        Ok(result.take(0)?)
    }

    /// Cascading hard delete of a post and everything it owns, plus
    /// the tag quote decrements, in one transaction.
    pub async fn delete_cascade(&self, post_key: &str, tags: Vec<String>) -> RepoResult<()> {
        self.base
            .db()
            .query(
                "BEGIN TRANSACTION; \
                 LET $cids = (SELECT VALUE record::id(id) FROM comment WHERE post_id = $pid); \
                 DELETE comment_content WHERE comment_id IN $cids; \
                 DELETE comment_reply WHERE comment_id IN $cids; \
                 DELETE comment WHERE post_id = $pid; \
                 DELETE post_content WHERE post_id = $pid; \
                 DELETE post_star WHERE post_id = $pid; \
                 DELETE post_collection WHERE post_id = $pid; \
                 UPDATE tag SET quote_num = math::max(quote_num - 1, 0), modified_on = $now WHERE tag IN $tags; \
                 DELETE $rid; \
                 COMMIT TRANSACTION;",
            )
            .bind(("pid", post_key.to_string()))
            .bind(("tags", tags))
            .bind(("rid", record_id(TABLE, post_key)))
            .bind(("now", now_ts()))
            .await?;
        Ok(())
    }

    /// Replace the content parts and tag list of an existing post
    pub async fn replace_contents(
        &self,
        post_key: &str,
        tags: &str,
        contents: Vec<PostContent>,
    ) -> RepoResult<Post> {
        let mut result = self
            .base
            .db()
            .query(
                "BEGIN TRANSACTION; \
                 DELETE post_content WHERE post_id = $pid; \
                 INSERT INTO post_content $contents; \
                 UPDATE $rid SET tags = $tags, modified_on = $now RETURN AFTER; \
                 COMMIT TRANSACTION;",
            )
            .bind(("pid", post_key.to_string()))
            .bind(("contents", contents))
            .bind(("rid", record_id(TABLE, post_key)))
            .bind(("tags", tags.to_string()))
            .bind(("now", now_ts()))
            .await?;
        let rows: Vec<Post> = result.take(2)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| RepoError::NotFound(format!("Post {} not found", post_key)))
    }

    /// Flip visibility; private forces the sticky flag off
    pub async fn set_visibility(&self, key: &str, visibility: Visibility) -> RepoResult<Post> {
        let force_untop = !visibility.is_public();
        let mut result = self
            .base
            .db()
            .query(
                "UPDATE $rid SET visibility = $visibility, \
                 is_top = IF $untop THEN 0 ELSE is_top END, \
                 modified_on = $now \
                 RETURN AFTER",
            )
            .bind(("rid", record_id(TABLE, key)))
            .bind(("visibility", visibility))
            .bind(("untop", force_untop))
            .bind(("now", now_ts()))
            .await?;
        let rows: Vec<Post> = result.take(0)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| RepoError::NotFound(format!("Post {} not found", key)))
    }

    /// Flip the sticky flag, recording when the pin went up
    pub async fn stick(&self, key: &str) -> RepoResult<Post> {
        let now = now_ts();
        let mut result = self
            .base
            .db()
            .query(
                "UPDATE $rid SET is_top = 1 - is_top, \
                 pinned_on = IF is_top = 1 THEN $now ELSE 0 END, \
                 modified_on = $now \
                 RETURN AFTER",
            )
            .bind(("rid", record_id(TABLE, key)))
            .bind(("now", now))
            .await?;
        let rows: Vec<Post> = result.take(0)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| RepoError::NotFound(format!("Post {} not found", key)))
    }

    /// Pinned posts whose pin aged past the policy window
    pub async fn expired_pins(&self, cutoff: i64) -> RepoResult<Vec<Post>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM post WHERE is_top = 1 AND pinned_on < $cutoff AND is_del = false")
            .bind(("cutoff", cutoff))
            .await?;
        Ok(result.take(0)?)
    }

    /// Public posts touched since `since` (re-index reconciliation)
    pub async fn public_modified_since(&self, since: i64) -> RepoResult<Vec<Post>> {
        let mut result = self
            .base
            .db()
            .query(
                "SELECT * FROM post WHERE visibility = $public AND is_del = false AND modified_on >= $since",
            )
            .bind(("public", Visibility::Public))
            .bind(("since", since))
            .await?;
        Ok(result.take(0)?)
    }

    pub async fn bump_comment_stats(&self, key: &str) -> RepoResult<()> {
        self.base
            .db()
            .query("UPDATE $rid SET comment_count += 1, latest_replied_on = $now, modified_on = $now")
            .bind(("rid", record_id(TABLE, key)))
            .bind(("now", now_ts()))
            .await?;
        Ok(())
    }

    pub async fn incr_view(&self, key: &str) -> RepoResult<()> {
        self.base
            .db()
            .query("UPDATE $rid SET view_count += 1")
            .bind(("rid", record_id(TABLE, key)))
            .await?;
        Ok(())
    }

    pub async fn incr_ref_count(&self, key: &str) -> RepoResult<()> {
        self.base
            .db()
            .query("UPDATE $rid SET ref_count += 1, modified_on = $now")
            .bind(("rid", record_id(TABLE, key)))
            .bind(("now", now_ts()))
            .await?;
        Ok(())
    }

    // ========== Stars ==========

    pub async fn find_star(&self, post_key: &str, address: &str) -> RepoResult<Option<PostStar>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM post_star WHERE post_id = $pid AND address = $address LIMIT 1")
            .bind(("pid", post_key.to_string()))
            .bind(("address", address.to_string()))
            .await?;
        let rows: Vec<PostStar> = result.take(0)?;
        Ok(rows.into_iter().next())
    }

    /// Insert (or restore) the star row and bump the counter together.
    /// An active row short-circuits at the engine; this only runs when
    /// the pair has no live star.
    pub async fn star(&self, post_key: &str, address: &str) -> RepoResult<()> {
        let now = now_ts();
        match self.find_star(post_key, address).await? {
            Some(row) if !row.is_del => Ok(()),
            Some(row) => {
                let star_rid = row
                    .id
                    .ok_or_else(|| RepoError::Database("star row without id".to_string()))?;
                self.base
                    .db()
                    .query(
                        "BEGIN TRANSACTION; \
                         UPDATE $star SET is_del = false, deleted_on = 0; \
                         UPDATE $rid SET upvote_count += 1, modified_on = $now; \
                         COMMIT TRANSACTION;",
                    )
                    .bind(("star", star_rid))
                    .bind(("rid", record_id(TABLE, post_key)))
                    .bind(("now", now))
                    .await?;
                Ok(())
            }
            None => {
                let star = PostStar {
                    id: None,
                    post_id: post_key.to_string(),
                    address: address.to_string(),
                    is_del: false,
                    created_on: now,
                    deleted_on: 0,
                };
                self.base
                    .db()
                    .query(
                        "BEGIN TRANSACTION; \
                         CREATE post_star CONTENT $star; \
                         UPDATE $rid SET upvote_count += 1, modified_on = $now; \
                         COMMIT TRANSACTION;",
                    )
                    .bind(("star", star))
                    .bind(("rid", record_id(TABLE, post_key)))
                    .bind(("now", now))
                    .await?;
                Ok(())
            }
        }
    }

    pub async fn unstar(&self, post_key: &str, address: &str) -> RepoResult<()> {
        let Some(row) = self.find_star(post_key, address).await?.filter(|r| !r.is_del) else {
            return Ok(());
        };
        let star_rid = row
            .id
            .ok_or_else(|| RepoError::Database("star row without id".to_string()))?;
        let now = now_ts();
        self.base
            .db()
            .query(
                "BEGIN TRANSACTION; \
                 UPDATE $star SET is_del = true, deleted_on = $now; \
                 UPDATE $rid SET upvote_count = math::max(upvote_count - 1, 0), modified_on = $now; \
                 COMMIT TRANSACTION;",
            )
            .bind(("star", star_rid))
            .bind(("rid", record_id(TABLE, post_key)))
            .bind(("now", now))
            .await?;
        Ok(())
    }

    // ========== Collections ==========

    pub async fn find_collection(
        &self,
        post_key: &str,
        address: &str,
    ) -> RepoResult<Option<PostCollection>> {
        let mut result = self
            .base
            .db()
            .query(
                "SELECT * FROM post_collection WHERE post_id = $pid AND address = $address LIMIT 1",
            )
            .bind(("pid", post_key.to_string()))
            .bind(("address", address.to_string()))
            .await?;
        let rows: Vec<PostCollection> = result.take(0)?;
        Ok(rows.into_iter().next())
    }

    pub async fn collect(&self, post_key: &str, address: &str) -> RepoResult<()> {
        let now = now_ts();
        match self.find_collection(post_key, address).await? {
            Some(row) if !row.is_del => Ok(()),
            Some(row) => {
                let col_rid = row
                    .id
                    .ok_or_else(|| RepoError::Database("collection row without id".to_string()))?;
                self.base
                    .db()
                    .query(
                        "BEGIN TRANSACTION; \
                         UPDATE $col SET is_del = false, deleted_on = 0; \
                         UPDATE $rid SET collection_count += 1, modified_on = $now; \
                         COMMIT TRANSACTION;",
                    )
                    .bind(("col", col_rid))
                    .bind(("rid", record_id(TABLE, post_key)))
                    .bind(("now", now))
                    .await?;
                Ok(())
            }
            None => {
                let col = PostCollection {
                    id: None,
                    post_id: post_key.to_string(),
                    address: address.to_string(),
                    is_del: false,
                    created_on: now,
                    deleted_on: 0,
                };
                self.base
                    .db()
                    .query(
                        "BEGIN TRANSACTION; \
                         CREATE post_collection CONTENT $col; \
                         UPDATE $rid SET collection_count += 1, modified_on = $now; \
                         COMMIT TRANSACTION;",
                    )
                    .bind(("col", col))
                    .bind(("rid", record_id(TABLE, post_key)))
                    .bind(("now", now))
                    .await?;
                Ok(())
            }
        }
    }

    pub async fn uncollect(&self, post_key: &str, address: &str) -> RepoResult<()> {
        let Some(row) = self
            .find_collection(post_key, address)
            .await?
            .filter(|r| !r.is_del)
        else {
            return Ok(());
        };
        let col_rid = row
            .id
            .ok_or_else(|| RepoError::Database("collection row without id".to_string()))?;
        let now = now_ts();
        self.base
            .db()
            .query(
                "BEGIN TRANSACTION; \
                 UPDATE $col SET is_del = true, deleted_on = $now; \
                 UPDATE $rid SET collection_count = math::max(collection_count - 1, 0), modified_on = $now; \
                 COMMIT TRANSACTION;",
            )
            .bind(("col", col_rid))
            .bind(("rid", record_id(TABLE, post_key)))
            .bind(("now", now))
            .await?;
        Ok(())
    }

    // ========== Timeline queries ==========

    /// Paginated feed visible to the viewer: public posts, plus the
    /// viewer's own posts of any visibility. Ordered by
    /// (is_top DESC, latest_replied_on DESC).
    pub async fn timeline(&self, query: &PostQuery) -> RepoResult<(Vec<Post>, u64)> {
        let (where_clause, viewer) = Self::visibility_clause(&query.viewer);
        let mut filters = vec![where_clause];
        if query.dao_key.is_some() {
            filters.push("dao_id = $dao".to_string());
        }
        if query.author.is_some() {
            filters.push("address = $author".to_string());
        }
        let conditions = filters.join(" AND ");

        let sql = format!(
            "SELECT * FROM post WHERE {conditions} \
             ORDER BY is_top DESC, latest_replied_on DESC \
             LIMIT $limit START $offset; \
             SELECT count() FROM post WHERE {conditions} GROUP ALL;"
        );

        let mut result = self
            .base
            .db()
            .query(sql)
            .bind(("public", Visibility::Public))
            .bind(("viewer", viewer))
            .bind(("dao", query.dao_key.clone().unwrap_or_default()))
            .bind(("author", query.author.clone().unwrap_or_default()))
            .bind(("limit", query.limit))
            .bind(("offset", query.offset))
            .await?;

        let posts: Vec<Post> = result.take(0)?;
        let counts: Vec<CountRow> = result.take(1)?;
        let total = counts.first().map(|r| r.count as u64).unwrap_or(0);
        Ok((posts, total))
    }

    fn visibility_clause(viewer: &Option<String>) -> (String, String) {
        match viewer {
            Some(address) => (
                "is_del = false AND (visibility = $public OR address = $viewer)".to_string(),
                address.clone(),
            ),
            None => (
                "is_del = false AND visibility = $public".to_string(),
                String::new(),
            ),
        }
    }

    /// All posts of an author regardless of visibility (sweep)
    pub async fn all_by_author(&self, address: &str) -> RepoResult<Vec<Post>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM post WHERE address = $address AND is_del = false")
            .bind(("address", address.to_string()))
            .await?;
        Ok(result.take(0)?)
    }

    /// Media URLs attached to a post (for blob purge after delete)
    pub async fn media_urls(&self, post_key: &str) -> RepoResult<Vec<String>> {
        let contents = self.contents_of(vec![post_key.to_string()]).await?;
        Ok(contents
            .into_iter()
            .filter(|c| c.category.is_media())
            .map(|c| c.content)
            .collect())
    }

    /// Post key helper for formatted output
    pub fn key(post: &Post) -> String {
        key_of(&post.id)
    }
}
