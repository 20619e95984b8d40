//! Comment Repository

use super::{BaseRepository, CountRow, RepoError, RepoResult, record_id};
use crate::db::models::{Comment, CommentContent, CommentReply};
use crate::utils::time::now_ts;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const TABLE: &str = "comment";

#[derive(Clone)]
pub struct CommentRepository {
    base: BaseRepository,
}

impl CommentRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Persist a comment with its content parts and bump the post's
    /// comment stats, all in one transaction. The caller has already
    /// verified the comment ceiling.
    pub async fn create_with_contents(
        &self,
        comment_key: &str,
        comment: Comment,
        contents: Vec<CommentContent>,
        post_key: &str,
    ) -> RepoResult<Comment> {
        let mut result = self
            .base
            .db()
            .query(
                "BEGIN TRANSACTION; \
                 CREATE $rid CONTENT $comment; \
                 INSERT INTO comment_content $contents; \
                 UPDATE $post SET comment_count += 1, latest_replied_on = $now, modified_on = $now; \
                 COMMIT TRANSACTION;",
            )
            .bind(("rid", record_id(TABLE, comment_key)))
            .bind(("comment", comment))
            .bind(("contents", contents))
            .bind(("post", record_id("post", post_key)))
            .bind(("now", now_ts()))
            .await?;
        let rows: Vec<Comment> = result.take(0)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| RepoError::Database("Failed to create comment".to_string()))
    }

    pub async fn find_by_id(&self, key: &str) -> RepoResult<Option<Comment>> {
        let comment: Option<Comment> = self.base.db().select((TABLE, key)).await?;
        Ok(comment.filter(|c| !c.is_del))
    }

    pub async fn list_by_post(
        &self,
        post_key: &str,
        offset: u64,
        limit: u64,
    ) -> RepoResult<(Vec<Comment>, u64)> {
        let mut result = self
            .base
            .db()
            .query(
                "SELECT * FROM comment WHERE post_id = $pid AND is_del = false \
                 ORDER BY created_on DESC LIMIT $limit START $offset; \
                 SELECT count() FROM comment WHERE post_id = $pid AND is_del = false GROUP ALL;",
            )
            .bind(("pid", post_key.to_string()))
            .bind(("limit", limit))
            .bind(("offset", offset))
            .await?;
        let comments: Vec<Comment> = result.take(0)?;
        let counts: Vec<CountRow> = result.take(1)?;
        let total = counts.first().map(|r| r.count as u64).unwrap_or(0);
        Ok((comments, total))
    }

    pub async fn contents_of(&self, comment_keys: Vec<String>) -> RepoResult<Vec<CommentContent>> {
        if comment_keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM comment_content WHERE comment_id IN $keys ORDER BY sort")
            .bind(("keys", comment_keys))
            .await?;
        Ok(result.take(0)?)
    }

    pub async fn replies_of(&self, comment_key: &str) -> RepoResult<Vec<CommentReply>> {
        let mut result = self
            .base
            .db()
            .query(
                "SELECT * FROM comment_reply WHERE comment_id = $cid AND is_del = false \
                 ORDER BY created_on ASC",
            )
            .bind(("cid", comment_key.to_string()))
            .await?;
        Ok(result.take(0)?)
    }

    pub async fn create_reply(&self, reply: CommentReply) -> RepoResult<CommentReply> {
        let comment_rid = record_id(TABLE, &reply.comment_id);
        let mut result = self
            .base
            .db()
            .query(
                "BEGIN TRANSACTION; \
                 CREATE comment_reply CONTENT $reply; \
                 UPDATE $comment SET reply_count += 1, modified_on = $now; \
                 COMMIT TRANSACTION;",
            )
            .bind(("reply", reply))
            .bind(("comment", comment_rid))
            .bind(("now", now_ts()))
            .await?;
        let rows: Vec<CommentReply> = result.take(0)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| RepoError::Database("Failed to create reply".to_string()))
    }

    /// Delete one comment with contents and replies, dropping the
    /// post's comment count
    pub async fn delete_cascade(&self, comment_key: &str, post_key: &str) -> RepoResult<()> {
        self.base
            .db()
            .query(
                "BEGIN TRANSACTION; \
                 DELETE comment_content WHERE comment_id = $cid; \
                 DELETE comment_reply WHERE comment_id = $cid; \
                 DELETE $rid; \
                 UPDATE $post SET comment_count = math::max(comment_count - 1, 0), modified_on = $now; \
                 COMMIT TRANSACTION;",
            )
            .bind(("cid", comment_key.to_string()))
            .bind(("rid", record_id(TABLE, comment_key)))
            .bind(("post", record_id("post", post_key)))
            .bind(("now", now_ts()))
            .await?;
        Ok(())
    }
}
