//! Comment threads
//!
//! Comments hang off posts, replies hang off comments. The post's
//! comment counter and latest_replied_on move inside the same
//! transaction as the comment row, so feed ordering never drifts.

use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

use super::ContentPartInput;
use crate::db::models::{key_of, Comment, CommentContent, CommentReply};
use crate::db::repository::{CommentRepository, PostRepository, UserRepository};
use crate::search::bridge::SearchBridge;
use crate::search::PostDoc;
use crate::utils::time::now_ts;
use crate::utils::{AppError, AppResult};
use serde::Serialize;
use shared::{Paged, Pagination};

#[derive(Debug, Clone, Serialize)]
pub struct FormattedReply {
    pub id: String,
    pub address: String,
    pub nickname: String,
    pub avatar: String,
    pub content: String,
    pub at_address: String,
    pub created_on: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FormattedComment {
    pub id: String,
    pub post_id: String,
    pub address: String,
    pub nickname: String,
    pub avatar: String,
    pub contents: Vec<super::format::FormattedContent>,
    pub replies: Vec<FormattedReply>,
    pub reply_count: i64,
    pub created_on: i64,
}

#[derive(Debug, Clone, serde::Deserialize, Validate)]
pub struct CreateCommentInput {
    pub post_id: String,
    #[validate(length(min = 1, max = 10), nested)]
    pub contents: Vec<ContentPartInput>,
}

#[derive(Debug, Clone, serde::Deserialize, Validate)]
pub struct CreateReplyInput {
    pub comment_id: String,
    #[validate(length(min = 1, max = 2000))]
    pub content: String,
    #[serde(default)]
    pub at_address: String,
}

#[derive(Clone)]
pub struct CommentEngine {
    comments: CommentRepository,
    posts: PostRepository,
    users: UserRepository,
    bridge: SearchBridge,
    max_comment_count: i64,
}

impl CommentEngine {
    pub fn new(
        comments: CommentRepository,
        posts: PostRepository,
        users: UserRepository,
        bridge: SearchBridge,
        max_comment_count: i64,
    ) -> Self {
        Self {
            comments,
            posts,
            users,
            bridge,
            max_comment_count,
        }
    }

    pub async fn create(&self, author: &str, input: CreateCommentInput) -> AppResult<Comment> {
        input
            .validate()
            .map_err(|e| AppError::invalid(e.to_string()))?;
        let post = self
            .posts
            .find_by_id(&input.post_id)
            .await?
            .ok_or_else(|| AppError::not_found("Post not found"))?;
        if !post.visibility.is_public() && post.address != author {
            return Err(AppError::not_found("Post not found"));
        }
        if post.comment_count >= self.max_comment_count {
            return Err(AppError::MaxCommentCount);
        }

        let now = now_ts();
        let comment_key = Uuid::new_v4().simple().to_string();
        let comment = Comment {
            id: None,
            post_id: input.post_id.clone(),
            address: author.to_string(),
            reply_count: 0,
            is_del: false,
            created_on: now,
            modified_on: now,
            deleted_on: 0,
        };
        let contents = input
            .contents
            .iter()
            .map(|part| CommentContent {
                id: None,
                comment_id: comment_key.clone(),
                address: author.to_string(),
                content: part.content.clone(),
                category: part.category,
                sort: part.sort,
                created_on: now,
            })
            .collect();
        let created = self
            .comments
            .create_with_contents(&comment_key, comment, contents, &input.post_id)
            .await?;
        self.reindex_post(&input.post_id).await?;
        Ok(created)
    }

    pub async fn reply(&self, author: &str, input: CreateReplyInput) -> AppResult<CommentReply> {
        input
            .validate()
            .map_err(|e| AppError::invalid(e.to_string()))?;
        self.comments
            .find_by_id(&input.comment_id)
            .await?
            .ok_or_else(|| AppError::not_found("Comment not found"))?;
        let reply = CommentReply {
            id: None,
            comment_id: input.comment_id,
            address: author.to_string(),
            content: input.content,
            at_address: input.at_address,
            is_del: false,
            created_on: now_ts(),
            deleted_on: 0,
        };
        Ok(self.comments.create_reply(reply).await?)
    }

    /// Comment page with contents, replies and author profiles merged
    pub async fn list(
        &self,
        post_key: &str,
        pager: Pagination,
    ) -> AppResult<Paged<FormattedComment>> {
        let (rows, total) = self
            .comments
            .list_by_post(post_key, pager.offset(), pager.limit())
            .await?;
        let keys: Vec<String> = rows.iter().map(|c| key_of(&c.id)).collect();
        let contents = self.comments.contents_of(keys.clone()).await?;
        let mut grouped: HashMap<String, Vec<super::format::FormattedContent>> = HashMap::new();
        for row in contents {
            grouped
                .entry(row.comment_id.clone())
                .or_default()
                .push(super::format::FormattedContent {
                    content: row.content,
                    category: row.category,
                    sort: row.sort,
                });
        }
        let mut replies: HashMap<String, Vec<CommentReply>> = HashMap::new();
        let mut addresses: Vec<String> = rows.iter().map(|c| c.address.clone()).collect();
        for key in &keys {
            let rs = self.comments.replies_of(key).await?;
            addresses.extend(rs.iter().map(|r| r.address.clone()));
            replies.insert(key.clone(), rs);
        }
        addresses.sort();
        addresses.dedup();
        let authors: HashMap<String, (String, String)> = self
            .users
            .find_by_addresses(addresses)
            .await?
            .into_iter()
            .map(|u| (u.address, (u.nickname, u.avatar)))
            .collect();
        let resolve = |address: &str| {
            authors
                .get(address)
                .cloned()
                .unwrap_or_else(|| (address.to_string(), String::new()))
        };

        let list = rows
            .into_iter()
            .map(|comment| {
                let key = key_of(&comment.id);
                let (nickname, avatar) = resolve(&comment.address);
                let formatted_replies = replies
                    .remove(&key)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|r| {
                        let (nickname, avatar) = resolve(&r.address);
                        FormattedReply {
                            id: key_of(&r.id),
                            address: r.address,
                            nickname,
                            avatar,
                            content: r.content,
                            at_address: r.at_address,
                            created_on: r.created_on,
                        }
                    })
                    .collect();
                FormattedComment {
                    id: key,
                    post_id: comment.post_id,
                    address: comment.address,
                    nickname,
                    avatar,
                    contents: grouped.remove(&key_of(&comment.id)).unwrap_or_default(),
                    replies: formatted_replies,
                    reply_count: comment.reply_count,
                    created_on: comment.created_on,
                }
            })
            .collect();
        Ok(Paged::new(list, pager, total))
    }

    /// Comment author or post author may delete
    pub async fn delete(&self, caller: &str, comment_key: &str) -> AppResult<()> {
        let comment = self
            .comments
            .find_by_id(comment_key)
            .await?
            .ok_or_else(|| AppError::not_found("Comment not found"))?;
        if comment.address != caller {
            let post = self
                .posts
                .find_by_id(&comment.post_id)
                .await?
                .ok_or_else(|| AppError::not_found("Post not found"))?;
            if post.address != caller {
                return Err(AppError::no_permission("Not the comment or post author"));
            }
        }
        self.comments
            .delete_cascade(comment_key, &comment.post_id)
            .await?;
        self.reindex_post(&comment.post_id).await?;
        Ok(())
    }

    /// Comment counters live on the post document too
    async fn reindex_post(&self, post_key: &str) -> AppResult<()> {
        if let Some(post) = self.posts.find_by_id(post_key).await? {
            let contents = self.posts.contents_of(vec![post_key.to_string()]).await?;
            let doc = PostDoc::from_post(&post, post_key, &contents);
            self.bridge
                .push(crate::search::bridge::IndexJob::Add(vec![doc]));
        }
        Ok(())
    }
}
