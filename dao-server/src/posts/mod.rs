//! Post Engine
//!
//! All post lifecycle flows: create, delete, visibility, pinning,
//! engagement, retweets and the timeline read path. The engine owns
//! the fan-out: every successful write nudges the search bridge and
//! the cache-index so the other read paths converge.

pub mod comments;
pub mod format;

use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::cache::{CacheIndex, IndexAction, IndexActionKind};
use crate::db::models::{Post, PostContent};
use crate::db::repository::{DaoRepository, PostQuery, PostRepository, TagRepository, UserRepository};
use crate::search::bridge::{IndexJob, SearchBridge};
use crate::search::PostDoc;
use crate::storage::BlobStore;
use crate::utils::time::now_ts;
use crate::utils::validation::{join_tags, normalize_tags, validate_link};
use crate::utils::{AppError, AppResult};
use format::{format_posts, FormattedPost};
use shared::{ContentCategory, Paged, Pagination, PostType, RefType, Visibility};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Validate)]
pub struct ContentPartInput {
    #[validate(length(min = 1, max = 8000))]
    pub content: String,
    pub category: ContentCategory,
    pub sort: i64,
}

#[derive(Debug, Clone, serde::Deserialize, Validate)]
pub struct CreatePostInput {
    /// Empty means a personal post outside any DAO
    #[serde(default)]
    pub dao_id: String,
    pub visibility: Visibility,
    #[serde(default)]
    #[validate(length(max = 9))]
    pub tags: Vec<String>,
    #[validate(length(min = 1, max = 20), nested)]
    pub contents: Vec<ContentPartInput>,
}

#[derive(Debug, Clone, serde::Deserialize, Validate)]
pub struct RetweetInput {
    pub ref_id: String,
    pub ref_type: RefType,
    /// Empty for a pure retweet, non-empty adds commentary
    #[serde(default)]
    #[validate(length(max = 20), nested)]
    pub contents: Vec<ContentPartInput>,
}

#[derive(Clone)]
pub struct PostEngine {
    posts: PostRepository,
    tags: TagRepository,
    users: UserRepository,
    daos: DaoRepository,
    bridge: SearchBridge,
    cache: CacheIndex,
    blobs: BlobStore,
}

impl PostEngine {
    pub fn new(
        posts: PostRepository,
        tags: TagRepository,
        users: UserRepository,
        daos: DaoRepository,
        bridge: SearchBridge,
        cache: CacheIndex,
        blobs: BlobStore,
    ) -> Self {
        Self {
            posts,
            tags,
            users,
            daos,
            bridge,
            cache,
            blobs,
        }
    }

    pub fn repo(&self) -> &PostRepository {
        &self.posts
    }

    // ========== Create / Delete ==========

    pub async fn create(&self, author: &str, input: CreatePostInput) -> AppResult<FormattedPost> {
        input
            .validate()
            .map_err(|e| AppError::invalid(e.to_string()))?;
        for part in &input.contents {
            if part.category == ContentCategory::Link {
                validate_link(&part.content)?;
            }
        }
        let member = if input.dao_id.is_empty() {
            0
        } else {
            self.daos
                .find_by_id(&input.dao_id)
                .await?
                .ok_or_else(|| AppError::not_found("DAO not found"))?;
            1
        };

        let tags = normalize_tags(&input.tags);
        let now = now_ts();
        let post_key = Uuid::new_v4().simple().to_string();
        let post = Post {
            id: None,
            address: author.to_string(),
            dao_id: input.dao_id,
            member,
            post_type: PostType::Text,
            visibility: input.visibility,
            tags: join_tags(&tags),
            view_count: 0,
            collection_count: 0,
            upvote_count: 0,
            comment_count: 0,
            ref_count: 0,
            is_top: 0,
            pinned_on: 0,
            ref_id: None,
            ref_type: None,
            latest_replied_on: now,
            is_del: false,
            created_on: now,
            modified_on: now,
            deleted_on: 0,
        };
        let contents = self.build_contents(&post_key, author, &input.contents, now);
        let created = self
            .posts
            .create_with_contents(&post_key, post, contents.clone())
            .await?;

        if created.visibility.is_public() {
            self.tags.incr(&tags, author).await?;
        }
        self.index_post(&created, &post_key, &contents);
        self.cache.send_action(IndexAction {
            kind: IndexActionKind::Create,
            author: author.to_string(),
            is_private: !created.visibility.is_public(),
        });

        let mut formatted = format_posts(&self.posts, &self.users, vec![created]).await?;
        formatted
            .pop()
            .ok_or_else(|| AppError::internal("formatting dropped the new post"))
    }

    /// Hard delete. Media purge is best-effort and never fails the
    /// delete; the cascade already committed.
    pub async fn delete(&self, caller: &str, post_key: &str) -> AppResult<()> {
        let post = self.find_owned(caller, post_key).await?;
        let tags = normalize_tags(&crate::utils::validation::split_tags(&post.tags));
        let media = self.posts.media_urls(post_key).await?;

        let tag_names = if post.visibility.is_public() {
            tags
        } else {
            Vec::new()
        };
        self.posts.delete_cascade(post_key, tag_names).await?;
        self.blobs.purge_urls(&media).await;
        self.bridge
            .push(IndexJob::Delete(vec![post_key.to_string()]));
        self.cache.send_action(IndexAction {
            kind: IndexActionKind::Delete,
            author: caller.to_string(),
            is_private: !post.visibility.is_public(),
        });
        Ok(())
    }

    /// Replace contents and tags of an owned post, then re-index
    pub async fn update(
        &self,
        caller: &str,
        post_key: &str,
        input: CreatePostInput,
    ) -> AppResult<FormattedPost> {
        input
            .validate()
            .map_err(|e| AppError::invalid(e.to_string()))?;
        for part in &input.contents {
            if part.category == ContentCategory::Link {
                validate_link(&part.content)?;
            }
        }
        let post = self.find_owned(caller, post_key).await?;
        let old_tags = normalize_tags(&crate::utils::validation::split_tags(&post.tags));
        let new_tags = normalize_tags(&input.tags);
        if post.visibility.is_public() && old_tags != new_tags {
            self.tags.decr(&old_tags).await?;
            self.tags.incr(&new_tags, caller).await?;
        }
        let contents = self.build_contents(post_key, caller, &input.contents, now_ts());
        let updated = self
            .posts
            .replace_contents(post_key, &join_tags(&new_tags), contents.clone())
            .await?;
        self.index_post(&updated, post_key, &contents);
        self.cache.send_action(IndexAction {
            kind: IndexActionKind::Update,
            author: caller.to_string(),
            is_private: !updated.visibility.is_public(),
        });
        let mut formatted = format_posts(&self.posts, &self.users, vec![updated]).await?;
        formatted
            .pop()
            .ok_or_else(|| AppError::internal("formatting dropped the post"))
    }

    // ========== Visibility / Pinning ==========

    pub async fn set_visibility(
        &self,
        caller: &str,
        post_key: &str,
        visibility: Visibility,
    ) -> AppResult<FormattedPost> {
        let post = self.find_owned(caller, post_key).await?;
        if post.visibility != visibility {
            let tags = normalize_tags(&crate::utils::validation::split_tags(&post.tags));
            // Tag quotas follow public visibility
            if post.visibility.is_public() && !visibility.is_public() {
                self.tags.decr(&tags).await?;
            } else if !post.visibility.is_public() && visibility.is_public() {
                self.tags.incr(&tags, caller).await?;
            }
        }
        let updated = self.posts.set_visibility(post_key, visibility).await?;
        self.refresh_index(&updated, post_key).await?;
        self.cache.send_action(IndexAction {
            kind: IndexActionKind::Visible,
            author: caller.to_string(),
            is_private: !visibility.is_public(),
        });
        let mut formatted = format_posts(&self.posts, &self.users, vec![updated]).await?;
        formatted
            .pop()
            .ok_or_else(|| AppError::internal("formatting dropped the post"))
    }

    /// Toggle the sticky flag. Only public posts can be pinned.
    pub async fn stick(&self, caller: &str, post_key: &str) -> AppResult<i64> {
        let post = self.find_owned(caller, post_key).await?;
        if !post.visibility.is_public() && post.is_top == 0 {
            return Err(AppError::invalid("Only public posts can be pinned"));
        }
        let updated = self.posts.stick(post_key).await?;
        self.refresh_index(&updated, post_key).await?;
        self.cache.send_action(IndexAction {
            kind: IndexActionKind::Stick,
            author: caller.to_string(),
            is_private: false,
        });
        Ok(updated.is_top)
    }

    // ========== Engagement ==========

    /// Engagement requires a public post, the author included
    async fn find_engageable(&self, viewer: &str, post_key: &str) -> AppResult<Post> {
        let post = self.find_visible(Some(viewer), post_key).await?;
        if !post.visibility.is_public() {
            return Err(AppError::no_permission("Private posts cannot be engaged"));
        }
        Ok(post)
    }

    pub async fn star(&self, viewer: &str, post_key: &str) -> AppResult<()> {
        let post = self.find_engageable(viewer, post_key).await?;
        self.posts.star(post_key, viewer).await?;
        self.touch_index(&post, post_key).await
    }

    pub async fn unstar(&self, viewer: &str, post_key: &str) -> AppResult<()> {
        let post = self.find_engageable(viewer, post_key).await?;
        self.posts.unstar(post_key, viewer).await?;
        self.touch_index(&post, post_key).await
    }

    pub async fn collect(&self, viewer: &str, post_key: &str) -> AppResult<()> {
        let post = self.find_engageable(viewer, post_key).await?;
        self.posts.collect(post_key, viewer).await?;
        self.touch_index(&post, post_key).await
    }

    pub async fn uncollect(&self, viewer: &str, post_key: &str) -> AppResult<()> {
        let post = self.find_engageable(viewer, post_key).await?;
        self.posts.uncollect(post_key, viewer).await?;
        self.touch_index(&post, post_key).await
    }

    pub async fn is_starred(&self, viewer: &str, post_key: &str) -> AppResult<bool> {
        Ok(self
            .posts
            .find_star(post_key, viewer)
            .await?
            .is_some_and(|r| !r.is_del))
    }

    pub async fn is_collected(&self, viewer: &str, post_key: &str) -> AppResult<bool> {
        Ok(self
            .posts
            .find_collection(post_key, viewer)
            .await?
            .is_some_and(|r| !r.is_del))
    }

    // ========== Retweet ==========

    pub async fn retweet(&self, author: &str, input: RetweetInput) -> AppResult<FormattedPost> {
        input
            .validate()
            .map_err(|e| AppError::invalid(e.to_string()))?;
        let (ref_id, ref_type, dao_id) = match input.ref_type {
            RefType::Post => {
                let origin = self.find_visible(Some(author), &input.ref_id).await?;
                // Retweeting a pure retweet re-points at its origin
                if origin.post_type == PostType::Retweet {
                    let origin_ref = origin
                        .ref_id
                        .clone()
                        .ok_or_else(|| AppError::invalid("Retweet without a reference"))?;
                    (origin_ref, origin.ref_type.unwrap_or(RefType::Post), origin.dao_id)
                } else {
                    (input.ref_id.clone(), RefType::Post, origin.dao_id)
                }
            }
            other => (input.ref_id.clone(), other, String::new()),
        };

        let post_type = if input.contents.is_empty() {
            PostType::Retweet
        } else {
            PostType::RetweetComment
        };
        let now = now_ts();
        let post_key = Uuid::new_v4().simple().to_string();
        let post = Post {
            id: None,
            address: author.to_string(),
            dao_id,
            member: 0,
            post_type,
            visibility: Visibility::Public,
            tags: String::new(),
            view_count: 0,
            collection_count: 0,
            upvote_count: 0,
            comment_count: 0,
            ref_count: 0,
            is_top: 0,
            pinned_on: 0,
            ref_id: Some(ref_id.clone()),
            ref_type: Some(ref_type),
            latest_replied_on: now,
            is_del: false,
            created_on: now,
            modified_on: now,
            deleted_on: 0,
        };
        let contents = self.build_contents(&post_key, author, &input.contents, now);
        let created = self
            .posts
            .create_with_contents(&post_key, post, contents.clone())
            .await?;
        if ref_type == RefType::Post {
            self.posts.incr_ref_count(&ref_id).await?;
        }
        self.index_post(&created, &post_key, &contents);
        self.cache.send_action(IndexAction {
            kind: IndexActionKind::Create,
            author: author.to_string(),
            is_private: false,
        });
        let mut formatted = format_posts(&self.posts, &self.users, vec![created]).await?;
        formatted
            .pop()
            .ok_or_else(|| AppError::internal("formatting dropped the retweet"))
    }

    // ========== Read path ==========

    /// Detail fetch; bumps the view counter
    pub async fn get(&self, viewer: Option<&str>, post_key: &str) -> AppResult<FormattedPost> {
        let post = self.find_visible(viewer, post_key).await?;
        self.posts.incr_view(post_key).await?;
        let mut formatted = format_posts(&self.posts, &self.users, vec![post]).await?;
        formatted
            .pop()
            .ok_or_else(|| AppError::internal("formatting dropped the post"))
    }

    /// Home timeline, served from the cache-index when possible
    pub async fn timeline(
        &self,
        viewer: Option<&str>,
        pager: Pagination,
    ) -> AppResult<Arc<Paged<FormattedPost>>> {
        let (offset, limit) = (pager.offset(), pager.limit());
        if let Some(hit) = self.cache.get(viewer, offset, limit) {
            return Ok(hit);
        }
        let query = PostQuery {
            dao_key: None,
            author: None,
            viewer: viewer.map(str::to_string),
            offset,
            limit,
        };
        let (rows, total) = self.posts.timeline(&query).await?;
        let list = format_posts(&self.posts, &self.users, rows).await?;
        let page = Arc::new(Paged::new(list, pager, total));
        self.cache.put(viewer, offset, limit, page.clone());
        Ok(page)
    }

    /// Full-text / tag / address search, answered from the index and
    /// re-materialized from the store so results match the live rows
    pub async fn search(
        &self,
        viewer: Option<&str>,
        query: crate::search::QueryKind,
        pager: Pagination,
    ) -> AppResult<Paged<FormattedPost>> {
        let result = self
            .bridge
            .backend()
            .search(viewer, &query, pager.offset(), pager.limit())
            .await?;
        let ids: Vec<String> = result.hits.iter().map(|d| d.id.clone()).collect();
        let rows = self.posts.find_by_ids(ids.clone()).await?;
        // Preserve the index ordering
        let mut by_key: std::collections::HashMap<String, Post> = rows
            .into_iter()
            .map(|p| (PostRepository::key(&p), p))
            .collect();
        let ordered: Vec<Post> = ids.iter().filter_map(|id| by_key.remove(id)).collect();
        let list = format_posts(&self.posts, &self.users, ordered).await?;
        Ok(Paged::new(list, pager, result.total))
    }

    /// DAO or author feed; not cached, same visibility rules
    pub async fn feed(
        &self,
        viewer: Option<&str>,
        dao_key: Option<String>,
        author: Option<String>,
        pager: Pagination,
    ) -> AppResult<Paged<FormattedPost>> {
        let query = PostQuery {
            dao_key,
            author,
            viewer: viewer.map(str::to_string),
            offset: pager.offset(),
            limit: pager.limit(),
        };
        let (rows, total) = self.posts.timeline(&query).await?;
        let list = format_posts(&self.posts, &self.users, rows).await?;
        Ok(Paged::new(list, pager, total))
    }

    // ========== Maintenance ==========

    /// Unpin posts whose pin aged out
    pub async fn expire_pins(&self, max_age_secs: i64) -> AppResult<usize> {
        let cutoff = now_ts() - max_age_secs;
        let expired = self.posts.expired_pins(cutoff).await?;
        let mut count = 0;
        for post in expired {
            let key = PostRepository::key(&post);
            let updated = self.posts.stick(&key).await?;
            self.refresh_index(&updated, &key).await?;
            count += 1;
        }
        if count > 0 {
            self.cache.send_action(IndexAction {
                kind: IndexActionKind::Update,
                author: String::new(),
                is_private: false,
            });
        }
        Ok(count)
    }

    /// Re-push recently touched public posts to the search index
    pub async fn reindex_modified_since(&self, since: i64) -> AppResult<usize> {
        let rows = self.posts.public_modified_since(since).await?;
        let count = rows.len();
        for post in rows {
            let key = PostRepository::key(&post);
            self.refresh_index(&post, &key).await?;
        }
        Ok(count)
    }

    /// Remove every post of a cancelled user (account sweep)
    pub async fn purge_author(&self, address: &str) -> AppResult<usize> {
        let rows = self.posts.all_by_author(address).await?;
        let count = rows.len();
        let mut doc_ids = Vec::with_capacity(count);
        for post in rows {
            let key = PostRepository::key(&post);
            let tags = if post.visibility.is_public() {
                normalize_tags(&crate::utils::validation::split_tags(&post.tags))
            } else {
                Vec::new()
            };
            let media = self.posts.media_urls(&key).await?;
            self.posts.delete_cascade(&key, tags).await?;
            self.blobs.purge_urls(&media).await;
            doc_ids.push(key);
        }
        if !doc_ids.is_empty() {
            self.bridge.push(IndexJob::Delete(doc_ids));
            self.cache.send_action(IndexAction {
                kind: IndexActionKind::Delete,
                author: address.to_string(),
                is_private: false,
            });
        }
        Ok(count)
    }

    // ========== Internals ==========

    fn build_contents(
        &self,
        post_key: &str,
        author: &str,
        parts: &[ContentPartInput],
        now: i64,
    ) -> Vec<PostContent> {
        parts
            .iter()
            .map(|part| PostContent {
                id: None,
                post_id: post_key.to_string(),
                address: author.to_string(),
                content: part.content.clone(),
                category: part.category,
                sort: part.sort,
                created_on: now,
            })
            .collect()
    }

    async fn find_owned(&self, caller: &str, post_key: &str) -> AppResult<Post> {
        let post = self
            .posts
            .find_by_id(post_key)
            .await?
            .ok_or_else(|| AppError::not_found("Post not found"))?;
        if post.address != caller {
            return Err(AppError::no_permission("Not the author"));
        }
        Ok(post)
    }

    async fn find_visible(&self, viewer: Option<&str>, post_key: &str) -> AppResult<Post> {
        let post = self
            .posts
            .find_by_id(post_key)
            .await?
            .ok_or_else(|| AppError::not_found("Post not found"))?;
        if post.visibility.is_public() || viewer == Some(post.address.as_str()) {
            Ok(post)
        } else {
            // Hidden posts look absent, not forbidden
            Err(AppError::not_found("Post not found"))
        }
    }

    fn index_post(&self, post: &Post, key: &str, contents: &[PostContent]) {
        let doc = PostDoc::from_post(post, key, contents);
        self.bridge.push(IndexJob::Add(vec![doc]));
    }

    /// Re-read counters and contents, then push a fresh document
    async fn touch_index(&self, _post: &Post, key: &str) -> AppResult<()> {
        if let Some(fresh) = self.posts.find_by_id(key).await? {
            self.refresh_index(&fresh, key).await?;
        }
        Ok(())
    }

    async fn refresh_index(&self, post: &Post, key: &str) -> AppResult<()> {
        let contents = self.posts.contents_of(vec![key.to_string()]).await?;
        self.index_post(post, key, &contents);
        Ok(())
    }
}
