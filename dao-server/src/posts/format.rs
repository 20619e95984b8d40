//! Post formatting
//!
//! Raw rows come out of three collections (post, post_content, user);
//! this module merges them into the shape clients consume, and for
//! retweets grafts the referenced post in as `origin`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::db::models::{Post, PostContent, User};
use crate::db::repository::{PostRepository, UserRepository};
use crate::utils::AppResult;
use crate::utils::validation::split_tags;
use shared::{ContentCategory, PostType, RefType, Visibility};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormattedContent {
    pub content: String,
    pub category: ContentCategory,
    pub sort: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormattedPost {
    pub id: String,
    pub address: String,
    pub nickname: String,
    pub avatar: String,
    pub dao_id: String,
    pub member: i64,
    #[serde(rename = "type")]
    pub post_type: PostType,
    pub visibility: Visibility,
    pub tags: Vec<String>,
    pub view_count: i64,
    pub collection_count: i64,
    pub upvote_count: i64,
    pub comment_count: i64,
    pub ref_count: i64,
    pub is_top: i64,
    pub ref_id: Option<String>,
    pub ref_type: Option<RefType>,
    pub contents: Vec<FormattedContent>,
    /// The referenced post, filled for retweets pointing at a post
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<Box<FormattedPost>>,
    pub created_on: i64,
    pub latest_replied_on: i64,
}

fn merge_one(
    post: &Post,
    contents: &HashMap<String, Vec<FormattedContent>>,
    authors: &HashMap<String, User>,
) -> FormattedPost {
    let key = PostRepository::key(post);
    let author = authors.get(&post.address);
    FormattedPost {
        id: key.clone(),
        address: post.address.clone(),
        nickname: author.map(|u| u.nickname.clone()).unwrap_or_default(),
        avatar: author.map(|u| u.avatar.clone()).unwrap_or_default(),
        dao_id: post.dao_id.clone(),
        member: post.member,
        post_type: post.post_type,
        visibility: post.visibility,
        tags: split_tags(&post.tags),
        view_count: post.view_count,
        collection_count: post.collection_count,
        upvote_count: post.upvote_count,
        comment_count: post.comment_count,
        ref_count: post.ref_count,
        is_top: post.is_top,
        ref_id: post.ref_id.clone(),
        ref_type: post.ref_type,
        contents: contents.get(&key).cloned().unwrap_or_default(),
        origin: None,
        created_on: post.created_on,
        latest_replied_on: post.latest_replied_on,
    }
}

fn group_contents(rows: Vec<PostContent>) -> HashMap<String, Vec<FormattedContent>> {
    let mut grouped: HashMap<String, Vec<FormattedContent>> = HashMap::new();
    for row in rows {
        grouped
            .entry(row.post_id.clone())
            .or_default()
            .push(FormattedContent {
                content: row.content,
                category: row.category,
                sort: row.sort,
            });
    }
    grouped
}

async fn load_parts(
    posts: &PostRepository,
    users: &UserRepository,
    batch: &[Post],
) -> AppResult<(
    HashMap<String, Vec<FormattedContent>>,
    HashMap<String, User>,
)> {
    let keys: Vec<String> = batch.iter().map(PostRepository::key).collect();
    let contents = group_contents(posts.contents_of(keys).await?);
    let mut addresses: Vec<String> = batch.iter().map(|p| p.address.clone()).collect();
    addresses.sort();
    addresses.dedup();
    let authors = users
        .find_by_addresses(addresses)
        .await?
        .into_iter()
        .map(|u| (u.address.clone(), u))
        .collect();
    Ok((contents, authors))
}

/// Merge posts with their content parts and author profiles, then
/// revamp retweets by embedding the referenced post (one level deep)
pub async fn format_posts(
    posts: &PostRepository,
    users: &UserRepository,
    batch: Vec<Post>,
) -> AppResult<Vec<FormattedPost>> {
    if batch.is_empty() {
        return Ok(Vec::new());
    }
    let (contents, authors) = load_parts(posts, users, &batch).await?;
    let mut formatted: Vec<FormattedPost> = batch
        .iter()
        .map(|p| merge_one(p, &contents, &authors))
        .collect();

    // Revamp: pull origin posts referenced by retweets in one batch
    let mut ref_keys: Vec<String> = formatted
        .iter()
        .filter(|f| f.post_type.is_retweet() && f.ref_type == Some(RefType::Post))
        .filter_map(|f| f.ref_id.clone())
        .collect();
    ref_keys.sort();
    ref_keys.dedup();
    if ref_keys.is_empty() {
        return Ok(formatted);
    }

    let origins = posts.find_by_ids(ref_keys).await?;
    let (origin_contents, origin_authors) = load_parts(posts, users, &origins).await?;
    let by_key: HashMap<String, FormattedPost> = origins
        .iter()
        .map(|p| {
            (
                PostRepository::key(p),
                merge_one(p, &origin_contents, &origin_authors),
            )
        })
        .collect();
    for item in &mut formatted {
        if item.post_type.is_retweet() && item.ref_type == Some(RefType::Post) {
            item.origin = item
                .ref_id
                .as_ref()
                .and_then(|k| by_key.get(k))
                .cloned()
                .map(Box::new);
        }
    }
    Ok(formatted)
}
