//! Search Indexer
//!
//! A denormalized post document is pushed to one of two
//! interchangeable backends (Zinc-like or Meili-like, chosen by
//! configuration). The document store stays authoritative: a failed
//! push is logged and the periodic re-index job reconciles.

pub mod bridge;
pub mod meili;
pub mod zinc;

pub use bridge::SearchBridge;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::db::models::{Post, PostContent};
use crate::utils::AppResult;
use crate::utils::validation::split_tags;
use shared::{ContentCategory, Visibility};

/// Denormalized search document, keyed by post id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDoc {
    pub id: String,
    pub address: String,
    pub dao_id: String,
    #[serde(rename = "type")]
    pub post_type: u8,
    pub visibility: u8,
    pub is_top: i64,
    pub member: i64,
    pub view_count: i64,
    pub upvote_count: i64,
    pub comment_count: i64,
    pub collection_count: i64,
    /// Flattened tag map: `tags.<name> = 1`
    pub tags: BTreeMap<String, u8>,
    /// Concatenated text of all title/text content parts
    pub content: String,
    pub created_on: i64,
    pub modified_on: i64,
    pub latest_replied_on: i64,
}

impl PostDoc {
    /// Flatten a post and its content parts into the indexed shape
    pub fn from_post(post: &Post, key: &str, contents: &[PostContent]) -> Self {
        let tags = split_tags(&post.tags)
            .into_iter()
            .map(|t| (t, 1u8))
            .collect();
        let content = contents
            .iter()
            .filter(|c| {
                matches!(c.category, ContentCategory::Title | ContentCategory::Text)
            })
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            id: key.to_string(),
            address: post.address.clone(),
            dao_id: post.dao_id.clone(),
            post_type: post.post_type.into(),
            visibility: post.visibility.into(),
            is_top: post.is_top,
            member: post.member,
            view_count: post.view_count,
            upvote_count: post.upvote_count,
            comment_count: post.comment_count,
            collection_count: post.collection_count,
            tags,
            content,
            created_on: post.created_on,
            modified_on: post.modified_on,
            latest_replied_on: post.latest_replied_on,
        }
    }

    fn visible_to(&self, viewer: Option<&str>) -> bool {
        self.visibility == u8::from(Visibility::Public)
            || viewer.is_some_and(|v| v == self.address)
    }
}

/// What to search for
#[derive(Debug, Clone)]
pub enum QueryKind {
    /// Full-text over the concatenated content
    Default(String),
    /// Posts carrying a tag (`tags.<name> = 1`)
    Tag(String),
    /// Posts by an exact author address
    Address(String),
    /// Everything, newest first
    Any,
}

#[derive(Debug, Default)]
pub struct SearchResult {
    pub hits: Vec<PostDoc>,
    pub total: u64,
}

/// The configured backend
#[derive(Clone)]
pub enum SearchBackend {
    Zinc(zinc::ZincClient),
    Meili(meili::MeiliClient),
    /// Discards writes and answers empty; used by tests
    Null,
}

impl SearchBackend {
    pub fn from_config(config: &crate::core::config::Config) -> AppResult<Self> {
        use crate::core::config::SearchBackendKind;
        match config.search_backend {
            SearchBackendKind::Zinc => {
                // Zinc credentials travel as "user:password"
                let (user, password) = config
                    .search_api_key
                    .split_once(':')
                    .unwrap_or((config.search_api_key.as_str(), ""));
                Ok(SearchBackend::Zinc(zinc::ZincClient::new(
                    &config.search_endpoint,
                    &config.search_index,
                    user,
                    password,
                )?))
            }
            SearchBackendKind::Meili => Ok(SearchBackend::Meili(meili::MeiliClient::new(
                &config.search_endpoint,
                &config.search_index,
                &config.search_api_key,
            )?)),
        }
    }

    pub async fn add_documents(&self, docs: Vec<PostDoc>) -> AppResult<()> {
        match self {
            SearchBackend::Zinc(c) => c.add_documents(docs).await,
            SearchBackend::Meili(c) => c.add_documents(docs).await,
            SearchBackend::Null => Ok(()),
        }
    }

    pub async fn delete_documents(&self, ids: Vec<String>) -> AppResult<()> {
        match self {
            SearchBackend::Zinc(c) => c.delete_documents(ids).await,
            SearchBackend::Meili(c) => c.delete_documents(ids).await,
            SearchBackend::Null => Ok(()),
        }
    }

    /// Run the query and drop private posts the viewer cannot see
    pub async fn search(
        &self,
        viewer: Option<&str>,
        query: &QueryKind,
        offset: u64,
        limit: u64,
    ) -> AppResult<SearchResult> {
        let mut result = match self {
            SearchBackend::Zinc(c) => c.search(query, offset, limit).await?,
            SearchBackend::Meili(c) => c.search(query, offset, limit).await?,
            SearchBackend::Null => SearchResult::default(),
        };
        result.hits.retain(|doc| doc.visible_to(viewer));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Post;
    use shared::PostType;

    fn sample_post() -> Post {
        Post {
            id: None,
            address: "0xa".into(),
            dao_id: "d1".into(),
            member: 0,
            post_type: PostType::Text,
            visibility: Visibility::Public,
            tags: "rust,dao".into(),
            view_count: 3,
            collection_count: 0,
            upvote_count: 1,
            comment_count: 0,
            ref_count: 0,
            is_top: 0,
            pinned_on: 0,
            ref_id: None,
            ref_type: None,
            latest_replied_on: 100,
            is_del: false,
            created_on: 100,
            modified_on: 100,
            deleted_on: 0,
        }
    }

    #[test]
    fn doc_flattens_tags_and_text() {
        let post = sample_post();
        let contents = vec![
            PostContent {
                id: None,
                post_id: "p1".into(),
                address: "0xa".into(),
                content: "hello".into(),
                category: ContentCategory::Title,
                sort: 0,
                created_on: 100,
            },
            PostContent {
                id: None,
                post_id: "p1".into(),
                address: "0xa".into(),
                content: "https://x/img.png".into(),
                category: ContentCategory::Image,
                sort: 1,
                created_on: 100,
            },
            PostContent {
                id: None,
                post_id: "p1".into(),
                address: "0xa".into(),
                content: "world".into(),
                category: ContentCategory::Text,
                sort: 2,
                created_on: 100,
            },
        ];
        let doc = PostDoc::from_post(&post, "p1", &contents);
        assert_eq!(doc.content, "hello world");
        assert_eq!(doc.tags.get("rust"), Some(&1));
        assert_eq!(doc.tags.get("dao"), Some(&1));
    }

    #[test]
    fn private_docs_hidden_from_strangers() {
        let mut post = sample_post();
        post.visibility = Visibility::Private;
        let doc = PostDoc::from_post(&post, "p1", &[]);
        assert!(!doc.visible_to(None));
        assert!(!doc.visible_to(Some("0xb")));
        assert!(doc.visible_to(Some("0xa")));
    }
}
