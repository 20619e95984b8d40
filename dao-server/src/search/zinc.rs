//! Zinc-style backend over the ES-compatible HTTP API

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::{PostDoc, QueryKind, SearchResult};
use crate::utils::{AppError, AppResult};

#[derive(Clone)]
pub struct ZincClient {
    http: Client,
    base_url: String,
    index: String,
    user: String,
    password: String,
}

#[derive(Deserialize)]
struct EsHits {
    total: EsTotal,
    hits: Vec<EsHit>,
}

#[derive(Deserialize)]
struct EsTotal {
    value: u64,
}

#[derive(Deserialize)]
struct EsHit {
    #[serde(rename = "_source")]
    source: PostDoc,
}

#[derive(Deserialize)]
struct EsResponse {
    hits: EsHits,
}

impl ZincClient {
    pub fn new(base_url: &str, index: &str, user: &str, password: &str) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::internal(format!("build search client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            index: index.to_string(),
            user: user.to_string(),
            password: password.to_string(),
        })
    }

    pub async fn add_documents(&self, docs: Vec<PostDoc>) -> AppResult<()> {
        if docs.is_empty() {
            return Ok(());
        }
        // _bulk takes NDJSON: an action line, then the document
        let mut body = String::new();
        for doc in &docs {
            let action = json!({ "index": { "_index": self.index, "_id": doc.id } });
            body.push_str(&action.to_string());
            body.push('\n');
            body.push_str(
                &serde_json::to_string(doc)
                    .map_err(|e| AppError::internal(format!("encode search doc: {e}")))?,
            );
            body.push('\n');
        }
        let resp = self
            .http
            .post(format!("{}/api/_bulk", self.base_url))
            .basic_auth(&self.user, Some(&self.password))
            .header("Content-Type", "application/x-ndjson")
            .body(body)
            .send()
            .await
            .map_err(|e| AppError::upstream(format!("search bulk: {e}")))?;
        if !resp.status().is_success() {
            return Err(AppError::upstream(format!(
                "search bulk returned {}",
                resp.status()
            )));
        }
        Ok(())
    }

    pub async fn delete_documents(&self, ids: Vec<String>) -> AppResult<()> {
        for id in ids {
            let resp = self
                .http
                .delete(format!(
                    "{}/api/{}/_doc/{}",
                    self.base_url, self.index, id
                ))
                .basic_auth(&self.user, Some(&self.password))
                .send()
                .await
                .map_err(|e| AppError::upstream(format!("search delete: {e}")))?;
            // 404 means it was never indexed, nothing to undo
            if !resp.status().is_success() && resp.status() != reqwest::StatusCode::NOT_FOUND {
                return Err(AppError::upstream(format!(
                    "search delete returned {}",
                    resp.status()
                )));
            }
        }
        Ok(())
    }

    pub async fn search(
        &self,
        query: &QueryKind,
        offset: u64,
        limit: u64,
    ) -> AppResult<SearchResult> {
        let (clause, sort): (Value, Value) = match query {
            QueryKind::Default(text) => (
                json!({ "match": { "content": { "query": text } } }),
                default_sort(),
            ),
            QueryKind::Tag(tag) => {
                let field = format!("tags.{tag}");
                (
                    json!({ "term": { field: { "value": 1 } } }),
                    default_sort(),
                )
            }
            QueryKind::Address(address) => (
                json!({ "term": { "address": { "value": address } } }),
                default_sort(),
            ),
            // The browse query ignores relevance entirely
            QueryKind::Any => (
                json!({ "match_all": {} }),
                json!([{ "created_on": { "order": "desc" } }]),
            ),
        };
        let body = json!({
            "query": clause,
            "sort": sort,
            "from": offset,
            "size": limit,
        });
        let resp = self
            .http
            .post(format!("{}/es/{}/_search", self.base_url, self.index))
            .basic_auth(&self.user, Some(&self.password))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::upstream(format!("search query: {e}")))?;
        if !resp.status().is_success() {
            return Err(AppError::upstream(format!(
                "search query returned {}",
                resp.status()
            )));
        }
        let parsed: EsResponse = resp
            .json()
            .await
            .map_err(|e| AppError::upstream(format!("decode search response: {e}")))?;
        Ok(SearchResult {
            hits: parsed.hits.hits.into_iter().map(|h| h.source).collect(),
            total: parsed.hits.total.value,
        })
    }
}

fn default_sort() -> Value {
    json!([
        { "is_top": { "order": "desc" } },
        { "latest_replied_on": { "order": "desc" } },
    ])
}
