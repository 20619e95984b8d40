//! Meili-style backend
//!
//! Writes are asynchronous on the backend side (enqueue tasks), so a
//! 2xx here only means accepted. The periodic re-index job covers
//! tasks the backend later fails.

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::{PostDoc, QueryKind, SearchResult};
use crate::utils::{AppError, AppResult};

#[derive(Clone)]
pub struct MeiliClient {
    http: Client,
    base_url: String,
    index: String,
    api_key: String,
}

#[derive(Deserialize)]
struct MeiliResponse {
    hits: Vec<PostDoc>,
    #[serde(rename = "estimatedTotalHits")]
    estimated_total_hits: u64,
}

impl MeiliClient {
    pub fn new(base_url: &str, index: &str, api_key: &str) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::internal(format!("build search client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            index: index.to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub async fn add_documents(&self, docs: Vec<PostDoc>) -> AppResult<()> {
        if docs.is_empty() {
            return Ok(());
        }
        let resp = self
            .http
            .post(format!(
                "{}/indexes/{}/documents?primaryKey=id",
                self.base_url, self.index
            ))
            .bearer_auth(&self.api_key)
            .json(&docs)
            .send()
            .await
            .map_err(|e| AppError::upstream(format!("search add: {e}")))?;
        if !resp.status().is_success() {
            return Err(AppError::upstream(format!(
                "search add returned {}",
                resp.status()
            )));
        }
        Ok(())
    }

    pub async fn delete_documents(&self, ids: Vec<String>) -> AppResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let resp = self
            .http
            .post(format!(
                "{}/indexes/{}/documents/delete-batch",
                self.base_url, self.index
            ))
            .bearer_auth(&self.api_key)
            .json(&ids)
            .send()
            .await
            .map_err(|e| AppError::upstream(format!("search delete: {e}")))?;
        if !resp.status().is_success() {
            return Err(AppError::upstream(format!(
                "search delete returned {}",
                resp.status()
            )));
        }
        Ok(())
    }

    pub async fn search(
        &self,
        query: &QueryKind,
        offset: u64,
        limit: u64,
    ) -> AppResult<SearchResult> {
        let mut body = json!({
            "offset": offset,
            "limit": limit,
            "sort": ["is_top:desc", "latest_replied_on:desc"],
        });
        match query {
            QueryKind::Default(text) => {
                body["q"] = json!(text);
            }
            QueryKind::Tag(tag) => {
                body["q"] = json!("");
                body["filter"] = json!(format!("tags.{tag} = 1"));
            }
            QueryKind::Address(address) => {
                body["q"] = json!("");
                body["filter"] = json!(format!("address = \"{address}\""));
            }
            QueryKind::Any => {
                body["q"] = json!("");
                body["sort"] = json!(["created_on:desc"]);
            }
        }
        let resp = self
            .http
            .post(format!("{}/indexes/{}/search", self.base_url, self.index))
            .bearer_auth(&self.api_key)
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
        let parsed: MeiliResponse = resp
            .json()
            .await
            .map_err(|e| AppError::upstream(format!("decode search response: {e}")))?;
        Ok(SearchResult {
            hits: parsed.hits,
            total: parsed.estimated_total_hits,
        })
    }
}
