//! Chat gateway clients
//!
//! CometChat-flavored REST surface: users, groups, group members.
//! Every call is keyed by app id and region; failures bubble up as
//! upstream errors except where the manager tolerates them.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::core::config::Config;
use crate::utils::{AppError, AppResult};

#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Returns the user's chat auth token
    async fn create_user(&self, uid: &str, nickname: &str) -> AppResult<String>;
    async fn delete_user(&self, uid: &str) -> AppResult<()>;
    async fn create_group(&self, guid: &str, name: &str, owner: &str) -> AppResult<()>;
    async fn delete_group(&self, guid: &str) -> AppResult<()>;
    async fn add_member(&self, guid: &str, uid: &str) -> AppResult<()>;
    async fn remove_member(&self, guid: &str, uid: &str) -> AppResult<()>;
}

pub type SharedChatGateway = Arc<dyn ChatGateway>;

/// Pick the real client when chat is configured, otherwise the no-op
pub fn from_config(config: &Config) -> AppResult<SharedChatGateway> {
    if config.chat_app_id.is_empty() {
        tracing::info!("Chat gateway not configured, running unlinked");
        return Ok(Arc::new(NoopChatGateway));
    }
    Ok(Arc::new(HttpChatGateway::new(
        &config.chat_app_id,
        &config.chat_region,
        &config.chat_api_key,
    )?))
}

// ========== HTTP client ==========

pub struct HttpChatGateway {
    http: Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct TokenData {
    #[serde(rename = "authToken")]
    auth_token: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    data: TokenData,
}

impl HttpChatGateway {
    pub fn new(app_id: &str, region: &str, api_key: &str) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::internal(format!("build chat client: {e}")))?;
        Ok(Self {
            http,
            base_url: format!("https://{app_id}.api-{region}.cometchat.io/v3"),
            api_key: api_key.to_string(),
        })
    }

    async fn check(&self, resp: reqwest::Response, what: &str) -> AppResult<()> {
        if resp.status().is_success() || resp.status() == reqwest::StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(AppError::upstream(format!(
                "chat {what} returned {}",
                resp.status()
            )))
        }
    }
}

#[async_trait]
impl ChatGateway for HttpChatGateway {
    async fn create_user(&self, uid: &str, nickname: &str) -> AppResult<String> {
        let resp = self
            .http
            .post(format!("{}/users", self.base_url))
            .header("apiKey", &self.api_key)
            .json(&json!({ "uid": uid, "name": nickname, "withAuthToken": true }))
            .send()
            .await
            .map_err(|e| AppError::upstream(format!("chat create user: {e}")))?;
        if !resp.status().is_success() {
            return Err(AppError::upstream(format!(
                "chat create user returned {}",
                resp.status()
            )));
        }
        let body: TokenResponse = resp
            .json()
            .await
            .map_err(|e| AppError::upstream(format!("decode chat response: {e}")))?;
        Ok(body.data.auth_token)
    }

    async fn delete_user(&self, uid: &str) -> AppResult<()> {
        let resp = self
            .http
            .delete(format!("{}/users/{uid}", self.base_url))
            .header("apiKey", &self.api_key)
            .json(&json!({ "permanent": true }))
            .send()
            .await
            .map_err(|e| AppError::upstream(format!("chat delete user: {e}")))?;
        self.check(resp, "delete user").await
    }

    async fn create_group(&self, guid: &str, name: &str, owner: &str) -> AppResult<()> {
        let resp = self
            .http
            .post(format!("{}/groups", self.base_url))
            .header("apiKey", &self.api_key)
            .json(&json!({ "guid": guid, "name": name, "type": "public", "owner": owner }))
            .send()
            .await
            .map_err(|e| AppError::upstream(format!("chat create group: {e}")))?;
        if !resp.status().is_success() {
            return Err(AppError::upstream(format!(
                "chat create group returned {}",
                resp.status()
            )));
        }
        Ok(())
    }

    async fn delete_group(&self, guid: &str) -> AppResult<()> {
        let resp = self
            .http
            .delete(format!("{}/groups/{guid}", self.base_url))
            .header("apiKey", &self.api_key)
            .send()
            .await
            .map_err(|e| AppError::upstream(format!("chat delete group: {e}")))?;
        self.check(resp, "delete group").await
    }

    async fn add_member(&self, guid: &str, uid: &str) -> AppResult<()> {
        let resp = self
            .http
            .post(format!("{}/groups/{guid}/members", self.base_url))
            .header("apiKey", &self.api_key)
            .json(&json!({ "participants": [uid] }))
            .send()
            .await
            .map_err(|e| AppError::upstream(format!("chat add member: {e}")))?;
        if !resp.status().is_success() {
            return Err(AppError::upstream(format!(
                "chat add member returned {}",
                resp.status()
            )));
        }
        Ok(())
    }

    async fn remove_member(&self, guid: &str, uid: &str) -> AppResult<()> {
        let resp = self
            .http
            .delete(format!("{}/groups/{guid}/members/{uid}", self.base_url))
            .header("apiKey", &self.api_key)
            .send()
            .await
            .map_err(|e| AppError::upstream(format!("chat remove member: {e}")))?;
        self.check(resp, "remove member").await
    }
}

// ========== No-op ==========

/// Chat disabled; link calls succeed with empty tokens
pub struct NoopChatGateway;

#[async_trait]
impl ChatGateway for NoopChatGateway {
    async fn create_user(&self, _uid: &str, _nickname: &str) -> AppResult<String> {
        Ok(String::new())
    }

    async fn delete_user(&self, _uid: &str) -> AppResult<()> {
        Ok(())
    }

    async fn create_group(&self, _guid: &str, _name: &str, _owner: &str) -> AppResult<()> {
        Ok(())
    }

    async fn delete_group(&self, _guid: &str) -> AppResult<()> {
        Ok(())
    }

    async fn add_member(&self, _guid: &str, _uid: &str) -> AppResult<()> {
        Ok(())
    }

    async fn remove_member(&self, _guid: &str, _uid: &str) -> AppResult<()> {
        Ok(())
    }
}
