//! Session store over the key-value cache

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::cache::{session_key, KvStore};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub address: String,
    pub user_key: String,
    pub nickname: String,
}

#[derive(Clone)]
pub struct SessionStore {
    kv: Arc<dyn KvStore>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KvStore>, ttl: Duration) -> Self {
        Self { kv, ttl }
    }

    pub async fn issue(&self, session: Session) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let body = serde_json::to_string(&session).unwrap_or_default();
        self.kv.set(&session_key(&token), body, Some(self.ttl)).await;
        token
    }

    pub async fn get(&self, token: &str) -> Option<Session> {
        let body = self.kv.get(&session_key(token)).await?;
        serde_json::from_str(&body).ok()
    }

    pub async fn revoke(&self, token: &str) {
        self.kv.del(&session_key(token)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryKv;

    #[tokio::test]
    async fn issue_get_revoke() {
        let store = SessionStore::new(Arc::new(MemoryKv::new()), Duration::from_secs(60));
        let token = store
            .issue(Session {
                address: "0xa".into(),
                user_key: "u1".into(),
                nickname: "ann".into(),
            })
            .await;
        let got = store.get(&token).await.unwrap();
        assert_eq!(got.address, "0xa");
        store.revoke(&token).await;
        assert!(store.get(&token).await.is_none());
    }
}
