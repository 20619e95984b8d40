//! Key-value cache
//!
//! Sessions, red-packet share counters, login throttles and captcha
//! nonces live here. The trait keeps the engines decoupled from the
//! concrete store; the in-process implementation covers the embedded
//! deployment and the tests.

use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Key-value cache handle
///
/// The only mutators of a given `redpacket_<id>` key are the
/// red-packet engine: set on payment success, decrement on claim,
/// delete on timeout.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>);
    async fn del(&self, key: &str);
    async fn exists(&self, key: &str) -> bool;
    /// Atomic add; missing keys start at 0. Returns the new value.
    async fn incr_by(&self, key: &str, delta: i64) -> i64;
}

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// In-process KV store backed by a concurrent map
pub struct MemoryKv {
    map: DashMap<String, Entry>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self {
            map: DashMap::new(),
        }
    }
}

impl Default for MemoryKv {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Option<String> {
        match self.map.get(key) {
            Some(entry) if !entry.expired() => Some(entry.value.clone()),
            Some(_) => {
                drop(self.map.remove(key));
                None
            }
            None => None,
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) {
        let entry = Entry {
            value,
            expires_at: ttl.map(|d| Instant::now() + d),
        };
        self.map.insert(key.to_string(), entry);
    }

    async fn del(&self, key: &str) {
        self.map.remove(key);
    }

    async fn exists(&self, key: &str) -> bool {
        self.get(key).await.is_some()
    }

    async fn incr_by(&self, key: &str, delta: i64) -> i64 {
        let mut entry = self.map.entry(key.to_string()).or_insert_with(|| Entry {
            value: "0".to_string(),
            expires_at: None,
        });
        if entry.expired() {
            entry.value = "0".to_string();
            entry.expires_at = None;
        }
        let current: i64 = entry.value.parse().unwrap_or(0);
        let next = current + delta;
        entry.value = next.to_string();
        next
    }
}

// Cache key helpers, matching the wire-level names consumers expect.

pub fn session_key(token: &str) -> String {
    format!("token_{}", token)
}

pub fn redpacket_key(packet_key: &str) -> String {
    format!("redpacket_{}", packet_key)
}

pub fn login_err_key(address: &str) -> String {
    format!("DaoUserLoginErr:{}", address)
}

pub fn captcha_key(uuid: &str) -> String {
    format!("DaoCaptcha:{}", uuid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_del_roundtrip() {
        let kv = MemoryKv::new();
        kv.set("a", "1".into(), None).await;
        assert_eq!(kv.get("a").await.as_deref(), Some("1"));
        kv.del("a").await;
        assert!(!kv.exists("a").await);
    }

    #[tokio::test]
    async fn ttl_expires_entries() {
        let kv = MemoryKv::new();
        kv.set("t", "x".into(), Some(Duration::from_millis(10))).await;
        assert!(kv.exists("t").await);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!kv.exists("t").await);
    }

    #[tokio::test]
    async fn incr_is_atomic_per_key() {
        let kv = std::sync::Arc::new(MemoryKv::new());
        kv.set("n", "5".into(), None).await;
        let mut handles = Vec::new();
        for _ in 0..5 {
            let kv = kv.clone();
            handles.push(tokio::spawn(async move { kv.incr_by("n", -1).await }));
        }
        let mut results = Vec::new();
        for h in handles {
            results.push(h.await.unwrap());
        }
        results.sort_unstable();
        assert_eq!(results, vec![0, 1, 2, 3, 4]);
    }
}
