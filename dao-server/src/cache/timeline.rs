//! Home-timeline cache (Cache-Index layer)
//!
//! Three modes, chosen at startup:
//!
//! - **None**: passthrough, every read hits the post engine.
//! - **Big**: bounded per-key cache of serialized timeline pages,
//!   keyed `index:<address>:<offset>:<limit>`.
//! - **Simple**: shared snapshots with a fixed expiry, ignoring the
//!   viewer.
//!
//! All writes and invalidations are serialized through a single
//! consumer task, so the cache state never races. Submission never
//! blocks a writer: a full channel overflows to a secondary channel,
//! and a full secondary spawns a throwaway forwarder that performs the
//! blocking send off the caller's path.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::config::{CacheIndexMode, Config};
use crate::posts::format::FormattedPost;
use shared::types::Paged;

/// One cached timeline page
pub type CachedTimeline = Arc<Paged<FormattedPost>>;

/// What happened to a post, for invalidation purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexActionKind {
    Create,
    Delete,
    Stick,
    Visible,
    Update,
}

/// Invalidation event sent by the post engine after a write
#[derive(Debug, Clone)]
pub struct IndexAction {
    pub kind: IndexActionKind,
    /// Post author; private-post actions only evict this author's keys
    pub author: String,
    pub is_private: bool,
}

enum Command {
    Put { key: String, value: CachedTimeline },
    Invalidate(IndexAction),
}

/// Timeline cache handle held by the post engine
#[derive(Clone)]
pub struct CacheIndex {
    mode: CacheIndexMode,
    entries: Arc<DashMap<String, (CachedTimeline, Option<Instant>)>>,
    primary_tx: mpsc::Sender<Command>,
    secondary_tx: mpsc::Sender<Command>,
}

impl CacheIndex {
    /// Build the cache and its single consumer
    pub fn new(config: &Config) -> (Self, CacheIndexWorker) {
        let (primary_tx, primary_rx) = mpsc::channel(256);
        let (secondary_tx, secondary_rx) = mpsc::channel(64);
        let entries = Arc::new(DashMap::new());

        let cache = Self {
            mode: config.cache_index_mode,
            entries: entries.clone(),
            primary_tx,
            secondary_tx,
        };
        let worker = CacheIndexWorker {
            mode: config.cache_index_mode,
            entries,
            primary_rx,
            secondary_rx,
            prevent: Duration::from_secs(config.cache_prevent_secs.max(0) as u64),
            max_entries: config.cache_max_entries,
            expire: Duration::from_secs(config.cache_expire_secs),
            check_interval: Duration::from_secs(config.cache_check_secs.max(1)),
            last_reset: Instant::now(),
        };
        (cache, worker)
    }

    pub fn key(viewer: Option<&str>, offset: u64, limit: u64) -> String {
        format!("index:{}:{}:{}", viewer.unwrap_or(""), offset, limit)
    }

    /// Cached page, if present and unexpired
    pub fn get(&self, viewer: Option<&str>, offset: u64, limit: u64) -> Option<CachedTimeline> {
        if self.mode == CacheIndexMode::None {
            return None;
        }
        let key = match self.mode {
            CacheIndexMode::Simple => Self::key(None, offset, limit),
            _ => Self::key(viewer, offset, limit),
        };
        let entry = self.entries.get(&key)?;
        let (value, expires) = entry.value();
        if expires.is_some_and(|at| Instant::now() >= at) {
            return None;
        }
        Some(value.clone())
    }

    /// Enqueue a freshly computed page for caching
    pub fn put(&self, viewer: Option<&str>, offset: u64, limit: u64, value: CachedTimeline) {
        if self.mode == CacheIndexMode::None {
            return;
        }
        let key = match self.mode {
            CacheIndexMode::Simple => Self::key(None, offset, limit),
            _ => Self::key(viewer, offset, limit),
        };
        self.submit(Command::Put { key, value });
    }

    /// Enqueue an invalidation. Never drops, never blocks the caller.
    pub fn send_action(&self, action: IndexAction) {
        if self.mode == CacheIndexMode::None {
            return;
        }
        self.submit(Command::Invalidate(action));
    }

    fn submit(&self, command: Command) {
        match self.primary_tx.try_send(command) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Closed(_)) => {}
            Err(mpsc::error::TrySendError::Full(command)) => {
                match self.secondary_tx.try_send(command) {
                    Ok(()) | Err(mpsc::error::TrySendError::Closed(_)) => {}
                    Err(mpsc::error::TrySendError::Full(command)) => {
                        // Both channels are saturated: hand the blocking
                        // send to a throwaway task. Latency over loss.
                        let tx = self.primary_tx.clone();
                        tokio::spawn(async move {
                            let _ = tx.send(command).await;
                        });
                    }
                }
            }
        }
    }
}

/// The single consumer serializing writes and invalidations
pub struct CacheIndexWorker {
    mode: CacheIndexMode,
    entries: Arc<DashMap<String, (CachedTimeline, Option<Instant>)>>,
    primary_rx: mpsc::Receiver<Command>,
    secondary_rx: mpsc::Receiver<Command>,
    prevent: Duration,
    max_entries: usize,
    expire: Duration,
    check_interval: Duration,
    last_reset: Instant,
}

impl CacheIndexWorker {
    pub async fn run(mut self, shutdown: CancellationToken) {
        let mut check = tokio::time::interval(self.check_interval);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::debug!("Cache-index consumer stopped");
                    return;
                }
                Some(command) = self.primary_rx.recv() => self.handle(command),
                Some(command) = self.secondary_rx.recv() => self.handle(command),
                _ = check.tick() => self.purge_expired(),
            }
        }
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Put { key, value } => {
                if self.entries.len() >= self.max_entries {
                    // Bounded cache: full means start over rather than
                    // tracking per-entry recency
                    self.entries.clear();
                }
                let expires = match self.mode {
                    CacheIndexMode::Simple => Some(Instant::now() + self.expire),
                    _ => None,
                };
                self.entries.insert(key, (value, expires));
            }
            Command::Invalidate(action) => self.invalidate(action),
        }
    }

    fn invalidate(&mut self, action: IndexAction) {
        let private_scoped = action.is_private
            && matches!(action.kind, IndexActionKind::Create | IndexActionKind::Delete);

        if private_scoped || self.last_reset.elapsed() < self.prevent {
            let prefix = format!("index:{}:", action.author);
            self.entries.retain(|key, _| !key.starts_with(&prefix));
        } else {
            self.entries.clear();
        }
        self.last_reset = Instant::now();
    }

    fn purge_expired(&self) {
        let now = Instant::now();
        self.entries
            .retain(|_, (_, expires)| !expires.is_some_and(|at| now >= at));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;

    fn test_config(mode: CacheIndexMode) -> Config {
        let mut config = Config::with_overrides("/tmp/dao-test", 0);
        config.cache_index_mode = mode;
        config.cache_prevent_secs = 3600; // keep resets scoped in tests
        config
    }

    fn page() -> CachedTimeline {
        Arc::new(Paged::new(Vec::new(), Default::default(), 0))
    }

    #[tokio::test]
    async fn none_mode_is_passthrough() {
        let (cache, _worker) = CacheIndex::new(&test_config(CacheIndexMode::None));
        cache.put(Some("0xa"), 0, 20, page());
        assert!(cache.get(Some("0xa"), 0, 20).is_none());
    }

    #[tokio::test]
    async fn big_mode_caches_per_viewer() {
        let (cache, worker) = CacheIndex::new(&test_config(CacheIndexMode::Big));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(worker.run(shutdown.clone()));

        cache.put(Some("0xa"), 0, 20, page());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(cache.get(Some("0xa"), 0, 20).is_some());
        assert!(cache.get(Some("0xb"), 0, 20).is_none());

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn private_create_evicts_only_author_keys() {
        let (cache, worker) = CacheIndex::new(&test_config(CacheIndexMode::Big));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(worker.run(shutdown.clone()));

        cache.put(Some("0xa"), 0, 20, page());
        cache.put(Some("0xb"), 0, 20, page());
        tokio::time::sleep(Duration::from_millis(50)).await;

        cache.send_action(IndexAction {
            kind: IndexActionKind::Create,
            author: "0xa".to_string(),
            is_private: true,
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(cache.get(Some("0xa"), 0, 20).is_none());
        assert!(cache.get(Some("0xb"), 0, 20).is_some());

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn public_action_outside_window_resets_everything() {
        let mut config = test_config(CacheIndexMode::Big);
        config.cache_prevent_secs = 0;
        let (cache, worker) = CacheIndex::new(&config);
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(worker.run(shutdown.clone()));

        cache.put(Some("0xa"), 0, 20, page());
        cache.put(Some("0xb"), 0, 20, page());
        tokio::time::sleep(Duration::from_millis(50)).await;

        cache.send_action(IndexAction {
            kind: IndexActionKind::Visible,
            author: "0xa".to_string(),
            is_private: false,
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(cache.get(Some("0xa"), 0, 20).is_none());
        assert!(cache.get(Some("0xb"), 0, 20).is_none());

        shutdown.cancel();
        handle.await.unwrap();
    }
}
