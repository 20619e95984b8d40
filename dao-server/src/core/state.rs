//! Server state wiring
//!
//! [`ServerState`] owns every shared service: the embedded database,
//! the KV store, the facade over the domain engines, the search bridge
//! and the blob store. It is Clone-cheap (all fields are handles) and
//! travels into the axum router as application state.

use std::sync::Arc;

use axum::extract::FromRef;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use crate::auth::{AuthService, DevWalletVerifier, SessionStore, SharedVerifier};
use crate::cache::{CacheIndex, CacheIndexWorker, KvStore, MemoryKv};
use crate::chat::ChatLinkManager;
use crate::core::config::Config;
use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::db::repository::{
    CommentRepository, DaoRepository, MsgRepository, PostRepository, RedpacketRepository,
    TagRepository, UserRepository,
};
use crate::facade::Facade;
use crate::notify::NotifyAggregator;
use crate::pay::{HttpPayGateway, SharedGateway};
use crate::posts::comments::CommentEngine;
use crate::posts::PostEngine;
use crate::redpacket::RedpacketEngine;
use crate::search::bridge::SearchBridge;
use crate::search::SearchBackend;
use crate::storage::BlobStore;
use crate::utils::AppResult;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub db: Surreal<Db>,
    pub kv: Arc<dyn KvStore>,
    pub facade: Facade,
    pub bridge: SearchBridge,
    pub blobs: BlobStore,
    /// Single cache-index consumer, taken exactly once at startup
    cache_worker: Arc<parking_lot::Mutex<Option<CacheIndexWorker>>>,
}

impl FromRef<ServerState> for SessionStore {
    fn from_ref(state: &ServerState) -> Self {
        state.facade.auth.sessions().clone()
    }
}

impl ServerState {
    /// Wire every service on top of an already-open database
    pub fn assemble(
        config: Config,
        db: Surreal<Db>,
        pay_gateway: SharedGateway,
        verifier: SharedVerifier,
    ) -> AppResult<Self> {
        let kv: Arc<dyn KvStore> = Arc::new(MemoryKv::new());

        let users = UserRepository::new(db.clone());
        let daos = DaoRepository::new(db.clone());
        let posts_repo = PostRepository::new(db.clone());
        let tags = TagRepository::new(db.clone());
        let comments_repo = CommentRepository::new(db.clone());
        let redpackets_repo = RedpacketRepository::new(db.clone());
        let msgs = MsgRepository::new(db.clone());

        let backend = SearchBackend::from_config(&config)?;
        let bridge = SearchBridge::new(backend, &config);
        let (cache, cache_worker) = CacheIndex::new(&config);
        let blobs = BlobStore::from_config(&config)?;

        let chat_gateway = crate::chat::gateway::from_config(&config)?;
        let chat = ChatLinkManager::new(chat_gateway, daos.clone(), users.clone());

        let sessions = SessionStore::new(
            kv.clone(),
            std::time::Duration::from_secs(config.session_ttl_secs),
        );
        let auth = AuthService::new(
            users.clone(),
            sessions,
            kv.clone(),
            verifier,
            chat.clone(),
            &config,
        );

        let posts = PostEngine::new(
            posts_repo.clone(),
            tags.clone(),
            users.clone(),
            daos.clone(),
            bridge.clone(),
            cache,
            blobs.clone(),
        );
        let comments = CommentEngine::new(
            comments_repo,
            posts_repo,
            users.clone(),
            bridge.clone(),
            config.max_comment_count,
        );
        let redpackets = RedpacketEngine::new(
            redpackets_repo,
            kv.clone(),
            pay_gateway.clone(),
            config.platform_address.clone(),
            config.redpacket_ttl_secs,
        );
        let notify = NotifyAggregator::new(msgs, users.clone(), daos.clone());

        let facade = Facade::new(
            auth,
            posts,
            comments,
            redpackets,
            notify,
            chat,
            daos,
            users,
            pay_gateway,
            config.platform_address.clone(),
        );

        Ok(Self {
            config,
            db,
            kv,
            facade,
            bridge,
            blobs,
            cache_worker: Arc::new(parking_lot::Mutex::new(Some(cache_worker))),
        })
    }

    /// Open the database and wire production services
    pub async fn initialize(config: &Config) -> AppResult<Self> {
        let db = crate::db::connect(&config.work_dir).await?;
        let pay_gateway: SharedGateway = Arc::new(HttpPayGateway::from_config(config)?);
        let verifier: SharedVerifier = Arc::new(DevWalletVerifier);
        Self::assemble(config.clone(), db, pay_gateway, verifier)
    }

    /// Register every background duty on the task manager
    pub fn start_background_tasks(&self, tasks: &mut BackgroundTasks) {
        if let Some(worker) = self.cache_worker.lock().take() {
            let token = tasks.shutdown_token();
            tasks.spawn("cache_index", TaskKind::Worker, async move {
                worker.run(token).await;
            });
        }

        for id in 0..self.bridge.worker_count() {
            let bridge = self.bridge.clone();
            let token = tasks.shutdown_token();
            tasks.spawn("search_bridge", TaskKind::Worker, async move {
                bridge.run_worker(id, token).await;
            });
        }

        {
            let facade = self.facade.clone();
            let token = tasks.shutdown_token();
            tasks.spawn("redpacket_timeout", TaskKind::Periodic, async move {
                let mut ticker = tokio::time::interval(std::time::Duration::from_secs(60));
                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = ticker.tick() => {
                            match facade.redpackets.expire_and_refund().await {
                                Ok(0) => {}
                                Ok(n) => tracing::info!(count = n, "Timed-out red packets refunded"),
                                Err(e) => tracing::error!(error = %e, "Red-packet timeout sweep failed"),
                            }
                        }
                    }
                }
            });
        }

        {
            let facade = self.facade.clone();
            let max_age = self.config.pin_ttl_secs;
            let token = tasks.shutdown_token();
            tasks.spawn("pin_expiry", TaskKind::Periodic, async move {
                let mut ticker = tokio::time::interval(std::time::Duration::from_secs(600));
                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = ticker.tick() => {
                            match facade.posts.expire_pins(max_age).await {
                                Ok(0) => {}
                                Ok(n) => tracing::info!(count = n, "Expired pins released"),
                                Err(e) => tracing::error!(error = %e, "Pin expiry sweep failed"),
                            }
                        }
                    }
                }
            });
        }

        {
            let facade = self.facade.clone();
            let interval = self.config.reindex_interval_secs.max(60);
            let token = tasks.shutdown_token();
            tasks.spawn("search_reindex", TaskKind::Periodic, async move {
                let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval));
                // First tick fires immediately; skip it so startup does
                // not re-push the whole recent window
                ticker.tick().await;
                let mut last_run = crate::utils::time::now_ts();
                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = ticker.tick() => {
                            let since = last_run;
                            last_run = crate::utils::time::now_ts();
                            match facade.posts.reindex_modified_since(since).await {
                                Ok(0) => {}
                                Ok(n) => tracing::debug!(count = n, "Posts re-indexed"),
                                Err(e) => tracing::error!(error = %e, "Search re-index failed"),
                            }
                        }
                    }
                }
            });
        }

        {
            let facade = self.facade.clone();
            let token = tasks.shutdown_token();
            tasks.spawn("user_sweeper", TaskKind::Periodic, async move {
                let mut ticker = tokio::time::interval(std::time::Duration::from_secs(60));
                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = ticker.tick() => {
                            match facade.sweep_cancelled(50).await {
                                Ok(0) => {}
                                Ok(n) => tracing::info!(count = n, "Cancelled users swept"),
                                Err(e) => tracing::error!(error = %e, "Cancellation sweep failed"),
                            }
                        }
                    }
                }
            });
        }
    }
}
