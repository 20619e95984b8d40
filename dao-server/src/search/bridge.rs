//! Buffered bridge between the engines and the search backend
//!
//! Producers never block on the index: jobs go through a bounded
//! primary channel, spill to a smaller secondary channel when the
//! primary is full, and as a last resort a throwaway task is spawned
//! to wait on the secondary. Workers drain both channels; on shutdown
//! whatever is still buffered is flushed before the workers exit.

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use super::{PostDoc, SearchBackend};
use crate::core::config::Config;

/// One unit of index work
#[derive(Debug)]
pub enum IndexJob {
    Add(Vec<PostDoc>),
    Delete(Vec<String>),
}

type SharedRx = Arc<Mutex<mpsc::Receiver<IndexJob>>>;

#[derive(Clone)]
pub struct SearchBridge {
    backend: SearchBackend,
    primary_tx: mpsc::Sender<IndexJob>,
    secondary_tx: mpsc::Sender<IndexJob>,
    primary_rx: SharedRx,
    secondary_rx: SharedRx,
    workers: usize,
}

impl SearchBridge {
    pub fn new(backend: SearchBackend, config: &Config) -> Self {
        let primary_cap = config.search_buffer;
        let secondary_cap = (primary_cap / 10).max(10);
        let (primary_tx, primary_rx) = mpsc::channel(primary_cap);
        let (secondary_tx, secondary_rx) = mpsc::channel(secondary_cap);
        Self {
            backend,
            primary_tx,
            secondary_tx,
            primary_rx: Arc::new(Mutex::new(primary_rx)),
            secondary_rx: Arc::new(Mutex::new(secondary_rx)),
            workers: config.search_workers,
        }
    }

    pub fn backend(&self) -> &SearchBackend {
        &self.backend
    }

    pub fn worker_count(&self) -> usize {
        self.workers
    }

    /// Enqueue a job without ever blocking the caller
    pub fn push(&self, job: IndexJob) {
        let job = match self.primary_tx.try_send(job) {
            Ok(()) => return,
            Err(mpsc::error::TrySendError::Full(job)) => job,
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!("Search bridge closed, dropping index job");
                return;
            }
        };
        let job = match self.secondary_tx.try_send(job) {
            Ok(()) => return,
            Err(mpsc::error::TrySendError::Full(job)) => job,
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!("Search bridge closed, dropping index job");
                return;
            }
        };
        // Both buffers full; park the job on a one-off task
        tracing::warn!("Search buffers full, spawning overflow forwarder");
        let tx = self.secondary_tx.clone();
        tokio::spawn(async move {
            if tx.send(job).await.is_err() {
                tracing::warn!("Search bridge closed, overflow job dropped");
            }
        });
    }

    /// Worker loop. Spawn `worker_count()` copies of this future.
    pub async fn run_worker(self, id: usize, shutdown: CancellationToken) {
        tracing::debug!(worker = id, "Search bridge worker started");
        loop {
            let job = tokio::select! {
                _ = shutdown.cancelled() => break,
                job = recv_shared(&self.primary_rx) => job,
                job = recv_shared(&self.secondary_rx) => job,
            };
            match job {
                Some(job) => self.apply(job).await,
                None => break,
            }
        }
        // Flush whatever is still buffered before going away
        while let Some(job) = try_recv_shared(&self.primary_rx).await {
            self.apply(job).await;
        }
        while let Some(job) = try_recv_shared(&self.secondary_rx).await {
            self.apply(job).await;
        }
        tracing::debug!(worker = id, "Search bridge worker stopped");
    }

    async fn apply(&self, job: IndexJob) {
        let result = match job {
            IndexJob::Add(docs) => self.backend.add_documents(docs).await,
            IndexJob::Delete(ids) => self.backend.delete_documents(ids).await,
        };
        // The store stays authoritative; re-index reconciles later
        if let Err(e) = result {
            tracing::warn!(error = %e, "Search index push failed");
        }
    }
}

async fn recv_shared(rx: &SharedRx) -> Option<IndexJob> {
    rx.lock().await.recv().await
}

async fn try_recv_shared(rx: &SharedRx) -> Option<IndexJob> {
    rx.lock().await.try_recv().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;

    fn bridge() -> SearchBridge {
        let config = Config::with_overrides("/tmp/dao-test", 0);
        SearchBridge::new(SearchBackend::Null, &config)
    }

    #[tokio::test]
    async fn push_never_blocks() {
        let b = bridge();
        for i in 0..5000 {
            b.push(IndexJob::Delete(vec![format!("p{i}")]));
        }
    }

    #[tokio::test]
    async fn worker_drains_on_shutdown() {
        let b = bridge();
        for i in 0..50 {
            b.push(IndexJob::Delete(vec![format!("p{i}")]));
        }
        let token = CancellationToken::new();
        token.cancel();
        // Already-cancelled token: the worker must still flush the buffer
        b.clone().run_worker(0, token).await;
        assert!(try_recv_shared(&b.primary_rx).await.is_none());
    }
}
