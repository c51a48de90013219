//! Asynchronous indexing: a single background worker writes each block's
//! entries in their own batch after the block has been committed.
//!
//! ```text
//! commit path ──create_indexes_async──→ [bounded queue] ──→ worker ──write_batch──→ store
//!                                                              │
//!                                              progress (indexed_through / failure)
//! ```
//!
//! One worker, FIFO queue and gap-free submissions: a later block's entries
//! are never visible before an earlier block's. After a restart the next
//! accepted block is the one after the last indexed block, so blocks dropped
//! by a discarding stop must be resubmitted before anything newer.

use crate::domain::{
    extract_indexes, AsyncIndexerConfig, Backpressure, IndexError, ShutdownMode,
};
use crate::ports::outbound::IndexStore;
use crate::service::queries::IndexQueries;
use ledger_types::{Block, Hash};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn, Instrument, Span};

/// Snapshot of the worker's progress.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexerProgress {
    /// First block this indexer wrote.
    pub indexed_from: Option<u64>,
    /// Highest block whose entries are queryable. Every block from
    /// `indexed_from` up to here has been written.
    pub indexed_through: Option<u64>,
    /// Set once the worker gives up on a block.
    pub failure: Option<WorkerFailure>,
    /// Whether a worker is accepting blocks.
    pub running: bool,
}

impl IndexerProgress {
    pub fn covers(&self, block_number: u64) -> bool {
        match (self.indexed_from, self.indexed_through) {
            (Some(from), Some(through)) => (from..=through).contains(&block_number),
            _ => false,
        }
    }
}

/// Block the worker halted on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerFailure {
    pub block_number: u64,
    pub reason: String,
}

struct IndexJob {
    block: Arc<Block>,
    block_number: u64,
    block_hash: Hash,
}

struct WorkerHandle {
    jobs: mpsc::Sender<IndexJob>,
    task: JoinHandle<()>,
    /// `None` until the first block is accepted.
    next_expected: Option<u64>,
}

#[derive(Default)]
struct WorkerSlot {
    handle: Option<WorkerHandle>,
    /// First block ever accepted; the resume point while nothing is indexed.
    first_submitted: Option<u64>,
}

/// Indexer backed by a background worker.
pub struct AsyncIndexer {
    store: Arc<dyn IndexStore>,
    queries: IndexQueries,
    config: AsyncIndexerConfig,
    span: Span,
    worker: Mutex<WorkerSlot>,
    progress: Arc<watch::Sender<IndexerProgress>>,
    shutdown: watch::Sender<bool>,
}

impl AsyncIndexer {
    /// `span` scopes every event this indexer and its worker emit.
    pub fn new(store: Arc<dyn IndexStore>, config: AsyncIndexerConfig, span: Span) -> Self {
        let (progress, _) = watch::channel(IndexerProgress::default());
        let (shutdown, _) = watch::channel(false);
        Self {
            queries: IndexQueries::new(Arc::clone(&store)),
            store,
            config,
            span,
            worker: Mutex::new(WorkerSlot::default()),
            progress: Arc::new(progress),
            shutdown,
        }
    }

    pub fn queries(&self) -> &IndexQueries {
        &self.queries
    }

    pub fn config(&self) -> &AsyncIndexerConfig {
        &self.config
    }

    /// Spawn the worker and wait until it is ready to take blocks.
    pub async fn start(&self) -> Result<(), IndexError> {
        let mut slot = self.worker.lock().await;
        if slot.handle.is_some() {
            return Err(IndexError::AlreadyStarted);
        }

        self.shutdown.send_replace(false);
        let indexed_through = self.progress.borrow().indexed_through;
        let next_expected = match indexed_through {
            Some(n) => Some(n.saturating_add(1)),
            None => slot.first_submitted,
        };
        self.progress.send_modify(|p| {
            p.failure = None;
            p.running = true;
        });

        let (jobs_tx, jobs_rx) = mpsc::channel(self.config.queue_capacity);
        let (ready_tx, ready_rx) = oneshot::channel();
        let worker = Worker {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
            progress: Arc::clone(&self.progress),
            shutdown: self.shutdown.subscribe(),
        };
        let task = tokio::spawn(worker.run(jobs_rx, ready_tx).instrument(self.span.clone()));

        if ready_rx.await.is_err() {
            self.progress.send_modify(|p| p.running = false);
            return Err(IndexError::WorkerFailed {
                block_number: next_expected.unwrap_or_default(),
                reason: "worker exited before becoming ready".into(),
            });
        }

        slot.handle = Some(WorkerHandle {
            jobs: jobs_tx,
            task,
            next_expected,
        });
        info!(
            parent: &self.span,
            capacity = self.config.queue_capacity,
            ?next_expected,
            "indexing worker started"
        );
        Ok(())
    }

    pub fn create_indexes_sync(&self) -> Result<(), IndexError> {
        Err(IndexError::NotApplicable {
            operation: "create_indexes_sync",
            strategy: "asynchronous",
        })
    }

    /// Queue `block` for indexing.
    ///
    /// Returns once the block is queued, not once it is queryable; see
    /// `wait_until_indexed`. With `Backpressure::Block` this waits for a free
    /// queue slot.
    ///
    /// Every block after the first must be the successor of the previous
    /// accepted one; anything else is `OutOfOrder`.
    pub async fn create_indexes_async(
        &self,
        block: Arc<Block>,
        block_number: u64,
        block_hash: Hash,
    ) -> Result<(), IndexError> {
        let mut guard = self.worker.lock().await;
        let slot = &mut *guard;
        let handle = slot.handle.as_mut().ok_or(IndexError::NotStarted)?;

        if let Some(err) = self.failure_error() {
            return Err(err);
        }
        if let Some(expected) = handle.next_expected {
            if block_number != expected {
                return Err(IndexError::OutOfOrder {
                    block_number,
                    expected,
                });
            }
        }

        let job = IndexJob {
            block,
            block_number,
            block_hash,
        };
        match self.config.backpressure {
            Backpressure::Block => handle
                .jobs
                .send(job)
                .await
                .map_err(|_| self.closed_error())?,
            Backpressure::Reject => handle.jobs.try_send(job).map_err(|e| match e {
                TrySendError::Full(_) => {
                    warn!(parent: &self.span, block_number, "indexing queue full, block rejected");
                    IndexError::QueueFull {
                        capacity: self.config.queue_capacity,
                    }
                }
                TrySendError::Closed(_) => self.closed_error(),
            })?,
        }

        handle.next_expected = Some(block_number.saturating_add(1));
        slot.first_submitted.get_or_insert(block_number);
        Ok(())
    }

    /// Stop the worker. Safe to call while blocks are being indexed; an
    /// in-flight batch is always completed or not started, never split.
    pub async fn stop(&self) {
        if self.config.shutdown == ShutdownMode::Discard {
            self.shutdown.send_replace(true);
        }

        let Some(handle) = self.worker.lock().await.handle.take() else {
            return;
        };
        drop(handle.jobs);
        if let Err(e) = handle.task.await {
            error!(parent: &self.span, error = %e, "indexing worker panicked");
        }
        self.progress.send_modify(|p| p.running = false);
        info!(parent: &self.span, "indexing worker stopped");
    }

    pub fn progress(&self) -> IndexerProgress {
        self.progress.borrow().clone()
    }

    /// Highest block whose entries are queryable.
    pub fn indexed_through(&self) -> Option<u64> {
        self.progress.borrow().indexed_through
    }

    /// Resolve once `block_number` is queryable.
    ///
    /// Blocks below the first one this indexer wrote are never covered.
    ///
    /// Fails with `WorkerFailed` if the worker halts first, and with
    /// `NotStarted` if no worker is running to make progress.
    pub async fn wait_until_indexed(&self, block_number: u64) -> Result<(), IndexError> {
        let mut rx = self.progress.subscribe();
        let progress = rx
            .wait_for(|p| p.covers(block_number) || p.failure.is_some() || !p.running)
            .await
            .map_err(|_| IndexError::NotStarted)?
            .clone();

        if progress.covers(block_number) {
            return Ok(());
        }
        Err(match progress.failure {
            Some(failure) => IndexError::WorkerFailed {
                block_number: failure.block_number,
                reason: failure.reason,
            },
            None => IndexError::NotStarted,
        })
    }

    fn failure_error(&self) -> Option<IndexError> {
        self.progress
            .borrow()
            .failure
            .as_ref()
            .map(|failure| IndexError::WorkerFailed {
                block_number: failure.block_number,
                reason: failure.reason.clone(),
            })
    }

    fn closed_error(&self) -> IndexError {
        self.failure_error().unwrap_or(IndexError::NotStarted)
    }
}

enum Outcome {
    Indexed,
    /// Discard shutdown arrived while waiting to retry.
    Abandoned,
    Failed(String),
}

/// Resolves when a discarding stop has been requested.
async fn discard_requested(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        // Indexer dropped; the closed job queue ends the worker instead.
        std::future::pending::<()>().await;
    }
}

struct Worker {
    store: Arc<dyn IndexStore>,
    config: AsyncIndexerConfig,
    progress: Arc<watch::Sender<IndexerProgress>>,
    shutdown: watch::Receiver<bool>,
}

impl Worker {
    async fn run(mut self, mut jobs: mpsc::Receiver<IndexJob>, ready: oneshot::Sender<()>) {
        if ready.send(()).is_err() {
            return;
        }
        debug!("indexing worker ready");

        loop {
            let job = tokio::select! {
                biased;
                _ = discard_requested(&mut self.shutdown) => break,
                job = jobs.recv() => match job {
                    Some(job) => job,
                    None => break,
                },
            };

            let block_number = job.block_number;
            match self.index_block(job).await {
                Outcome::Indexed => {}
                Outcome::Abandoned => break,
                Outcome::Failed(reason) => {
                    error!(block_number, %reason, "indexing worker halted");
                    self.progress.send_modify(|p| {
                        p.failure = Some(WorkerFailure {
                            block_number,
                            reason,
                        });
                        p.running = false;
                    });
                    break;
                }
            }
        }

        jobs.close();
        let mut discarded = 0usize;
        while jobs.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            info!(discarded, "queued blocks dropped at shutdown");
        }
        self.progress.send_modify(|p| p.running = false);
    }

    async fn index_block(&mut self, job: IndexJob) -> Outcome {
        let block_number = job.block_number;
        let extracted = match extract_indexes(&job.block, block_number, &job.block_hash) {
            Ok(extracted) => extracted,
            Err(e) => return Outcome::Failed(e.to_string()),
        };
        let entries = extracted.entries.len();
        let batch = extracted.into_batch();

        let mut attempt = 0u32;
        loop {
            let store = Arc::clone(&self.store);
            let attempt_batch = batch.clone();
            let result = tokio::task::spawn_blocking(move || store.write_batch(attempt_batch)).await;

            match result {
                Ok(Ok(())) => {
                    self.progress.send_modify(|p| {
                        p.indexed_from.get_or_insert(block_number);
                        p.indexed_through = Some(block_number);
                    });
                    debug!(
                        block_number,
                        block_hash = %hex::encode(&job.block_hash[..4]),
                        entries,
                        "indexed block"
                    );
                    return Outcome::Indexed;
                }
                Ok(Err(e)) if attempt < self.config.max_write_retries => {
                    attempt += 1;
                    warn!(block_number, attempt, error = %e, "index write failed, retrying");
                    tokio::select! {
                        biased;
                        _ = discard_requested(&mut self.shutdown) => return Outcome::Abandoned,
                        _ = tokio::time::sleep(self.config.retry_backoff) => {}
                    }
                }
                Ok(Err(e)) => return Outcome::Failed(e.to_string()),
                Err(e) => return Outcome::Failed(format!("write task failed: {}", e)),
            }
        }
    }
}
