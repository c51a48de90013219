//! Indexer configuration with validation.
//!
//! The strategy is chosen once at startup from `IndexerConfig::mode`.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Main indexer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct IndexerConfig {
    /// When index entries are written relative to the block commit
    pub mode: IndexingMode,
    /// Background worker settings (asynchronous mode only)
    pub async_worker: AsyncIndexerConfig,
}

impl IndexerConfig {
    /// Synchronous indexing (entries commit with the block).
    pub fn synchronous() -> Self {
        Self::default()
    }

    /// Asynchronous indexing with the given worker settings.
    pub fn asynchronous(async_worker: AsyncIndexerConfig) -> Self {
        Self {
            mode: IndexingMode::Asynchronous,
            async_worker,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.async_worker.validate()
    }
}

/// Indexing strategy selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IndexingMode {
    /// Index entries join the block's own write batch.
    #[default]
    Synchronous,
    /// Index entries are written by a background worker after the commit.
    Asynchronous,
}

/// What `create_indexes_async` does when the queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Backpressure {
    /// Wait until the worker frees a slot.
    #[default]
    Block,
    /// Fail with `QueueFull`.
    Reject,
}

/// What `stop` does with queued blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownMode {
    /// Index every queued block before the worker exits.
    #[default]
    Drain,
    /// Finish the in-flight block, drop the rest.
    Discard,
}

/// Background worker configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AsyncIndexerConfig {
    /// Blocks that may wait for the worker
    pub queue_capacity: usize,
    /// Full-queue policy
    pub backpressure: Backpressure,
    /// Extra attempts after a failed batch write before the worker halts
    pub max_write_retries: u32,
    /// Delay between write attempts
    #[serde(with = "duration_millis")]
    pub retry_backoff: Duration,
    /// Queue handling on stop
    pub shutdown: ShutdownMode,
}

impl Default for AsyncIndexerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            backpressure: Backpressure::Block,
            max_write_retries: 3,
            retry_backoff: Duration::from_millis(50),
            shutdown: ShutdownMode::Drain,
        }
    }
}

impl AsyncIndexerConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::InvalidQueueCapacity);
        }
        Ok(())
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_backpressure(mut self, backpressure: Backpressure) -> Self {
        self.backpressure = backpressure;
        self
    }

    pub fn with_retries(mut self, max_write_retries: u32, retry_backoff: Duration) -> Self {
        self.max_write_retries = max_write_retries;
        self.retry_backoff = retry_backoff;
        self
    }

    pub fn with_shutdown(mut self, shutdown: ShutdownMode) -> Self {
        self.shutdown = shutdown;
        self
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("async_worker.queue_capacity cannot be 0")]
    InvalidQueueCapacity,
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
