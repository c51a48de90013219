//! # Domain Errors
//!
//! Error types for the indexing engine.
//!
//! | Error | Raised by | Caller action |
//! |-------|-----------|---------------|
//! | `NotFound` | query façade | expected; the key was never indexed |
//! | `MalformedValue` | codec via query façade | on-disk corruption or codec mismatch |
//! | `Store` | store adapter | propagate; retry policy belongs to the caller |
//! | `NotApplicable` | indexing strategy | programming error; fail fast |
//! | `MalformedBlock` | extractor | upstream contract violation; abort the commit |

use crate::domain::codec::IndexFamily;
use crate::ports::outbound::StoreError;
use thiserror::Error;

/// Errors returned by indexing and lookup operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// The requested key is absent from the index.
    #[error("{family} index has no entry for key {key}")]
    NotFound { family: IndexFamily, key: String },

    /// A stored value could not be decoded.
    #[error("malformed {family} value: {source}")]
    MalformedValue {
        family: IndexFamily,
        source: DecodeError,
    },

    /// The key-value engine failed the operation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The operation belongs to the other indexing strategy.
    #[error("{operation} is not applicable to the {strategy} indexer")]
    NotApplicable {
        operation: &'static str,
        strategy: &'static str,
    },

    /// The block violates the extraction contract.
    #[error("malformed block {block_number}: {reason}")]
    MalformedBlock { block_number: u64, reason: String },

    /// The asynchronous worker has not been started (or was stopped).
    #[error("indexing worker is not running")]
    NotStarted,

    /// `start` was called on a running asynchronous worker.
    #[error("indexing worker is already running")]
    AlreadyStarted,

    /// The asynchronous queue is full and the backpressure policy rejects.
    #[error("indexing queue full ({capacity} blocks pending)")]
    QueueFull { capacity: usize },

    /// Blocks must reach the asynchronous worker in order and without gaps.
    #[error("block {block_number} submitted, expected block {expected}")]
    OutOfOrder { block_number: u64, expected: u64 },

    /// The asynchronous worker gave up on a block and halted.
    #[error("indexing worker halted at block {block_number}: {reason}")]
    WorkerFailed { block_number: u64, reason: String },
}

impl IndexError {
    /// Whether this error only reports an absent key.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Binary decoding failures of index keys and values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The buffer ended inside a variable-width integer, or before an
    /// expected integer.
    #[error("buffer truncated")]
    Truncated,

    /// A variable-width integer does not fit in 64 bits.
    #[error("varint overflows u64")]
    Overflow,

    /// Bytes remain after the expected integers were read.
    #[error("{remaining} trailing bytes")]
    TrailingBytes { remaining: usize },

    /// The key does not start with the expected family prefix.
    #[error("unexpected key prefix {found:#04x}")]
    WrongPrefix { found: u8 },

    /// An address component is not valid UTF-8.
    #[error("address is not valid UTF-8")]
    InvalidUtf8,
}

/// Result type for indexing operations.
pub type IndexResult<T> = Result<T, IndexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = IndexError::NotFound {
            family: IndexFamily::BlockHash,
            key: "abcd".into(),
        };
        assert!(err.is_not_found());
        assert!(err.to_string().contains("block-hash"));
        assert!(err.to_string().contains("abcd"));
    }

    #[test]
    fn test_store_error_conversion() {
        let err: IndexError = StoreError::Io {
            message: "disk failure".into(),
        }
        .into();

        assert!(!err.is_not_found());
        assert!(err.to_string().contains("disk failure"));
    }

    #[test]
    fn test_malformed_value_display() {
        let err = IndexError::MalformedValue {
            family: IndexFamily::TxGuid,
            source: DecodeError::Truncated,
        };
        assert!(err.to_string().contains("tx-guid"));
        assert!(err.to_string().contains("truncated"));
    }
}
