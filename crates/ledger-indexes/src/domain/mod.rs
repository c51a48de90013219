//! # Domain Layer
//!
//! Pure indexing logic. No I/O: storage is reached through `crate::ports`.
//!
//! - `codec` - binary key/value layouts of the index families
//! - `extractor` - block → index entries
//! - `config` - strategy selection and worker settings
//! - `errors` - error taxonomy

pub mod codec;
pub mod config;
pub mod errors;
pub mod extractor;

pub use codec::IndexFamily;
pub use config::{AsyncIndexerConfig, Backpressure, ConfigError, IndexerConfig, IndexingMode, ShutdownMode};
pub use errors::{DecodeError, IndexError, IndexResult};
pub use extractor::{extract_indexes, ExtractedIndexes, IndexEntry};
