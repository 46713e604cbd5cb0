//! # streamreader
//!
//! The per-stream read path for a block-cache-backed log storage engine:
//! sliding-window prefetch over content-addressed objects in remote object
//! storage.
//!
//! A [`stream::StreamReader`] turns `(start_offset, end_offset, max_bytes)`
//! requests into fetches against a shared, reference-counted
//! [`cache::BlockCache`], growing a contiguous index window
//! ([`stream::BlockWindow`]) forward as needed and prefetching beyond the
//! current read with an adaptive readahead size
//! ([`stream::ReadaheadController`]). It tolerates concurrent compaction of
//! the underlying objects: a read that hits a deleted object resets its
//! window and retries once.
//!
//! ## Architecture
//!
//! - [`error`] - error taxonomy and retry classification
//! - [`record`] - record batches, the unit a read returns
//! - [`object`] - `ObjectManager`/`ObjectReader` traits, plus an in-memory
//!   implementation used by tests and the demo binary
//! - [`cache`] - the shared, pin-counted block cache
//! - [`stream`] - the index window, readahead controller, and reader itself
//! - [`config`] - CLI and tuning configuration
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use streamreader::{cache::BlockCache, config::ReaderConfig, object::memory::InMemoryObjectStore, stream::StreamReader};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ReaderConfig::default();
//!     let store = Arc::new(InMemoryObjectStore::new(1));
//!     store.push_object(&[(0, 100, 100), (100, 250, 150)]);
//!
//!     let cache = Arc::new(BlockCache::new(config.cache_capacity));
//!     let reader = StreamReader::new(1, store, cache, config, 0);
//!
//!     let result = reader.read(0, 250, 1024).await.unwrap();
//!     println!("read {} batches", result.batches.len());
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod object;
pub mod record;
pub mod stream;

pub use cache::{BlockCache, DataBlockHandle, SlotKey};
pub use config::ReaderConfig;
pub use error::{ObjectId, StreamError};
pub use object::{BlockIndex, DataBlock, ObjectManager, ObjectMetadata, ObjectReader};
pub use record::{CacheAccessType, RecordBatch};
pub use stream::{BlockEntry, BlockWindow, ReadResult, ReadaheadController, StreamReader, StreamReaderStats};
