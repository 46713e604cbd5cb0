//! §4.1-4.3 "StreamReader": turns `(start_offset, end_offset, max_bytes)`
//! requests into block-cache fetches, growing the index window forward as
//! needed and prefetching beyond the read with an adaptive readahead size.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

use crate::cache::{BlockCache, SlotKey};
use crate::config::ReaderConfig;
use crate::error::StreamError;
use crate::object::ObjectManager;
use crate::record::{CacheAccessType, RecordBatch};

use super::entry::BlockEntry;
use super::readahead::ReadaheadController;
use super::window::BlockWindow;

/// Result of one [`StreamReader::read`] call.
#[derive(Debug, Clone)]
pub struct ReadResult {
    pub batches: Vec<RecordBatch>,
    /// `Miss` if any block this read touched required a fetch; `Hit` if
    /// every block was already cached.
    pub access_type: CacheAccessType,
}

/// Point-in-time counters for one stream's activity.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamReaderStats {
    pub bytes_read: u64,
    pub batches_read: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub retries: u64,
    /// Approximate bytes currently warmed in the cache by readahead but not
    /// yet consumed by a real read.
    pub readahead_bytes_inflight: u64,
}

#[derive(Debug, Default)]
struct StatsInner {
    bytes_read: u64,
    batches_read: u64,
    cache_hits: u64,
    cache_misses: u64,
    retries: u64,
}

struct Inner {
    window: BlockWindow,
    cursor: u64,
    last_access: Instant,
    readahead: ReadaheadController,
    /// Blocks readahead warmed into the cache, not yet consumed by a real
    /// read, keyed by slot with their approximate size. When a real read
    /// reaches one of these keys, its cache hit/miss tells the readahead
    /// controller whether the prefetch paid off or was evicted too early
    /// (§4.4 `handleBlockFree` on an unread entry, §9's eviction-pressure
    /// scenario) without needing a separate free-notification channel.
    readahead_pending: HashMap<SlotKey, u64>,
    stats: StatsInner,
}

/// Per-stream read path over a shared, reference-counted block cache.
pub struct StreamReader<M: ObjectManager> {
    stream_id: u64,
    manager: Arc<M>,
    cache: Arc<BlockCache>,
    config: ReaderConfig,
    inner: Mutex<Inner>,
}

impl<M: ObjectManager> StreamReader<M> {
    pub fn new(stream_id: u64, manager: Arc<M>, cache: Arc<BlockCache>, config: ReaderConfig, start_offset: u64) -> Self {
        let readahead = ReadaheadController::new(
            config.default_readahead_size,
            config.max_readahead_size,
            Duration::from_secs(config.readahead_cooldown_secs),
        );
        Self {
            stream_id,
            manager,
            cache,
            config,
            inner: Mutex::new(Inner {
                window: BlockWindow::new(),
                cursor: start_offset,
                last_access: Instant::now(),
                readahead,
                readahead_pending: HashMap::new(),
                stats: StatsInner::default(),
            }),
        }
    }

    pub fn stream_id(&self) -> u64 {
        self.stream_id
    }

    /// Read records covering `[start_offset, end_offset)`, stopping once
    /// `max_bytes` worth of records have been collected (one trailing batch
    /// may exceed the budget rather than be dropped).
    ///
    /// Retries once, with the index window reset, if the first attempt fails
    /// with a retryable error (§4.1, §7) — typically a compaction racing the
    /// read out from under it.
    pub async fn read(&self, start_offset: u64, end_offset: u64, max_bytes: i64) -> Result<ReadResult, StreamError> {
        let mut attempt = 0;
        loop {
            match self.read_once(start_offset, end_offset, max_bytes).await {
                Ok(result) => return Ok(result),
                Err(err) if err.retryable() && attempt < self.config.read_retry_budget => {
                    attempt += 1;
                    warn!(stream_id = self.stream_id, %err, attempt, "retrying read after window reset");
                    let mut inner = self.inner.lock().await;
                    inner.window.reset();
                    inner.stats.retries += 1;
                    drop(inner);
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn read_once(&self, start_offset: u64, end_offset: u64, max_bytes: i64) -> Result<ReadResult, StreamError> {
        let mut inner = self.inner.lock().await;

        self.get_blocks(&mut inner, start_offset, end_offset).await?;

        let mut batches = Vec::new();
        let mut total: i64 = 0;
        let mut access_type = CacheAccessType::Hit;

        let entries: Vec<BlockEntry> = inner.window.tail_range(start_offset).copied().collect();
        let mut cursor = start_offset;
        for entry in entries {
            if entry.start_offset() >= end_offset {
                break;
            }
            if !batches.is_empty() && total >= max_bytes {
                break;
            }
            if !self.manager.is_object_exist(entry.object_metadata.object_id) {
                return Err(StreamError::ObjectNotExist(entry.object_metadata.object_id));
            }

            // §4.1 step 3: the window's contiguity invariant should make this
            // unreachable; a violation means a bug in block acquisition, not
            // a transient condition, so it is not retried.
            if cursor < entry.start_offset() || cursor >= entry.end_offset() {
                return Err(StreamError::InternalConsistency(format!(
                    "cursor {} outside block [{}, {})",
                    cursor,
                    entry.start_offset(),
                    entry.end_offset()
                )));
            }

            let key = SlotKey::new(entry.object_metadata.object_id, entry.start_offset());
            let was_readahead_pending = inner.readahead_pending.remove(&key).is_some();

            let manager = self.manager.clone();
            let object_metadata = entry.object_metadata;
            let index = entry.index;
            let handle = self
                .cache
                .get_block(key, || async move {
                    let reader = manager.open_reader(object_metadata.object_id).await?;
                    reader.read_block(index).await
                })
                .await?;

            match handle.access_type() {
                CacheAccessType::Hit => {
                    inner.stats.cache_hits += 1;
                    trace!(stream_id = self.stream_id, already_read = handle.is_read(), "cache hit");
                }
                CacheAccessType::Miss => {
                    inner.stats.cache_misses += 1;
                    access_type = CacheAccessType::Miss;
                    if was_readahead_pending {
                        debug!(stream_id = self.stream_id, "readahead block evicted before read, resetting");
                        inner.readahead.reset(Instant::now());
                    }
                }
            }

            let block_start = cursor;
            let block_end = entry.end_offset().min(end_offset);
            let remaining = (max_bytes - total).max(0);
            let records = handle.data().get_records(block_start, block_end, remaining);
            handle.mark_read();
            for r in &records {
                total += r.size() as i64;
            }
            batches.extend(records);
            cursor = block_end;
        }

        self.after_read(&mut inner, start_offset, &batches);
        self.try_readahead(&mut inner).await;

        Ok(ReadResult { batches, access_type })
    }

    /// §4.2 "getBlocks": extend the index window forward until it covers
    /// `end_offset` or there are no more objects to discover.
    async fn get_blocks(&self, inner: &mut Inner, start_offset: u64, end_offset: u64) -> Result<(), StreamError> {
        loop {
            if let Some(loaded_end) = inner.window.loaded_end_offset() {
                if loaded_end >= end_offset {
                    return Ok(());
                }
            }
            let continuation = inner.window.loaded_end_offset().unwrap_or(start_offset);
            let before = inner.window.len();
            self.load_more_blocks_without_data(inner, continuation).await?;
            if inner.window.len() == before {
                // No more objects available forward of `continuation`.
                return Ok(());
            }
        }
    }

    /// §4.3 "loadMoreBlocksWithoutData": fetch up to `get_object_step`
    /// objects forward of `continuation` and append their block indexes to
    /// the window, without materializing any block data.
    async fn load_more_blocks_without_data(&self, inner: &mut Inner, continuation: u64) -> Result<(), StreamError> {
        let objects = self
            .manager
            .get_objects(self.stream_id, continuation, None, self.config.get_object_step)
            .await?;

        let mut cursor = continuation;
        for object in objects {
            let reader = self.manager.open_reader(object.object_id).await?;
            let indexes = reader.find(self.stream_id, cursor, None, -1).await?;
            for index in indexes {
                inner.window.push_back(BlockEntry::new(object, index))?;
                cursor = index.end_offset;
            }
        }
        Ok(())
    }

    fn after_read(&self, inner: &mut Inner, start_offset: u64, batches: &[RecordBatch]) {
        inner.last_access = Instant::now();
        inner.cursor = batches.last().map(|b| b.last_offset() + 1).unwrap_or(start_offset);
        inner.window.remove_before(inner.cursor);
        inner.stats.batches_read += batches.len() as u64;
        inner.stats.bytes_read += batches.iter().map(|b| b.size() as u64).sum::<u64>();
    }

    /// §4.5 "tryReadahead": warm the cache beyond the window's current reach
    /// by up to the controller's current readahead size, tracking what was
    /// warmed so a later real read can tell the controller whether it paid
    /// off.
    async fn try_readahead(&self, inner: &mut Inner) {
        let now = Instant::now();
        let Some(loaded_end) = inner.window.loaded_end_offset() else {
            return;
        };
        let next_read_offset = inner.cursor;
        let Some(size) = inner.readahead.plan(now, next_read_offset) else {
            return;
        };

        let start = inner.readahead.next_offset().max(loaded_end);
        let readahead_end = start.saturating_add(size);

        if let Err(err) = self.get_blocks(inner, start, readahead_end).await {
            if err.retryable() {
                inner.readahead.reset(now);
            }
            return;
        }

        let entries: Vec<BlockEntry> = inner.window.tail_range(start).copied().collect();
        let mut frontier = start;
        for entry in entries {
            if entry.start_offset() >= readahead_end {
                break;
            }
            if !self.manager.is_object_exist(entry.object_metadata.object_id) {
                inner.readahead.reset(now);
                return;
            }

            let key = SlotKey::new(entry.object_metadata.object_id, entry.start_offset());
            if self.cache.is_cached(key).await {
                frontier = entry.end_offset();
                continue;
            }

            let manager = self.manager.clone();
            let object_metadata = entry.object_metadata;
            let index = entry.index;
            let loaded = self
                .cache
                .get_block(key, || async move {
                    let reader = manager.open_reader(object_metadata.object_id).await?;
                    reader.read_block(index).await
                })
                .await;

            match loaded {
                Ok(handle) => {
                    handle.mark_unread();
                    inner.readahead_pending.insert(key, handle.data().index().approximate_size);
                    frontier = entry.end_offset();
                }
                Err(err) => {
                    if err.retryable() {
                        inner.readahead.reset(now);
                    }
                    return;
                }
            }
        }
        inner.readahead.advance(frontier);
    }

    /// Reposition the read cursor without prefetching. The index window is
    /// discarded since it may no longer be contiguous with the new offset;
    /// the next `read()` rebuilds it from scratch.
    pub async fn seek(&self, offset: u64) {
        let mut inner = self.inner.lock().await;
        inner.window.reset();
        inner.readahead_pending.clear();
        inner.readahead.skip();
        inner.cursor = offset;
        inner.last_access = Instant::now();
    }

    pub async fn next_read_offset(&self) -> u64 {
        self.inner.lock().await.cursor
    }

    pub async fn last_access_timestamp(&self) -> Instant {
        self.inner.lock().await.last_access
    }

    pub async fn stats(&self) -> StreamReaderStats {
        let inner = self.inner.lock().await;
        StreamReaderStats {
            bytes_read: inner.stats.bytes_read,
            batches_read: inner.stats.batches_read,
            cache_hits: inner.stats.cache_hits,
            cache_misses: inner.stats.cache_misses,
            retries: inner.stats.retries,
            readahead_bytes_inflight: inner.readahead_pending.values().sum(),
        }
    }

    /// Release this reader's window state. Cached blocks may outlive the
    /// call, since the cache is shared across streams.
    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;
        inner.window.reset();
        inner.readahead_pending.clear();
    }
}
