//! The shared block cache (§6 "Block cache (consumed)").
//!
//! Slots are keyed by `(object_id, block start_offset)`, which is a stable
//! identity: a compaction that rewrites a range produces objects with new
//! ids, so stale and fresh data never collide in the same slot. Loading is
//! coalesced the same way the teacher's `BlockCache::get_block` coalesces
//! concurrent range reads — one fetch per key, everyone else waits on a
//! `Notify` and re-checks the cache.
//!
//! Eviction and free-notification internals are intentionally simple: this
//! crate treats "how the cache decides what to evict" as the caller-opaque
//! detail §1 scopes out, and only the pin contract (a block held by a
//! [`DataBlockHandle`] is never evicted) is load-bearing for correctness.
//! Recency order is tracked by hand rather than via the `lru` crate's own
//! cursor, since eviction here must skip pinned entries — something
//! `LruCache::pop_lru` cannot do.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};

use crate::error::{ObjectId, StreamError};
use crate::object::DataBlock;
use crate::record::CacheAccessType;

pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Identity of a cached block: the object it came from plus its start offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub object_id: ObjectId,
    pub start_offset: u64,
}

impl SlotKey {
    pub fn new(object_id: ObjectId, start_offset: u64) -> Self {
        Self {
            object_id,
            start_offset,
        }
    }
}

struct Slot {
    data: Arc<DataBlock>,
    refcount: Arc<AtomicUsize>,
    read: Arc<AtomicBool>,
}

struct State {
    slots: HashMap<SlotKey, Slot>,
    /// Recency order, oldest first. A key may appear here without being
    /// evictable yet (refcount > 0); eviction skips over those.
    order: VecDeque<SlotKey>,
    in_flight: HashMap<SlotKey, Arc<Notify>>,
}

impl State {
    fn touch(&mut self, key: SlotKey) {
        self.order.retain(|k| *k != key);
        self.order.push_back(key);
    }

    fn evict_to_capacity(&mut self, capacity: usize) {
        let mut i = 0;
        while self.slots.len() > capacity && i < self.order.len() {
            let key = self.order[i];
            let evictable = self
                .slots
                .get(&key)
                .map(|s| s.refcount.load(Ordering::Acquire) == 0)
                .unwrap_or(false);
            if evictable {
                self.slots.remove(&key);
                self.order.remove(i);
            } else {
                i += 1;
            }
        }
    }
}

/// A pinned handle to a cached [`DataBlock`].
///
/// Holding one guarantees the underlying block stays cached: eviction only
/// considers slots whose refcount is zero. Dropping the handle (or calling
/// [`Self::release`] explicitly, which is just a named `drop`) unpins it.
pub struct DataBlockHandle {
    data: Arc<DataBlock>,
    refcount: Arc<AtomicUsize>,
    read: Arc<AtomicBool>,
    access_type: CacheAccessType,
}

impl DataBlockHandle {
    pub fn data(&self) -> &DataBlock {
        &self.data
    }

    pub fn access_type(&self) -> CacheAccessType {
        self.access_type
    }

    /// Mark this block as having been consumed by a read. Informational only
    /// — it does not affect eviction eligibility, which is refcount-driven.
    pub fn mark_read(&self) {
        self.read.store(true, Ordering::Release);
    }

    pub fn mark_unread(&self) {
        self.read.store(false, Ordering::Release);
    }

    pub fn is_read(&self) -> bool {
        self.read.load(Ordering::Acquire)
    }

    /// Release this pin. Equivalent to dropping the handle; kept as an
    /// explicit method for parity with §6's external-interface contract.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for DataBlockHandle {
    fn drop(&mut self) {
        self.refcount.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Shared, reference-counted cache of materialized data blocks.
pub struct BlockCache {
    capacity: usize,
    state: Mutex<State>,
}

impl BlockCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(State {
                slots: HashMap::new(),
                order: VecDeque::new(),
                in_flight: HashMap::new(),
            }),
        }
    }

    /// Fetch a block from cache, or load it via `loader` if absent. Concurrent
    /// callers for the same key share one `loader` invocation.
    pub async fn get_block<F, Fut>(&self, key: SlotKey, loader: F) -> Result<DataBlockHandle, StreamError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<DataBlock, StreamError>>,
    {
        loop {
            {
                let mut state = self.state.lock().await;
                if let Some(slot) = state.slots.get(&key) {
                    slot.refcount.fetch_add(1, Ordering::AcqRel);
                    let handle = DataBlockHandle {
                        data: slot.data.clone(),
                        refcount: slot.refcount.clone(),
                        read: slot.read.clone(),
                        access_type: CacheAccessType::Hit,
                    };
                    state.touch(key);
                    return Ok(handle);
                }
            }

            let notify = {
                let mut state = self.state.lock().await;
                if let Some(notify) = state.in_flight.get(&key) {
                    let notify = notify.clone();
                    drop(state);
                    notify.notified().await;
                    continue;
                }
                let notify = Arc::new(Notify::new());
                state.in_flight.insert(key, notify.clone());
                notify
            };

            let result = loader().await;

            let mut state = self.state.lock().await;
            state.in_flight.remove(&key);

            let handle = match result {
                Ok(data) => {
                    let refcount = Arc::new(AtomicUsize::new(1));
                    let read = Arc::new(AtomicBool::new(false));
                    let data = Arc::new(data);
                    state.slots.insert(
                        key,
                        Slot {
                            data: data.clone(),
                            refcount: refcount.clone(),
                            read: read.clone(),
                        },
                    );
                    state.touch(key);
                    state.evict_to_capacity(self.capacity);
                    Ok(DataBlockHandle {
                        data,
                        refcount,
                        read,
                        access_type: CacheAccessType::Miss,
                    })
                }
                Err(err) => Err(err),
            };

            drop(state);
            notify.notify_waiters();
            return handle;
        }
    }

    pub async fn is_cached(&self, key: SlotKey) -> bool {
        self.state.lock().await.slots.contains_key(&key)
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.slots.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
