//! Record batches: the payload unit returned by [`crate::stream::StreamReader::read`].
//!
//! A batch is a contiguous, indivisible run of records with known first/last
//! offsets. Batches are cheaply cloneable (`Bytes`-backed) — `release()` is kept
//! as an explicit method mirroring §6's external-interface contract, even though
//! the `Bytes` refcount means ordinary `Drop` already reclaims the memory.

use bytes::Bytes;

/// An opaque, reference-counted record payload covering `[first_offset, last_offset]`.
#[derive(Debug, Clone)]
pub struct RecordBatch {
    first_offset: u64,
    last_offset: u64,
    payload: Bytes,
}

impl RecordBatch {
    /// Construct a batch covering `[first_offset, last_offset]` with the given
    /// encoded payload. `last_offset` is inclusive, matching the rest of the
    /// offset arithmetic in this crate (block index ranges are exclusive on the
    /// end; record batches are not).
    pub fn new(first_offset: u64, last_offset: u64, payload: Bytes) -> Self {
        debug_assert!(last_offset >= first_offset);
        Self {
            first_offset,
            last_offset,
            payload,
        }
    }

    pub fn first_offset(&self) -> u64 {
        self.first_offset
    }

    pub fn last_offset(&self) -> u64 {
        self.last_offset
    }

    /// Byte footprint of this batch, as counted against read/readahead budgets.
    pub fn size(&self) -> usize {
        self.payload.len()
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Release this batch's hold on its backing memory. A no-op beyond `Drop`
    /// given `Bytes`'s own refcounting, kept for parity with §6's consumed
    /// interface and so call sites read the same as the original design.
    pub fn release(self) {
        drop(self);
    }
}

/// Cache-access-type tag attached to a [`crate::stream::ReadResult`].
///
/// §9 notes the original always reports `Hit`; this crate threads the real
/// value through `BlockCache::get_block` (see [`crate::cache`]) but keeps the
/// historical default wherever a caller doesn't care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAccessType {
    Hit,
    Miss,
}

impl Default for CacheAccessType {
    fn default() -> Self {
        CacheAccessType::Hit
    }
}
