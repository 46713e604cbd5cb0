use async_trait::async_trait;

use crate::error::{ObjectId, StreamError};
use crate::record::RecordBatch;

/// Metadata describing one data block within an object: `[start_offset,
/// end_offset)`, plus an approximate byte size that may over- or under-count
/// the true footprint (headers, framing).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockIndex {
    pub start_offset: u64,
    pub end_offset: u64,
    pub approximate_size: u64,
}

impl BlockIndex {
    pub fn new(start_offset: u64, end_offset: u64, approximate_size: u64) -> Self {
        debug_assert!(end_offset > start_offset);
        Self {
            start_offset,
            end_offset,
            approximate_size,
        }
    }
}

/// A materialized data block: the ordered records covering `[start, end)` of
/// one [`BlockIndex`]. Owned by a cache slot (see [`crate::cache`]); a
/// `DataBlock` itself never leaves the cache, only clones of the
/// [`RecordBatch`]es it hands out via [`Self::get_records`].
#[derive(Debug, Clone)]
pub struct DataBlock {
    index: BlockIndex,
    records: Vec<RecordBatch>,
}

impl DataBlock {
    pub fn new(index: BlockIndex, records: Vec<RecordBatch>) -> Self {
        Self { index, records }
    }

    pub fn index(&self) -> BlockIndex {
        self.index
    }

    /// Return, in order, the records overlapping `[start, end)` whose
    /// cumulative size stays within `max_bytes` — except the first record
    /// returned, which is always included even if it alone exceeds the
    /// budget (the one-batch slack permitted by §4.1/§9).
    pub fn get_records(&self, start: u64, end: u64, max_bytes: i64) -> Vec<RecordBatch> {
        let mut out = Vec::new();
        let mut consumed: i64 = 0;
        for batch in &self.records {
            if batch.last_offset() < start {
                continue;
            }
            if batch.first_offset() >= end {
                break;
            }
            if !out.is_empty() && consumed >= max_bytes {
                break;
            }
            consumed += batch.size() as i64;
            out.push(batch.clone());
        }
        out
    }
}

/// §6 "ObjectReader (consumed, per object)".
///
/// A reader is scoped to one object; `find` discovers block indexes covering
/// an offset range, `read_block` materializes one of them. Rust's ownership
/// model replaces the original's explicit `release()`: dropping the reader
/// (or the `Arc` wrapping it) releases the underlying reference.
#[async_trait]
pub trait ObjectReader: Send + Sync {
    /// Discover block indexes covering `[start_offset, end_offset)` for
    /// `stream_id`. `end_offset = None` means no upper bound; `max_bytes < 0`
    /// means no byte cap on how much of the object to scan.
    async fn find(
        &self,
        stream_id: u64,
        start_offset: u64,
        end_offset: Option<u64>,
        max_bytes: i64,
    ) -> Result<Vec<BlockIndex>, StreamError>;

    /// Materialize the given block's data.
    async fn read_block(&self, index: BlockIndex) -> Result<DataBlock, StreamError>;

    /// Identity of the object this reader is bound to, used as half of the
    /// block cache's slot key.
    fn object_id(&self) -> ObjectId;
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn batch(first: u64, last: u64) -> RecordBatch {
        RecordBatch::new(first, last, Bytes::from(vec![0u8; (last - first + 1) as usize]))
    }

    #[test]
    fn get_records_respects_range() {
        let index = BlockIndex::new(0, 30, 30);
        let block = DataBlock::new(
            index,
            vec![batch(0, 9), batch(10, 19), batch(20, 29)],
        );
        let out = block.get_records(10, 30, i64::MAX);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].first_offset(), 10);
        assert_eq!(out[1].first_offset(), 20);
    }

    #[test]
    fn get_records_allows_one_batch_over_budget() {
        let index = BlockIndex::new(0, 30, 30);
        let block = DataBlock::new(index, vec![batch(0, 9), batch(10, 19), batch(20, 29)]);
        let out = block.get_records(0, 30, 1);
        // First batch (size 10) exceeds budget of 1 but is still returned;
        // the second batch is not, since budget was already exhausted.
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].first_offset(), 0);
    }

    #[test]
    fn get_records_stops_at_end_offset() {
        let index = BlockIndex::new(0, 30, 30);
        let block = DataBlock::new(index, vec![batch(0, 9), batch(10, 19), batch(20, 29)]);
        let out = block.get_records(0, 15, i64::MAX);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].first_offset(), 0);
    }
}
