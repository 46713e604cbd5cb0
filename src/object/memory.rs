//! An in-memory [`ObjectManager`]/[`ObjectReader`] pair.
//!
//! Real backends (an S3-like remote store, a local file tree) are explicitly
//! out of scope (§1) — this is the stand-in used by this crate's own tests and
//! demo binary, the same role the teacher's `MockReader`/`SlowMockReader` types
//! play in `io::block_cache`'s test module, just promoted to a reusable module
//! since this crate has no production backend of its own.
//!
//! It also doubles as a compaction simulator: [`InMemoryObjectStore::delete_object`]
//! marks an object gone (as `isObjectExist` would report after a real compactor
//! rewrote it), without touching the data a reader opened before the delete
//! already captured — objects are immutable once read, only their *existence*
//! changes.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{ObjectId, StreamError};
use crate::record::RecordBatch;

use super::{BlockIndex, DataBlock, ObjectManager, ObjectMetadata, ObjectReader};

struct BlockRecord {
    index: BlockIndex,
    payload: Bytes,
}

struct StoredObject {
    object_id: ObjectId,
    blocks: Arc<Vec<BlockRecord>>,
}

struct State {
    stream_id: u64,
    objects: Vec<StoredObject>,
    deleted: std::collections::HashSet<ObjectId>,
    next_id: ObjectId,
}

/// A single-stream, in-memory object store.
///
/// `is_object_exist` is genuinely synchronous (backed by `std::sync::RwLock`,
/// not `tokio::sync::RwLock`) to match §6's contract, since a real
/// implementation would typically be a local existence cache rather than a
/// network round-trip.
pub struct InMemoryObjectStore {
    state: RwLock<State>,
}

impl InMemoryObjectStore {
    pub fn new(stream_id: u64) -> Self {
        Self {
            state: RwLock::new(State {
                stream_id,
                objects: Vec::new(),
                deleted: std::collections::HashSet::new(),
                next_id: 1,
            }),
        }
    }

    /// Append a new live object made of the given `(start, end, approximate_size)`
    /// blocks, in order. Blocks within one object need not abut blocks of the
    /// next object passed separately — that's how S6-style discontinuities are
    /// constructed in tests.
    pub fn push_object(&self, block_specs: &[(u64, u64, u64)]) -> ObjectId {
        let mut state = self.state.write().unwrap();
        let object_id = state.next_id;
        state.next_id += 1;

        let blocks = block_specs
            .iter()
            .map(|&(start, end, approx)| {
                let mut payload = vec![0u8; (end - start) as usize];
                for (i, b) in payload.iter_mut().enumerate() {
                    *b = ((start as usize + i) % 251) as u8;
                }
                BlockRecord {
                    index: BlockIndex::new(start, end, approx),
                    payload: Bytes::from(payload),
                }
            })
            .collect();

        state.objects.push(StoredObject {
            object_id,
            blocks: Arc::new(blocks),
        });
        object_id
    }

    /// Simulate a compaction deleting `object_id`. Future `get_objects` calls
    /// omit it and `is_object_exist` reports `false`; readers already opened
    /// against it keep working (the snapshot they hold is immutable).
    pub fn delete_object(&self, object_id: ObjectId) {
        self.state.write().unwrap().deleted.insert(object_id);
    }
}

#[async_trait]
impl ObjectManager for InMemoryObjectStore {
    type Reader = InMemoryObjectReader;

    async fn get_objects(
        &self,
        stream_id: u64,
        start_offset: u64,
        end_offset: Option<u64>,
        limit: usize,
    ) -> Result<Vec<ObjectMetadata>, StreamError> {
        let state = self.state.read().unwrap();
        if stream_id != state.stream_id {
            return Ok(Vec::new());
        }

        let mut matches: Vec<(u64, ObjectMetadata)> = Vec::new();
        for obj in &state.objects {
            if state.deleted.contains(&obj.object_id) {
                continue;
            }
            let obj_start = obj.blocks.first().map(|b| b.index.start_offset);
            let obj_end = obj.blocks.last().map(|b| b.index.end_offset);
            let (Some(obj_start), Some(obj_end)) = (obj_start, obj_end) else {
                continue;
            };
            if obj_end <= start_offset {
                continue;
            }
            if let Some(end) = end_offset {
                if obj_start >= end {
                    continue;
                }
            }
            matches.push((
                obj_start,
                ObjectMetadata {
                    object_id: obj.object_id,
                    stream_id,
                },
            ));
        }
        // §6/§4.3 require objects back in offset order. Insertion order is
        // not offset order once a compactor appends a replacement object at
        // the tail of `objects` for a range earlier in the stream.
        matches.sort_by_key(|(start, _)| *start);
        matches.truncate(limit);
        Ok(matches.into_iter().map(|(_, meta)| meta).collect())
    }

    fn is_object_exist(&self, object_id: ObjectId) -> bool {
        let state = self.state.read().unwrap();
        !state.deleted.contains(&object_id) && state.objects.iter().any(|o| o.object_id == object_id)
    }

    async fn open_reader(&self, object_id: ObjectId) -> Result<Self::Reader, StreamError> {
        let state = self.state.read().unwrap();
        let obj = state
            .objects
            .iter()
            .find(|o| o.object_id == object_id)
            .ok_or(StreamError::ObjectNotExist(object_id))?;
        Ok(InMemoryObjectReader {
            object_id,
            stream_id: state.stream_id,
            blocks: obj.blocks.clone(),
        })
    }
}

/// Reader handle for one object held by [`InMemoryObjectStore`].
pub struct InMemoryObjectReader {
    object_id: ObjectId,
    stream_id: u64,
    blocks: Arc<Vec<BlockRecord>>,
}

#[async_trait]
impl ObjectReader for InMemoryObjectReader {
    async fn find(
        &self,
        stream_id: u64,
        start_offset: u64,
        end_offset: Option<u64>,
        max_bytes: i64,
    ) -> Result<Vec<BlockIndex>, StreamError> {
        if stream_id != self.stream_id {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        let mut total: i64 = 0;
        for b in self.blocks.iter() {
            if b.index.end_offset <= start_offset {
                continue;
            }
            if let Some(end) = end_offset {
                if b.index.start_offset >= end {
                    break;
                }
            }
            out.push(b.index);
            total += b.index.approximate_size as i64;
            if max_bytes >= 0 && total >= max_bytes {
                break;
            }
        }
        Ok(out)
    }

    async fn read_block(&self, index: BlockIndex) -> Result<DataBlock, StreamError> {
        let rec = self
            .blocks
            .iter()
            .find(|b| b.index == index)
            .ok_or_else(|| {
                StreamError::KeyNotFoundInStore(format!(
                    "block [{}, {}) not found in object {}",
                    index.start_offset, index.end_offset, self.object_id
                ))
            })?;
        let batch = RecordBatch::new(index.start_offset, index.end_offset - 1, rec.payload.clone());
        Ok(DataBlock::new(index, vec![batch]))
    }

    fn object_id(&self) -> ObjectId {
        self.object_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_objects_skips_deleted() {
        let store = InMemoryObjectStore::new(1);
        let o1 = store.push_object(&[(0, 100, 100)]);
        let _o2 = store.push_object(&[(100, 250, 150)]);

        store.delete_object(o1);

        let objects = store.get_objects(1, 0, None, 10).await.unwrap();
        assert_eq!(objects.len(), 1);
        assert!(!store.is_object_exist(o1));
    }

    #[tokio::test]
    async fn open_reader_still_works_after_delete() {
        let store = InMemoryObjectStore::new(1);
        let o1 = store.push_object(&[(0, 50, 50)]);
        let reader = store.open_reader(o1).await.unwrap();

        store.delete_object(o1);

        // The reader was opened before the delete; it still serves content —
        // objects are immutable, only existence changes.
        let found = reader.find(1, 0, None, -1).await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn read_block_returns_block_sized_payload() {
        let store = InMemoryObjectStore::new(1);
        let o1 = store.push_object(&[(0, 50, 50)]);
        let reader = store.open_reader(o1).await.unwrap();
        let index = BlockIndex::new(0, 50, 50);
        let block = reader.read_block(index).await.unwrap();
        let records = block.get_records(0, 50, i64::MAX);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].size(), 50);
    }
}
