use async_trait::async_trait;

use crate::error::{ObjectId, StreamError};

use super::ObjectReader;

/// Identity of a remote object containing one or more data blocks for a stream.
///
/// Immutable once handed out by [`ObjectManager::get_objects`]; a compaction
/// that rewrites the underlying bytes produces a *new* `ObjectMetadata` with a
/// new `object_id` rather than mutating this one in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectMetadata {
    pub object_id: ObjectId,
    pub stream_id: u64,
}

/// §6 "ObjectManager (consumed)".
///
/// `get_objects` resolves `streamId → list of ObjectMetadata` forward from an
/// offset; `is_object_exist` answers a synchronous existence check used to
/// detect compaction mid-acquisition (§4.2 step 3, §7 `ObjectNotExist`).
#[async_trait]
pub trait ObjectManager: Send + Sync {
    /// Concrete reader type this manager hands out via [`Self::open_reader`].
    type Reader: ObjectReader + 'static;

    /// Return up to `limit` objects for `stream_id` covering forward from
    /// `start_offset`. `end_offset = None` means no upper bound. May return
    /// fewer than `limit`; an empty result means end of stream (so far).
    async fn get_objects(
        &self,
        stream_id: u64,
        start_offset: u64,
        end_offset: Option<u64>,
        limit: usize,
    ) -> Result<Vec<ObjectMetadata>, StreamError>;

    /// Synchronous existence check. `false` means the object was deleted,
    /// typically by a background compactor.
    fn is_object_exist(&self, object_id: ObjectId) -> bool;

    /// Open a reader bound to the given object.
    async fn open_reader(&self, object_id: ObjectId) -> Result<Self::Reader, StreamError>;
}
