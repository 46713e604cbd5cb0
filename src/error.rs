use thiserror::Error;

/// Identity of a remote object, as handed back by the object manager.
pub type ObjectId = u64;

/// Errors surfaced by the stream-reader read path.
///
/// [`StreamError::retryable`] captures the classification from the retry policy:
/// a handful of kinds are expected under normal compaction churn and are retried
/// once by [`crate::stream::StreamReader::read`]; the rest propagate immediately.
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    /// `isObjectExist` returned false mid-acquisition: the object was deleted,
    /// almost always by a concurrent compaction.
    #[error("object {0} does not exist")]
    ObjectNotExist(ObjectId),

    /// The underlying store reported no such key while materializing a block.
    #[error("key not found in store: {0}")]
    KeyNotFoundInStore(String),

    /// Window extension discovered a block whose start offset does not abut
    /// the previous tail.
    #[error("block discontinuity: expected new block to start at {expected}, found {found}")]
    BlockNotContinuous { expected: u64, found: u64 },

    /// The read cursor fell outside an assembled block's range. Indicates a bug
    /// in block acquisition (`putBlock`/`getBlocks`), never a transient condition.
    #[error("internal consistency violation: {0}")]
    InternalConsistency(String),

    /// The cache's load future rejected. Recorded as a sticky failure on the
    /// `BlockEntry` that requested it; surfaces only when that entry is awaited.
    #[error("block load failed: {0}")]
    LoadFailure(String),
}

impl StreamError {
    /// Whether the top-level `read` retry policy (§7) should reset the window
    /// and retry once for this error kind.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            StreamError::ObjectNotExist(_)
                | StreamError::KeyNotFoundInStore(_)
                | StreamError::BlockNotContinuous { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_not_exist_is_retryable() {
        assert!(StreamError::ObjectNotExist(7).retryable());
    }

    #[test]
    fn key_not_found_is_retryable() {
        assert!(StreamError::KeyNotFoundInStore("k".into()).retryable());
    }

    #[test]
    fn block_not_continuous_is_retryable() {
        assert!(StreamError::BlockNotContinuous {
            expected: 100,
            found: 150
        }
        .retryable());
    }

    #[test]
    fn internal_consistency_is_not_retryable() {
        assert!(!StreamError::InternalConsistency("cursor out of range".into()).retryable());
    }

    #[test]
    fn load_failure_is_not_retryable() {
        assert!(!StreamError::LoadFailure("timeout".into()).retryable());
    }
}
