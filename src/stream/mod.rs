//! §3/§4 "StreamReader": the per-stream read path built on top of
//! [`crate::cache::BlockCache`] and [`crate::object`].

mod entry;
mod readahead;
mod reader;
mod window;

pub use entry::BlockEntry;
pub use readahead::ReadaheadController;
pub use reader::{ReadResult, StreamReader, StreamReaderStats};
pub use window::BlockWindow;
