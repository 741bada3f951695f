//! Page cache over the paged file layer
//!
//! A fixed pool of frames, each able to hold one page. Pages are looked up
//! through the [`PageTable`], pinned while callers hold them, and evicted by
//! the [`ClockReplacer`] once unpinned and not recently referenced.

mod dump;
mod error;
mod frame;
mod manager;
mod page_table;
mod replacer;

pub use dump::{FrameInfo, PoolDump};
pub use error::{BufferError, BufferResult};
pub use frame::FrameDescriptor;
pub use manager::BufferManager;
pub use page_table::{PageKey, PageTable};
pub use replacer::ClockReplacer;

/// Default number of frames in the buffer pool
/// 1024 frames × 8KB = 8MB
pub const BUFFER_POOL_SIZE: usize = 1024;

/// Index of a frame in the buffer pool
pub type FrameId = usize;
