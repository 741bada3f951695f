pub mod buffer;
pub mod file;

pub use buffer::{
    BUFFER_POOL_SIZE, BufferError, BufferManager, BufferResult, ClockReplacer, FrameDescriptor,
    FrameId, FrameInfo, PageKey, PageTable, PoolDump,
};
pub use file::{
    DiskStore, FileError, FileHandle, FileResult, IoStats, MemoryStore, PAGE_SIZE, Page, PageId,
    PageStore, PagedFileManager,
};
