mod error;
mod file_manager;
mod page;
mod store;

pub use error::{FileError, FileResult};
pub use file_manager::{FileHandle, IoStats, PagedFileManager};
pub use page::Page;
pub use store::{DiskStore, MemoryStore, PageStore, SLOT_HEADER_SIZE, SLOT_SIZE};

/// Page size in bytes (8KB)
pub const PAGE_SIZE: usize = 8192;

/// Page ID type
pub type PageId = usize;
