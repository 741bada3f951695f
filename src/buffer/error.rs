use thiserror::Error;

use super::FrameId;
use crate::file::{FileError, FileHandle, PageId};

#[derive(Debug, Error)]
pub enum BufferError {
    #[error("File error: {0}")]
    File(#[from] FileError),

    #[error("Buffer pool exceeded: all {num_frames} frames are pinned")]
    BufferExceeded { num_frames: usize },

    #[error("Page not pinned: file={file}, page_id={page_id}")]
    PageNotPinned {
        file: FileHandle,
        page_id: PageId,
        frame: Option<FrameId>,
    },

    #[error("Page pinned: file={file}, page_id={page_id}, frame={frame}")]
    PagePinned {
        file: FileHandle,
        page_id: PageId,
        frame: FrameId,
    },

    #[error(
        "Bad buffer: frame={frame}, occupied={occupied}, modified={modified}, referenced={referenced}, pin_count={pin_count}"
    )]
    BadBuffer {
        frame: FrameId,
        occupied: bool,
        modified: bool,
        referenced: bool,
        pin_count: u32,
    },
}

pub type BufferResult<T> = Result<T, BufferError>;
