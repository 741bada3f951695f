use super::error::{FileError, FileResult};
use super::{PAGE_SIZE, PageId};

/// Contents of one page together with the page number it belongs to
///
/// The page number travels with the bytes so a page can be written back
/// without the caller restating where it lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    page_no: PageId,
    data: Box<[u8]>,
}

impl Page {
    /// Create a zero-filled page
    pub fn new(page_no: PageId) -> Self {
        Self {
            page_no,
            data: vec![0u8; PAGE_SIZE].into_boxed_slice(),
        }
    }

    /// Wrap an existing buffer, which must be exactly `PAGE_SIZE` bytes
    pub fn from_bytes(page_no: PageId, data: Vec<u8>) -> FileResult<Self> {
        if data.len() != PAGE_SIZE {
            return Err(FileError::InvalidPageSize {
                expected: PAGE_SIZE,
                actual: data.len(),
            });
        }

        Ok(Self {
            page_no,
            data: data.into_boxed_slice(),
        })
    }

    pub fn page_number(&self) -> PageId {
        self.page_no
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Reset to an empty page, keeping the allocation
    pub(crate) fn reset(&mut self) {
        self.page_no = 0;
        self.data.fill(0);
    }
}
