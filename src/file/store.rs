use std::collections::BTreeSet;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

use super::error::{FileError, FileResult};
use super::page::Page;
use super::{PAGE_SIZE, PageId};

/// Bytes of bookkeeping stored in front of every page on disk
pub const SLOT_HEADER_SIZE: usize = 8;

/// On-disk footprint of one page: header followed by the page bytes
pub const SLOT_SIZE: usize = SLOT_HEADER_SIZE + PAGE_SIZE;

const SLOT_LIVE: u32 = 1;

/// Raw page I/O for a single page file.
///
/// Pages are addressed by number. A page is *live* between `allocate_page`
/// and `delete_page`; reading or writing a page that is not live fails with
/// `FileError::PageNotFound`. Deleted page numbers are handed out again by
/// later allocations, lowest first.
pub trait PageStore {
    /// Read a live page.
    fn read_page(&mut self, page_no: PageId) -> FileResult<Page>;

    /// Persist a page at its embedded page number.
    fn write_page(&mut self, page: &Page) -> FileResult<()>;

    /// Create a zeroed page with a freshly assigned page number.
    fn allocate_page(&mut self) -> FileResult<Page>;

    /// Free a page. Deleting a page that is already free is a no-op.
    fn delete_page(&mut self, page_no: PageId) -> FileResult<()>;

    /// Number of live pages.
    fn page_count(&self) -> usize;

    /// Flush OS buffers to stable storage.
    fn sync(&mut self) -> FileResult<()>;
}

/// Page file backed by a file on disk
///
/// Slot `n` starts at byte `n * SLOT_SIZE`. Its header holds the page number
/// (`u32` LE) and a flags word (`u32` LE, bit 0 = live).
pub struct DiskStore {
    file: File,
    /// Number of slots in the file, live or free
    slots: usize,
    free: BTreeSet<PageId>,
}

impl DiskStore {
    /// Wrap an open read/write file, rebuilding the free list from slot headers
    pub fn open(mut file: File) -> FileResult<Self> {
        let len = file.metadata()?.len() as usize;
        if !len.is_multiple_of(SLOT_SIZE) {
            return Err(FileError::Corrupted(format!(
                "file length {} is not a multiple of the slot size {}",
                len, SLOT_SIZE
            )));
        }

        let slots = len / SLOT_SIZE;
        let mut free = BTreeSet::new();
        let mut header = [0u8; SLOT_HEADER_SIZE];

        for slot in 0..slots {
            file.seek(SeekFrom::Start((slot * SLOT_SIZE) as u64))?;
            file.read_exact(&mut header)?;

            let page_no = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
            let flags = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

            if flags & SLOT_LIVE == 0 {
                free.insert(slot);
            } else if page_no as usize != slot {
                return Err(FileError::Corrupted(format!(
                    "slot {} claims page number {}",
                    slot, page_no
                )));
            }
        }

        Ok(Self { file, slots, free })
    }

    fn is_live(&self, page_no: PageId) -> bool {
        page_no < self.slots && !self.free.contains(&page_no)
    }

    fn write_header(&mut self, page_no: PageId, flags: u32) -> FileResult<()> {
        let stored_no = u32::try_from(page_no).map_err(|_| {
            FileError::Corrupted(format!("page number {} does not fit a slot header", page_no))
        })?;

        let mut header = [0u8; SLOT_HEADER_SIZE];
        header[0..4].copy_from_slice(&stored_no.to_le_bytes());
        header[4..8].copy_from_slice(&flags.to_le_bytes());

        self.file
            .seek(SeekFrom::Start((page_no * SLOT_SIZE) as u64))?;
        self.file.write_all(&header)?;
        Ok(())
    }

    fn write_body(&mut self, page_no: PageId, data: &[u8]) -> FileResult<()> {
        let offset = page_no * SLOT_SIZE + SLOT_HEADER_SIZE;
        self.file.seek(SeekFrom::Start(offset as u64))?;
        self.file.write_all(data)?;
        Ok(())
    }
}

impl PageStore for DiskStore {
    fn read_page(&mut self, page_no: PageId) -> FileResult<Page> {
        if !self.is_live(page_no) {
            return Err(FileError::PageNotFound { page_id: page_no });
        }

        let offset = page_no * SLOT_SIZE + SLOT_HEADER_SIZE;
        self.file.seek(SeekFrom::Start(offset as u64))?;

        let mut data = vec![0u8; PAGE_SIZE];
        self.file.read_exact(&mut data)?;

        Page::from_bytes(page_no, data)
    }

    fn write_page(&mut self, page: &Page) -> FileResult<()> {
        let page_no = page.page_number();
        if !self.is_live(page_no) {
            return Err(FileError::PageNotFound { page_id: page_no });
        }

        self.write_body(page_no, page.data())
    }

    fn allocate_page(&mut self) -> FileResult<Page> {
        let page_no = match self.free.first() {
            Some(&page_no) => page_no,
            None => self.slots,
        };

        let page = Page::new(page_no);
        self.write_header(page_no, SLOT_LIVE)?;
        self.write_body(page_no, page.data())?;

        // Only commit the bookkeeping once the slot is on disk
        if page_no == self.slots {
            self.slots += 1;
        } else {
            self.free.remove(&page_no);
        }

        Ok(page)
    }

    fn delete_page(&mut self, page_no: PageId) -> FileResult<()> {
        if page_no >= self.slots {
            return Err(FileError::PageNotFound { page_id: page_no });
        }
        if self.free.contains(&page_no) {
            return Ok(());
        }

        self.write_header(page_no, 0)?;
        self.free.insert(page_no);
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.slots - self.free.len()
    }

    fn sync(&mut self) -> FileResult<()> {
        self.file.sync_data()?;
        Ok(())
    }
}

/// Page file held entirely in memory
#[derive(Default)]
pub struct MemoryStore {
    pages: Vec<Option<Box<[u8]>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PageStore for MemoryStore {
    fn read_page(&mut self, page_no: PageId) -> FileResult<Page> {
        let data = self
            .pages
            .get(page_no)
            .and_then(|slot| slot.as_ref())
            .ok_or(FileError::PageNotFound { page_id: page_no })?;

        Page::from_bytes(page_no, data.to_vec())
    }

    fn write_page(&mut self, page: &Page) -> FileResult<()> {
        let page_no = page.page_number();
        let data = self
            .pages
            .get_mut(page_no)
            .and_then(|slot| slot.as_mut())
            .ok_or(FileError::PageNotFound { page_id: page_no })?;

        data.copy_from_slice(page.data());
        Ok(())
    }

    fn allocate_page(&mut self) -> FileResult<Page> {
        let page_no = match self.pages.iter().position(Option::is_none) {
            Some(page_no) => page_no,
            None => {
                self.pages.push(None);
                self.pages.len() - 1
            }
        };

        let page = Page::new(page_no);
        self.pages[page_no] = Some(page.data().into());
        Ok(page)
    }

    fn delete_page(&mut self, page_no: PageId) -> FileResult<()> {
        let slot = self
            .pages
            .get_mut(page_no)
            .ok_or(FileError::PageNotFound { page_id: page_no })?;

        *slot = None;
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.pages.iter().filter(|slot| slot.is_some()).count()
    }

    fn sync(&mut self) -> FileResult<()> {
        Ok(())
    }
}
