use tracing::{debug, trace, warn};

use super::dump::PoolDump;
use super::error::{BufferError, BufferResult};
use super::frame::FrameDescriptor;
use super::page_table::PageTable;
use super::replacer::ClockReplacer;
use super::{BUFFER_POOL_SIZE, FrameId};
use crate::file::{FileHandle, Page, PageId, PagedFileManager};

/// Manages a fixed pool of page frames with clock (second-chance) eviction
///
/// Every page handed out by `fetch_page` or `alloc_page` is pinned and stays
/// in its frame until the matching `unpin_page`. Modified pages are written
/// back before their frame is reused.
pub struct BufferManager {
    /// Underlying file manager
    file_manager: PagedFileManager,
    /// Page contents, one slot per frame
    pool: Vec<Page>,
    /// Per-frame metadata, parallel to `pool`
    descriptors: Vec<FrameDescriptor>,
    page_table: PageTable,
    replacer: ClockReplacer,
}

impl BufferManager {
    /// Create a new buffer manager
    pub fn new(file_manager: PagedFileManager) -> Self {
        Self::with_capacity(file_manager, BUFFER_POOL_SIZE)
    }

    /// Create a new buffer manager with `num_frames` frames
    pub fn with_capacity(file_manager: PagedFileManager, num_frames: usize) -> Self {
        Self {
            file_manager,
            pool: (0..num_frames).map(|_| Page::new(0)).collect(),
            descriptors: vec![FrameDescriptor::default(); num_frames],
            page_table: PageTable::with_capacity(num_frames),
            replacer: ClockReplacer::new(num_frames),
        }
    }

    /// Get a reference to the file manager
    pub fn file_manager(&self) -> &PagedFileManager {
        &self.file_manager
    }

    /// Get a mutable reference to the file manager
    ///
    /// Closing or removing a file through this reference bypasses the cache:
    /// its cached pages are neither written back nor dropped. Use
    /// [`BufferManager::close_file`] instead.
    pub fn file_manager_mut(&mut self) -> &mut PagedFileManager {
        &mut self.file_manager
    }

    /// Pin a page, reading it from its file on a miss
    pub fn fetch_page(&mut self, file: FileHandle, page_id: PageId) -> BufferResult<&mut Page> {
        if let Some(frame) = self.page_table.lookup(file, page_id) {
            trace!(%file, page_id, frame, "buffer hit");
            let desc = &mut self.descriptors[frame];
            desc.referenced = true;
            desc.pin_count += 1;
            return Ok(&mut self.pool[frame]);
        }

        debug!(%file, page_id, "buffer miss, reading page");
        let frame = self.alloc_frame()?;
        let page = self.file_manager.read_page(file, page_id)?;
        self.install(frame, file, page)
    }

    /// Drop one pin on a cached page, marking it modified if asked
    ///
    /// The modified flag is sticky: passing `dirty = false` never clears it.
    pub fn unpin_page(
        &mut self,
        file: FileHandle,
        page_id: PageId,
        dirty: bool,
    ) -> BufferResult<()> {
        let frame = self.page_table.lookup(file, page_id);
        let desc = match frame {
            Some(frame) if self.descriptors[frame].is_pinned() => &mut self.descriptors[frame],
            _ => {
                return Err(BufferError::PageNotPinned {
                    file,
                    page_id,
                    frame,
                });
            }
        };

        if dirty {
            desc.modified = true;
        }
        desc.pin_count -= 1;
        Ok(())
    }

    /// Create a new page in `file` and pin it
    pub fn alloc_page(&mut self, file: FileHandle) -> BufferResult<(PageId, &mut Page)> {
        let page = self.file_manager.allocate_page(file)?;
        let page_id = page.page_number();
        debug!(%file, page_id, "allocated page");

        let frame = self.alloc_frame()?;
        let page = self.install(frame, file, page)?;
        Ok((page_id, page))
    }

    /// Write back and drop every cached page of `file`
    ///
    /// Stops at the first pinned page of the file with `PagePinned`. Pages
    /// handled before that point stay written back and evicted.
    /// Frames of other files and clean empty frames are skipped, so pins held
    /// on other files never fail the flush.
    pub fn flush_file(&mut self, file: FileHandle) -> BufferResult<()> {
        for frame in 0..self.descriptors.len() {
            let desc = self.descriptors[frame];

            if !desc.occupied {
                if !desc.is_consistent() {
                    return Err(Self::bad_buffer(frame, &desc));
                }
                continue;
            }

            let Some(owner) = desc.owner else {
                return Err(Self::bad_buffer(frame, &desc));
            };
            if owner.file != file {
                continue;
            }

            if desc.is_pinned() {
                warn!(%file, page_id = owner.page_id, frame, "flush aborted on pinned page");
                return Err(BufferError::PagePinned {
                    file,
                    page_id: owner.page_id,
                    frame,
                });
            }

            if desc.modified {
                debug!(%file, page_id = owner.page_id, frame, "writing back page");
                self.file_manager.write_page(file, &self.pool[frame])?;
            }

            // Already gone from the table is fine, the frame is what matters
            self.page_table.remove(file, owner.page_id);
            self.evict_slot(frame);
        }

        debug!(%file, "flushed file");
        Ok(())
    }

    /// Drop a page from the cache, if present, and delete it from its file
    ///
    /// Outstanding pins on the page are not checked.
    pub fn dispose_page(&mut self, file: FileHandle, page_id: PageId) -> BufferResult<()> {
        if let Some(frame) = self.page_table.remove(file, page_id) {
            debug!(%file, page_id, frame, "dropping cached page");
            self.evict_slot(frame);
        }

        self.file_manager.delete_page(file, page_id)?;
        Ok(())
    }

    /// Write back every modified page without evicting anything
    ///
    /// A failed write does not stop the others; the first error is returned
    /// once every frame has been tried and the files synced. Frames that
    /// could not be written stay modified.
    pub fn flush_all(&mut self) -> BufferResult<()> {
        let mut first_error = None;

        for frame in 0..self.descriptors.len() {
            let desc = &mut self.descriptors[frame];
            if !desc.occupied || !desc.modified {
                continue;
            }
            let Some(owner) = desc.owner else {
                continue;
            };

            match self.file_manager.write_page(owner.file, &self.pool[frame]) {
                Ok(()) => desc.modified = false,
                Err(e) => {
                    warn!(
                        file = %owner.file,
                        page_id = owner.page_id,
                        frame,
                        error = %e,
                        "write-back failed"
                    );
                    first_error.get_or_insert(e);
                }
            }
        }

        // Sync all files to ensure data is persisted to disk
        let synced = self.file_manager.sync_all();

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(synced?),
        }
    }

    /// Flush a file's cached pages out of the pool, then close it
    ///
    /// Fails with `PagePinned` and leaves the file open if any of its pages
    /// is still pinned.
    pub fn close_file(&mut self, file: FileHandle) -> BufferResult<()> {
        self.flush_file(file)?;
        self.file_manager.close_file(file)?;
        debug!(%file, "closed file");
        Ok(())
    }

    /// Snapshot of every frame for inspection
    pub fn dump(&self) -> PoolDump {
        PoolDump::capture(&self.descriptors)
    }

    /// Number of frames in the pool
    pub fn num_frames(&self) -> usize {
        self.descriptors.len()
    }

    /// Check if a page is in the buffer pool
    pub fn is_page_cached(&self, file: FileHandle, page_id: PageId) -> bool {
        self.page_table.lookup(file, page_id).is_some()
    }

    /// Pin count of a cached page
    pub fn pin_count(&self, file: FileHandle, page_id: PageId) -> Option<u32> {
        self.page_table
            .lookup(file, page_id)
            .map(|frame| self.descriptors[frame].pin_count)
    }

    /// Number of frames holding a page
    pub fn valid_frame_count(&self) -> usize {
        self.descriptors.iter().filter(|d| d.occupied).count()
    }

    /// Get the number of dirty pages in the buffer pool
    pub fn dirty_page_count(&self) -> usize {
        self.descriptors.iter().filter(|d| d.modified).count()
    }

    #[cfg(test)]
    pub(crate) fn descriptor(&self, frame: FrameId) -> &FrameDescriptor {
        &self.descriptors[frame]
    }

    #[cfg(test)]
    pub(crate) fn descriptor_mut(&mut self, frame: FrameId) -> &mut FrameDescriptor {
        &mut self.descriptors[frame]
    }

    #[cfg(test)]
    pub(crate) fn frame_of(&self, file: FileHandle, page_id: PageId) -> Option<FrameId> {
        self.page_table.lookup(file, page_id)
    }

    /// Get a free frame, evicting the clock's victim if it holds a page
    fn alloc_frame(&mut self) -> BufferResult<FrameId> {
        let frame = self.replacer.pick_victim(&mut self.descriptors)?;
        let desc = self.descriptors[frame];

        if let Some(owner) = desc.owner.filter(|_| desc.occupied) {
            if desc.modified {
                debug!(file = %owner.file, page_id = owner.page_id, frame, "writing back victim");
                self.file_manager.write_page(owner.file, &self.pool[frame])?;
            }

            debug!(file = %owner.file, page_id = owner.page_id, frame, "evicted page");
            self.page_table.remove(owner.file, owner.page_id);
            self.evict_slot(frame);
        }

        Ok(frame)
    }

    /// Place a page in an empty frame and pin it for the caller
    fn install(
        &mut self,
        frame: FrameId,
        file: FileHandle,
        page: Page,
    ) -> BufferResult<&mut Page> {
        let page_id = page.page_number();
        if !self.page_table.insert(file, page_id, frame) {
            return Err(Self::bad_buffer(frame, &self.descriptors[frame]));
        }

        self.descriptors[frame].mark_occupied(file, page_id);
        self.pool[frame] = page;
        Ok(&mut self.pool[frame])
    }

    fn evict_slot(&mut self, frame: FrameId) {
        self.descriptors[frame].clear();
        self.pool[frame].reset();
    }

    fn bad_buffer(frame: FrameId, desc: &FrameDescriptor) -> BufferError {
        BufferError::BadBuffer {
            frame,
            occupied: desc.occupied,
            modified: desc.modified,
            referenced: desc.referenced,
            pin_count: desc.pin_count,
        }
    }
}

impl Drop for BufferManager {
    fn drop(&mut self) {
        // Flush all dirty pages when the buffer manager is dropped
        let _ = self.flush_all();
    }
}
