use super::page_table::PageKey;
use crate::file::{FileHandle, PageId};

/// Bookkeeping for one frame of the buffer pool
///
/// An unoccupied frame always has `pin_count == 0`, `modified == false` and
/// `referenced == false`; `clear` is the only way back to that state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameDescriptor {
    /// Frame currently holds a cached page
    pub occupied: bool,
    /// Second-chance bit, consumed by one pass of the clock
    pub referenced: bool,
    /// Content differs from the on-disk copy
    pub modified: bool,
    /// Number of outstanding holders
    pub pin_count: u32,
    /// Cached page, meaningful only while `occupied`
    pub owner: Option<PageKey>,
}

impl FrameDescriptor {
    /// Take ownership of a freshly loaded page, pinned once by the caller
    pub fn mark_occupied(&mut self, file: FileHandle, page_id: PageId) {
        *self = Self {
            occupied: true,
            referenced: true,
            modified: false,
            pin_count: 1,
            owner: Some(PageKey { file, page_id }),
        };
    }

    /// Return the frame to the invalid state
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_pinned(&self) -> bool {
        self.pin_count > 0
    }

    /// True when the descriptor respects the invalid-frame invariant, or is occupied
    pub(crate) fn is_consistent(&self) -> bool {
        self.occupied
            || (!self.referenced && !self.modified && self.pin_count == 0 && self.owner.is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_invalid() {
        let desc = FrameDescriptor::default();
        assert!(!desc.occupied);
        assert!(!desc.is_pinned());
        assert!(desc.is_consistent());
    }

    #[test]
    fn test_mark_occupied() {
        let mut manager = crate::file::PagedFileManager::new();
        let file = manager.open_memory().unwrap();

        let mut desc = FrameDescriptor {
            modified: true,
            pin_count: 4,
            ..Default::default()
        };
        desc.mark_occupied(file, 12);

        assert!(desc.occupied);
        assert!(desc.referenced);
        assert!(!desc.modified);
        assert_eq!(desc.pin_count, 1);
        assert_eq!(desc.owner, Some(PageKey { file, page_id: 12 }));
    }

    #[test]
    fn test_clear() {
        let mut manager = crate::file::PagedFileManager::new();
        let file = manager.open_memory().unwrap();

        let mut desc = FrameDescriptor::default();
        desc.mark_occupied(file, 3);
        desc.modified = true;
        desc.clear();

        assert_eq!(desc, FrameDescriptor::default());
    }

    #[test]
    fn test_inconsistent_invalid_frame() {
        let desc = FrameDescriptor {
            pin_count: 1,
            ..Default::default()
        };
        assert!(!desc.is_consistent());
    }
}
