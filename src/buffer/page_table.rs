use ahash::AHashMap;
use serde::Serialize;

use super::FrameId;
use crate::file::{FileHandle, PageId};

/// A key identifying a page in the buffer pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PageKey {
    pub file: FileHandle,
    pub page_id: PageId,
}

/// Maps cached pages to the frame holding them
///
/// Each key appears at most once, so a page can never be cached in two frames.
pub struct PageTable {
    entries: AHashMap<PageKey, FrameId>,
}

impl PageTable {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: AHashMap::with_capacity(capacity),
        }
    }

    /// Frame caching the page, or `None` on a miss
    pub fn lookup(&self, file: FileHandle, page_id: PageId) -> Option<FrameId> {
        self.entries.get(&PageKey { file, page_id }).copied()
    }

    /// Register a page. Returns `false` and leaves the table untouched if the
    /// page is already mapped.
    pub fn insert(&mut self, file: FileHandle, page_id: PageId, frame: FrameId) -> bool {
        let key = PageKey { file, page_id };
        if self.entries.contains_key(&key) {
            return false;
        }

        self.entries.insert(key, frame);
        true
    }

    /// Drop a mapping, returning the frame it pointed to
    pub fn remove(&mut self, file: FileHandle, page_id: PageId) -> Option<FrameId> {
        self.entries.remove(&PageKey { file, page_id })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::PagedFileManager;

    fn two_files() -> (FileHandle, FileHandle) {
        let mut manager = PagedFileManager::new();
        (manager.open_memory().unwrap(), manager.open_memory().unwrap())
    }

    #[test]
    fn test_lookup_miss() {
        let (file, _) = two_files();
        let table = PageTable::with_capacity(4);
        assert_eq!(table.lookup(file, 0), None);
        assert!(table.is_empty());
    }

    #[test]
    fn test_insert_lookup_remove() {
        let (file, _) = two_files();
        let mut table = PageTable::with_capacity(4);

        assert!(table.insert(file, 5, 2));
        assert_eq!(table.lookup(file, 5), Some(2));
        assert_eq!(table.len(), 1);

        assert_eq!(table.remove(file, 5), Some(2));
        assert_eq!(table.lookup(file, 5), None);
        assert_eq!(table.remove(file, 5), None);
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let (file, _) = two_files();
        let mut table = PageTable::with_capacity(4);

        assert!(table.insert(file, 1, 0));
        assert!(!table.insert(file, 1, 3));
        assert_eq!(table.lookup(file, 1), Some(0));
    }

    #[test]
    fn test_same_page_number_in_different_files() {
        let (file1, file2) = two_files();
        let mut table = PageTable::with_capacity(4);

        assert!(table.insert(file1, 0, 0));
        assert!(table.insert(file2, 0, 1));
        assert_eq!(table.lookup(file1, 0), Some(0));
        assert_eq!(table.lookup(file2, 0), Some(1));
    }
}
