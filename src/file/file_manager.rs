use std::collections::HashMap;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::error::{FileError, FileResult};
use super::page::Page;
use super::store::{DiskStore, MemoryStore, PageStore};
use super::PageId;

/// Handle to an open file
///
/// Handles are never reused within one manager, so a handle is a stable
/// identity for the file it was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FileHandle(usize);

impl FileHandle {
    pub fn as_usize(&self) -> usize {
        self.0
    }
}

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Counters for page I/O that went through the manager
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IoStats {
    pub reads: u64,
    pub writes: u64,
    pub allocations: u64,
    pub deletions: u64,
}

/// Manages paged file operations
pub struct PagedFileManager {
    /// Map from file handles to open files
    open_files: HashMap<FileHandle, FileEntry>,
    /// Map from file paths to handles (for checking if already open)
    path_to_handle: HashMap<PathBuf, FileHandle>,
    /// Next available file handle
    next_handle: usize,
    /// Maximum number of open files
    max_open_files: usize,
    stats: IoStats,
}

struct FileEntry {
    store: Box<dyn PageStore>,
    /// `None` for in-memory files
    path: Option<PathBuf>,
}

impl PagedFileManager {
    /// Create a new paged file manager
    pub fn new() -> Self {
        Self::with_max_files(128)
    }

    /// Create a new paged file manager with specified max open files
    pub fn with_max_files(max_open_files: usize) -> Self {
        Self {
            open_files: HashMap::new(),
            path_to_handle: HashMap::new(),
            next_handle: 0,
            max_open_files,
            stats: IoStats::default(),
        }
    }

    /// Create a new, empty page file
    pub fn create_file<P: AsRef<Path>>(&mut self, path: P) -> FileResult<()> {
        let path = path.as_ref();

        if path.exists() {
            return Err(FileError::FileAlreadyExists(path.display().to_string()));
        }

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        File::create(path)?;
        Ok(())
    }

    /// Open an existing page file
    pub fn open_file<P: AsRef<Path>>(&mut self, path: P) -> FileResult<FileHandle> {
        let path_ref = path.as_ref();
        let path = path_ref
            .canonicalize()
            .map_err(|_| FileError::FileNotFound(path_ref.display().to_string()))?;

        // Check if file is already open
        if let Some(&handle) = self.path_to_handle.get(&path) {
            return Ok(handle);
        }

        self.check_capacity()?;

        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let store = DiskStore::open(file)?;

        let handle = self.register(Box::new(store), Some(path.clone()));
        self.path_to_handle.insert(path, handle);

        Ok(handle)
    }

    /// Open a fresh page file that lives only in memory
    pub fn open_memory(&mut self) -> FileResult<FileHandle> {
        self.check_capacity()?;
        Ok(self.register(Box::new(MemoryStore::new()), None))
    }

    /// Close a file
    pub fn close_file(&mut self, handle: FileHandle) -> FileResult<()> {
        let entry = self
            .open_files
            .remove(&handle)
            .ok_or(FileError::InvalidHandle(handle.0))?;

        if let Some(path) = entry.path {
            self.path_to_handle.remove(&path);
        }
        Ok(())
    }

    /// Remove (delete) a file
    pub fn remove_file<P: AsRef<Path>>(&mut self, path: P) -> FileResult<()> {
        let path = path.as_ref();

        // If file is open, close it first
        if let Ok(canonical_path) = path.canonicalize()
            && let Some(&handle) = self.path_to_handle.get(&canonical_path)
        {
            self.close_file(handle)?;
        }

        std::fs::remove_file(path)?;
        Ok(())
    }

    /// Read a page from a file
    pub fn read_page(&mut self, handle: FileHandle, page_id: PageId) -> FileResult<Page> {
        let page = self.store_mut(handle)?.read_page(page_id)?;
        self.stats.reads += 1;
        Ok(page)
    }

    /// Write a page back to its file
    pub fn write_page(&mut self, handle: FileHandle, page: &Page) -> FileResult<()> {
        self.store_mut(handle)?.write_page(page)?;
        self.stats.writes += 1;
        Ok(())
    }

    /// Allocate a new page in a file
    pub fn allocate_page(&mut self, handle: FileHandle) -> FileResult<Page> {
        let page = self.store_mut(handle)?.allocate_page()?;
        self.stats.allocations += 1;
        Ok(page)
    }

    /// Delete a page from a file
    pub fn delete_page(&mut self, handle: FileHandle, page_id: PageId) -> FileResult<()> {
        self.store_mut(handle)?.delete_page(page_id)?;
        self.stats.deletions += 1;
        Ok(())
    }

    /// Get the number of live pages in a file
    pub fn page_count(&self, handle: FileHandle) -> FileResult<usize> {
        let entry = self
            .open_files
            .get(&handle)
            .ok_or(FileError::InvalidHandle(handle.0))?;

        Ok(entry.store.page_count())
    }

    /// Sync a file to disk (flush all OS buffers)
    pub fn sync_file(&mut self, handle: FileHandle) -> FileResult<()> {
        self.store_mut(handle)?.sync()
    }

    /// Sync all open files to disk
    pub fn sync_all(&mut self) -> FileResult<()> {
        for entry in self.open_files.values_mut() {
            entry.store.sync()?;
        }
        Ok(())
    }

    /// Check if a file is open
    pub fn is_file_open(&self, handle: FileHandle) -> bool {
        self.open_files.contains_key(&handle)
    }

    /// Get the number of currently open files
    pub fn open_file_count(&self) -> usize {
        self.open_files.len()
    }

    /// Page I/O performed so far
    pub fn stats(&self) -> IoStats {
        self.stats
    }

    fn check_capacity(&self) -> FileResult<()> {
        if self.open_files.len() >= self.max_open_files {
            return Err(FileError::TooManyOpenFiles);
        }
        Ok(())
    }

    fn register(&mut self, store: Box<dyn PageStore>, path: Option<PathBuf>) -> FileHandle {
        let handle = FileHandle(self.next_handle);
        self.next_handle += 1;

        self.open_files.insert(handle, FileEntry { store, path });
        handle
    }

    fn store_mut(&mut self, handle: FileHandle) -> FileResult<&mut dyn PageStore> {
        let entry = self
            .open_files
            .get_mut(&handle)
            .ok_or(FileError::InvalidHandle(handle.0))?;

        Ok(entry.store.as_mut())
    }
}

impl Default for PagedFileManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::PAGE_SIZE;
    use tempfile::TempDir;

    fn setup_test_dir() -> TempDir {
        tempfile::tempdir().unwrap()
    }

    #[test]
    fn test_create_file() {
        let temp_dir = setup_test_dir();
        let test_file = temp_dir.path().join("test.db");
        let mut manager = PagedFileManager::new();

        assert!(manager.create_file(&test_file).is_ok());
        assert!(test_file.exists());
    }

    #[test]
    fn test_create_file_already_exists() {
        let temp_dir = setup_test_dir();
        let test_file = temp_dir.path().join("test.db");
        let mut manager = PagedFileManager::new();

        manager.create_file(&test_file).unwrap();
        let result = manager.create_file(&test_file);
        assert!(matches!(result, Err(FileError::FileAlreadyExists(_))));
    }

    #[test]
    fn test_open_close_file() {
        let temp_dir = setup_test_dir();
        let test_file = temp_dir.path().join("test.db");
        let mut manager = PagedFileManager::new();

        manager.create_file(&test_file).unwrap();
        let handle = manager.open_file(&test_file).unwrap();
        assert!(manager.is_file_open(handle));

        manager.close_file(handle).unwrap();
        assert!(!manager.is_file_open(handle));
        assert!(matches!(
            manager.read_page(handle, 0),
            Err(FileError::InvalidHandle(_))
        ));
    }

    #[test]
    fn test_open_nonexistent_file() {
        let temp_dir = setup_test_dir();
        let test_file = temp_dir.path().join("nonexistent.db");
        let mut manager = PagedFileManager::new();

        let result = manager.open_file(&test_file);
        assert!(matches!(result, Err(FileError::FileNotFound(_))));
    }

    #[test]
    fn test_open_same_file_twice() {
        let temp_dir = setup_test_dir();
        let test_file = temp_dir.path().join("test.db");
        let mut manager = PagedFileManager::new();

        manager.create_file(&test_file).unwrap();
        let handle1 = manager.open_file(&test_file).unwrap();
        let handle2 = manager.open_file(&test_file).unwrap();

        assert_eq!(handle1, handle2);
        assert_eq!(manager.open_file_count(), 1);
    }

    #[test]
    fn test_handles_are_not_reused() {
        let mut manager = PagedFileManager::new();

        let first = manager.open_memory().unwrap();
        manager.close_file(first).unwrap();
        let second = manager.open_memory().unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_allocate_read_write_page() {
        let temp_dir = setup_test_dir();
        let test_file = temp_dir.path().join("test.db");
        let mut manager = PagedFileManager::new();

        manager.create_file(&test_file).unwrap();
        let handle = manager.open_file(&test_file).unwrap();

        let mut page = manager.allocate_page(handle).unwrap();
        page.data_mut()[0] = 42;
        page.data_mut()[100] = 99;
        page.data_mut()[PAGE_SIZE - 1] = 255;
        manager.write_page(handle, &page).unwrap();

        let read = manager.read_page(handle, page.page_number()).unwrap();
        assert_eq!(read, page);
    }

    #[test]
    fn test_pages_survive_reopen() {
        let temp_dir = setup_test_dir();
        let test_file = temp_dir.path().join("test.db");

        {
            let mut manager = PagedFileManager::new();
            manager.create_file(&test_file).unwrap();
            let handle = manager.open_file(&test_file).unwrap();

            for i in 0..10 {
                let mut page = manager.allocate_page(handle).unwrap();
                page.data_mut()[0] = i as u8;
                manager.write_page(handle, &page).unwrap();
            }
            manager.sync_all().unwrap();
        }

        let mut manager = PagedFileManager::new();
        let handle = manager.open_file(&test_file).unwrap();
        assert_eq!(manager.page_count(handle).unwrap(), 10);
        for page_id in 0..10 {
            let page = manager.read_page(handle, page_id).unwrap();
            assert_eq!(page.data()[0], page_id as u8);
        }
    }

    #[test]
    fn test_read_nonexistent_page() {
        let mut manager = PagedFileManager::new();
        let handle = manager.open_memory().unwrap();

        let result = manager.read_page(handle, 100);
        assert!(matches!(
            result,
            Err(FileError::PageNotFound { page_id: 100 })
        ));
    }

    #[test]
    fn test_delete_page() {
        let mut manager = PagedFileManager::new();
        let handle = manager.open_memory().unwrap();

        manager.allocate_page(handle).unwrap();
        manager.allocate_page(handle).unwrap();
        assert_eq!(manager.page_count(handle).unwrap(), 2);

        manager.delete_page(handle, 0).unwrap();
        assert_eq!(manager.page_count(handle).unwrap(), 1);
        assert!(manager.read_page(handle, 0).is_err());
    }

    #[test]
    fn test_stats_count_successful_io() {
        let mut manager = PagedFileManager::new();
        let handle = manager.open_memory().unwrap();

        let page = manager.allocate_page(handle).unwrap();
        manager.write_page(handle, &page).unwrap();
        manager.read_page(handle, 0).unwrap();
        assert!(manager.read_page(handle, 1).is_err());
        manager.delete_page(handle, 0).unwrap();

        assert_eq!(
            manager.stats(),
            IoStats {
                reads: 1,
                writes: 1,
                allocations: 1,
                deletions: 1,
            }
        );
    }

    #[test]
    fn test_remove_open_file() {
        let temp_dir = setup_test_dir();
        let test_file = temp_dir.path().join("test.db");
        let mut manager = PagedFileManager::new();

        manager.create_file(&test_file).unwrap();
        let handle = manager.open_file(&test_file).unwrap();
        assert!(manager.is_file_open(handle));

        manager.remove_file(&test_file).unwrap();
        assert!(!test_file.exists());
        assert!(!manager.is_file_open(handle));
    }

    #[test]
    fn test_max_open_files() {
        let temp_dir = setup_test_dir();
        let mut manager = PagedFileManager::with_max_files(2);

        let file1 = temp_dir.path().join("test1.db");
        let file2 = temp_dir.path().join("test2.db");

        manager.create_file(&file1).unwrap();
        manager.create_file(&file2).unwrap();

        manager.open_file(&file1).unwrap();
        manager.open_memory().unwrap();

        let result = manager.open_file(&file2);
        assert!(matches!(result, Err(FileError::TooManyOpenFiles)));
    }
}
