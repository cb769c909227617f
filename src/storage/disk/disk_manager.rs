use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use crate::common::{PageId, Result, PAGE_SIZE};

/// DiskManager is responsible for reading and writing pages to/from a
/// single database file. Page ids map directly to file offsets:
/// page_id * PAGE_SIZE.
///
/// Page 0 is reserved for the header page (index directory) and is never
/// handed out by `allocate_page`; fresh ids start at 1. Deallocated ids
/// go onto a free list and are reused before the file grows.
pub struct DiskManager {
    /// The database file, cursor guarded by a mutex
    db_file: Mutex<File>,
    /// Path to the database file
    db_path: PathBuf,
    /// Next page id to hand out when the free list is empty
    next_page_id: AtomicU32,
    /// Deallocated page ids available for reuse
    free_pages: Mutex<Vec<PageId>>,
    /// Number of disk reads performed
    num_reads: AtomicU32,
    /// Number of disk writes performed
    num_writes: AtomicU32,
}

impl DiskManager {
    /// Opens (or creates) the database file at the given path.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&db_path)?;

        let file_size = file.metadata()?.len();
        let pages_on_disk = (file_size / PAGE_SIZE as u64) as u32;

        Ok(Self {
            db_file: Mutex::new(file),
            db_path,
            // Page 0 is the header page even in a brand-new file.
            next_page_id: AtomicU32::new(pages_on_disk.max(1)),
            free_pages: Mutex::new(Vec::new()),
            num_reads: AtomicU32::new(0),
            num_writes: AtomicU32::new(0),
        })
    }

    /// Reads a page from disk into the provided buffer.
    /// Reading past the end of the file yields zeroed bytes, so a freshly
    /// allocated page reads back as all zeros.
    pub fn read_page(&self, page_id: PageId, data: &mut [u8]) -> Result<()> {
        assert_eq!(data.len(), PAGE_SIZE, "Buffer must be PAGE_SIZE bytes");

        let byte_offset = page_id.as_u32() as u64 * PAGE_SIZE as u64;

        let mut file = self.db_file.lock();
        file.seek(SeekFrom::Start(byte_offset))?;

        let mut filled = 0;
        while filled < PAGE_SIZE {
            let n = file.read(&mut data[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        data[filled..].fill(0);

        self.num_reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Writes a page to disk from the provided buffer.
    pub fn write_page(&self, page_id: PageId, data: &[u8]) -> Result<()> {
        assert_eq!(data.len(), PAGE_SIZE, "Buffer must be PAGE_SIZE bytes");

        let byte_offset = page_id.as_u32() as u64 * PAGE_SIZE as u64;

        let mut file = self.db_file.lock();
        file.seek(SeekFrom::Start(byte_offset))?;
        file.write_all(data)?;
        file.flush()?;

        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Allocates a new page id. Reuses a deallocated id when one is
    /// available, otherwise grows the file.
    pub fn allocate_page(&self) -> Result<PageId> {
        if let Some(page_id) = self.free_pages.lock().pop() {
            return Ok(page_id);
        }
        let raw = self.next_page_id.fetch_add(1, Ordering::SeqCst);
        Ok(PageId::new(raw))
    }

    /// Returns a page id to the allocator for reuse.
    pub fn deallocate_page(&self, page_id: PageId) {
        let mut free_pages = self.free_pages.lock();
        if !free_pages.contains(&page_id) {
            free_pages.push(page_id);
        }
    }

    /// Total number of page ids handed out so far (including page 0).
    pub fn num_pages(&self) -> u32 {
        self.next_page_id.load(Ordering::Relaxed)
    }

    pub fn num_reads(&self) -> u32 {
        self.num_reads.load(Ordering::Relaxed)
    }

    pub fn num_writes(&self) -> u32 {
        self.num_writes.load(Ordering::Relaxed)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn sync(&self) -> Result<()> {
        self.db_file.lock().sync_all()?;
        Ok(())
    }
}

impl Drop for DiskManager {
    fn drop(&mut self) {
        let _ = self.db_file.get_mut().sync_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_disk_manager_new() {
        let temp_file = NamedTempFile::new().unwrap();
        let dm = DiskManager::new(temp_file.path()).unwrap();

        // Page 0 is always reserved for the header page
        assert_eq!(dm.num_pages(), 1);
        assert_eq!(dm.allocate_page().unwrap(), PageId::new(1));
    }

    #[test]
    fn test_disk_manager_read_write() {
        let temp_file = NamedTempFile::new().unwrap();
        let dm = DiskManager::new(temp_file.path()).unwrap();

        let page_id = dm.allocate_page().unwrap();

        let mut write_data = [0u8; PAGE_SIZE];
        write_data[0] = 42;
        write_data[100] = 255;
        write_data[PAGE_SIZE - 1] = 128;
        dm.write_page(page_id, &write_data).unwrap();

        let mut read_data = [0u8; PAGE_SIZE];
        dm.read_page(page_id, &mut read_data).unwrap();

        assert_eq!(read_data[0], 42);
        assert_eq!(read_data[100], 255);
        assert_eq!(read_data[PAGE_SIZE - 1], 128);
    }

    #[test]
    fn test_disk_manager_read_past_eof() {
        let temp_file = NamedTempFile::new().unwrap();
        let dm = DiskManager::new(temp_file.path()).unwrap();

        // Never written; must come back zeroed
        let mut data = [7u8; PAGE_SIZE];
        dm.read_page(PageId::new(12), &mut data).unwrap();
        assert!(data.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_disk_manager_allocate_reuses_deallocated() {
        let temp_file = NamedTempFile::new().unwrap();
        let dm = DiskManager::new(temp_file.path()).unwrap();

        let a = dm.allocate_page().unwrap();
        let b = dm.allocate_page().unwrap();
        assert_ne!(a, b);

        dm.deallocate_page(a);
        assert_eq!(dm.allocate_page().unwrap(), a);
    }

    #[test]
    fn test_disk_manager_counters() {
        let temp_file = NamedTempFile::new().unwrap();
        let dm = DiskManager::new(temp_file.path()).unwrap();

        let page_id = dm.allocate_page().unwrap();
        let data = [1u8; PAGE_SIZE];
        dm.write_page(page_id, &data).unwrap();

        let mut buf = [0u8; PAGE_SIZE];
        dm.read_page(page_id, &mut buf).unwrap();
        dm.read_page(page_id, &mut buf).unwrap();

        assert_eq!(dm.num_writes(), 1);
        assert_eq!(dm.num_reads(), 2);
    }

    #[test]
    fn test_disk_manager_persistence() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();
        let page_id;

        {
            let dm = DiskManager::new(&path).unwrap();
            page_id = dm.allocate_page().unwrap();
            let mut data = [0u8; PAGE_SIZE];
            data[0] = 123;
            dm.write_page(page_id, &data).unwrap();
        }

        {
            let dm = DiskManager::new(&path).unwrap();
            // Header page + 1 data page already on disk
            assert_eq!(dm.num_pages(), 2);

            let mut data = [0u8; PAGE_SIZE];
            dm.read_page(page_id, &mut data).unwrap();
            assert_eq!(data[0], 123);
        }
    }
}
