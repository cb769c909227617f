use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::common::{FrameId, PageId, Result, SiltError, PAGE_SIZE};
use crate::storage::disk::{DiskManager, DiskScheduler};

use super::{Frame, LruReplacer};

/// Bookkeeping guarded by the pool latch.
struct PoolState {
    /// Maps resident page ids to the frames hosting them
    page_table: HashMap<PageId, FrameId>,
    /// Frames not currently hosting any page, FIFO
    free_list: VecDeque<FrameId>,
    /// Evictable frames in unpin order
    replacer: LruReplacer,
}

/// BufferPoolManager mediates every disk access: it caches pages in a
/// fixed array of frames, pins them while callers hold references, and
/// writes dirty pages back on eviction or explicit flush.
///
/// One process-wide latch serializes all operations, including the
/// blocking disk I/O they perform. Callers must balance every fetch with
/// an unpin carrying the correct dirty flag; a page is never evicted
/// between the two.
pub struct BufferPoolManager {
    /// Number of frames in the pool
    pool_size: usize,
    /// The frame array; never reallocated, frames never move
    frames: Vec<Arc<Frame>>,
    /// All mutable bookkeeping, behind the single latch
    state: Mutex<PoolState>,
    /// Disk I/O front-end
    disk_scheduler: DiskScheduler,
}

impl BufferPoolManager {
    pub fn new(pool_size: usize, disk_manager: Arc<DiskManager>) -> Self {
        assert!(pool_size > 0, "buffer pool needs at least one frame");

        let mut frames = Vec::with_capacity(pool_size);
        let mut free_list = VecDeque::with_capacity(pool_size);
        for i in 0..pool_size {
            let frame_id = FrameId::new(i as u32);
            frames.push(Arc::new(Frame::new(frame_id)));
            free_list.push_back(frame_id);
        }

        Self {
            pool_size,
            frames,
            state: Mutex::new(PoolState {
                page_table: HashMap::new(),
                free_list,
                replacer: LruReplacer::new(pool_size),
            }),
            disk_scheduler: DiskScheduler::new(disk_manager),
        }
    }

    /// Fetches a page, pinning it. On a hit the dirty flag is left alone;
    /// on a miss the page is read from disk into a frame taken from the
    /// free list or, failing that, evicted from the replacer (writing the
    /// victim back first if it is dirty).
    pub fn fetch_page(&self, page_id: PageId) -> Result<Arc<Frame>> {
        if !page_id.is_valid() {
            return Err(SiltError::InvalidPageId(page_id));
        }

        let mut state = self.state.lock();

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            let frame = &self.frames[frame_id.as_usize()];
            frame.pin();
            state.replacer.pin(frame_id);
            return Ok(Arc::clone(frame));
        }

        let frame_id = self.take_frame(&mut state)?;
        let frame = &self.frames[frame_id.as_usize()];

        frame.set_page_id(page_id);
        frame.pin();
        frame.set_dirty(false);
        state.page_table.insert(page_id, frame_id);
        state.replacer.pin(frame_id);

        let mut buf = [0u8; PAGE_SIZE];
        self.disk_scheduler.schedule_read_sync(page_id, &mut buf)?;
        frame.copy_from_slice(&buf);

        Ok(Arc::clone(frame))
    }

    /// Drops one pin on a page, ORing the caller's dirty flag into the
    /// frame (the flag is sticky until write-back). Returns false when
    /// the page is not resident or its pin count is already zero. Never
    /// touches the disk.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let mut state = self.state.lock();

        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return false;
        };
        let frame = &self.frames[frame_id.as_usize()];

        let Some(remaining) = frame.unpin() else {
            return false;
        };
        if is_dirty {
            frame.set_dirty(true);
        }
        if remaining == 0 {
            state.replacer.unpin(frame_id);
        }
        true
    }

    /// Writes a page back to disk if it is dirty and clears the flag.
    /// Returns Ok(true) iff the page is resident; pin state is untouched.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool> {
        let state = self.state.lock();
        self.flush_locked(&state, page_id)
    }

    /// Allocates a brand-new page, pinned and zero-filled.
    /// Fails with PoolExhausted before allocating a disk page when every
    /// frame is pinned.
    pub fn new_page(&self) -> Result<(PageId, Arc<Frame>)> {
        let mut state = self.state.lock();

        if state.free_list.is_empty() && state.replacer.is_empty() {
            return Err(SiltError::PoolExhausted);
        }

        let page_id = self.disk_scheduler.disk_manager().allocate_page()?;
        let frame_id = self.take_frame(&mut state)?;
        let frame = &self.frames[frame_id.as_usize()];

        frame.set_page_id(page_id);
        frame.pin();
        frame.set_dirty(false);
        frame.zero_data();
        state.page_table.insert(page_id, frame_id);
        state.replacer.pin(frame_id);

        Ok((page_id, Arc::clone(frame)))
    }

    /// Removes a page from the pool and hands its id back to the disk
    /// manager. Returns Ok(false) while the page is pinned. A page that
    /// is not resident is deallocated directly.
    pub fn delete_page(&self, page_id: PageId) -> Result<bool> {
        let mut state = self.state.lock();

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            let frame = &self.frames[frame_id.as_usize()];
            if frame.pin_count() > 0 {
                return Ok(false);
            }

            state.page_table.remove(&page_id);
            state.replacer.pin(frame_id);
            frame.reset();
            state.free_list.push_back(frame_id);
        }

        self.disk_scheduler.disk_manager().deallocate_page(page_id);
        Ok(true)
    }

    /// Flushes every resident page.
    pub fn flush_all_pages(&self) -> Result<()> {
        let state = self.state.lock();
        let page_ids: Vec<PageId> = state.page_table.keys().copied().collect();
        for page_id in page_ids {
            self.flush_locked(&state, page_id)?;
        }
        Ok(())
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn free_frame_count(&self) -> usize {
        self.state.lock().free_list.len()
    }

    /// Number of frames currently evictable.
    pub fn evictable_count(&self) -> usize {
        self.state.lock().replacer.len()
    }

    pub fn pin_count_of(&self, page_id: PageId) -> Option<u32> {
        let state = self.state.lock();
        state
            .page_table
            .get(&page_id)
            .map(|frame_id| self.frames[frame_id.as_usize()].pin_count())
    }

    pub fn is_dirty(&self, page_id: PageId) -> Option<bool> {
        let state = self.state.lock();
        state
            .page_table
            .get(&page_id)
            .map(|frame_id| self.frames[frame_id.as_usize()].is_dirty())
    }

    pub fn contains_page(&self, page_id: PageId) -> bool {
        self.state.lock().page_table.contains_key(&page_id)
    }

    pub fn disk_manager(&self) -> &Arc<DiskManager> {
        self.disk_scheduler.disk_manager()
    }

    /// Takes a frame for a new resident, free list first, then the
    /// replacer. An evicted page is written back if dirty and unmapped.
    /// Must be called with the latch held.
    fn take_frame(&self, state: &mut PoolState) -> Result<FrameId> {
        if let Some(frame_id) = state.free_list.pop_front() {
            return Ok(frame_id);
        }

        let Some(frame_id) = state.replacer.victim() else {
            return Err(SiltError::PoolExhausted);
        };
        let frame = &self.frames[frame_id.as_usize()];
        let old_page_id = frame.page_id();

        if frame.is_dirty() {
            let mut buf = [0u8; PAGE_SIZE];
            frame.copy_to_slice(&mut buf);
            self.disk_scheduler.schedule_write_sync(old_page_id, &buf)?;
        }

        state.page_table.remove(&old_page_id);
        frame.reset();
        Ok(frame_id)
    }

    fn flush_locked(&self, state: &PoolState, page_id: PageId) -> Result<bool> {
        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return Ok(false);
        };
        let frame = &self.frames[frame_id.as_usize()];

        if frame.is_dirty() {
            let mut buf = [0u8; PAGE_SIZE];
            frame.copy_to_slice(&mut buf);
            self.disk_scheduler.schedule_write_sync(page_id, &buf)?;
            frame.set_dirty(false);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn create_bpm(pool_size: usize) -> (BufferPoolManager, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let dm = Arc::new(DiskManager::new(temp_file.path()).unwrap());
        (BufferPoolManager::new(pool_size, dm), temp_file)
    }

    #[test]
    fn test_new_pool_is_all_free() {
        let (bpm, _temp) = create_bpm(10);
        assert_eq!(bpm.pool_size(), 10);
        assert_eq!(bpm.free_frame_count(), 10);
        assert_eq!(bpm.evictable_count(), 0);
    }

    #[test]
    fn test_new_page_is_pinned_and_zeroed() {
        let (bpm, _temp) = create_bpm(10);

        let (page_id, frame) = bpm.new_page().unwrap();
        assert_eq!(page_id, PageId::new(1));
        assert_eq!(frame.pin_count(), 1);
        assert!(!frame.is_dirty());
        assert!(frame.read_data().iter().all(|&b| b == 0));
        assert_eq!(bpm.free_frame_count(), 9);
    }

    #[test]
    fn test_unpin_moves_frame_into_replacer() {
        let (bpm, _temp) = create_bpm(4);

        let (page_id, _frame) = bpm.new_page().unwrap();
        assert_eq!(bpm.evictable_count(), 0);

        assert!(bpm.unpin_page(page_id, false));
        assert_eq!(bpm.evictable_count(), 1);

        // Second unpin must fail: the pin count is already zero
        assert!(!bpm.unpin_page(page_id, false));
        assert_eq!(bpm.evictable_count(), 1);
    }

    #[test]
    fn test_unpin_unknown_page() {
        let (bpm, _temp) = create_bpm(4);
        assert!(!bpm.unpin_page(PageId::new(99), true));
    }

    #[test]
    fn test_dirty_flag_is_sticky() {
        let (bpm, _temp) = create_bpm(4);

        let (page_id, frame) = bpm.new_page().unwrap();
        frame.write_data()[0] = 1;
        assert!(bpm.unpin_page(page_id, true));

        // Fetch after a dirty unpin: still dirty, and a clean unpin must
        // not clear the flag either.
        let frame = bpm.fetch_page(page_id).unwrap();
        assert!(frame.is_dirty());
        assert!(bpm.unpin_page(page_id, false));
        assert_eq!(bpm.is_dirty(page_id), Some(true));
    }

    #[test]
    fn test_fetch_miss_reads_from_disk() {
        let (bpm, _temp) = create_bpm(2);

        let (page_id, frame) = bpm.new_page().unwrap();
        frame.write_data()[0] = 0xCD;
        bpm.unpin_page(page_id, true);
        bpm.flush_page(page_id).unwrap();

        // Evict it by filling the pool with other pages
        let (other, _f) = bpm.new_page().unwrap();
        bpm.unpin_page(other, false);
        let (other2, _f2) = bpm.new_page().unwrap();
        bpm.unpin_page(other2, false);
        assert!(!bpm.contains_page(page_id));

        let reads_before = bpm.disk_manager().num_reads();
        let frame = bpm.fetch_page(page_id).unwrap();
        assert_eq!(bpm.disk_manager().num_reads(), reads_before + 1);
        assert_eq!(frame.read_data()[0], 0xCD);
        assert_eq!(frame.pin_count(), 1);
        bpm.unpin_page(page_id, false);
    }

    #[test]
    fn test_eviction_writes_back_dirty_victim() {
        let (bpm, _temp) = create_bpm(1);

        let (first, frame) = bpm.new_page().unwrap();
        frame.write_data()[42] = 9;
        bpm.unpin_page(first, true);

        let writes_before = bpm.disk_manager().num_writes();
        let (second, _frame2) = bpm.new_page().unwrap();
        assert_eq!(bpm.disk_manager().num_writes(), writes_before + 1);
        assert!(!bpm.contains_page(first));
        bpm.unpin_page(second, false);

        // The evicted bytes must be readable again
        let frame = bpm.fetch_page(first).unwrap();
        assert_eq!(frame.read_data()[42], 9);
        assert!(!frame.is_dirty());
    }

    #[test]
    fn test_pool_exhausted() {
        let (bpm, _temp) = create_bpm(2);

        let (_p1, _f1) = bpm.new_page().unwrap();
        let (_p2, _f2) = bpm.new_page().unwrap();

        assert!(matches!(bpm.new_page(), Err(SiltError::PoolExhausted)));
        assert!(matches!(
            bpm.fetch_page(PageId::new(50)),
            Err(SiltError::PoolExhausted)
        ));
    }

    #[test]
    fn test_delete_page() {
        let (bpm, _temp) = create_bpm(4);

        let (page_id, _frame) = bpm.new_page().unwrap();

        // Pinned: refuse
        assert!(!bpm.delete_page(page_id).unwrap());

        bpm.unpin_page(page_id, false);
        assert!(bpm.delete_page(page_id).unwrap());
        assert!(!bpm.contains_page(page_id));
        assert_eq!(bpm.free_frame_count(), 4);
        assert_eq!(bpm.evictable_count(), 0);

        // Deleting a non-resident page succeeds
        assert!(bpm.delete_page(PageId::new(77)).unwrap());
    }

    #[test]
    fn test_deleted_page_id_is_reused() {
        let (bpm, _temp) = create_bpm(4);

        let (page_id, _frame) = bpm.new_page().unwrap();
        bpm.unpin_page(page_id, false);
        bpm.delete_page(page_id).unwrap();

        let (reused, _frame) = bpm.new_page().unwrap();
        assert_eq!(reused, page_id);
    }

    #[test]
    fn test_flush_all_pages_clears_dirty() {
        let (bpm, _temp) = create_bpm(4);

        let mut ids = Vec::new();
        for _ in 0..3 {
            let (page_id, frame) = bpm.new_page().unwrap();
            frame.write_data()[0] = 1;
            bpm.unpin_page(page_id, true);
            ids.push(page_id);
        }

        bpm.flush_all_pages().unwrap();
        for page_id in ids {
            assert_eq!(bpm.is_dirty(page_id), Some(false));
        }
    }

    #[test]
    fn test_flush_page_returns_residency() {
        let (bpm, _temp) = create_bpm(4);

        let (page_id, _frame) = bpm.new_page().unwrap();
        assert!(bpm.flush_page(page_id).unwrap());
        assert!(!bpm.flush_page(PageId::new(123)).unwrap());
    }

    #[test]
    fn test_lru_eviction_order() {
        let (bpm, _temp) = create_bpm(3);

        let mut ids = Vec::new();
        for _ in 0..3 {
            let (page_id, _frame) = bpm.new_page().unwrap();
            ids.push(page_id);
        }
        // Unpin in a scrambled order; the first unpinned is the victim
        bpm.unpin_page(ids[1], false);
        bpm.unpin_page(ids[0], false);
        bpm.unpin_page(ids[2], false);

        let (_new_id, _frame) = bpm.new_page().unwrap();
        assert!(!bpm.contains_page(ids[1]));
        assert!(bpm.contains_page(ids[0]));
        assert!(bpm.contains_page(ids[2]));
    }
}
