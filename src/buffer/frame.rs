use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use parking_lot::RwLock;

use crate::common::{FrameId, PageId, INVALID_PAGE_ID, PAGE_SIZE};

/// A single slot of the buffer pool: one page's bytes plus the metadata
/// the pool needs for replacement decisions. Frames never move; the same
/// frame hosts different page ids over its lifetime.
///
/// Metadata invariants (maintained by the buffer pool, which mutates
/// frames only while holding its latch):
/// - pin_count == 0 and a valid page_id: the frame sits in the replacer
/// - an invalid page_id: the frame sits on the free list
pub struct Frame {
    /// Index of this frame in the pool's frame array
    frame_id: FrameId,
    /// The page currently hosted (INVALID_PAGE_ID if free)
    page_id: RwLock<PageId>,
    /// Number of outstanding references preventing eviction
    pin_count: AtomicU32,
    /// Whether the in-memory bytes differ from the bytes on disk
    is_dirty: AtomicBool,
    /// The page bytes
    data: RwLock<Box<[u8; PAGE_SIZE]>>,
}

impl Frame {
    pub fn new(frame_id: FrameId) -> Self {
        Self {
            frame_id,
            page_id: RwLock::new(INVALID_PAGE_ID),
            pin_count: AtomicU32::new(0),
            is_dirty: AtomicBool::new(false),
            data: RwLock::new(Box::new([0u8; PAGE_SIZE])),
        }
    }

    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    pub fn page_id(&self) -> PageId {
        *self.page_id.read()
    }

    pub(crate) fn set_page_id(&self, page_id: PageId) {
        *self.page_id.write() = page_id;
    }

    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Acquire)
    }

    /// Increments the pin count, returning the new value.
    pub(crate) fn pin(&self) -> u32 {
        self.pin_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Decrements the pin count, returning the new value.
    /// Returns None when the count is already zero.
    pub(crate) fn unpin(&self) -> Option<u32> {
        let mut current = self.pin_count.load(Ordering::Acquire);
        loop {
            if current == 0 {
                return None;
            }
            match self.pin_count.compare_exchange(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(current - 1),
                Err(observed) => current = observed,
            }
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty.load(Ordering::Acquire)
    }

    pub(crate) fn set_dirty(&self, dirty: bool) {
        self.is_dirty.store(dirty, Ordering::Release);
    }

    /// Shared access to the page bytes.
    pub fn read_data(&self) -> parking_lot::RwLockReadGuard<'_, Box<[u8; PAGE_SIZE]>> {
        self.data.read()
    }

    /// Exclusive access to the page bytes. Callers that modify them must
    /// unpin the page with dirty = true.
    pub fn write_data(&self) -> parking_lot::RwLockWriteGuard<'_, Box<[u8; PAGE_SIZE]>> {
        self.data.write()
    }

    pub(crate) fn copy_from_slice(&self, src: &[u8]) {
        assert_eq!(src.len(), PAGE_SIZE);
        self.data.write().copy_from_slice(src);
    }

    pub(crate) fn copy_to_slice(&self, dst: &mut [u8]) {
        assert_eq!(dst.len(), PAGE_SIZE);
        dst.copy_from_slice(&self.data.read()[..]);
    }

    pub(crate) fn zero_data(&self) {
        self.data.write().fill(0);
    }

    /// Restores the free-frame state: invalid id, pin 0, clean, zeroed.
    pub(crate) fn reset(&self) {
        *self.page_id.write() = INVALID_PAGE_ID;
        self.pin_count.store(0, Ordering::Release);
        self.is_dirty.store(false, Ordering::Release);
        self.data.write().fill(0);
    }
}
