use std::sync::Arc;

use crate::buffer::{BufferPoolManager, Frame};
use crate::common::{IndexKey, PageId, Result, Rid, INVALID_PAGE_ID};

use super::btree_page::LeafPageRef;

/// Forward iterator over the leaf chain. Holds a pin on the current leaf
/// and walks `next_page_id` links left to right, unpinning each leaf
/// (clean) as it steps off its last slot. The end sentinel holds no pin.
pub struct BPlusTreeIterator {
    bpm: Arc<BufferPoolManager>,
    /// Current leaf, INVALID_PAGE_ID at the end
    page_id: PageId,
    /// The pinned frame backing the current leaf
    frame: Option<Arc<Frame>>,
    /// Position within the current leaf
    index: usize,
}

impl BPlusTreeIterator {
    pub(crate) fn new(
        bpm: Arc<BufferPoolManager>,
        page_id: PageId,
        frame: Arc<Frame>,
        index: usize,
    ) -> Self {
        Self {
            bpm,
            page_id,
            frame: Some(frame),
            index,
        }
    }

    pub(crate) fn end(bpm: Arc<BufferPoolManager>) -> Self {
        Self {
            bpm,
            page_id: INVALID_PAGE_ID,
            frame: None,
            index: 0,
        }
    }

    pub fn is_end(&self) -> bool {
        self.frame.is_none()
    }

    /// Returns the pair under the cursor and advances, or None at the
    /// end of the leaf chain.
    pub fn next_item(&mut self) -> Result<Option<(IndexKey, Rid)>> {
        loop {
            let Some(frame) = &self.frame else {
                return Ok(None);
            };

            let (item, next_id) = {
                let data = frame.read_data();
                let leaf = LeafPageRef::new(&data[..]);
                if self.index < leaf.size() {
                    (Some(leaf.item_at(self.index)), INVALID_PAGE_ID)
                } else {
                    (None, leaf.next_page_id())
                }
            };

            if let Some(item) = item {
                self.index += 1;
                return Ok(Some(item));
            }

            // Off the end of this leaf: release it and follow the chain
            self.bpm.unpin_page(self.page_id, false);
            self.frame = None;
            self.page_id = INVALID_PAGE_ID;
            if !next_id.is_valid() {
                return Ok(None);
            }
            let frame = self.bpm.fetch_page(next_id)?;
            self.page_id = next_id;
            self.frame = Some(frame);
            self.index = 0;
        }
    }
}

impl Iterator for BPlusTreeIterator {
    type Item = Result<(IndexKey, Rid)>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_item() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl Drop for BPlusTreeIterator {
    fn drop(&mut self) {
        if self.frame.take().is_some() {
            self.bpm.unpin_page(self.page_id, false);
        }
    }
}
