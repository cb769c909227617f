use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use crate::buffer::{BufferPoolManager, Frame};
use crate::common::{
    IndexKey, PageId, Result, Rid, SiltError, SlotId, HEADER_PAGE_ID, INVALID_PAGE_ID,
};
use crate::storage::page::{HeaderPage, HeaderPageRef};

use super::btree_iterator::BPlusTreeIterator;
use super::btree_page::{
    BTreePage, BTreePageRef, InternalPage, InternalPageRef, LeafPage, LeafPageRef,
    INTERNAL_MAX_SLOTS, LEAF_MAX_SLOTS,
};
use super::key_comparator::KeyComparator;

/// Disk-backed B+ tree index. Every page it touches goes through the
/// buffer pool: fetch, use through a typed view, unpin with the dirty
/// flag reflecting whether bytes changed. Sibling, parent, and child
/// links are all page ids, never in-memory pointers.
///
/// Keys are unique. The tree is single-writer: concurrent readers of a
/// quiescent tree are fine, concurrent mutation is not supported.
pub struct BPlusTree<C: KeyComparator> {
    /// Name of this index in the header-page directory
    index_name: String,
    /// Current root, INVALID_PAGE_ID when the tree is empty
    root_page_id: PageId,
    bpm: Arc<BufferPoolManager>,
    comparator: C,
    /// A leaf splits when its size exceeds this
    leaf_max_size: usize,
    /// An internal page splits when its size exceeds this
    internal_max_size: usize,
}

impl<C: KeyComparator> BPlusTree<C> {
    /// Creates a new, empty tree. Nothing is written until the first
    /// insert allocates the root.
    pub fn new(
        index_name: &str,
        bpm: Arc<BufferPoolManager>,
        comparator: C,
        leaf_max_size: usize,
        internal_max_size: usize,
    ) -> Self {
        // A page must be able to hold one entry past max_size while a
        // split is in flight.
        assert!(leaf_max_size >= 2 && leaf_max_size < LEAF_MAX_SLOTS);
        assert!(internal_max_size >= 3 && internal_max_size < INTERNAL_MAX_SLOTS);
        Self {
            index_name: index_name.to_string(),
            root_page_id: INVALID_PAGE_ID,
            bpm,
            comparator,
            leaf_max_size,
            internal_max_size,
        }
    }

    /// Reattaches to an index previously registered in the header page.
    /// Returns None if the directory has no entry for this name.
    pub fn open(
        index_name: &str,
        bpm: Arc<BufferPoolManager>,
        comparator: C,
        leaf_max_size: usize,
        internal_max_size: usize,
    ) -> Result<Option<Self>> {
        let frame = bpm.fetch_page(HEADER_PAGE_ID)?;
        let root = {
            let data = frame.read_data();
            HeaderPageRef::new(&data[..]).get_root_id(index_name)
        };
        bpm.unpin_page(HEADER_PAGE_ID, false);

        Ok(root?.map(|root_page_id| Self {
            index_name: index_name.to_string(),
            root_page_id,
            bpm,
            comparator,
            leaf_max_size,
            internal_max_size,
        }))
    }

    pub fn root_page_id(&self) -> PageId {
        self.root_page_id
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// True iff the tree holds no keys.
    pub fn is_empty(&self) -> Result<bool> {
        if !self.root_page_id.is_valid() {
            return Ok(true);
        }
        let frame = self.bpm.fetch_page(self.root_page_id)?;
        let size = {
            let data = frame.read_data();
            BTreePageRef::new(&data[..]).size()
        };
        self.bpm.unpin_page(self.root_page_id, false);
        Ok(size == 0)
    }

    /// Point lookup. Returns every value for the key; with unique keys
    /// that is zero or one entries.
    pub fn get_value(&self, key: &IndexKey) -> Result<Vec<Rid>> {
        if !self.root_page_id.is_valid() {
            return Ok(Vec::new());
        }
        let (leaf_id, frame) = self.find_leaf_page(key, false)?;
        let found = {
            let data = frame.read_data();
            LeafPageRef::new(&data[..]).lookup(key, &self.comparator)
        };
        self.bpm.unpin_page(leaf_id, false);
        Ok(found.into_iter().collect())
    }

    /// Inserts a key/value pair. Returns false (and changes nothing) if
    /// the key is already present.
    pub fn insert(&mut self, key: IndexKey, rid: Rid) -> Result<bool> {
        if !self.root_page_id.is_valid() {
            self.start_new_tree(key, rid)?;
            return Ok(true);
        }
        self.insert_into_leaf(key, rid)
    }

    /// Deletes a key if present; a missing key is a no-op.
    pub fn remove(&mut self, key: &IndexKey) -> Result<()> {
        if !self.root_page_id.is_valid() {
            return Ok(());
        }

        let (leaf_id, frame) = self.find_leaf_page(key, false)?;
        let (removed, underflow) = {
            let mut data = frame.write_data();
            let mut leaf = LeafPage::new(&mut data[..]);
            let removed = leaf.remove_record(key, &self.comparator);
            let underflow = if leaf.is_root() {
                leaf.size() == 0
            } else {
                leaf.size() < leaf.min_size()
            };
            (removed, underflow)
        };
        self.bpm.unpin_page(leaf_id, removed);

        if removed && underflow && self.coalesce_or_redistribute(leaf_id)? {
            self.bpm.delete_page(leaf_id)?;
        }
        Ok(())
    }

    /// Iterator positioned at the first key of the tree.
    pub fn begin(&self) -> Result<BPlusTreeIterator> {
        if !self.root_page_id.is_valid() {
            return Ok(BPlusTreeIterator::end(Arc::clone(&self.bpm)));
        }
        let (leaf_id, frame) = self.find_leaf_page(&IndexKey::zero(), true)?;
        Ok(BPlusTreeIterator::new(
            Arc::clone(&self.bpm),
            leaf_id,
            frame,
            0,
        ))
    }

    /// Iterator positioned at the first key >= the probe.
    pub fn begin_at(&self, key: &IndexKey) -> Result<BPlusTreeIterator> {
        if !self.root_page_id.is_valid() {
            return Ok(BPlusTreeIterator::end(Arc::clone(&self.bpm)));
        }
        let (leaf_id, frame) = self.find_leaf_page(key, false)?;
        let index = {
            let data = frame.read_data();
            LeafPageRef::new(&data[..]).key_index(key, &self.comparator)
        };
        Ok(BPlusTreeIterator::new(
            Arc::clone(&self.bpm),
            leaf_id,
            frame,
            index,
        ))
    }

    /// The end sentinel.
    pub fn end(&self) -> BPlusTreeIterator {
        BPlusTreeIterator::end(Arc::clone(&self.bpm))
    }

    /// Descends to the leaf responsible for the key (or the leftmost
    /// leaf). The returned leaf is pinned; every internal page touched on
    /// the way down has been unpinned clean.
    fn find_leaf_page(&self, key: &IndexKey, leftmost: bool) -> Result<(PageId, Arc<Frame>)> {
        let mut page_id = self.root_page_id;
        loop {
            let frame = self.bpm.fetch_page(page_id)?;
            let next = {
                let data = frame.read_data();
                let header = BTreePageRef::new(&data[..]);
                if header.is_leaf() {
                    None
                } else {
                    let internal = InternalPageRef::new(&data[..]);
                    Some(if leftmost {
                        internal.value_at(0)
                    } else {
                        internal.lookup(key, &self.comparator)
                    })
                }
            };
            match next {
                None => return Ok((page_id, frame)),
                Some(child) => {
                    self.bpm.unpin_page(page_id, false);
                    page_id = child;
                }
            }
        }
    }

    fn start_new_tree(&mut self, key: IndexKey, rid: Rid) -> Result<()> {
        let (page_id, frame) = self.bpm.new_page()?;
        {
            let mut data = frame.write_data();
            let mut leaf = LeafPage::new(&mut data[..]);
            leaf.init(page_id, INVALID_PAGE_ID, self.leaf_max_size);
            leaf.insert(key, rid, &self.comparator);
        }
        self.root_page_id = page_id;
        self.update_root_page_id(true)?;
        self.bpm.unpin_page(page_id, true);
        Ok(())
    }

    fn insert_into_leaf(&mut self, key: IndexKey, rid: Rid) -> Result<bool> {
        let (leaf_id, frame) = self.find_leaf_page(&key, false)?;

        let outcome = {
            let mut data = frame.write_data();
            let mut leaf = LeafPage::new(&mut data[..]);
            if leaf.lookup(&key, &self.comparator).is_some() {
                None
            } else {
                Some(leaf.insert(key, rid, &self.comparator) > self.leaf_max_size)
            }
        };

        match outcome {
            None => {
                self.bpm.unpin_page(leaf_id, false);
                Ok(false)
            }
            Some(false) => {
                self.bpm.unpin_page(leaf_id, true);
                Ok(true)
            }
            Some(true) => {
                self.split_leaf(leaf_id, &frame)?;
                self.bpm.unpin_page(leaf_id, true);
                Ok(true)
            }
        }
    }

    /// Splits an overfull leaf: the upper half moves to a fresh right
    /// sibling, the leaf chain is rethreaded, and the sibling's first key
    /// goes up to the parent as the separator.
    fn split_leaf(&mut self, leaf_id: PageId, frame: &Arc<Frame>) -> Result<()> {
        let (sibling_id, sibling_frame) = self.bpm.new_page()?;

        let separator = {
            let mut data = frame.write_data();
            let mut node = LeafPage::new(&mut data[..]);
            let mut sibling_data = sibling_frame.write_data();
            let mut sibling = LeafPage::new(&mut sibling_data[..]);

            sibling.init(sibling_id, node.parent_page_id(), self.leaf_max_size);
            node.move_half_to(&mut sibling);
            sibling.set_next_page_id(node.next_page_id());
            node.set_next_page_id(sibling_id);
            sibling.key_at(0)
        };

        self.insert_into_parent(leaf_id, separator, sibling_id)?;
        self.bpm.unpin_page(sibling_id, true);
        Ok(())
    }

    /// Splits an overfull internal page. The separator rides along in the
    /// new sibling's slot 0 (where it stays behind as the sentinel), and
    /// every moved child is rewired to the sibling.
    fn split_internal(&mut self, node_id: PageId, frame: &Arc<Frame>) -> Result<()> {
        let (sibling_id, sibling_frame) = self.bpm.new_page()?;

        let (separator, moved_children) = {
            let mut data = frame.write_data();
            let mut node = InternalPage::new(&mut data[..]);
            let mut sibling_data = sibling_frame.write_data();
            let mut sibling = InternalPage::new(&mut sibling_data[..]);

            sibling.init(sibling_id, node.parent_page_id(), self.internal_max_size);
            let moved = node.move_half_to(&mut sibling);
            (sibling.key_at(0), moved)
        };

        for child in moved_children {
            self.reparent(child, sibling_id)?;
        }

        self.insert_into_parent(node_id, separator, sibling_id)?;
        self.bpm.unpin_page(sibling_id, true);
        Ok(())
    }

    /// Hooks a freshly split-off sibling into the tree above. Growing a
    /// new root when the old node was the root, otherwise inserting the
    /// separator into the parent and splitting it in turn if overfull.
    fn insert_into_parent(&mut self, old_id: PageId, key: IndexKey, new_id: PageId) -> Result<()> {
        let old_frame = self.bpm.fetch_page(old_id)?;
        let parent_id = {
            let data = old_frame.read_data();
            BTreePageRef::new(&data[..]).parent_page_id()
        };

        if !parent_id.is_valid() {
            let (root_id, root_frame) = self.bpm.new_page()?;
            {
                let mut data = root_frame.write_data();
                let mut root = InternalPage::new(&mut data[..]);
                root.init(root_id, INVALID_PAGE_ID, self.internal_max_size);
                root.populate_new_root(old_id, key, new_id);
            }
            {
                let mut data = old_frame.write_data();
                BTreePage::new(&mut data[..]).set_parent_page_id(root_id);
            }
            self.bpm.unpin_page(old_id, true);
            self.reparent(new_id, root_id)?;

            self.root_page_id = root_id;
            self.update_root_page_id(false)?;
            self.bpm.unpin_page(root_id, true);
            return Ok(());
        }

        self.bpm.unpin_page(old_id, false);

        let parent_frame = self.bpm.fetch_page(parent_id)?;
        let needs_split = {
            let mut data = parent_frame.write_data();
            let mut parent = InternalPage::new(&mut data[..]);
            parent.insert_node_after(old_id, key, new_id) > self.internal_max_size
        };

        if needs_split {
            self.split_internal(parent_id, &parent_frame)?;
        }
        self.bpm.unpin_page(parent_id, true);
        Ok(())
    }

    /// Fixes up an underfull page: borrow one entry from a sibling when
    /// possible, merge with it otherwise, cascading up the tree. Returns
    /// true when the page was emptied and the caller must delete it.
    fn coalesce_or_redistribute(&mut self, node_id: PageId) -> Result<bool> {
        let node_frame = self.bpm.fetch_page(node_id)?;

        let parent_id = {
            let data = node_frame.read_data();
            BTreePageRef::new(&data[..]).parent_page_id()
        };
        if !parent_id.is_valid() {
            let should_delete = self.adjust_root(&node_frame);
            self.bpm.unpin_page(node_id, false);
            return should_delete;
        }

        let parent_frame = self.bpm.fetch_page(parent_id)?;
        let node_index = {
            let data = parent_frame.read_data();
            InternalPageRef::new(&data[..]).value_index(node_id)
        };
        let node_index = match node_index {
            Some(index) => index,
            None => {
                self.bpm.unpin_page(parent_id, false);
                self.bpm.unpin_page(node_id, false);
                return Err(SiltError::IndexCorrupted(format!(
                    "page {} missing from its parent {}",
                    node_id, parent_id
                )));
            }
        };

        // Prefer the left sibling; the leftmost child borrows right.
        let sibling_index = if node_index == 0 { 1 } else { node_index - 1 };
        let separator_index = node_index.max(sibling_index);
        let sibling_id = {
            let data = parent_frame.read_data();
            InternalPageRef::new(&data[..]).value_at(sibling_index)
        };
        let sibling_frame = self.bpm.fetch_page(sibling_id)?;

        let (node_size, sibling_size, max_size) = {
            let data = node_frame.read_data();
            let header = BTreePageRef::new(&data[..]);
            let sibling_data = sibling_frame.read_data();
            (
                header.size(),
                BTreePageRef::new(&sibling_data[..]).size(),
                header.max_size(),
            )
        };

        if node_size + sibling_size <= max_size {
            self.coalesce(
                &parent_frame,
                &node_frame,
                &sibling_frame,
                node_index,
                separator_index,
            )?;

            // The right-hand page was emptied. When it is our node, the
            // caller deletes it; when it is the sibling, delete it here.
            let parent_underflow = {
                let data = parent_frame.read_data();
                let parent = BTreePageRef::new(&data[..]);
                if parent.is_root() {
                    parent.size() == 1
                } else {
                    parent.size() < parent.min_size()
                }
            };

            self.bpm.unpin_page(sibling_id, true);
            self.bpm.unpin_page(node_id, true);
            self.bpm.unpin_page(parent_id, true);

            if node_index == 0 {
                self.bpm.delete_page(sibling_id)?;
            }
            if parent_underflow && self.coalesce_or_redistribute(parent_id)? {
                self.bpm.delete_page(parent_id)?;
            }
            Ok(node_index != 0)
        } else {
            self.redistribute(
                &parent_frame,
                &node_frame,
                &sibling_frame,
                node_index,
                separator_index,
            )?;
            self.bpm.unpin_page(sibling_id, true);
            self.bpm.unpin_page(node_id, true);
            self.bpm.unpin_page(parent_id, true);
            Ok(false)
        }
    }

    /// Merges the right-hand page of a sibling pair into the left-hand
    /// one and drops the separator from the parent. Leaves both frames
    /// pinned; the right page ends up empty.
    fn coalesce(
        &mut self,
        parent_frame: &Arc<Frame>,
        node_frame: &Arc<Frame>,
        sibling_frame: &Arc<Frame>,
        node_index: usize,
        separator_index: usize,
    ) -> Result<()> {
        // Merge right into left so the surviving page keeps its place in
        // the parent and the leaf chain stays intact.
        let (left_frame, right_frame) = if node_index == 0 {
            (node_frame, sibling_frame)
        } else {
            (sibling_frame, node_frame)
        };

        let moved_children = {
            let mut parent_data = parent_frame.write_data();
            let mut parent = InternalPage::new(&mut parent_data[..]);
            let mut left_data = left_frame.write_data();
            let mut right_data = right_frame.write_data();

            let moved = if BTreePageRef::new(&left_data[..]).is_leaf() {
                let mut left = LeafPage::new(&mut left_data[..]);
                let mut right = LeafPage::new(&mut right_data[..]);
                right.move_all_to(&mut left);
                Vec::new()
            } else {
                let middle_key = parent.key_at(separator_index);
                let mut left = InternalPage::new(&mut left_data[..]);
                let mut right = InternalPage::new(&mut right_data[..]);
                right.move_all_to(&mut left, middle_key)
            };

            parent.remove_at(separator_index);
            moved
        };

        let left_id = {
            let data = left_frame.read_data();
            BTreePageRef::new(&data[..]).page_id()
        };
        for child in moved_children {
            self.reparent(child, left_id)?;
        }
        Ok(())
    }

    /// Moves one entry from the sibling into the underfull node and
    /// rewrites the separator between them in the parent.
    fn redistribute(
        &mut self,
        parent_frame: &Arc<Frame>,
        node_frame: &Arc<Frame>,
        sibling_frame: &Arc<Frame>,
        node_index: usize,
        separator_index: usize,
    ) -> Result<()> {
        let moved_child = {
            let mut parent_data = parent_frame.write_data();
            let mut parent = InternalPage::new(&mut parent_data[..]);
            let mut node_data = node_frame.write_data();
            let mut sibling_data = sibling_frame.write_data();

            if BTreePageRef::new(&node_data[..]).is_leaf() {
                let mut node = LeafPage::new(&mut node_data[..]);
                let mut sibling = LeafPage::new(&mut sibling_data[..]);
                if node_index == 0 {
                    // Right sibling lends its first pair
                    sibling.move_first_to_end_of(&mut node);
                    parent.set_key_at(separator_index, sibling.key_at(0));
                } else {
                    // Left sibling lends its last pair
                    sibling.move_last_to_front_of(&mut node);
                    parent.set_key_at(separator_index, node.key_at(0));
                }
                None
            } else {
                let middle_key = parent.key_at(separator_index);
                let mut node = InternalPage::new(&mut node_data[..]);
                let mut sibling = InternalPage::new(&mut sibling_data[..]);
                let (new_separator, moved) = if node_index == 0 {
                    sibling.move_first_to_end_of(&mut node, middle_key)
                } else {
                    sibling.move_last_to_front_of(&mut node, middle_key)
                };
                parent.set_key_at(separator_index, new_separator);
                Some(moved)
            }
        };

        if let Some(child) = moved_child {
            let node_id = {
                let data = node_frame.read_data();
                BTreePageRef::new(&data[..]).page_id()
            };
            self.reparent(child, node_id)?;
        }
        Ok(())
    }

    /// Shrinks the tree at the top after deletions: an internal root
    /// with a single remaining child hands the root role to that child;
    /// an emptied leaf root turns the tree empty. Returns true when the
    /// old root page should be deleted.
    fn adjust_root(&mut self, frame: &Arc<Frame>) -> Result<bool> {
        let promotion = {
            let data = frame.read_data();
            let header = BTreePageRef::new(&data[..]);
            if header.is_internal() && header.size() == 1 {
                Some(InternalPageRef::new(&data[..]).value_at(0))
            } else if header.is_leaf() && header.size() == 0 {
                None
            } else {
                return Ok(false);
            }
        };

        match promotion {
            Some(child) => {
                self.reparent(child, INVALID_PAGE_ID)?;
                self.root_page_id = child;
            }
            None => {
                self.root_page_id = INVALID_PAGE_ID;
            }
        }
        self.update_root_page_id(false)?;
        Ok(true)
    }

    /// Rewrites one page's parent pointer through the pool.
    fn reparent(&self, page_id: PageId, new_parent: PageId) -> Result<()> {
        let frame = self.bpm.fetch_page(page_id)?;
        {
            let mut data = frame.write_data();
            BTreePage::new(&mut data[..]).set_parent_page_id(new_parent);
        }
        self.bpm.unpin_page(page_id, true);
        Ok(())
    }

    /// Mirrors the current root page id into the header-page directory.
    /// Called on every root change; insert = true registers the index.
    fn update_root_page_id(&self, insert: bool) -> Result<()> {
        let frame = self.bpm.fetch_page(HEADER_PAGE_ID)?;
        let result = (|| -> Result<()> {
            let mut data = frame.write_data();
            let mut header = HeaderPage::new(&mut data[..]);
            if insert {
                if !header.insert_record(&self.index_name, self.root_page_id)? {
                    header.update_record(&self.index_name, self.root_page_id)?;
                }
            } else if !header.update_record(&self.index_name, self.root_page_id)? {
                header.insert_record(&self.index_name, self.root_page_id)?;
            }
            Ok(())
        })();
        self.bpm.unpin_page(HEADER_PAGE_ID, true);
        result
    }

    /// Reads whitespace-separated integer keys from a file and inserts
    /// them, synthesizing each record id from its key. Verification only.
    pub fn insert_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let contents = std::fs::read_to_string(path)?;
        for token in contents.split_whitespace() {
            if let Ok(value) = token.parse::<u64>() {
                let key = IndexKey::from_u64(value);
                let rid = Rid::new(PageId::new(value as u32), SlotId::new(value as u32));
                self.insert(key, rid)?;
            }
        }
        Ok(())
    }

    /// Reads whitespace-separated integer keys from a file and removes
    /// them. Verification only.
    pub fn remove_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let contents = std::fs::read_to_string(path)?;
        for token in contents.split_whitespace() {
            if let Ok(value) = token.parse::<u64>() {
                self.remove(&IndexKey::from_u64(value))?;
            }
        }
        Ok(())
    }

    /// Emits a DOT rendering of the tree for debugging.
    pub fn to_graph<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "digraph btree {{")?;
        if self.root_page_id.is_valid() {
            self.graph_page(self.root_page_id, out)?;
        }
        writeln!(out, "}}")?;
        Ok(())
    }

    fn graph_page<W: Write>(&self, page_id: PageId, out: &mut W) -> Result<()> {
        let frame = self.bpm.fetch_page(page_id)?;
        let result = (|| -> Result<Vec<PageId>> {
            let data = frame.read_data();
            let header = BTreePageRef::new(&data[..]);
            if header.is_leaf() {
                let leaf = LeafPageRef::new(&data[..]);
                let keys: Vec<String> = (0..leaf.size())
                    .map(|i| leaf.key_at(i).to_string())
                    .collect();
                writeln!(
                    out,
                    "  leaf_{} [shape=record label=\"{}\"];",
                    page_id.as_u32(),
                    keys.join("|")
                )?;
                if leaf.next_page_id().is_valid() {
                    writeln!(
                        out,
                        "  leaf_{} -> leaf_{} [constraint=false];",
                        page_id.as_u32(),
                        leaf.next_page_id().as_u32()
                    )?;
                }
                Ok(Vec::new())
            } else {
                let internal = InternalPageRef::new(&data[..]);
                let mut cells = vec!["<p0>".to_string()];
                for i in 1..internal.size() {
                    cells.push(format!("{}|<p{}>", internal.key_at(i), i));
                }
                writeln!(
                    out,
                    "  internal_{} [shape=record label=\"{}\"];",
                    page_id.as_u32(),
                    cells.join("|")
                )?;
                let mut children = Vec::with_capacity(internal.size());
                for i in 0..internal.size() {
                    children.push(internal.value_at(i));
                }
                Ok(children)
            }
        })();
        self.bpm.unpin_page(page_id, false);
        let children = result?;

        for child in &children {
            let kind = {
                let frame = self.bpm.fetch_page(*child)?;
                let data = frame.read_data();
                let leaf = BTreePageRef::new(&data[..]).is_leaf();
                drop(data);
                self.bpm.unpin_page(*child, false);
                if leaf {
                    "leaf"
                } else {
                    "internal"
                }
            };
            writeln!(
                out,
                "  internal_{} -> {}_{};",
                page_id.as_u32(),
                kind,
                child.as_u32()
            )?;
            self.graph_page(*child, out)?;
        }
        Ok(())
    }

    /// Emits a textual dump of the tree, one page per line group.
    pub fn print_tree<W: Write>(&self, out: &mut W) -> Result<()> {
        if !self.root_page_id.is_valid() {
            writeln!(out, "(empty tree)")?;
            return Ok(());
        }
        self.print_page(self.root_page_id, 0, out)
    }

    fn print_page<W: Write>(&self, page_id: PageId, depth: usize, out: &mut W) -> Result<()> {
        let frame = self.bpm.fetch_page(page_id)?;
        let (lines, children) = {
            let data = frame.read_data();
            let header = BTreePageRef::new(&data[..]);
            if header.is_leaf() {
                let leaf = LeafPageRef::new(&data[..]);
                let keys: Vec<String> = (0..leaf.size())
                    .map(|i| leaf.key_at(i).to_string())
                    .collect();
                let next = leaf.next_page_id();
                (
                    format!(
                        "Leaf {} (next {}): [{}]",
                        page_id.as_u32(),
                        if next.is_valid() {
                            next.as_u32().to_string()
                        } else {
                            "-".to_string()
                        },
                        keys.join(", ")
                    ),
                    Vec::new(),
                )
            } else {
                let internal = InternalPageRef::new(&data[..]);
                let mut entries = vec![format!("*{}", internal.value_at(0).as_u32())];
                for i in 1..internal.size() {
                    entries.push(format!(
                        "{} *{}",
                        internal.key_at(i),
                        internal.value_at(i).as_u32()
                    ));
                }
                let children: Vec<PageId> =
                    (0..internal.size()).map(|i| internal.value_at(i)).collect();
                (
                    format!("Internal {}: [{}]", page_id.as_u32(), entries.join(" | ")),
                    children,
                )
            }
        };
        self.bpm.unpin_page(page_id, false);

        writeln!(out, "{}{}", "  ".repeat(depth), lines)?;
        for child in children {
            self.print_page(child, depth + 1, out)?;
        }
        Ok(())
    }
}
