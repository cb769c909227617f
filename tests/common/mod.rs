//! Shared helpers for the B+ tree integration tests

use std::sync::Arc;

use silt::buffer::BufferPoolManager;
use silt::common::{PageId, INVALID_PAGE_ID};
use silt::index::{BTreePageRef, InternalPageRef, LeafPageRef};
use silt::storage::disk::DiskManager;
use tempfile::NamedTempFile;

pub fn create_bpm(pool_size: usize) -> (Arc<BufferPoolManager>, NamedTempFile) {
    let temp_file = NamedTempFile::new().unwrap();
    let dm = Arc::new(DiskManager::new(temp_file.path()).unwrap());
    (Arc::new(BufferPoolManager::new(pool_size, dm)), temp_file)
}

/// Walks the whole tree checking the structural invariants:
/// - every child's parent pointer names the page that references it
/// - every non-root page satisfies min_size <= size <= max_size
/// - keys are sorted and each subtree stays within its separator bounds
/// - all leaves sit at the same depth and chain left-to-right in order
///
/// Panics on any violation. All fetched pages are unpinned again, so the
/// walk leaves the pool as it found it.
pub fn check_tree_integrity(bpm: &BufferPoolManager, root_page_id: PageId) {
    if !root_page_id.is_valid() {
        return;
    }
    let mut leaves = Vec::new();
    let mut leaf_depth = None;
    check_page(
        bpm,
        root_page_id,
        INVALID_PAGE_ID,
        None,
        None,
        0,
        &mut leaf_depth,
        &mut leaves,
    );

    // The chain must visit exactly the leaves found by the walk, in order
    for window in leaves.windows(2) {
        let frame = bpm.fetch_page(window[0]).unwrap();
        let next = {
            let data = frame.read_data();
            LeafPageRef::new(&data[..]).next_page_id()
        };
        bpm.unpin_page(window[0], false);
        assert_eq!(next, window[1], "leaf chain skips a leaf");
    }
    if let Some(&last) = leaves.last() {
        let frame = bpm.fetch_page(last).unwrap();
        let next = {
            let data = frame.read_data();
            LeafPageRef::new(&data[..]).next_page_id()
        };
        bpm.unpin_page(last, false);
        assert!(!next.is_valid(), "rightmost leaf must end the chain");
    }
}

#[allow(clippy::too_many_arguments)]
fn check_page(
    bpm: &BufferPoolManager,
    page_id: PageId,
    expected_parent: PageId,
    lower: Option<u64>,
    upper: Option<u64>,
    depth: usize,
    leaf_depth: &mut Option<usize>,
    leaves: &mut Vec<PageId>,
) {
    let frame = bpm.fetch_page(page_id).unwrap();
    let is_root = !expected_parent.is_valid();

    enum Walk {
        Leaf,
        Internal(Vec<(PageId, Option<u64>, Option<u64>)>),
    }

    let walk = {
        let data = frame.read_data();
        let header = BTreePageRef::new(&data[..]);
        assert_eq!(header.page_id(), page_id, "page id field mismatch");
        assert_eq!(
            header.parent_page_id(),
            expected_parent,
            "parent pointer of page {} is stale",
            page_id
        );
        if !is_root {
            assert!(
                header.size() >= header.min_size(),
                "page {} underflows: {} < {}",
                page_id,
                header.size(),
                header.min_size()
            );
        }
        assert!(
            header.size() <= header.max_size(),
            "page {} overflows: {} > {}",
            page_id,
            header.size(),
            header.max_size()
        );

        if header.is_leaf() {
            let leaf = LeafPageRef::new(&data[..]);
            let mut prev = None;
            for i in 0..leaf.size() {
                let key = leaf.key_at(i).as_u64();
                if let Some(prev) = prev {
                    assert!(prev < key, "leaf {} keys out of order", page_id);
                }
                if let Some(lo) = lower {
                    assert!(key >= lo, "leaf {} key below separator", page_id);
                }
                if let Some(hi) = upper {
                    assert!(key < hi, "leaf {} key above separator", page_id);
                }
                prev = Some(key);
            }
            Walk::Leaf
        } else {
            let internal = InternalPageRef::new(&data[..]);
            assert!(internal.size() >= 2, "internal page {} too small", page_id);
            let mut children = Vec::with_capacity(internal.size());
            for i in 0..internal.size() {
                let child_lower = if i == 0 {
                    lower
                } else {
                    let key = internal.key_at(i).as_u64();
                    if let Some(lo) = lower {
                        assert!(key > lo, "internal {} separators out of order", page_id);
                    }
                    if let Some(hi) = upper {
                        assert!(key < hi, "internal {} separator above bound", page_id);
                    }
                    Some(key)
                };
                let child_upper = if i + 1 < internal.size() {
                    Some(internal.key_at(i + 1).as_u64())
                } else {
                    upper
                };
                children.push((internal.value_at(i), child_lower, child_upper));
            }
            Walk::Internal(children)
        }
    };
    bpm.unpin_page(page_id, false);

    match walk {
        Walk::Leaf => {
            match *leaf_depth {
                None => *leaf_depth = Some(depth),
                Some(expected) => assert_eq!(expected, depth, "leaves at unequal depth"),
            }
            leaves.push(page_id);
        }
        Walk::Internal(children) => {
            for (child, lo, hi) in children {
                check_page(bpm, child, page_id, lo, hi, depth + 1, leaf_depth, leaves);
            }
        }
    }
}

/// Keys visited by a full forward scan, as integers.
pub fn collect_keys<C: silt::index::KeyComparator>(tree: &silt::index::BPlusTree<C>) -> Vec<u64> {
    tree.begin()
        .unwrap()
        .map(|item| item.unwrap().0.as_u64())
        .collect()
}
