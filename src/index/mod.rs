pub mod btree_index;
pub mod btree_iterator;
pub mod btree_page;
pub mod key_comparator;

pub use btree_index::BPlusTree;
pub use btree_iterator::BPlusTreeIterator;
pub use btree_page::{
    BTreePage, BTreePageRef, InternalPage, InternalPageRef, LeafPage, LeafPageRef,
    INTERNAL_MAX_SLOTS, LEAF_MAX_SLOTS,
};
pub use key_comparator::{BytewiseComparator, IntegerComparator, KeyComparator};
