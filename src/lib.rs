//! Silt - the storage kernel of a disk-oriented relational database
//!
//! The crate couples a fixed-size buffer pool over a single database
//! file with a disk-backed B+ tree index that mutates pages exclusively
//! through that pool.
//!
//! # Architecture
//!
//! - **Storage layer** (`storage`): page-granular disk access
//!   - `DiskManager`: reads, writes, allocates, and deallocates pages of
//!     a single file
//!   - `DiskScheduler`: background worker funneling page I/O through a
//!     request queue
//!   - `HeaderPage`: the on-disk directory mapping index names to their
//!     root page ids
//!
//! - **Buffer pool** (`buffer`): the page cache every access goes through
//!   - `BufferPoolManager`: pin/unpin bookkeeping, dirty-page write-back
//!     on eviction or flush, one latch over all of it
//!   - `LruReplacer`: picks eviction victims in first-unpinned order
//!   - `Frame`: one slot of the pool, bytes plus metadata
//!
//! - **Index** (`index`): the B+ tree
//!   - `BPlusTree`: search, insert with splits, delete with
//!     coalesce/redistribute, generic over a `KeyComparator`
//!   - `LeafPage`/`InternalPage`: typed views over raw page bytes
//!   - `BPlusTreeIterator`: forward scan over the leaf chain
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use silt::buffer::BufferPoolManager;
//! use silt::common::{IndexKey, PageId, Rid, SlotId};
//! use silt::index::{BPlusTree, IntegerComparator};
//! use silt::storage::disk::DiskManager;
//!
//! let disk_manager = Arc::new(DiskManager::new("test.db").unwrap());
//! let bpm = Arc::new(BufferPoolManager::new(64, disk_manager));
//!
//! let mut tree = BPlusTree::new("test_index", bpm, IntegerComparator, 32, 32);
//! let key = IndexKey::from_u64(42);
//! tree.insert(key, Rid::new(PageId::new(1), SlotId::new(0))).unwrap();
//! assert_eq!(tree.get_value(&key).unwrap().len(), 1);
//! ```

pub mod buffer;
pub mod common;
pub mod index;
pub mod storage;

// Re-export commonly used types at the crate root
pub use common::{IndexKey, PageId, Result, Rid, SiltError, SlotId};
