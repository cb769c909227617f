pub mod config;
pub mod error;
pub mod types;

pub use config::{DEFAULT_POOL_SIZE, HEADER_PAGE_ID, INVALID_PAGE_ID, KEY_SIZE, PAGE_SIZE};
pub use error::{Result, SiltError};
pub use types::{FrameId, IndexKey, PageId, Rid, SlotId};
