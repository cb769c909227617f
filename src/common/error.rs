use thiserror::Error;

use super::types::PageId;

/// Database error types
#[derive(Error, Debug)]
pub enum SiltError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Buffer pool exhausted, every frame is pinned")]
    PoolExhausted,

    #[error("Invalid page ID: {0}")]
    InvalidPageId(PageId),

    #[error("Disk scheduler error: {0}")]
    DiskScheduler(String),

    #[error("Header page directory is full")]
    HeaderDirectoryFull,

    #[error("Index name too long: {0}")]
    IndexNameTooLong(String),

    #[error("Index corrupted: {0}")]
    IndexCorrupted(String),
}

pub type Result<T> = std::result::Result<T, SiltError>;
