//! Beacon store implementations
//!
//! Two implementations of the [`bc_common::AnalyticsStore`] contract:
//! - MemoryStore: in-process state behind a `parking_lot::RwLock`
//! - JsonFileStore: the same semantics persisted to a JSON file after every
//!   mutation
//!
//! Both serialize their read-modify-write merges internally, as the store
//! contract requires.

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

/// Errors opening a file-backed store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store state corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
