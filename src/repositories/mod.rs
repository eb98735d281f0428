pub mod file;
pub mod memory;

pub use file::FileScanStore;
pub(crate) use file::write_replacing;
pub use memory::MemoryScanStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::entities::{ItemId, ScanState};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state store unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt scan state for {id}: {reason}")]
    Corrupt { id: ItemId, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Persistence of scan state keyed by content item.
///
/// `put` replaces the whole record in one step; a reader never observes a
/// half-written state. Missing records read as [`ScanState::default`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScanStateStore: Send + Sync {
    async fn get(&self, id: &ItemId) -> Result<ScanState, StoreError>;

    async fn put(&self, id: &ItemId, state: &ScanState) -> Result<(), StoreError>;

    async fn clear(&self, id: &ItemId) -> Result<(), StoreError>;
}
