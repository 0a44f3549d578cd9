//! The ordered key-value store the cursors read from, and the record layer on top of it.

mod memory;
mod records;

pub use memory::MemoryStore;
pub use records::RecordStore;

use async_trait::async_trait;
use strata_proto::KeyRange;

use crate::error::StoreError;

/// Point and range reads over an ordered key space within one snapshot.
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// At most `limit` pairs inside `range`, in key order (descending when `reverse`)
    async fn scan(&self, range: &KeyRange, reverse: bool, limit: usize) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError>;

    async fn set(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    /// Returns whether the key was present
    async fn clear(&self, key: &[u8]) -> Result<bool, StoreError>;
}
