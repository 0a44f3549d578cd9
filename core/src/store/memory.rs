use std::collections::BTreeMap;

use async_trait::async_trait;
use strata_proto::KeyRange;
use tokio::sync::RwLock;

use super::KeyValueStore;
use crate::error::StoreError;

/// An in-process `KeyValueStore` backed by a `BTreeMap`
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub async fn len(&self) -> usize { self.data.read().await.len() }

    pub async fn is_empty(&self) -> bool { self.data.read().await.is_empty() }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> { Ok(self.data.read().await.get(key).cloned()) }

    async fn scan(&self, range: &KeyRange, reverse: bool, limit: usize) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        if range.is_empty() {
            return Ok(Vec::new());
        }
        let data = self.data.read().await;
        let iter = data.range(range.begin.clone()..range.end.clone()).map(|(k, v)| (k.clone(), v.clone()));
        Ok(if reverse { iter.rev().take(limit).collect() } else { iter.take(limit).collect() })
    }

    async fn set(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.data.write().await.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    async fn clear(&self, key: &[u8]) -> Result<bool, StoreError> { Ok(self.data.write().await.remove(key).is_some()) }
}
