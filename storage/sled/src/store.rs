use async_trait::async_trait;
use strata_core::{error::StoreError, store::KeyValueStore};
use strata_proto::KeyRange;
use tokio::task;

use crate::error::{sled_error, SledStoreError};

/// A `KeyValueStore` over one sled tree
#[derive(Clone)]
pub struct SledKeyValueStore {
    pub tree: sled::Tree,
}

impl SledKeyValueStore {
    pub fn new(tree: sled::Tree) -> Self { Self { tree } }

    fn get_blocking(&self, key: Vec<u8>) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.tree.get(key).map_err(sled_error)?.map(|value| value.to_vec()))
    }

    fn scan_blocking(&self, range: KeyRange, reverse: bool, limit: usize) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        if range.is_empty() {
            return Ok(Vec::new());
        }
        let iter = self.tree.range(range.begin..range.end);
        let mut out = Vec::with_capacity(limit.min(1024));
        let mut push = |item: Result<(sled::IVec, sled::IVec), sled::Error>| -> Result<(), StoreError> {
            let (key, value) = item.map_err(sled_error)?;
            out.push((key.to_vec(), value.to_vec()));
            Ok(())
        };
        if reverse {
            for item in iter.rev().take(limit) {
                push(item)?;
            }
        } else {
            for item in iter.take(limit) {
                push(item)?;
            }
        }
        Ok(out)
    }

    fn set_blocking(&self, key: Vec<u8>, value: Vec<u8>) -> Result<(), StoreError> {
        self.tree.insert(key, value).map_err(sled_error)?;
        Ok(())
    }

    fn clear_blocking(&self, key: Vec<u8>) -> Result<bool, StoreError> { Ok(self.tree.remove(key).map_err(sled_error)?.is_some()) }
}

#[async_trait]
impl KeyValueStore for SledKeyValueStore {
    // each method hands off to its blocking counterpart since sled operations are not async
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let me = self.clone();
        let key = key.to_vec();
        task::spawn_blocking(move || me.get_blocking(key)).await.map_err(SledStoreError::from)?
    }

    async fn scan(&self, range: &KeyRange, reverse: bool, limit: usize) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let me = self.clone();
        let range = range.clone();
        task::spawn_blocking(move || me.scan_blocking(range, reverse, limit)).await.map_err(SledStoreError::from)?
    }

    async fn set(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        let me = self.clone();
        let (key, value) = (key.to_vec(), value.to_vec());
        task::spawn_blocking(move || me.set_blocking(key, value)).await.map_err(SledStoreError::from)?
    }

    async fn clear(&self, key: &[u8]) -> Result<bool, StoreError> {
        let me = self.clone();
        let key = key.to_vec();
        task::spawn_blocking(move || me.clear_blocking(key)).await.map_err(SledStoreError::from)?
    }
}
