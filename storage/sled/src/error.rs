use strata_core::error::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SledStoreError {
    #[error("Storage error: {0}")]
    StorageError(#[from] sled::Error),
    #[error("Blocking task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

impl From<SledStoreError> for StoreError {
    fn from(err: SledStoreError) -> Self { StoreError::Backend(Box::new(err)) }
}

pub fn sled_error(err: sled::Error) -> StoreError { SledStoreError::StorageError(err).into() }
