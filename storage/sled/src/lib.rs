mod engine;
mod error;
mod store;

pub use engine::SledStorageEngine;
pub use error::SledStoreError;
pub use store::SledKeyValueStore;
