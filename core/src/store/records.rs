use std::sync::Arc;

use strata_proto::{Continuation, Tuple, TupleRange};
use tracing::debug;

use super::KeyValueStore;
use crate::{
    config::{ExecuteConfig, PipelineOperation},
    cursor::{BoxCursor, CursorExt, KeyValueCursor},
    error::{CursorError, StoreError},
    record::Record,
    scan::{ExecuteState, ScanProperties},
    task::Executor,
};

/// Records stored under `subspace + pack(primary_key)` with a bincode body.
#[derive(Clone)]
pub struct RecordStore {
    kv: Arc<dyn KeyValueStore>,
    subspace: Vec<u8>,
    config: Arc<ExecuteConfig>,
}

impl RecordStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, subspace: &Tuple, config: ExecuteConfig) -> Self {
        Self { kv, subspace: subspace.pack(), config: Arc::new(config) }
    }

    pub fn config(&self) -> &ExecuteConfig { &self.config }

    pub fn pipeline_size(&self, operation: PipelineOperation) -> usize { self.config.pipeline_size(operation) }

    pub fn kv(&self) -> &Arc<dyn KeyValueStore> { &self.kv }

    pub fn executor(&self) -> Executor { Executor::current() }

    fn record_key(&self, primary_key: &Tuple) -> Vec<u8> {
        let mut key = self.subspace.clone();
        key.extend_from_slice(&primary_key.pack());
        key
    }

    pub async fn load_record(&self, primary_key: &Tuple) -> Result<Option<Record>, StoreError> {
        match self.kv.get(&self.record_key(primary_key)).await? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn save_record(&self, record: &Record) -> Result<(), StoreError> {
        debug!(record = %record, "save_record");
        let body = bincode::serialize(record)?;
        self.kv.set(&self.record_key(&record.primary_key), &body).await
    }

    pub async fn delete_record(&self, primary_key: &Tuple) -> Result<bool, StoreError> {
        debug!(primary_key = %primary_key, "delete_record");
        self.kv.clear(&self.record_key(primary_key)).await
    }

    /// Records whose primary key falls in `range`, in primary-key order,
    /// with the skip/limit/time limit of `props` applied.
    pub fn scan_records(
        &self,
        range: &TupleRange,
        continuation: &Continuation,
        props: &ScanProperties,
        state: &ExecuteState,
    ) -> Result<BoxCursor<Record>, CursorError> {
        let kv = KeyValueCursor::new(
            self.kv.clone(),
            range.to_key_range(&self.subspace),
            props.reverse,
            continuation,
            self.config.scan_batch_size,
            state.clone(),
        )?;
        Ok(kv
            .try_map(|kv| bincode::deserialize::<Record>(&kv.value).map_err(|e| CursorError::from(StoreError::from(e))))
            .skip_then_limit(props, continuation)
            .boxed())
    }
}

#[cfg(test)]
mod tests {
    use strata_proto::tuple;

    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_save_load_delete() -> Result<(), anyhow::Error> {
        let store = RecordStore::new(Arc::new(MemoryStore::new()), &tuple!["records"], ExecuteConfig::default());
        let record = Record::new("Doc", tuple![7]).with_field("text", "hello");
        store.save_record(&record).await?;
        assert_eq!(store.load_record(&tuple![7]).await?, Some(record));
        assert!(store.delete_record(&tuple![7]).await?);
        assert_eq!(store.load_record(&tuple![7]).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_scan_records_by_range() -> Result<(), anyhow::Error> {
        let store = RecordStore::new(Arc::new(MemoryStore::new()), &tuple!["records"], ExecuteConfig::default().with_scan_batch_size(2));
        for id in 0..6i64 {
            store.save_record(&Record::new("Doc", tuple![id])).await?;
        }
        let props = ScanProperties::reverse();
        let (records, _, _) = store.scan_records(&TupleRange::between(tuple![1], tuple![4]), &Continuation::Start, &props, &ExecuteState::unlimited())?.collect_all().await?;
        let ids: Vec<i64> = records.iter().filter_map(|r| r.primary_key.get(0).and_then(|v| v.as_int())).collect();
        assert_eq!(ids, vec![3, 2, 1]);
        Ok(())
    }
}
