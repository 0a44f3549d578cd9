use std::str::FromStr;
use std::sync::Arc;

use strata_core::{proto::tuple, ExecuteConfig, MemoryStore, Record, RecordStore};
use tracing::Level;

// Initialize tracing for tests
#[ctor::ctor]
fn init_tracing() {
    // if LOG_LEVEL env var is set, use it
    if let Ok(level) = std::env::var("LOG_LEVEL") {
        tracing_subscriber::fmt().with_max_level(Level::from_str(&level).unwrap()).with_test_writer().init();
    } else {
        tracing_subscriber::fmt().with_max_level(Level::INFO).with_test_writer().init();
    }
}

/// A record store over an in-memory key space, filled with `Doc` records
/// `0..count` carrying `rank = id`, `color` and `size` fields.
#[allow(unused)]
pub async fn setup_store(count: i64) -> Result<RecordStore, anyhow::Error> {
    let store = RecordStore::new(Arc::new(MemoryStore::new()), &tuple!["docs"], ExecuteConfig::default().with_scan_batch_size(3));
    for id in 0..count {
        let color = if id % 2 == 0 { "red" } else { "blue" };
        let record = Record::new("Doc", tuple![id]).with_field("rank", id).with_field("color", color).with_field("size", id % 3);
        store.save_record(&record).await?;
    }
    Ok(store)
}

#[allow(unused)]
pub fn ids(results: &[strata_core::QueryResult]) -> Vec<i64> {
    results.iter().filter_map(|r| r.primary_key().get(0).and_then(|v| v.as_int())).collect()
}
