use std::str::FromStr;
use std::sync::Arc;

use strata_core::{ExecuteConfig, QueryResult, Record, RecordStore};
use strata_proto::tuple;
use strata_storage_sled::SledStorageEngine;
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

pub const GENRES: [&str; 3] = ["rock", "jazz", "folk"];

/// `Album` record `id`: `year = 1960 + id`, `genre` cycling through `GENRES`,
/// `decade` and a `title` for full-text search
#[allow(unused)]
pub fn album(id: i64) -> Record {
    let year = 1960 + id;
    Record::new("Album", tuple![id])
        .with_field("year", year)
        .with_field("genre", GENRES[(id % 3) as usize])
        .with_field("decade", year - year % 10)
        .with_field("title", format!("{} sessions volume {}", GENRES[(id % 3) as usize], id))
}

/// A temporary sled database with albums `0..count` saved into the `albums` store
#[allow(unused)]
pub async fn sled_albums(count: i64, config: ExecuteConfig) -> Result<(SledStorageEngine, RecordStore), anyhow::Error> {
    let engine = SledStorageEngine::new_test()?;
    let store = RecordStore::new(Arc::new(engine.store("albums")?), &tuple!["album"], config);
    for id in 0..count {
        store.save_record(&album(id)).await?;
    }
    Ok((engine, store))
}

#[allow(unused)]
pub fn ids(results: &[QueryResult]) -> Vec<i64> {
    results.iter().filter_map(|r| r.primary_key().get(0).and_then(|v| v.as_int())).collect()
}
