use std::str::FromStr;
use std::sync::Arc;

use strata_core::{proto::tuple, ExecuteConfig, Record, RecordStore};
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

pub fn names(records: &[Record]) -> Vec<String> {
    records.iter().map(|r| r.field("name").and_then(|f| f.as_str()).unwrap_or_default().to_string()).collect()
}

/// A record store on a temporary sled database holding `albums` as (name, year) records keyed by year
#[allow(unused)]
pub async fn setup_albums(albums: &[(&str, i64)], config: ExecuteConfig) -> Result<(SledStorageEngine, RecordStore), anyhow::Error> {
    let engine = SledStorageEngine::new_test()?;
    let store = RecordStore::new(Arc::new(engine.store("albums")?), &tuple!["album"], config);
    for (name, year) in albums {
        store.save_record(&Record::new("Album", tuple![*year]).with_field("name", *name).with_field("year", *year)).await?;
    }
    Ok((engine, store))
}

#[allow(unused)]
pub fn twenty_albums() -> Vec<(String, i64)> { (0..20).map(|i| (format!("Album {:02}", i), 2000 + i)).collect() }
