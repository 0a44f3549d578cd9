use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use strata_core::{
    error::StoreError, proto::tuple, BoxCursor, CursorError, CursorExt, ExecuteConfig, KeyValueStore, MemoryStore, Record, RecordStore,
};
use strata_proto::{IndexEntry, KeyRange, Tuple};
use strata_search::{
    DirectoryManager, IndexReader, ScoreDoc, SearchError, SearchIndex, SearchIndexMaintainer, SearchQuery, StandardAnalyzer, TopDocs,
};
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

/// A memory store that counts every call made to it
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStore,
    calls: AtomicUsize,
}

#[allow(unused)]
impl CountingStore {
    pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }

    pub fn reset(&self) { self.calls.store(0, Ordering::SeqCst) }
}

#[async_trait]
impl KeyValueStore for CountingStore {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn scan(&self, range: &KeyRange, reverse: bool, limit: usize) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.scan(range, reverse, limit).await
    }

    async fn set(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value).await
    }

    async fn clear(&self, key: &[u8]) -> Result<bool, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.clear(key).await
    }
}

/// Wraps a reader, counting calls, optionally failing every search
pub struct CountingReader {
    pub inner: Option<Arc<dyn IndexReader>>,
    pub calls: AtomicUsize,
}

#[allow(unused)]
impl CountingReader {
    pub fn wrapping(inner: Arc<dyn IndexReader>) -> Self { Self { inner: Some(inner), calls: AtomicUsize::new(0) } }

    pub fn failing() -> Self { Self { inner: None, calls: AtomicUsize::new(0) } }

    pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }

    fn inner(&self) -> Result<&Arc<dyn IndexReader>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.as_ref().ok_or_else(|| SearchError::Io("disk unavailable".to_string()))
    }
}

#[async_trait]
impl IndexReader for CountingReader {
    async fn field_names(&self) -> Result<BTreeSet<String>, SearchError> {
        match self.inner() {
            Ok(inner) => inner.field_names().await,
            // let a failing reader get as far as the search itself
            Err(_) => Ok(["body".to_string()].into_iter().collect()),
        }
    }

    async fn search_after(&self, query: &SearchQuery, after: Option<&ScoreDoc>, top_k: usize) -> Result<TopDocs, SearchError> {
        self.inner()?.search_after(query, after, top_k).await
    }

    async fn primary_key(&self, doc: u64) -> Result<Tuple, SearchError> { self.inner()?.primary_key(doc).await }

    async fn terms(&self, field: &str) -> Result<Vec<(String, u64)>, SearchError> { self.inner()?.terms(field).await }
}

#[allow(unused)]
pub fn email(id: i64, subject: &str, body: &str) -> Record { Record::new("Email", tuple![id]).with_field("subject", subject).with_field("body", body) }

#[allow(unused)]
pub fn email_index() -> SearchIndex { SearchIndex::new("email_text", "Email", &["subject", "body"]).with_auto_complete(true) }

/// A maintainer over a counting store, with `records` saved and indexed.
/// The store's call counter is reset afterwards.
#[allow(unused)]
pub async fn setup(index: SearchIndex, config: ExecuteConfig, records: &[Record]) -> Result<(SearchIndexMaintainer, Arc<CountingStore>), anyhow::Error> {
    let kv = Arc::new(CountingStore::default());
    let store = RecordStore::new(kv.clone(), &tuple!["records"], config);
    let maintainer = SearchIndexMaintainer::new(index, store.clone(), Arc::new(DirectoryManager::new()), Arc::new(StandardAnalyzer));
    for record in records {
        store.save_record(record).await?;
        maintainer.update(None, Some(record)).await?;
    }
    kv.reset();
    Ok((maintainer, kv))
}

#[allow(unused)]
pub fn fox_emails() -> Vec<Record> {
    vec![
        email(1, "Quick fox sighting", "the quick brown fox jumps"),
        email(2, "Slow turtle", "a quick turtle"),
        email(3, "Foxes", "quick foxy tales"),
        email(4, "Report", "fox chased by something quick"),
    ]
}

#[allow(unused)]
pub async fn collect(cursor: BoxCursor<IndexEntry>) -> Result<Vec<IndexEntry>, CursorError> {
    let (entries, _, _) = cursor.collect_all().await?;
    Ok(entries)
}

/// `(field, text)` of suggestion keys without a grouping key
#[allow(unused)]
pub fn suggestions(entries: &[IndexEntry]) -> Vec<(String, String)> {
    entries
        .iter()
        .map(|e| {
            let field = e.key.get(0).and_then(|v| v.as_str()).unwrap_or_default().to_string();
            let text = e.key.get(1).and_then(|v| v.as_str()).unwrap_or_default().to_string();
            (field, text)
        })
        .collect()
}

#[allow(unused)]
pub fn primary_keys(entries: &[IndexEntry]) -> Vec<i64> {
    entries.iter().filter_map(|e| e.primary_key.as_ref().and_then(|pk| pk.get(0)).and_then(|v| v.as_int())).collect()
}
