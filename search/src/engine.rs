use std::{collections::BTreeSet, sync::Arc};

use async_trait::async_trait;
use dashmap::DashMap;
use strata_proto::{ScoreDocPosition, Tuple};
use thiserror::Error;
use tracing::debug;

use crate::{analyzer::Analyzer, memory::MemoryIndex, query::SearchQuery};

#[derive(Debug, Error)]
pub enum SearchError {
    /// Nothing was ever written for this index and grouping key
    #[error("index not found: {index} {grouping_key}")]
    IndexNotFound { index: String, grouping_key: Tuple },
    #[error("search engine I/O failure: {0}")]
    Io(String),
}

/// A scored hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreDoc {
    pub score: f32,
    pub doc: u64,
    pub shard: u32,
}

impl ScoreDoc {
    pub fn new(score: f32, doc: u64) -> Self { Self { score, doc, shard: 0 } }

    /// Whether `self` ranks after `other`: lower score first, then higher doc id
    pub fn ranks_after(&self, other: &ScoreDoc) -> bool {
        self.score < other.score || (self.score == other.score && (self.shard, self.doc) > (other.shard, other.doc))
    }

    pub fn to_position(&self) -> ScoreDocPosition { ScoreDocPosition { score: self.score, doc: self.doc, shard: self.shard } }

    pub fn from_position(position: &ScoreDocPosition) -> Self { Self { score: position.score, doc: position.doc, shard: position.shard } }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopDocs {
    pub total_hits: usize,
    pub score_docs: Vec<ScoreDoc>,
}

/// Read access to one search index partition.
#[async_trait]
pub trait IndexReader: Send + Sync {
    /// Names of the fields that carry indexed terms
    async fn field_names(&self) -> Result<BTreeSet<String>, SearchError>;

    /// The best `top_k` hits ranking after `after`, best first
    async fn search_after(&self, query: &SearchQuery, after: Option<&ScoreDoc>, top_k: usize) -> Result<TopDocs, SearchError>;

    async fn search(&self, query: &SearchQuery, top_k: usize) -> Result<TopDocs, SearchError> { self.search_after(query, None, top_k).await }

    /// The primary key stored with a document
    async fn primary_key(&self, doc: u64) -> Result<Tuple, SearchError>;

    /// Every term of `field` with the number of documents containing it
    async fn terms(&self, field: &str) -> Result<Vec<(String, u64)>, SearchError>;
}

/// Registry of the shared index partitions, keyed by index name and grouping key.
#[derive(Default)]
pub struct DirectoryManager {
    readers: DashMap<(String, Tuple), Arc<dyn IndexReader>>,
    writers: DashMap<(String, Tuple), Arc<MemoryIndex>>,
}

impl DirectoryManager {
    pub fn new() -> Self { Self::default() }

    pub fn reader(&self, index: &str, grouping_key: &Tuple) -> Result<Arc<dyn IndexReader>, SearchError> {
        match self.readers.get(&(index.to_string(), grouping_key.clone())) {
            Some(reader) => Ok(reader.value().clone()),
            None => Err(SearchError::IndexNotFound { index: index.to_string(), grouping_key: grouping_key.clone() }),
        }
    }

    /// The writable in-memory partition, created on first use
    pub fn writer(&self, index: &str, grouping_key: &Tuple, analyzer: Arc<dyn Analyzer>) -> Arc<MemoryIndex> {
        let key = (index.to_string(), grouping_key.clone());
        let writer = self
            .writers
            .entry(key.clone())
            .or_insert_with(|| {
                debug!(index, grouping_key = %grouping_key, "DirectoryManager.writer created");
                Arc::new(MemoryIndex::new(index, grouping_key.clone(), analyzer))
            })
            .value()
            .clone();
        self.readers.entry(key).or_insert_with(|| writer.clone());
        writer
    }

    /// Serve reads for a partition from another engine
    pub fn register_reader(&self, index: &str, grouping_key: &Tuple, reader: Arc<dyn IndexReader>) {
        self.readers.insert((index.to_string(), grouping_key.clone()), reader);
    }

    pub fn grouping_keys(&self, index: &str) -> Vec<Tuple> {
        let mut keys: Vec<Tuple> = self.readers.iter().filter(|e| e.key().0 == index).map(|e| e.key().1.clone()).collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use strata_proto::tuple;

    use super::*;
    use crate::analyzer::StandardAnalyzer;

    #[test]
    fn test_reader_lookup() {
        let manager = DirectoryManager::new();
        assert!(matches!(manager.reader("text", &tuple![]), Err(SearchError::IndexNotFound { .. })));
        let first = manager.writer("text", &tuple!["a"], Arc::new(StandardAnalyzer));
        let again = manager.writer("text", &tuple!["a"], Arc::new(StandardAnalyzer));
        assert!(Arc::ptr_eq(&first, &again));
        assert!(manager.reader("text", &tuple!["a"]).is_ok());
        assert_eq!(manager.grouping_keys("text"), vec![tuple!["a"]]);
    }

    #[test]
    fn test_ranking() {
        let best = ScoreDoc::new(2.0, 7);
        assert!(ScoreDoc::new(1.0, 1).ranks_after(&best));
        assert!(ScoreDoc::new(2.0, 8).ranks_after(&best));
        assert!(!ScoreDoc::new(2.0, 6).ranks_after(&best));
    }
}
