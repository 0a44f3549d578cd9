use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use strata_proto::Tuple;
use tokio::sync::RwLock;
use tracing::{debug, trace};

use crate::{
    analyzer::Analyzer,
    engine::{IndexReader, ScoreDoc, SearchError, TopDocs},
    query::{Occur, SearchQuery},
};

/// An in-process inverted index for one partition of a search index.
///
/// Values of a multi-valued field are indexed back to back, so positional
/// queries may match across value boundaries.
pub struct MemoryIndex {
    name: String,
    grouping_key: Tuple,
    analyzer: Arc<dyn Analyzer>,
    data: RwLock<IndexData>,
}

#[derive(Default)]
struct IndexData {
    /// Indexed by doc id. A deleted document leaves a `None` slot that is never
    /// reclaimed: `search_after` continuations carry doc ids, so ids must not
    /// shift or be reused for the life of the partition.
    docs: Vec<Option<StoredDocument>>,
    by_primary_key: HashMap<Vec<u8>, u64>,
    postings: BTreeMap<String, BTreeMap<String, BTreeSet<u64>>>,
}

struct StoredDocument {
    primary_key: Tuple,
    fields: BTreeMap<String, Vec<String>>,
}

impl MemoryIndex {
    pub fn new(name: &str, grouping_key: Tuple, analyzer: Arc<dyn Analyzer>) -> Self {
        Self { name: name.to_string(), grouping_key, analyzer, data: RwLock::new(IndexData::default()) }
    }

    pub fn analyzer(&self) -> &Arc<dyn Analyzer> { &self.analyzer }

    /// Index `fields` for `primary_key`, replacing any document it already had
    pub async fn add_document(&self, primary_key: &Tuple, fields: &[(String, String)]) -> u64 {
        let mut document = StoredDocument { primary_key: primary_key.clone(), fields: BTreeMap::new() };
        for (name, text) in fields {
            let tokens = self.analyzer.tokens(text).into_iter().map(|t| t.text);
            document.fields.entry(name.clone()).or_default().extend(tokens);
        }

        let mut data = self.data.write().await;
        data.remove(primary_key);
        let doc = data.docs.len() as u64;
        for (name, tokens) in &document.fields {
            let terms = data.postings.entry(name.clone()).or_default();
            for token in tokens {
                terms.entry(token.clone()).or_default().insert(doc);
            }
        }
        data.by_primary_key.insert(primary_key.pack(), doc);
        data.docs.push(Some(document));
        trace!(index = %self.name, grouping_key = %self.grouping_key, doc, primary_key = %primary_key, "MemoryIndex.add_document");
        doc
    }

    pub async fn delete_document(&self, primary_key: &Tuple) -> bool {
        let removed = self.data.write().await.remove(primary_key);
        debug!(index = %self.name, primary_key = %primary_key, removed, "MemoryIndex.delete_document");
        removed
    }

    pub async fn num_docs(&self) -> usize { self.data.read().await.docs.iter().filter(|d| d.is_some()).count() }

    fn not_found(&self) -> SearchError { SearchError::IndexNotFound { index: self.name.clone(), grouping_key: self.grouping_key.clone() } }
}

impl IndexData {
    fn remove(&mut self, primary_key: &Tuple) -> bool {
        let Some(doc) = self.by_primary_key.remove(&primary_key.pack()) else {
            return false;
        };
        let Some(document) = self.docs.get_mut(doc as usize).and_then(Option::take) else {
            return false;
        };
        for (name, tokens) in &document.fields {
            if let Some(terms) = self.postings.get_mut(name) {
                for token in tokens {
                    if let Some(docs) = terms.get_mut(token) {
                        docs.remove(&doc);
                        if docs.is_empty() {
                            terms.remove(token);
                        }
                    }
                }
                if terms.is_empty() {
                    self.postings.remove(name);
                }
            }
        }
        true
    }

    fn live_docs(&self) -> usize { self.docs.iter().filter(|d| d.is_some()).count() }

    fn idf(&self, field: &str, term: &str) -> f32 {
        let df = self.postings.get(field).and_then(|terms| terms.get(term)).map_or(0, |docs| docs.len());
        1.0 + ((self.live_docs() as f32 + 1.0) / (df as f32 + 1.0)).ln()
    }

    fn score(&self, document: &StoredDocument, query: &SearchQuery) -> Option<f32> {
        match query {
            SearchQuery::Term { field, term } => {
                let count = tokens(document, field).iter().filter(|t| *t == term).count();
                (count > 0).then(|| (count as f32).sqrt() * self.idf(field, term))
            }
            SearchQuery::Prefix { field, prefix } => tokens(document, field).iter().any(|t| t.starts_with(prefix.as_str())).then_some(1.0),
            SearchQuery::Phrase { field, terms } => {
                if terms.is_empty() {
                    return None;
                }
                let count = tokens(document, field).windows(terms.len()).filter(|window| *window == terms.as_slice()).count();
                (count > 0).then(|| (count as f32).sqrt() * terms.iter().map(|t| self.idf(field, t)).sum::<f32>())
            }
            SearchQuery::SpanTerm { .. } | SearchQuery::SpanPrefix { .. } | SearchQuery::SpanNear { .. } | SearchQuery::FieldMask { .. } => {
                let spans = spans(document, query);
                (!spans.is_empty()).then(|| (spans.len() as f32).sqrt())
            }
            SearchQuery::Boolean { clauses, minimum_should_match } => {
                if clauses.is_empty() {
                    return None;
                }
                let mut total = 0.0;
                let mut should_matched = 0;
                for (occur, clause) in clauses {
                    match (occur, self.score(document, clause)) {
                        (Occur::Must, None) => return None,
                        (Occur::Must, Some(score)) => total += score,
                        (Occur::Should, Some(score)) => {
                            should_matched += 1;
                            total += score;
                        }
                        (Occur::Should, None) => {}
                    }
                }
                (should_matched >= *minimum_should_match).then_some(total)
            }
        }
    }
}

fn tokens<'a>(document: &'a StoredDocument, field: &str) -> &'a [String] { document.fields.get(field).map(Vec::as_slice).unwrap_or(&[]) }

/// Matching position ranges `start..end` of a span query, ordered by start
fn spans(document: &StoredDocument, query: &SearchQuery) -> Vec<(usize, usize)> {
    match query {
        SearchQuery::SpanTerm { field, term } => {
            tokens(document, field).iter().enumerate().filter(|(_, t)| *t == term).map(|(i, _)| (i, i + 1)).collect()
        }
        SearchQuery::SpanPrefix { field, prefix } => {
            tokens(document, field).iter().enumerate().filter(|(_, t)| t.starts_with(prefix.as_str())).map(|(i, _)| (i, i + 1)).collect()
        }
        SearchQuery::FieldMask { query, .. } => spans(document, query),
        SearchQuery::SpanNear { clauses, slop, .. } => {
            let Some((first, rest)) = clauses.split_first() else {
                return Vec::new();
            };
            let rest: Vec<Vec<(usize, usize)>> = rest.iter().map(|clause| spans(document, clause)).collect();
            let mut matched = Vec::new();
            'outer: for (start, end) in spans(document, first) {
                let mut end = end;
                let mut gap = 0;
                for clause_spans in &rest {
                    // the earliest following span leaves the most room for the rest
                    let Some(&(next_start, next_end)) = clause_spans.iter().find(|(s, _)| *s >= end) else {
                        continue 'outer;
                    };
                    gap += next_start - end;
                    if gap > *slop as usize {
                        continue 'outer;
                    }
                    end = next_end;
                }
                matched.push((start, end));
            }
            matched
        }
        _ => Vec::new(),
    }
}

#[async_trait]
impl IndexReader for MemoryIndex {
    async fn field_names(&self) -> Result<BTreeSet<String>, SearchError> {
        let data = self.data.read().await;
        if data.docs.is_empty() {
            return Err(self.not_found());
        }
        Ok(data.postings.keys().cloned().collect())
    }

    async fn search_after(&self, query: &SearchQuery, after: Option<&ScoreDoc>, top_k: usize) -> Result<TopDocs, SearchError> {
        let data = self.data.read().await;
        if data.docs.is_empty() {
            return Err(self.not_found());
        }
        let mut total_hits = 0;
        let mut hits = Vec::new();
        for (doc, document) in data.docs.iter().enumerate() {
            let Some(document) = document else { continue };
            let Some(score) = data.score(document, query) else { continue };
            total_hits += 1;
            let hit = ScoreDoc::new(score, doc as u64);
            if after.map_or(true, |after| hit.ranks_after(after)) {
                hits.push(hit);
            }
        }
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.doc.cmp(&b.doc)));
        hits.truncate(top_k);
        trace!(index = %self.name, query = %query, total_hits, returned = hits.len(), "MemoryIndex.search_after");
        Ok(TopDocs { total_hits, score_docs: hits })
    }

    async fn primary_key(&self, doc: u64) -> Result<Tuple, SearchError> {
        let data = self.data.read().await;
        match data.docs.get(doc as usize) {
            Some(Some(document)) => Ok(document.primary_key.clone()),
            _ => Err(SearchError::Io(format!("no stored document {} in {}", doc, self.name))),
        }
    }

    async fn terms(&self, field: &str) -> Result<Vec<(String, u64)>, SearchError> {
        let data = self.data.read().await;
        if data.docs.is_empty() {
            return Err(self.not_found());
        }
        Ok(data.postings.get(field).map(|terms| terms.iter().map(|(term, docs)| (term.clone(), docs.len() as u64)).collect()).unwrap_or_default())
    }
}
