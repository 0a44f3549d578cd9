use std::{cmp::Reverse, collections::BTreeSet};

use async_trait::async_trait;
use strata_core::{
    cursor::{CursorTail, ListCursor},
    task::Executor,
    BoxCursor, Cursor, CursorError, CursorExt, CursorResult, ScanProperties,
};
use strata_proto::{tuple, Continuation, IndexEntry, Tuple};
use tracing::debug;

use crate::{engine::SearchError, maintainer::SearchContext};

/// Largest edit distance of a suggestion
pub const MAX_EDITS: usize = 2;

/// Scan bounds of a spell-check lookup
#[derive(Debug, Clone, PartialEq)]
pub struct SpellCheckScan {
    /// Fields to take suggestions from; every indexed field when empty
    pub fields: Vec<String>,
    pub word: String,
    pub grouping_key: Tuple,
}

impl SpellCheckScan {
    pub fn new(word: &str) -> Self { Self { fields: Vec::new(), word: word.to_string(), grouping_key: Tuple::new() } }

    pub fn with_fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_grouping_key(mut self, grouping_key: Tuple) -> Self {
        self.grouping_key = grouping_key;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Suggestion {
    field: String,
    term: String,
    distance: usize,
    frequency: u64,
}

/// Indexed terms close to a word, nearest first, then most frequent.
/// Each entry is keyed `(grouping key.., field, term)` with the similarity
/// (1.0 for identical) as its value.
pub struct SpellCheckCursor {
    context: SearchContext,
    scan: SpellCheckScan,
    limits: ScanProperties,
    results: Option<BoxCursor<IndexEntry>>,
    executor: Executor,
    tail: CursorTail,
}

impl SpellCheckCursor {
    pub fn new(context: SearchContext, scan: SpellCheckScan, props: &ScanProperties) -> Result<Self, CursorError> {
        if scan.word.trim().is_empty() {
            return Err(CursorError::invalid_argument("invalid word for spell-check").with_log_info("index_name", &context.index.name));
        }
        let limits = ScanProperties::new().with_skip(props.skip).with_limit(props.limit.unwrap_or(0));
        Ok(Self { context, scan, limits, results: None, executor: Executor::current(), tail: CursorTail::Open })
    }

    async fn suggestions(&mut self) -> Result<Vec<Suggestion>, SearchError> {
        let reader = self.context.directory.reader(&self.context.index.name, &self.scan.grouping_key)?;
        let fields: BTreeSet<String> =
            if self.scan.fields.is_empty() { reader.field_names().await? } else { self.scan.fields.iter().cloned().collect() };
        let word = self.scan.word.to_lowercase();
        let mut suggestions = Vec::new();
        for field in fields {
            for (term, frequency) in reader.terms(&field).await? {
                if term == word {
                    continue;
                }
                let distance = strsim::osa_distance(&word, &term);
                if distance <= MAX_EDITS {
                    suggestions.push(Suggestion { field: field.clone(), term, distance, frequency });
                }
            }
        }
        suggestions.sort_by(|a, b| {
            (a.distance, Reverse(a.frequency), &a.term, &a.field).cmp(&(b.distance, Reverse(b.frequency), &b.term, &b.field))
        });
        debug!(index_name = %self.context.index.name, word = %word, suggestions = suggestions.len(), "spell-check");
        Ok(suggestions)
    }

    fn entry(&self, suggestion: Suggestion) -> IndexEntry {
        let longest = self.scan.word.chars().count().max(suggestion.term.chars().count()).max(1);
        let similarity = 1.0 - suggestion.distance as f32 / longest as f32;
        let key = self.scan.grouping_key.clone().add_all(&tuple![suggestion.field, suggestion.term]);
        IndexEntry::new(self.context.index.name.clone(), key, tuple![similarity], None)
    }
}

#[async_trait]
impl Cursor<IndexEntry> for SpellCheckCursor {
    async fn next(&mut self) -> Result<CursorResult<IndexEntry>, CursorError> {
        if let Some(result) = self.tail.guard() {
            return result;
        }
        if self.results.is_none() {
            let suggestions = match self.suggestions().await {
                Ok(suggestions) => suggestions,
                Err(SearchError::IndexNotFound { .. }) => return self.tail.observe(Ok(CursorResult::exhausted())),
                Err(err) => {
                    let err = CursorError::failure(err).with_log_info("index_name", &self.context.index.name).with_log_info("word", &self.scan.word);
                    return self.tail.observe(Err(err));
                }
            };
            let entries: Vec<IndexEntry> = suggestions.into_iter().map(|s| self.entry(s)).collect();
            let list = ListCursor::from_vec(entries);
            self.results = Some(list.skip_then_limit(&self.limits, &Continuation::Start).boxed());
        }
        let result = match self.results.as_mut() {
            Some(results) => results.next().await,
            None => Ok(CursorResult::exhausted()),
        };
        self.tail.observe(result)
    }

    fn close(&mut self) {
        if let Some(results) = self.results.as_mut() {
            results.close();
        }
        self.tail.close()
    }

    fn executor(&self) -> &Executor { &self.executor }
}
