//! Auto-complete suggestions read from a search index.
//!
//! The phrase is looked up once, on the first `next`: the engine returns the
//! best `limit + skip` documents, their records are loaded (pipelined), and
//! each record's indexed fields are searched again for the matched tokens so
//! that only fields which really contain the phrase produce a suggestion.
//! The cursor cannot be resumed; paging is done by re-running with `skip`.

use std::{collections::BTreeSet, sync::Arc};

use async_trait::async_trait;
use futures::FutureExt;
use strata_core::{
    cursor::{CheckValueFn, CursorTail, FlatMapPipelinedCursor, ListCursor, OpenInnerFn},
    task::Executor,
    BoxCursor, Cursor, CursorError, CursorExt, CursorResult, PipelineOperation, Record, ScanProperties,
};
use strata_proto::{encode_position, tuple, Continuation, IndexEntry, Tuple};
use tracing::{debug, trace};

use crate::{
    analyzer::query_tokens,
    engine::{IndexReader, ScoreDoc, SearchError},
    highlight::search_all_maybe_highlight,
    maintainer::SearchContext,
    query::{Occur, SearchQuery},
};

/// Scan bounds of an auto-complete lookup
#[derive(Debug, Clone, PartialEq)]
pub struct AutoCompleteScan {
    /// Text typed so far; a quoted phrase must match as a phrase
    pub phrase: String,
    pub grouping_key: Tuple,
    pub highlight: bool,
}

impl AutoCompleteScan {
    pub fn new(phrase: &str) -> Self { Self { phrase: phrase.to_string(), grouping_key: Tuple::new(), highlight: false } }

    pub fn with_grouping_key(mut self, grouping_key: Tuple) -> Self {
        self.grouping_key = grouping_key;
        self
    }

    pub fn with_highlight(mut self, highlight: bool) -> Self {
        self.highlight = highlight;
        self
    }
}

struct Lookup {
    context: SearchContext,
    scan: AutoCompleteScan,
    limit: usize,
    skip: usize,
    max_text_length: usize,
}

/// A search hit with its record, if the record still exists
struct Hit {
    score_doc: ScoreDoc,
    primary_key: Tuple,
    record: Option<Record>,
}

pub struct AutoCompleteCursor {
    lookup: Arc<Lookup>,
    results: Option<BoxCursor<IndexEntry>>,
    executor: Executor,
    tail: CursorTail,
}

impl AutoCompleteCursor {
    pub fn new(context: SearchContext, scan: AutoCompleteScan, props: &ScanProperties) -> Result<Self, CursorError> {
        if scan.phrase.is_empty() {
            return Err(CursorError::invalid_argument("invalid query for auto-complete search")
                .with_log_info("query", &scan.phrase)
                .with_log_info("index_name", &context.index.name));
        }
        let config = context.store.config();
        let limit = props.limit.unwrap_or(usize::MAX).min(config.auto_complete_search_limit);
        let max_text_length = config.auto_complete_text_size_upper_limit;
        let lookup = Lookup { scan, limit, skip: props.skip, max_text_length, context };
        Ok(Self { lookup: Arc::new(lookup), results: None, executor: Executor::current(), tail: CursorTail::Open })
    }
}

#[async_trait]
impl Cursor<IndexEntry> for AutoCompleteCursor {
    async fn next(&mut self) -> Result<CursorResult<IndexEntry>, CursorError> {
        if let Some(result) = self.tail.guard() {
            return result;
        }
        if self.results.is_none() {
            match self.lookup.perform().await {
                Ok(Some(results)) => self.results = Some(results),
                // an index that was never written has no suggestions
                Ok(None) => return self.tail.observe(Ok(CursorResult::exhausted())),
                Err(err) => return self.tail.observe(Err(err)),
            }
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

impl Lookup {
    /// `None` if the index partition does not exist
    fn found<T>(&self, result: Result<T, SearchError>) -> Result<Option<T>, CursorError> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(SearchError::IndexNotFound { .. }) => Ok(None),
            Err(err) => Err(CursorError::failure(err)
                .with_log_info("query", &self.scan.phrase)
                .with_log_info("index_name", &self.context.index.name)),
        }
    }

    async fn perform(self: &Arc<Self>) -> Result<Option<BoxCursor<IndexEntry>>, CursorError> {
        let phrase = self.scan.phrase.as_str();
        let phrase_mode = phrase.len() >= 2 && phrase.starts_with('"') && phrase.ends_with('"');
        let search_key = if phrase_mode { &phrase[1..phrase.len() - 1] } else { phrase };
        let parsed = query_tokens(self.context.analyzer.as_ref(), search_key);

        let Some(reader) = self.found(self.context.directory.reader(&self.context.index.name, &self.scan.grouping_key))? else {
            return Ok(None);
        };
        let Some(field_names) = self.found(reader.field_names().await)? else {
            return Ok(None);
        };
        let token_set: BTreeSet<String> = parsed.tokens.iter().cloned().collect();
        let query = if phrase_mode {
            phrase_matching_query(&field_names, &parsed.tokens, parsed.prefix.as_deref())
        } else {
            terms_matching_query(&field_names, &token_set, parsed.prefix.as_deref())
        };
        debug!(index_name = %self.context.index.name, query = %phrase, search_query = %query, "query for auto-complete");

        let Some(top) = self.found(reader.search(&query, self.limit.saturating_add(self.skip)).await)? else {
            return Ok(None);
        };
        debug!(index_name = %self.context.index.name, matched = top.score_docs.len(), "auto-complete suggestions matched");
        self.create_results(reader, top.score_docs, token_set, parsed.prefix).map(Some)
    }

    fn create_results(
        self: &Arc<Self>,
        reader: Arc<dyn IndexReader>,
        score_docs: Vec<ScoreDoc>,
        tokens: BTreeSet<String>,
        prefix: Option<String>,
    ) -> Result<BoxCursor<IndexEntry>, CursorError> {
        let loader = self.clone();
        let depth = self.context.store.pipeline_size(PipelineOperation::KeyToRecord);
        let hits = ListCursor::from_vec(score_docs)
            .map_pipelined(
                move |score_doc: ScoreDoc| {
                    let lookup = loader.clone();
                    let reader = reader.clone();
                    async move {
                        let hit = lookup.load_hit(reader.as_ref(), score_doc).await?;
                        let position = encode_position(&hit.score_doc.to_position()).map_err(CursorError::failure)?;
                        Ok((hit, position))
                    }
                    .boxed()
                },
                depth,
            )
            .map_result(|result: CursorResult<(Hit, Continuation)>| match result {
                CursorResult::Next { value: (hit, position), .. } => CursorResult::next(hit, position),
                CursorResult::Exhausted { .. } => CursorResult::exhausted(),
            })
            .boxed();

        let finder = self.clone();
        let tokens = Arc::new(tokens);
        let open_inner: OpenInnerFn<Hit, IndexEntry> = Arc::new(move |hit: Hit, continuation: Continuation| {
            let entries = finder.find_index_entries(&hit, &tokens, prefix.as_deref());
            async move { Ok::<_, CursorError>(ListCursor::new(entries?, &continuation)?.boxed()) }.boxed()
        });
        let check_value: CheckValueFn<Hit> = Arc::new(|hit: &Hit| hit.primary_key.pack());

        // the inner cursors do no I/O and the outer one is pipelined already
        let results = FlatMapPipelinedCursor::new(move |_| Ok(hits), open_inner, Some(check_value), &Continuation::Start, 1)?;
        let limits = ScanProperties::new().with_skip(self.skip).with_limit(self.limit);
        Ok(results.skip_then_limit(&limits, &Continuation::Start).boxed())
    }

    async fn load_hit(&self, reader: &dyn IndexReader, score_doc: ScoreDoc) -> Result<Hit, CursorError> {
        let primary_key = reader.primary_key(score_doc.doc).await.map_err(|err| {
            CursorError::failure(err).with_log_info("index_name", &self.context.index.name).with_log_info("doc", score_doc.doc)
        })?;
        let record = self.context.store.load_record(&primary_key).await?;
        Ok(Hit { score_doc, primary_key, record })
    }

    fn find_index_entries(&self, hit: &Hit, tokens: &BTreeSet<String>, prefix: Option<&str>) -> Result<Vec<IndexEntry>, CursorError> {
        let Some(record) = &hit.record else {
            return Ok(Vec::new());
        };
        let fields = self.context.index.document_fields(record)?.remove(&self.scan.grouping_key).unwrap_or_default();
        let mut entries = Vec::new();
        for field in fields {
            let Some(text) = field.text() else { continue };
            if text.chars().count() > self.max_text_length {
                continue;
            }
            let Some(matched) = search_all_maybe_highlight(self.context.analyzer.as_ref(), text, tokens, prefix, self.scan.highlight) else {
                continue;
            };
            let key = self.scan.grouping_key.clone().add_all(&tuple![field.name, matched]);
            let entry = IndexEntry::new(self.context.index.name.clone(), key, tuple![hit.score_doc.score], Some(hit.primary_key.clone()));
            trace!(index_name = %self.context.index.name, key = %entry.key, value = %entry.value, "suggestion read as an index entry");
            entries.push(entry);
        }
        Ok(entries)
    }
}

/// In any field, the phrase must occur, its last token possibly as a prefix
pub fn phrase_matching_query(fields: &BTreeSet<String>, tokens: &[String], prefix: Option<&str>) -> SearchQuery {
    let clauses = fields
        .iter()
        .map(|field| {
            let query = match prefix {
                Some(prefix) => SearchQuery::phrase_prefix(field, tokens, prefix),
                None => SearchQuery::phrase(field, tokens),
            };
            (Occur::Should, query)
        })
        .collect();
    SearchQuery::boolean(clauses, 1)
}

/// In any field, every token must occur, plus a word starting with the prefix
pub fn terms_matching_query(fields: &BTreeSet<String>, tokens: &BTreeSet<String>, prefix: Option<&str>) -> SearchQuery {
    let clauses = fields
        .iter()
        .map(|field| {
            let mut must: Vec<(Occur, SearchQuery)> = tokens.iter().map(|token| (Occur::Must, SearchQuery::term(field, token))).collect();
            if let Some(prefix) = prefix {
                must.push((Occur::Must, SearchQuery::prefix(field, prefix)));
            }
            (Occur::Should, SearchQuery::boolean(must, 0))
        })
        .collect();
    SearchQuery::boolean(clauses, 1)
}
