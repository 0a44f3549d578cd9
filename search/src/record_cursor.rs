use std::{collections::VecDeque, sync::Arc};

use async_trait::async_trait;
use strata_core::{
    cursor::{CursorTail, NoNextReason},
    task::Executor,
    Cursor, CursorError, CursorResult,
};
use strata_proto::{decode_position, encode_position, tuple, Continuation, IndexEntry, ScoreDocPosition, Tuple};
use tracing::trace;

use crate::{
    engine::{IndexReader, ScoreDoc, SearchError},
    maintainer::SearchContext,
    query::SearchQuery,
};

/// Scan bounds of a scored search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchScanQuery {
    pub query: SearchQuery,
    pub grouping_key: Tuple,
}

impl SearchScanQuery {
    pub fn new(query: SearchQuery) -> Self { Self { query, grouping_key: Tuple::new() } }

    pub fn with_grouping_key(mut self, grouping_key: Tuple) -> Self {
        self.grouping_key = grouping_key;
        self
    }
}

/// Hits of a query, best first, fetched a page at a time.
///
/// Entries are keyed `(grouping key.., primary key..)` with the score as value.
/// The continuation is the last returned hit; a resumed cursor asks the engine
/// for the hits ranking after it.
pub struct SearchRecordCursor {
    context: SearchContext,
    scan: SearchScanQuery,
    page_size: usize,
    reader: Option<Arc<dyn IndexReader>>,
    page_after: Option<ScoreDoc>,
    buffer: VecDeque<ScoreDoc>,
    last_page: bool,
    executor: Executor,
    tail: CursorTail,
}

impl SearchRecordCursor {
    pub fn new(context: SearchContext, scan: SearchScanQuery, continuation: &Continuation) -> Result<Self, CursorError> {
        let page_size = context.store.config().search_page_size.max(1);
        let mut tail = CursorTail::Open;
        let mut page_after = None;
        match continuation {
            Continuation::End => tail = CursorTail::Done(NoNextReason::SourceExhausted, Continuation::End),
            _ => {
                page_after = decode_position::<ScoreDocPosition>(continuation)
                    .map_err(CursorError::invalid_continuation)?
                    .map(|position| ScoreDoc::from_position(&position));
            }
        }
        Ok(Self {
            context,
            scan,
            page_size,
            reader: None,
            page_after,
            buffer: VecDeque::new(),
            last_page: false,
            executor: Executor::current(),
            tail,
        })
    }

    fn failure(&self, err: SearchError) -> CursorError {
        CursorError::failure(err).with_log_info("index_name", &self.context.index.name).with_log_info("query", &self.scan.query)
    }

    /// Fill the buffer with the next page; `false` when the index does not exist
    async fn fetch_page(&mut self) -> Result<bool, CursorError> {
        let reader = match &self.reader {
            Some(reader) => reader.clone(),
            None => match self.context.directory.reader(&self.context.index.name, &self.scan.grouping_key) {
                Ok(reader) => {
                    self.reader = Some(reader.clone());
                    reader
                }
                Err(SearchError::IndexNotFound { .. }) => return Ok(false),
                Err(err) => return Err(self.failure(err)),
            },
        };
        let top = match reader.search_after(&self.scan.query, self.page_after.as_ref(), self.page_size).await {
            Ok(top) => top,
            Err(SearchError::IndexNotFound { .. }) => return Ok(false),
            Err(err) => return Err(self.failure(err)),
        };
        trace!(index_name = %self.context.index.name, hits = top.score_docs.len(), total_hits = top.total_hits, "SearchRecordCursor.fetch_page");
        self.last_page = top.score_docs.len() < self.page_size;
        if let Some(last) = top.score_docs.last() {
            self.page_after = Some(*last);
        }
        self.buffer.extend(top.score_docs);
        Ok(true)
    }

    async fn advance(&mut self) -> Result<CursorResult<IndexEntry>, CursorError> {
        if self.buffer.is_empty() && !self.last_page && !self.fetch_page().await? {
            return Ok(CursorResult::exhausted());
        }
        let (Some(score_doc), Some(reader)) = (self.buffer.pop_front(), self.reader.clone()) else {
            return Ok(CursorResult::exhausted());
        };
        let primary_key = reader.primary_key(score_doc.doc).await.map_err(|err| self.failure(err))?;
        let key = self.scan.grouping_key.clone().add_all(&primary_key);
        let entry = IndexEntry::new(self.context.index.name.clone(), key, tuple![score_doc.score], Some(primary_key));
        let continuation = encode_position(&score_doc.to_position()).map_err(CursorError::failure)?;
        Ok(CursorResult::next(entry, continuation))
    }
}

#[async_trait]
impl Cursor<IndexEntry> for SearchRecordCursor {
    async fn next(&mut self) -> Result<CursorResult<IndexEntry>, CursorError> {
        if let Some(result) = self.tail.guard() {
            return result;
        }
        let result = self.advance().await;
        self.tail.observe(result)
    }

    fn close(&mut self) {
        self.buffer.clear();
        self.tail.close()
    }

    fn executor(&self) -> &Executor { &self.executor }
}
