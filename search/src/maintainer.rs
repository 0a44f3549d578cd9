use std::{collections::BTreeMap, sync::Arc};

use strata_core::{BoxCursor, CursorError, CursorExt, Record, RecordStore, ScanProperties};
use strata_proto::{Continuation, IndexEntry, Tuple, TupleRange};
use tracing::trace;

use crate::{
    analyzer::Analyzer,
    autocomplete::{AutoCompleteCursor, AutoCompleteScan},
    engine::DirectoryManager,
    index::{DocumentField, SearchIndex},
    record_cursor::{SearchRecordCursor, SearchScanQuery},
    spellcheck::{SpellCheckCursor, SpellCheckScan},
};

/// Everything a search cursor reads from
#[derive(Clone)]
pub struct SearchContext {
    pub index: Arc<SearchIndex>,
    pub store: RecordStore,
    pub directory: Arc<DirectoryManager>,
    pub analyzer: Arc<dyn Analyzer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexScanType {
    ByValue,
    BySearch,
    ByAutoComplete,
    BySpellCheck,
}

impl std::fmt::Display for IndexScanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexScanType::ByValue => write!(f, "by_value"),
            IndexScanType::BySearch => write!(f, "by_search"),
            IndexScanType::ByAutoComplete => write!(f, "by_auto_complete"),
            IndexScanType::BySpellCheck => write!(f, "by_spell_check"),
        }
    }
}

/// What to scan, with the payload each kind of scan needs
#[derive(Debug, Clone, PartialEq)]
pub enum IndexScanBounds {
    Plain(TupleRange),
    Query(SearchScanQuery),
    AutoComplete(AutoCompleteScan),
    SpellCheck(SpellCheckScan),
}

impl IndexScanBounds {
    pub fn scan_type(&self) -> IndexScanType {
        match self {
            IndexScanBounds::Plain(_) => IndexScanType::ByValue,
            IndexScanBounds::Query(_) => IndexScanType::BySearch,
            IndexScanBounds::AutoComplete(_) => IndexScanType::ByAutoComplete,
            IndexScanBounds::SpellCheck(_) => IndexScanType::BySpellCheck,
        }
    }
}

/// Keeps a search index in step with its records and serves its scans.
pub struct SearchIndexMaintainer {
    context: SearchContext,
}

impl SearchIndexMaintainer {
    pub fn new(index: SearchIndex, store: RecordStore, directory: Arc<DirectoryManager>, analyzer: Arc<dyn Analyzer>) -> Self {
        Self { context: SearchContext { index: Arc::new(index), store, directory, analyzer } }
    }

    pub fn context(&self) -> &SearchContext { &self.context }

    pub fn index(&self) -> &SearchIndex { &self.context.index }

    pub fn scan(&self, bounds: &IndexScanBounds, continuation: &Continuation, props: &ScanProperties) -> Result<BoxCursor<IndexEntry>, CursorError> {
        let index_name = &self.context.index.name;
        trace!(index_name = %index_name, scan_type = %bounds.scan_type(), "scan");
        match bounds {
            IndexScanBounds::Plain(_) => Err(CursorError::invalid_argument("unsupported scan type for search index")
                .with_log_info("index_name", index_name)
                .with_log_info("scan_type", bounds.scan_type())),
            IndexScanBounds::Query(scan) => {
                let cursor = SearchRecordCursor::new(self.context.clone(), scan.clone(), continuation)?;
                Ok(cursor.skip_then_limit(props, continuation).boxed())
            }
            IndexScanBounds::AutoComplete(scan) => {
                if !self.context.index.options.auto_complete_enabled {
                    return Err(CursorError::invalid_argument("auto-complete unsupported due to not enabled on index")
                        .with_log_info("index_name", index_name));
                }
                if !continuation.is_start() {
                    return Err(CursorError::invalid_argument("auto-complete does not support scanning with continuation")
                        .with_log_info("index_name", index_name));
                }
                Ok(AutoCompleteCursor::new(self.context.clone(), scan.clone(), props)?.boxed())
            }
            IndexScanBounds::SpellCheck(scan) => {
                if !continuation.is_start() {
                    return Err(CursorError::invalid_argument("spell-check does not support scanning with continuation")
                        .with_log_info("index_name", index_name));
                }
                Ok(SpellCheckCursor::new(self.context.clone(), scan.clone(), props)?.boxed())
            }
        }
    }

    /// Replace the documents of `old` with those of `new`. Partitions whose
    /// fields did not change are left alone.
    pub async fn update(&self, old: Option<&Record>, new: Option<&Record>) -> Result<(), CursorError> {
        let index = &self.context.index;
        let mut old_fields = self.fields_of(old)?;
        let mut new_fields = self.fields_of(new)?;
        let unchanged: Vec<Tuple> = old_fields.iter().filter(|(key, fields)| new_fields.get(*key) == Some(*fields)).map(|(key, _)| key.clone()).collect();
        for key in &unchanged {
            old_fields.remove(key);
            new_fields.remove(key);
        }
        trace!(index_name = %index.name, deleted = old_fields.len(), written = new_fields.len(), "update");

        if let Some(old) = old {
            for grouping_key in old_fields.keys() {
                self.context.directory.writer(&index.name, grouping_key, self.context.analyzer.clone()).delete_document(&old.primary_key).await;
            }
        }
        if let Some(new) = new {
            for (grouping_key, fields) in new_fields {
                let texts: Vec<(String, String)> = fields.iter().filter_map(|f| f.text().map(|text| (f.name.clone(), text.to_string()))).collect();
                self.context.directory.writer(&index.name, &grouping_key, self.context.analyzer.clone()).add_document(&new.primary_key, &texts).await;
            }
        }
        Ok(())
    }

    fn fields_of(&self, record: Option<&Record>) -> Result<BTreeMap<Tuple, Vec<DocumentField>>, CursorError> {
        match record {
            Some(record) => Ok(self.context.index.document_fields(record)?),
            None => Ok(BTreeMap::new()),
        }
    }
}
