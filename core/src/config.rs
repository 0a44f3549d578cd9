use std::collections::BTreeMap;

use serde::Deserialize;

/// Asynchronous per-element operations whose in-flight window is configurable
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineOperation {
    /// Loading a record by primary key for a raw key
    KeyToRecord,
    /// Loading a record by primary key for an index entry
    IndexToRecord,
    /// Resolving an intermediate result into its final form
    Resolve,
    Insert,
}

impl std::fmt::Display for PipelineOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineOperation::KeyToRecord => write!(f, "key_to_record"),
            PipelineOperation::IndexToRecord => write!(f, "index_to_record"),
            PipelineOperation::Resolve => write!(f, "resolve"),
            PipelineOperation::Insert => write!(f, "insert"),
        }
    }
}

pub const DEFAULT_PIPELINE_SIZE: usize = 10;

/// Execution tuning shared by every cursor built for one store.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExecuteConfig {
    pub pipeline_sizes: BTreeMap<PipelineOperation, usize>,
    pub default_pipeline_size: usize,
    pub scan_batch_size: usize,
    pub auto_complete_search_limit: usize,
    pub auto_complete_text_size_upper_limit: usize,
    pub search_page_size: usize,
}

impl Default for ExecuteConfig {
    fn default() -> Self {
        Self {
            pipeline_sizes: BTreeMap::new(),
            default_pipeline_size: DEFAULT_PIPELINE_SIZE,
            scan_batch_size: 100,
            auto_complete_search_limit: 10_000,
            auto_complete_text_size_upper_limit: 32_768,
            search_page_size: 200,
        }
    }
}

impl ExecuteConfig {
    pub fn new() -> Self { Self::default() }

    /// In-flight window for `operation`; never less than 1
    pub fn pipeline_size(&self, operation: PipelineOperation) -> usize {
        self.pipeline_sizes.get(&operation).copied().unwrap_or(self.default_pipeline_size).max(1)
    }

    pub fn with_pipeline_size(mut self, operation: PipelineOperation, size: usize) -> Self {
        self.pipeline_sizes.insert(operation, size);
        self
    }

    pub fn with_default_pipeline_size(mut self, size: usize) -> Self {
        self.default_pipeline_size = size;
        self
    }

    pub fn with_scan_batch_size(mut self, size: usize) -> Self {
        self.scan_batch_size = size.max(1);
        self
    }

    pub fn with_auto_complete_search_limit(mut self, limit: usize) -> Self {
        self.auto_complete_search_limit = limit;
        self
    }

    pub fn with_auto_complete_text_size_upper_limit(mut self, limit: usize) -> Self {
        self.auto_complete_text_size_upper_limit = limit;
        self
    }

    pub fn with_search_page_size(mut self, size: usize) -> Self {
        self.search_page_size = size.max(1);
        self
    }
}
