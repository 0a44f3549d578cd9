//! Full-text search index scans for strata: scored queries, auto-complete
//! suggestions and spell-check, served from shared per-partition indexes.

pub mod analyzer;
pub mod autocomplete;
pub mod engine;
pub mod highlight;
pub mod index;
pub mod maintainer;
pub mod memory;
pub mod query;
pub mod record_cursor;
pub mod spellcheck;

pub use analyzer::{query_tokens, Analyzer, QueryTokens, StandardAnalyzer, Token};
pub use autocomplete::{AutoCompleteCursor, AutoCompleteScan};
pub use engine::{DirectoryManager, IndexReader, ScoreDoc, SearchError, TopDocs};
pub use index::{DocumentField, SearchIndex, SearchIndexOptions};
pub use maintainer::{IndexScanBounds, IndexScanType, SearchContext, SearchIndexMaintainer};
pub use memory::MemoryIndex;
pub use query::{Occur, SearchQuery};
pub use record_cursor::{SearchRecordCursor, SearchScanQuery};
pub use spellcheck::{SpellCheckCursor, SpellCheckScan};
