pub mod config;
pub mod cursor;
pub mod error;
pub mod expression;
pub mod merge;
pub mod plan;
pub mod record;
pub mod scan;
pub mod store;
pub mod task;

pub use config::{ExecuteConfig, PipelineOperation};
pub use cursor::{BoxCursor, Cursor, CursorExt, CursorResult, NoNextReason};
pub use error::CursorError;
pub use record::{FieldValue, QueryResult, Record};
pub use scan::{ExecuteState, ScanProperties};
pub use store::{KeyValueStore, MemoryStore, RecordStore};

pub use strata_proto as proto;
pub use strata_proto::{Continuation, Tuple};
