use std::sync::Arc;

use strata_proto::{Continuation, TupleRange};

use super::{stable_hash, PlanHashable, QueryPlan};
use crate::{
    cursor::{BoxCursor, CursorExt},
    error::CursorError,
    expression::Bindings,
    record::QueryResult,
    scan::{ExecuteState, ScanProperties},
    store::RecordStore,
};

/// Scans records by primary-key range
#[derive(Debug, Clone)]
pub struct ScanPlan {
    pub range: TupleRange,
    pub reverse: bool,
}

impl ScanPlan {
    pub fn new(range: TupleRange, reverse: bool) -> Self { Self { range, reverse } }

    pub fn all() -> Self { Self::new(TupleRange::all(), false) }
}

impl PlanHashable for ScanPlan {
    fn plan_hash(&self) -> u64 { stable_hash(&("scan", &self.range, self.reverse)) }
}

impl QueryPlan for ScanPlan {
    fn execute(
        &self,
        store: &RecordStore,
        _bindings: &Bindings,
        continuation: &Continuation,
        props: &ScanProperties,
        state: &ExecuteState,
    ) -> Result<BoxCursor<QueryResult>, CursorError> {
        let props = props.clone().with_reverse(self.reverse);
        Ok(store.scan_records(&self.range, continuation, &props, state)?.map(QueryResult::new).boxed())
    }

    fn children(&self) -> Vec<Arc<dyn QueryPlan>> { Vec::new() }

    fn is_reverse(&self) -> bool { self.reverse }
}
