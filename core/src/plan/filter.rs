use std::sync::Arc;

use strata_proto::{Continuation, Tuple};

use super::{stable_hash, PlanHashable, QueryPlan};
use crate::{
    cursor::{BoxCursor, CursorExt},
    error::CursorError,
    expression::{Bindings, KeyExpression},
    record::QueryResult,
    scan::{ExecuteState, ScanProperties},
    store::RecordStore,
};

/// Keeps the child's results whose `key` evaluates to `equals`
#[derive(Debug, Clone)]
pub struct FilterPlan {
    pub child: Arc<dyn QueryPlan>,
    pub key: KeyExpression,
    pub equals: Tuple,
}

impl FilterPlan {
    pub fn new(child: impl QueryPlan, key: KeyExpression, equals: Tuple) -> Self { Self { child: Arc::new(child), key, equals } }
}

impl PlanHashable for FilterPlan {
    fn plan_hash(&self) -> u64 { stable_hash(&("filter", self.child.plan_hash(), &self.key, &self.equals)) }
}

impl QueryPlan for FilterPlan {
    fn execute(
        &self,
        store: &RecordStore,
        bindings: &Bindings,
        continuation: &Continuation,
        props: &ScanProperties,
        state: &ExecuteState,
    ) -> Result<BoxCursor<QueryResult>, CursorError> {
        let child = self.child.execute(store, bindings, continuation, &props.clear_skip_and_limit(), state)?;
        let (key, equals) = (self.key.clone(), self.equals.clone());
        // records the key cannot be evaluated on never match
        Ok(child
            .filter(move |result: &QueryResult| key.evaluate_singleton(result.record()).is_ok_and(|k| k == equals))
            .skip_then_limit(props, continuation)
            .boxed())
    }

    fn children(&self) -> Vec<Arc<dyn QueryPlan>> { vec![self.child.clone()] }

    fn is_reverse(&self) -> bool { self.child.is_reverse() }
}
