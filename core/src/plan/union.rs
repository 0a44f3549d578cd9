use std::sync::Arc;

use strata_proto::Continuation;

use super::{set::execute_merge, stable_hash, PlanHashable, Quantifier, QueryPlan, SetPlan};
use crate::{
    cursor::BoxCursor,
    error::CursorError,
    expression::Bindings,
    merge::{ComparisonKeyFunction, SetOperation},
    record::QueryResult,
    scan::{ExecuteState, ScanProperties},
    store::RecordStore,
};

/// Distinct union of legs ordered by a shared comparison key
#[derive(Debug, Clone)]
pub struct UnionPlan {
    quantifiers: Vec<Quantifier>,
    comparison_key: ComparisonKeyFunction,
    reverse: bool,
    dynamic: bool,
}

impl UnionPlan {
    pub fn new(quantifiers: Vec<Quantifier>, comparison_key: ComparisonKeyFunction, reverse: bool) -> Self {
        Self { quantifiers, comparison_key, reverse, dynamic: false }
    }

    /// A union over one correlated leg that is run per outer value
    pub fn dynamic(leg: Quantifier, comparison_key: ComparisonKeyFunction, reverse: bool) -> Self {
        Self { quantifiers: vec![leg], comparison_key, reverse, dynamic: true }
    }
}

impl PlanHashable for UnionPlan {
    fn plan_hash(&self) -> u64 {
        let legs: Vec<u64> = self.quantifiers.iter().map(|q| q.plan.plan_hash()).collect();
        stable_hash(&("union", legs, self.comparison_key.plan_hash(), self.reverse, self.dynamic))
    }
}

impl QueryPlan for UnionPlan {
    fn execute(
        &self,
        store: &RecordStore,
        bindings: &Bindings,
        continuation: &Continuation,
        props: &ScanProperties,
        state: &ExecuteState,
    ) -> Result<BoxCursor<QueryResult>, CursorError> {
        if self.is_dynamic() {
            return self.quantifiers[0].plan.execute(store, bindings, continuation, props, state);
        }
        execute_merge(SetOperation::Union, &self.quantifiers, &self.comparison_key, self.reverse, self.plan_hash(), store, bindings, continuation, props, state)
    }

    fn children(&self) -> Vec<Arc<dyn QueryPlan>> { self.quantifiers.iter().map(|q| q.plan.clone()).collect() }

    fn is_reverse(&self) -> bool { self.reverse }
}

impl SetPlan for UnionPlan {
    fn operation(&self) -> SetOperation { SetOperation::Union }

    fn quantifiers(&self) -> &[Quantifier] { &self.quantifiers }

    fn comparison_key(&self) -> &ComparisonKeyFunction { &self.comparison_key }

    fn with_children_references(&self, children: Vec<Quantifier>) -> Result<Self, CursorError> {
        if children.len() != self.quantifiers.len() {
            return Err(CursorError::invalid_argument("union must keep its number of legs")
                .with_log_info("expected", self.quantifiers.len())
                .with_log_info("actual", children.len()));
        }
        Ok(Self { quantifiers: children, ..self.clone() })
    }

    fn is_dynamic(&self) -> bool { self.dynamic && self.quantifiers.len() == 1 }
}
