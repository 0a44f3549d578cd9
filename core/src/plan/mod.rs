//! Executable plan nodes: leaf scans, filters and the set operators.

mod filter;
mod hash;
mod intersection;
mod scan;
mod set;
mod union;

pub use filter::FilterPlan;
pub use hash::{stable_hash, PlanHashable};
pub use intersection::IntersectionPlan;
pub use scan::ScanPlan;
pub use set::{push_value_function, FieldTranslation, SetPlan, TranslateValueFunction};
pub use union::UnionPlan;

use std::sync::Arc;

use strata_proto::Continuation;

use crate::{
    cursor::BoxCursor,
    error::CursorError,
    expression::{Bindings, CorrelationIdentifier},
    record::QueryResult,
    scan::{ExecuteState, ScanProperties},
    store::RecordStore,
};

/// A node of a chosen query plan that can be turned into a cursor
pub trait QueryPlan: PlanHashable + std::fmt::Debug + Send + Sync + 'static {
    /// Open a cursor over this plan's results. `props` skip and limit apply
    /// to the returned cursor as a whole.
    fn execute(
        &self,
        store: &RecordStore,
        bindings: &Bindings,
        continuation: &Continuation,
        props: &ScanProperties,
        state: &ExecuteState,
    ) -> Result<BoxCursor<QueryResult>, CursorError>;

    fn children(&self) -> Vec<Arc<dyn QueryPlan>>;

    fn is_reverse(&self) -> bool;
}

/// A child plan together with the alias its results are bound to
#[derive(Debug, Clone)]
pub struct Quantifier {
    pub alias: CorrelationIdentifier,
    pub plan: Arc<dyn QueryPlan>,
}

impl Quantifier {
    pub fn new(alias: CorrelationIdentifier, plan: Arc<dyn QueryPlan>) -> Self { Self { alias, plan } }

    /// Quantify `plan` under a fresh alias
    pub fn over(plan: impl QueryPlan) -> Self { Self { alias: CorrelationIdentifier::unique(), plan: Arc::new(plan) } }
}
