use std::{hash::Hash, sync::Arc};

use strata_proto::Tuple;

use crate::{
    error::{CursorError, EvaluationError},
    expression::{Bindings, CorrelationIdentifier, KeyExpression, Value},
    plan::{stable_hash, PlanHashable},
    record::QueryResult,
};

/// Extracts the comparison key of one merged value
pub type KeyFn<T> = Arc<dyn Fn(&T) -> Result<Tuple, CursorError> + Send + Sync>;

/// How a set operation derives the comparison key of a result.
///
/// Equality and hashing only consider the key expression or value, never
/// the alias a value is evaluated under.
#[derive(Debug, Clone)]
pub enum ComparisonKeyFunction {
    OnKeyExpression(KeyExpression),
    /// Evaluate `value` with the result bound to `base_alias`
    OnValue { base_alias: CorrelationIdentifier, value: Value },
}

impl ComparisonKeyFunction {
    pub fn on_key_expression(expression: KeyExpression) -> Self { ComparisonKeyFunction::OnKeyExpression(expression) }

    pub fn on_value(base_alias: CorrelationIdentifier, value: Value) -> Self { ComparisonKeyFunction::OnValue { base_alias, value } }

    pub fn evaluate(&self, bindings: &Bindings, result: &QueryResult) -> Result<Tuple, EvaluationError> {
        match self {
            ComparisonKeyFunction::OnKeyExpression(expression) => expression.evaluate_singleton(result.record()),
            ComparisonKeyFunction::OnValue { base_alias, value } => value.eval(&bindings.with_binding(base_alias.clone(), result.clone())),
        }
    }

    /// Bind this function to an evaluation context for use by a merge cursor
    pub fn key_fn(&self, bindings: &Bindings) -> KeyFn<QueryResult> {
        let function = self.clone();
        let bindings = bindings.clone();
        Arc::new(move |result: &QueryResult| function.evaluate(&bindings, result).map_err(|e| CursorError::from(e).with_log_info("comparison_key", &function)))
    }
}

impl PartialEq for ComparisonKeyFunction {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ComparisonKeyFunction::OnKeyExpression(left), ComparisonKeyFunction::OnKeyExpression(right)) => left == right,
            (ComparisonKeyFunction::OnValue { value: left, .. }, ComparisonKeyFunction::OnValue { value: right, .. }) => left == right,
            _ => false,
        }
    }
}

impl Eq for ComparisonKeyFunction {}

impl Hash for ComparisonKeyFunction {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            ComparisonKeyFunction::OnKeyExpression(expression) => expression.hash(state),
            ComparisonKeyFunction::OnValue { value, .. } => value.hash(state),
        }
    }
}

impl PlanHashable for ComparisonKeyFunction {
    fn plan_hash(&self) -> u64 {
        match self {
            ComparisonKeyFunction::OnKeyExpression(expression) => stable_hash(&("on_key_expression", expression)),
            ComparisonKeyFunction::OnValue { value, .. } => stable_hash(&("on_value", value.plan_hash())),
        }
    }
}

impl std::fmt::Display for ComparisonKeyFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComparisonKeyFunction::OnKeyExpression(expression) => write!(f, "{}", expression),
            ComparisonKeyFunction::OnValue { value, .. } => write!(f, "{}", value),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::Hasher;

    use strata_proto::tuple;

    use super::*;
    use crate::{expression::Type, record::Record};

    fn hash_of(function: &ComparisonKeyFunction) -> u64 {
        let mut hasher = DefaultHasher::new();
        function.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_on_value_ignores_base_alias() {
        let value = Value::quantified(CorrelationIdentifier::of("base")).field("rank", Type::Int);
        let left = ComparisonKeyFunction::on_value(CorrelationIdentifier::of("base"), value.clone());
        let right = ComparisonKeyFunction::on_value(CorrelationIdentifier::of("other"), value);
        assert_eq!(left, right);
        assert_eq!(hash_of(&left), hash_of(&right));
        assert_ne!(left, ComparisonKeyFunction::on_key_expression(KeyExpression::field("rank")));
    }

    #[test]
    fn test_both_variants_agree() {
        let base = CorrelationIdentifier::unique();
        let result = QueryResult::new(Record::new("Doc", tuple![4]).with_field("rank", 12i64));
        let on_value = ComparisonKeyFunction::on_value(base.clone(), Value::quantified(base).field("rank", Type::Int));
        let on_key = ComparisonKeyFunction::on_key_expression(KeyExpression::field("rank"));
        let bindings = Bindings::new();
        assert_eq!(on_value.evaluate(&bindings, &result).unwrap(), tuple![12i64]);
        assert_eq!(on_key.key_fn(&bindings)(&result).unwrap(), tuple![12i64]);
        assert_ne!(on_value.plan_hash(), on_key.plan_hash());
    }
}
