use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use strata_proto::Continuation;

use super::{QueryPlan, Quantifier};
use crate::{
    cursor::{BoxCursor, CursorExt},
    error::CursorError,
    expression::{AliasMap, Bindings, CorrelationIdentifier, KeyExpression, Type, Value},
    merge::{ComparisonKeyFunction, MergeCursor, SetOperation},
    record::QueryResult,
    scan::{ExecuteState, ScanProperties},
    store::RecordStore,
};

/// Translates a value expressed over a merged stream into an equivalent
/// value over one leg, rooted at `new_base_alias`. `None` if the leg cannot
/// produce it.
pub trait TranslateValueFunction: Send + Sync {
    fn translate_value(&self, value: &Value, new_base_alias: &CorrelationIdentifier) -> Option<Value>;
}

impl<F> TranslateValueFunction for F
where F: Fn(&Value, &CorrelationIdentifier) -> Option<Value> + Send + Sync
{
    fn translate_value(&self, value: &Value, new_base_alias: &CorrelationIdentifier) -> Option<Value> { self(value, new_base_alias) }
}

/// Translation for a leg that exposes a known set of field paths of the
/// stream bound to `source_alias`, possibly under different names.
#[derive(Debug, Clone)]
pub struct FieldTranslation {
    source_alias: CorrelationIdentifier,
    fields: BTreeMap<Vec<String>, Vec<String>>,
}

fn path_of(names: &[&str]) -> Vec<String> { names.iter().map(|n| n.to_string()).collect() }

impl FieldTranslation {
    pub fn new(source_alias: CorrelationIdentifier) -> Self { Self { source_alias, fields: BTreeMap::new() } }

    /// The leg has this field under the same path
    pub fn with_field(mut self, path: &[&str]) -> Self {
        self.fields.insert(path_of(path), path_of(path));
        self
    }

    /// The leg has the field at `path` under `leg_path`
    pub fn with_renamed(mut self, path: &[&str], leg_path: &[&str]) -> Self {
        self.fields.insert(path_of(path), path_of(leg_path));
        self
    }
}

impl TranslateValueFunction for FieldTranslation {
    fn translate_value(&self, value: &Value, new_base_alias: &CorrelationIdentifier) -> Option<Value> {
        match value {
            Value::Literal(_) => Some(value.clone()),
            Value::RecordConstructor(columns) => columns
                .iter()
                .map(|(name, column)| Some((name.clone(), self.translate_value(column, new_base_alias)?)))
                .collect::<Option<Vec<_>>>()
                .map(Value::RecordConstructor),
            Value::Quantified(alias) if alias == &self.source_alias => None,
            Value::Quantified(_) => Some(value.clone()),
            Value::Field { result_type, .. } => {
                let (alias, path) = value.field_path()?;
                if alias != &self.source_alias {
                    return Some(value.clone());
                }
                let path: Vec<String> = path.into_iter().map(String::from).collect();
                let leg_path = self.fields.get(&path)?;
                let (last, parents) = leg_path.split_last()?;
                let parent = parents.iter().fold(Value::quantified(new_base_alias.clone()), |acc, name| acc.field(name.clone(), Type::Any));
                Some(parent.field(last.clone(), result_type.clone()))
            }
        }
    }
}

/// Combine the translations of several legs into one: succeeds only if every
/// leg translates the value and all translations agree.
pub fn push_value_function(dependent_functions: Vec<Arc<dyn TranslateValueFunction>>) -> Result<Arc<dyn TranslateValueFunction>, CursorError> {
    if dependent_functions.is_empty() {
        return Err(CursorError::invalid_argument("push_value_function needs at least one dependent function"));
    }
    Ok(Arc::new(move |value: &Value, new_base_alias: &CorrelationIdentifier| -> Option<Value> {
        let mut previous: Option<(Value, AliasMap)> = None;
        for function in &dependent_functions {
            let pushed = function.translate_value(value, new_base_alias)?;
            match &previous {
                None => {
                    let equivalences = AliasMap::identities_for(&pushed.correlated_to());
                    previous = Some((pushed, equivalences));
                }
                Some((first, equivalences)) => {
                    if !first.semantic_equals(&pushed, equivalences) {
                        return None;
                    }
                }
            }
        }
        previous.map(|(value, _)| value)
    }))
}

/// A set operator over several quantified legs sharing one comparison key
pub trait SetPlan: QueryPlan + Sized {
    fn operation(&self) -> SetOperation;

    fn quantifiers(&self) -> &[Quantifier];

    fn comparison_key(&self) -> &ComparisonKeyFunction;

    /// Rebuild with new legs, same arity
    fn with_children_references(&self, children: Vec<Quantifier>) -> Result<Self, CursorError>;

    /// A dynamic set operation has exactly one correlated leg that is run
    /// once per outer value instead of being merged
    fn is_dynamic(&self) -> bool { false }

    fn required_fields(&self) -> Vec<KeyExpression> {
        match self.comparison_key() {
            ComparisonKeyFunction::OnKeyExpression(expression) => vec![expression.clone()],
            ComparisonKeyFunction::OnValue { .. } => Vec::new(),
        }
    }

    /// Values each input record must be able to produce, rooted at `base_alias`
    fn required_values(&self, base_alias: &CorrelationIdentifier, input_type: &Type) -> Vec<Value> {
        match self.comparison_key() {
            ComparisonKeyFunction::OnKeyExpression(expression) => Value::from_key_expressions(std::slice::from_ref(expression), base_alias, input_type),
            ComparisonKeyFunction::OnValue { base_alias: own, value } => vec![value.rebase(&AliasMap::of(own.clone(), base_alias.clone()))],
        }
    }

    /// Legs onto which every one of `values` can be pushed.
    ///
    /// A leg whose translation fails is dropped. If two remaining legs
    /// translate a value differently (beyond renaming the new base alias),
    /// nothing can be pushed and the result is empty.
    fn try_push_values(
        &self,
        dependent_functions: &[Arc<dyn TranslateValueFunction>],
        quantifiers: &[Quantifier],
        values: &[Value],
    ) -> Result<BTreeSet<CorrelationIdentifier>, CursorError> {
        if dependent_functions.is_empty() || dependent_functions.len() != quantifiers.len() {
            return Err(CursorError::invalid_argument("one translate function per quantifier is required")
                .with_log_info("functions", dependent_functions.len())
                .with_log_info("quantifiers", quantifiers.len()));
        }
        let mut candidates: BTreeSet<CorrelationIdentifier> = quantifiers.iter().map(|q| q.alias.clone()).collect();
        let new_base_alias = CorrelationIdentifier::unique();
        let equivalences = AliasMap::identities_for([&new_base_alias]);

        for value in values {
            let mut previous: Option<Value> = None;
            for (function, quantifier) in dependent_functions.iter().zip(quantifiers) {
                if !candidates.contains(&quantifier.alias) {
                    continue;
                }
                let Some(pushed) = function.translate_value(value, &new_base_alias) else {
                    candidates.remove(&quantifier.alias);
                    continue;
                };
                match &previous {
                    None => previous = Some(pushed),
                    Some(first) if !first.semantic_equals(&pushed, &equivalences) => {
                        tracing::debug!(value = %value, leg = %quantifier.alias, "legs disagree on pushed value");
                        return Ok(BTreeSet::new());
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(candidates)
    }
}

/// Open every leg with skip and limit cleared, merge them, then apply
/// `props` to the merged stream.
#[allow(clippy::too_many_arguments)]
pub(super) fn execute_merge(
    operation: SetOperation,
    quantifiers: &[Quantifier],
    comparison_key: &ComparisonKeyFunction,
    reverse: bool,
    plan_hash: u64,
    store: &RecordStore,
    bindings: &Bindings,
    continuation: &Continuation,
    props: &ScanProperties,
    state: &ExecuteState,
) -> Result<BoxCursor<QueryResult>, CursorError> {
    let leg_props = props.clear_skip_and_limit();
    let merge = MergeCursor::new(
        operation,
        quantifiers.len(),
        |index, leg_continuation| quantifiers[index].plan.execute(store, bindings, &leg_continuation, &leg_props, state),
        comparison_key.key_fn(bindings),
        reverse,
        plan_hash,
        continuation,
    )?;
    Ok(merge.skip_then_limit(props, continuation).boxed())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_translation_rebases_and_renames() {
        let outer = CorrelationIdentifier::of("outer");
        let base = CorrelationIdentifier::of("base");
        let value = Value::quantified(outer.clone()).field("a", Type::Int);

        let same = FieldTranslation::new(outer.clone()).with_field(&["a"]);
        assert_eq!(same.translate_value(&value, &base), Some(Value::quantified(base.clone()).field("a", Type::Int)));

        let renamed = FieldTranslation::new(outer.clone()).with_renamed(&["a"], &["inner", "b"]);
        assert_eq!(
            renamed.translate_value(&value, &base),
            Some(Value::quantified(base.clone()).field("inner", Type::Any).field("b", Type::Int))
        );

        let missing = FieldTranslation::new(outer.clone());
        assert_eq!(missing.translate_value(&value, &base), None);
        // values correlated to something else pass through
        let other = Value::quantified(CorrelationIdentifier::of("x")).field("a", Type::Int);
        assert_eq!(missing.translate_value(&other, &base), Some(other.clone()));
    }

    #[test]
    fn test_push_value_function_requires_agreement() {
        let outer = CorrelationIdentifier::of("outer");
        let base = CorrelationIdentifier::of("base");
        let value = Value::quantified(outer.clone()).field("a", Type::Int);
        let same: Arc<dyn TranslateValueFunction> = Arc::new(FieldTranslation::new(outer.clone()).with_field(&["a"]));
        let renamed: Arc<dyn TranslateValueFunction> = Arc::new(FieldTranslation::new(outer.clone()).with_renamed(&["a"], &["b"]));

        let agreeing = push_value_function(vec![same.clone(), same.clone()]).unwrap();
        assert!(agreeing.translate_value(&value, &base).is_some());
        let disagreeing = push_value_function(vec![same, renamed]).unwrap();
        assert!(disagreeing.translate_value(&value, &base).is_none());
        assert!(push_value_function(Vec::new()).is_err());
    }
}
