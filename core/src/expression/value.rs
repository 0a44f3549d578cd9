use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strata_proto::{Tuple, TupleValue};

use super::{AliasMap, Bindings, CorrelationIdentifier, KeyExpression, Type};
use crate::{
    error::EvaluationError,
    plan::{stable_hash, PlanHashable},
    record::{FieldValue, Record},
};

/// A correlated expression: evaluated against the results bound to the
/// aliases it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    /// The result bound to an alias
    Quantified(CorrelationIdentifier),
    Field { child: Box<Value>, name: String, result_type: Type },
    Literal(TupleValue),
    RecordConstructor(Vec<(String, Value)>),
}

enum Resolved<'a> {
    Record(&'a Record),
    Field(&'a FieldValue),
    Missing,
}

impl Value {
    pub fn quantified(alias: CorrelationIdentifier) -> Self { Value::Quantified(alias) }

    pub fn literal(value: impl Into<TupleValue>) -> Self { Value::Literal(value.into()) }

    /// `self.name`
    pub fn field(self, name: impl Into<String>, result_type: Type) -> Self {
        Value::Field { child: Box::new(self), name: name.into(), result_type }
    }

    pub fn record_of(columns: Vec<(&str, Value)>) -> Self {
        Value::RecordConstructor(columns.into_iter().map(|(name, value)| (name.to_string(), value)).collect())
    }

    /// One field-chain value per column of each key expression, rooted at `base_alias`
    pub fn from_key_expressions(expressions: &[KeyExpression], base_alias: &CorrelationIdentifier, input_type: &Type) -> Vec<Value> {
        expressions
            .iter()
            .flat_map(|expression| expression.field_paths())
            .map(|path| {
                let mut value = Value::Quantified(base_alias.clone());
                let mut ty = input_type.clone();
                for name in path {
                    ty = ty.field_type(&name).unwrap_or(Type::Any);
                    value = value.field(name, ty.clone());
                }
                value
            })
            .collect()
    }

    /// The root alias and field names of a field chain
    pub fn field_path(&self) -> Option<(&CorrelationIdentifier, Vec<&str>)> {
        match self {
            Value::Quantified(alias) => Some((alias, Vec::new())),
            Value::Field { child, name, .. } => {
                let (alias, mut path) = child.field_path()?;
                path.push(name);
                Some((alias, path))
            }
            _ => None,
        }
    }

    pub fn correlated_to(&self) -> BTreeSet<CorrelationIdentifier> {
        let mut out = BTreeSet::new();
        self.collect_correlations(&mut out);
        out
    }

    fn collect_correlations(&self, out: &mut BTreeSet<CorrelationIdentifier>) {
        match self {
            Value::Quantified(alias) => {
                out.insert(alias.clone());
            }
            Value::Field { child, .. } => child.collect_correlations(out),
            Value::Literal(_) => {}
            Value::RecordConstructor(columns) => columns.iter().for_each(|(_, value)| value.collect_correlations(out)),
        }
    }

    /// Structural equality where aliases mapped by `equivalences` are
    /// considered equal to their targets; unmapped aliases must match exactly.
    pub fn semantic_equals(&self, other: &Value, equivalences: &AliasMap) -> bool {
        match (self, other) {
            (Value::Quantified(left), Value::Quantified(right)) => match equivalences.target(left) {
                Some(target) => target == right,
                None => left == right,
            },
            (Value::Field { child: lc, name: ln, result_type: lt }, Value::Field { child: rc, name: rn, result_type: rt }) => {
                ln == rn && lt == rt && lc.semantic_equals(rc, equivalences)
            }
            (Value::Literal(left), Value::Literal(right)) => left == right,
            (Value::RecordConstructor(left), Value::RecordConstructor(right)) => {
                left.len() == right.len() && left.iter().zip(right).all(|((ln, lv), (rn, rv))| ln == rn && lv.semantic_equals(rv, equivalences))
            }
            _ => false,
        }
    }

    /// Replace every alias mapped by `translation` with its target
    pub fn rebase(&self, translation: &AliasMap) -> Value {
        match self {
            Value::Quantified(alias) => Value::Quantified(translation.target(alias).cloned().unwrap_or_else(|| alias.clone())),
            Value::Field { child, name, result_type } => Value::Field { child: Box::new(child.rebase(translation)), name: name.clone(), result_type: result_type.clone() },
            Value::Literal(value) => Value::Literal(value.clone()),
            Value::RecordConstructor(columns) => Value::RecordConstructor(columns.iter().map(|(name, value)| (name.clone(), value.rebase(translation))).collect()),
        }
    }

    /// Evaluate to a flat tuple: a scalar yields one element, a record
    /// constructor the concatenation of its columns. Missing fields yield null.
    pub fn eval(&self, bindings: &Bindings) -> Result<Tuple, EvaluationError> {
        let mut out = Tuple::new();
        self.eval_into(bindings, &mut out)?;
        Ok(out)
    }

    fn eval_into(&self, bindings: &Bindings, out: &mut Tuple) -> Result<(), EvaluationError> {
        match self {
            Value::Literal(value) => out.push(value.clone()),
            Value::RecordConstructor(columns) => {
                for (_, value) in columns {
                    value.eval_into(bindings, out)?;
                }
            }
            Value::Quantified(_) | Value::Field { .. } => match self.resolve(bindings)? {
                Resolved::Field(FieldValue::Scalar(value)) => out.push(value.clone()),
                Resolved::Missing => out.push(TupleValue::Null),
                Resolved::Field(FieldValue::Repeated(_)) => return Err(EvaluationError::RepeatedField(self.to_string())),
                Resolved::Field(FieldValue::Message(_)) | Resolved::Record(_) => return Err(EvaluationError::NotAScalar(self.to_string())),
            },
        }
        Ok(())
    }

    fn resolve<'b>(&self, bindings: &'b Bindings) -> Result<Resolved<'b>, EvaluationError> {
        match self {
            Value::Quantified(alias) => bindings
                .get(alias)
                .map(|result| Resolved::Record(result.record()))
                .ok_or_else(|| EvaluationError::UnboundAlias(alias.to_string())),
            Value::Field { child, name, .. } => {
                let fields = match child.resolve(bindings)? {
                    Resolved::Record(record) => &record.fields,
                    Resolved::Field(FieldValue::Message(fields)) => fields,
                    Resolved::Field(FieldValue::Repeated(_)) => return Err(EvaluationError::RepeatedField(child.to_string())),
                    Resolved::Field(FieldValue::Scalar(_)) => return Err(EvaluationError::NotAMessage(child.to_string())),
                    Resolved::Missing => return Ok(Resolved::Missing),
                };
                Ok(fields.get(name).map(Resolved::Field).unwrap_or(Resolved::Missing))
            }
            _ => Err(EvaluationError::NotAMessage(self.to_string())),
        }
    }

    /// The same expression with every alias replaced by one placeholder,
    /// so that hashing does not depend on generated alias names.
    fn anonymized(&self) -> Value {
        match self {
            Value::Quantified(_) => Value::Quantified(CorrelationIdentifier::of("_")),
            Value::Field { child, name, result_type } => Value::Field { child: Box::new(child.anonymized()), name: name.clone(), result_type: result_type.clone() },
            Value::Literal(value) => Value::Literal(value.clone()),
            Value::RecordConstructor(columns) => Value::RecordConstructor(columns.iter().map(|(name, value)| (name.clone(), value.anonymized())).collect()),
        }
    }
}

impl PlanHashable for Value {
    fn plan_hash(&self) -> u64 { stable_hash(&("value", self.anonymized())) }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Quantified(alias) => write!(f, "${}", alias),
            Value::Field { child, name, .. } => write!(f, "{}.{}", child, name),
            Value::Literal(value) => write!(f, "{}", value),
            Value::RecordConstructor(columns) => {
                write!(f, "(")?;
                for (i, (name, value)) in columns.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} as {}", value, name)?;
                }
                write!(f, ")")
            }
        }
    }
}
