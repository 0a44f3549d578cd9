use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strata_proto::{Tuple, TupleValue};

use crate::{
    error::EvaluationError,
    record::{FieldValue, Record},
};

/// A static field-path expression producing a key tuple from a record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyExpression {
    Empty,
    Field(String),
    /// A field of the nested message in `parent`
    Nest(String, Box<KeyExpression>),
    Concat(Vec<KeyExpression>),
}

impl KeyExpression {
    pub fn field(name: impl Into<String>) -> Self { KeyExpression::Field(name.into()) }

    pub fn nest(parent: impl Into<String>, child: KeyExpression) -> Self { KeyExpression::Nest(parent.into(), Box::new(child)) }

    pub fn concat(children: Vec<KeyExpression>) -> Self { KeyExpression::Concat(children) }

    pub fn concat_fields(names: &[&str]) -> Self { KeyExpression::Concat(names.iter().map(|n| Self::field(*n)).collect()) }

    /// Number of tuple elements this expression produces
    pub fn column_size(&self) -> usize {
        match self {
            KeyExpression::Empty => 0,
            KeyExpression::Field(_) => 1,
            KeyExpression::Nest(_, child) => child.column_size(),
            KeyExpression::Concat(children) => children.iter().map(|c| c.column_size()).sum(),
        }
    }

    /// The field paths this expression reads, in column order
    pub fn field_paths(&self) -> Vec<Vec<String>> {
        match self {
            KeyExpression::Empty => Vec::new(),
            KeyExpression::Field(name) => vec![vec![name.clone()]],
            KeyExpression::Nest(parent, child) => child
                .field_paths()
                .into_iter()
                .map(|path| std::iter::once(parent.clone()).chain(path).collect())
                .collect(),
            KeyExpression::Concat(children) => children.iter().flat_map(|c| c.field_paths()).collect(),
        }
    }

    /// Evaluate against a record where every field on the path holds a single value.
    /// Missing fields evaluate to null.
    pub fn evaluate_singleton(&self, record: &Record) -> Result<Tuple, EvaluationError> {
        let mut out = Tuple::new();
        self.evaluate_into(Some(&record.fields), &mut out)?;
        Ok(out)
    }

    fn evaluate_into(&self, fields: Option<&BTreeMap<String, FieldValue>>, out: &mut Tuple) -> Result<(), EvaluationError> {
        match self {
            KeyExpression::Empty => {}
            KeyExpression::Field(name) => match fields.and_then(|f| f.get(name)) {
                None => out.push(TupleValue::Null),
                Some(FieldValue::Scalar(value)) => out.push(value.clone()),
                Some(FieldValue::Message(_)) => return Err(EvaluationError::NotAScalar(name.clone())),
                Some(FieldValue::Repeated(_)) => return Err(EvaluationError::RepeatedField(name.clone())),
            },
            KeyExpression::Nest(parent, child) => match fields.and_then(|f| f.get(parent)) {
                None => child.evaluate_into(None, out)?,
                Some(FieldValue::Message(nested)) => child.evaluate_into(Some(nested), out)?,
                Some(FieldValue::Scalar(_)) => return Err(EvaluationError::NotAMessage(parent.clone())),
                Some(FieldValue::Repeated(_)) => return Err(EvaluationError::RepeatedField(parent.clone())),
            },
            KeyExpression::Concat(children) => {
                for child in children {
                    child.evaluate_into(fields, out)?;
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for KeyExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyExpression::Empty => write!(f, "empty"),
            KeyExpression::Field(name) => write!(f, "{}", name),
            KeyExpression::Nest(parent, child) => write!(f, "{}.{}", parent, child),
            KeyExpression::Concat(children) => {
                write!(f, "(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", child)?;
                }
                write!(f, ")")
            }
        }
    }
}
