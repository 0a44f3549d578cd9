use std::{collections::BTreeMap, sync::Arc};

use serde::{Deserialize, Serialize};
use strata_proto::{Tuple, TupleValue};

/// A stored record: its type, primary key and named fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub record_type: String,
    pub primary_key: Tuple,
    pub fields: BTreeMap<String, FieldValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Scalar(TupleValue),
    /// A nested message
    Message(BTreeMap<String, FieldValue>),
    Repeated(Vec<FieldValue>),
}

impl FieldValue {
    pub fn as_scalar(&self) -> Option<&TupleValue> {
        match self {
            FieldValue::Scalar(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> { self.as_scalar().and_then(|v| v.as_str()) }

    pub fn as_message(&self) -> Option<&BTreeMap<String, FieldValue>> {
        match self {
            FieldValue::Message(fields) => Some(fields),
            _ => None,
        }
    }
}

macro_rules! scalar_from {
    ($($ty:ty),*) => {
        $(impl From<$ty> for FieldValue {
            fn from(value: $ty) -> Self { FieldValue::Scalar(value.into()) }
        })*
    };
}

scalar_from!(TupleValue, &str, String, i64, i32, f64, bool, Vec<u8>);

impl Record {
    pub fn new(record_type: impl Into<String>, primary_key: Tuple) -> Self {
        Self { record_type: record_type.into(), primary_key, fields: BTreeMap::new() }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_message(mut self, name: impl Into<String>, fields: BTreeMap<String, FieldValue>) -> Self {
        self.fields.insert(name.into(), FieldValue::Message(fields));
        self
    }

    pub fn with_repeated(mut self, name: impl Into<String>, values: Vec<FieldValue>) -> Self {
        self.fields.insert(name.into(), FieldValue::Repeated(values));
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> { self.fields.get(name) }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}{}", self.record_type, self.primary_key) }
}

/// One result flowing through a plan. Cheap to clone.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult(Arc<Record>);

impl QueryResult {
    pub fn new(record: Record) -> Self { Self(Arc::new(record)) }

    pub fn record(&self) -> &Record { &self.0 }

    pub fn primary_key(&self) -> &Tuple { &self.0.primary_key }
}

impl From<Record> for QueryResult {
    fn from(record: Record) -> Self { Self::new(record) }
}

impl std::ops::Deref for QueryResult {
    type Target = Record;
    fn deref(&self) -> &Record { &self.0 }
}
