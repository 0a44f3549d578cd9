use std::collections::BTreeMap;

use serde::Deserialize;
use strata_core::{error::EvaluationError, expression::KeyExpression, FieldValue, Record};
use strata_proto::{Tuple, TupleValue};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SearchIndexOptions {
    pub auto_complete_enabled: bool,
}

/// A full-text index over the text fields of one record type, partitioned by
/// the value of its grouping expression.
#[derive(Debug, Clone)]
pub struct SearchIndex {
    pub name: String,
    pub record_type: String,
    /// Dotted field paths; repeated fields contribute every element
    pub text_fields: Vec<String>,
    pub grouping: KeyExpression,
    pub options: SearchIndexOptions,
}

/// One indexed value of a record
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentField {
    pub name: String,
    pub value: TupleValue,
}

impl DocumentField {
    pub fn text(&self) -> Option<&str> { self.value.as_str() }
}

impl SearchIndex {
    pub fn new(name: &str, record_type: &str, text_fields: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            record_type: record_type.to_string(),
            text_fields: text_fields.iter().map(|f| f.to_string()).collect(),
            grouping: KeyExpression::Empty,
            options: SearchIndexOptions::default(),
        }
    }

    pub fn with_grouping(mut self, grouping: KeyExpression) -> Self {
        self.grouping = grouping;
        self
    }

    pub fn with_auto_complete(mut self, enabled: bool) -> Self {
        self.options.auto_complete_enabled = enabled;
        self
    }

    pub fn with_options(mut self, options: SearchIndexOptions) -> Self {
        self.options = options;
        self
    }

    pub fn indexes(&self, record: &Record) -> bool { record.record_type == self.record_type }

    /// The indexed values of `record`, keyed by the grouping key of the partition they belong to
    pub fn document_fields(&self, record: &Record) -> Result<BTreeMap<Tuple, Vec<DocumentField>>, EvaluationError> {
        let mut grouped = BTreeMap::new();
        if !self.indexes(record) {
            return Ok(grouped);
        }
        let grouping_key = self.grouping.evaluate_singleton(record)?;
        let mut fields = Vec::new();
        for path in &self.text_fields {
            let segments: Vec<&str> = path.split('.').collect();
            collect_values(&record.fields, &segments, path, &mut fields);
        }
        grouped.insert(grouping_key, fields);
        Ok(grouped)
    }
}

fn collect_values(fields: &BTreeMap<String, FieldValue>, segments: &[&str], path: &str, out: &mut Vec<DocumentField>) {
    let Some((first, rest)) = segments.split_first() else { return };
    if let Some(value) = fields.get(*first) {
        collect_from(value, rest, path, out);
    }
}

fn collect_from(value: &FieldValue, rest: &[&str], path: &str, out: &mut Vec<DocumentField>) {
    match value {
        FieldValue::Scalar(scalar) if rest.is_empty() && !scalar.is_null() => {
            out.push(DocumentField { name: path.to_string(), value: scalar.clone() });
        }
        FieldValue::Message(nested) if !rest.is_empty() => collect_values(nested, rest, path, out),
        FieldValue::Repeated(values) => {
            for value in values {
                collect_from(value, rest, path, out);
            }
        }
        _ => {}
    }
}
