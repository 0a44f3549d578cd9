use serde::{Deserialize, Serialize};

use crate::tuple::Tuple;

/// A single result of an index scan
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexEntry {
    pub index_name: String,
    pub key: Tuple,
    pub value: Tuple,
    pub primary_key: Option<Tuple>,
}

impl IndexEntry {
    pub fn new(index_name: impl Into<String>, key: Tuple, value: Tuple, primary_key: Option<Tuple>) -> Self {
        Self { index_name: index_name.into(), key, value, primary_key }
    }
}

impl std::fmt::Display for IndexEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "IndexEntry({} {} => {}", self.index_name, self.key, self.value)?;
        if let Some(pk) = &self.primary_key {
            write!(f, " pk {}", pk)?;
        }
        write!(f, ")")
    }
}
