use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::record::QueryResult;

/// Names a quantifier (a leg, or the current record of a stream) inside
/// correlated expressions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CorrelationIdentifier(String);

impl CorrelationIdentifier {
    pub fn of(name: impl Into<String>) -> Self { Self(name.into()) }

    /// A fresh identifier that cannot collide with any other
    pub fn unique() -> Self { Self(format!("q{}", Ulid::new().to_string().to_lowercase())) }

    pub fn name(&self) -> &str { &self.0 }
}

impl std::fmt::Display for CorrelationIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.0) }
}

impl From<&str> for CorrelationIdentifier {
    fn from(name: &str) -> Self { Self::of(name) }
}

/// A mapping between correlation identifiers, used to compare expressions
/// modulo renaming and to rebase them onto other aliases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasMap(BTreeMap<CorrelationIdentifier, CorrelationIdentifier>);

impl AliasMap {
    pub fn empty() -> Self { Self::default() }

    /// Maps every alias to itself
    pub fn identities_for<'a>(aliases: impl IntoIterator<Item = &'a CorrelationIdentifier>) -> Self {
        Self(aliases.into_iter().map(|alias| (alias.clone(), alias.clone())).collect())
    }

    pub fn of(source: CorrelationIdentifier, target: CorrelationIdentifier) -> Self { Self::empty().with(source, target) }

    pub fn with(mut self, source: CorrelationIdentifier, target: CorrelationIdentifier) -> Self {
        self.0.insert(source, target);
        self
    }

    pub fn target(&self, source: &CorrelationIdentifier) -> Option<&CorrelationIdentifier> { self.0.get(source) }

    pub fn contains_source(&self, source: &CorrelationIdentifier) -> bool { self.0.contains_key(source) }

    pub fn sources(&self) -> BTreeSet<&CorrelationIdentifier> { self.0.keys().collect() }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

/// Immutable alias -> bound result context threaded through evaluation.
/// Adding a binding produces a new context and leaves the original untouched.
#[derive(Debug, Clone, Default)]
pub struct Bindings(Arc<BTreeMap<CorrelationIdentifier, QueryResult>>);

impl Bindings {
    pub fn new() -> Self { Self::default() }

    pub fn with_binding(&self, alias: CorrelationIdentifier, result: QueryResult) -> Self {
        let mut map = (*self.0).clone();
        map.insert(alias, result);
        Self(Arc::new(map))
    }

    pub fn get(&self, alias: &CorrelationIdentifier) -> Option<&QueryResult> { self.0.get(alias) }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}
