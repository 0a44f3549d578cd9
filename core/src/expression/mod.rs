//! Field-path key expressions and the correlated value expressions
//! evaluated against a binding context.

mod alias;
mod key;
mod types;
mod value;

pub use alias::{AliasMap, Bindings, CorrelationIdentifier};
pub use key::KeyExpression;
pub use types::Type;
pub use value::Value;
