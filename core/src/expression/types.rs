use serde::{Deserialize, Serialize};

/// The type of a value flowing through a plan
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Any,
    Null,
    Bool,
    Int,
    Float,
    String,
    Bytes,
    Record(Vec<(String, Type)>),
    Array(Box<Type>),
}

impl Type {
    pub fn record(fields: Vec<(&str, Type)>) -> Self { Type::Record(fields.into_iter().map(|(name, ty)| (name.to_string(), ty)).collect()) }

    /// Type of field `name`, if this type can have one
    pub fn field_type(&self, name: &str) -> Option<Type> {
        match self {
            Type::Any => Some(Type::Any),
            Type::Record(fields) => fields.iter().find(|(field, _)| field == name).map(|(_, ty)| ty.clone()),
            _ => None,
        }
    }

    pub fn is_record(&self) -> bool { matches!(self, Type::Record(_)) }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Any => write!(f, "any"),
            Type::Null => write!(f, "null"),
            Type::Bool => write!(f, "bool"),
            Type::Int => write!(f, "int"),
            Type::Float => write!(f, "float"),
            Type::String => write!(f, "string"),
            Type::Bytes => write!(f, "bytes"),
            Type::Record(fields) => {
                write!(f, "record(")?;
                for (i, (name, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, ty)?;
                }
                write!(f, ")")
            }
            Type::Array(element) => write!(f, "array<{}>", element),
        }
    }
}
