//! Lower-level error types that are wrapped into `CursorError::Failure`
//! at the cursor boundary.

use strata_proto::DecodeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("decode error: {0}")]
    DecodeError(DecodeError),

    #[error("serialization error: {0}")]
    SerializationError(Box<dyn std::error::Error + Send + Sync + 'static>),

    #[error("backend error: {0}")]
    Backend(Box<dyn std::error::Error + Send + Sync + 'static>),

    #[error("task failed: {0}")]
    TaskFailed(String),
}

impl From<DecodeError> for StoreError {
    fn from(err: DecodeError) -> Self { StoreError::DecodeError(err) }
}

impl From<bincode::Error> for StoreError {
    fn from(e: bincode::Error) -> Self { StoreError::SerializationError(Box::new(e)) }
}

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("alias {0} is not bound")]
    UnboundAlias(String),

    #[error("field {0} is repeated and cannot be evaluated as a single value")]
    RepeatedField(String),

    #[error("field {0} is not a nested message")]
    NotAMessage(String),

    #[error("{0} does not evaluate to a scalar")]
    NotAScalar(String),
}
