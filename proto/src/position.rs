//! Serialized resume state of the individual cursor operators.
//!
//! Each operator owns one message type; its bincode encoding is the payload of
//! `Continuation::Resume`. Nested continuations are stored in their
//! `Continuation::to_bytes` form so that `Start` and `End` survive the trip.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{continuation::Continuation, error::DecodeError};

/// Resume state of a list cursor: the index of the next element to return
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListPosition {
    pub next_index: u64,
}

/// Resume state of a key-value range scan: the last key returned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPosition {
    pub last_key: Vec<u8>,
}

/// Resume state of a flat-map: where the outer cursor stood before the current
/// outer element, that element's check value, and how far its inner cursor got.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatMapPosition {
    pub outer: Vec<u8>,
    pub check: Option<Vec<u8>>,
    pub inner: Vec<u8>,
}

impl FlatMapPosition {
    pub fn new(outer: &Continuation, check: Option<Vec<u8>>, inner: &Continuation) -> Self {
        Self { outer: outer.to_bytes(), check, inner: inner.to_bytes() }
    }

    pub fn outer(&self) -> Result<Continuation, DecodeError> { Continuation::from_bytes(&self.outer) }

    pub fn inner(&self) -> Result<Continuation, DecodeError> { Continuation::from_bytes(&self.inner) }
}

/// Resume state of a merge (union / intersection): the plan it belongs to and
/// one continuation per leg, in leg order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergePosition {
    pub plan_hash: u64,
    pub legs: Vec<Vec<u8>>,
}

impl MergePosition {
    pub fn new(plan_hash: u64, legs: &[Continuation]) -> Self { Self { plan_hash, legs: legs.iter().map(|c| c.to_bytes()).collect() } }

    pub fn legs(&self) -> Result<Vec<Continuation>, DecodeError> { self.legs.iter().map(|b| Continuation::from_bytes(b)).collect() }
}

/// Resume state of a scored search: the last hit returned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreDocPosition {
    pub score: f32,
    pub doc: u64,
    pub shard: u32,
}

/// Wrap the bincode encoding of `position` in a `Resume` continuation
pub fn encode_position<T: Serialize>(position: &T) -> Result<Continuation, bincode::Error> {
    Ok(Continuation::Resume(bincode::serialize(position)?))
}

/// Decode the payload of a `Resume` continuation; `None` for `Start`/`End`
pub fn decode_position<T: DeserializeOwned>(continuation: &Continuation) -> Result<Option<T>, DecodeError> {
    match continuation.payload() {
        Some(bytes) => Ok(Some(bincode::deserialize(bytes)?)),
        None => Ok(None),
    }
}
