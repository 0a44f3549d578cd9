use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use crate::error::DecodeError;

// Type codes of the packed encoding. Byte order of the codes matches the
// ordering of `TupleValue` variants, so packed tuples sort like tuples.
const NULL_CODE: u8 = 0x00;
const BYTES_CODE: u8 = 0x01;
const STRING_CODE: u8 = 0x02;
const NESTED_CODE: u8 = 0x05;
const INT_CODE: u8 = 0x0C;
const FLOAT_CODE: u8 = 0x21;
const FALSE_CODE: u8 = 0x26;
const TRUE_CODE: u8 = 0x27;
const ESCAPE: u8 = 0xFF;

/// A single tuple element.
///
/// Elements are totally ordered: `Null` sorts before every present value,
/// different types order by type, and floats use IEEE 754 total ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TupleValue {
    Null,
    Bytes(Vec<u8>),
    String(String),
    Nested(Tuple),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl TupleValue {
    fn rank(&self) -> u8 {
        match self {
            TupleValue::Null => 0,
            TupleValue::Bytes(_) => 1,
            TupleValue::String(_) => 2,
            TupleValue::Nested(_) => 3,
            TupleValue::Int(_) => 4,
            TupleValue::Float(_) => 5,
            TupleValue::Bool(_) => 6,
        }
    }

    pub fn is_null(&self) -> bool { matches!(self, TupleValue::Null) }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TupleValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            TupleValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl PartialEq for TupleValue {
    fn eq(&self, other: &Self) -> bool { self.cmp(other) == Ordering::Equal }
}

impl Eq for TupleValue {}

impl PartialOrd for TupleValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for TupleValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (TupleValue::Null, TupleValue::Null) => Ordering::Equal,
            (TupleValue::Bytes(a), TupleValue::Bytes(b)) => a.cmp(b),
            (TupleValue::String(a), TupleValue::String(b)) => a.cmp(b),
            (TupleValue::Nested(a), TupleValue::Nested(b)) => a.cmp(b),
            (TupleValue::Int(a), TupleValue::Int(b)) => a.cmp(b),
            (TupleValue::Float(a), TupleValue::Float(b)) => a.total_cmp(b),
            (TupleValue::Bool(a), TupleValue::Bool(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for TupleValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            TupleValue::Null => {}
            TupleValue::Bytes(b) => b.hash(state),
            TupleValue::String(s) => s.hash(state),
            TupleValue::Nested(t) => t.hash(state),
            TupleValue::Int(i) => i.hash(state),
            TupleValue::Float(f) => f.to_bits().hash(state),
            TupleValue::Bool(b) => b.hash(state),
        }
    }
}

impl std::fmt::Display for TupleValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TupleValue::Null => write!(f, "null"),
            TupleValue::Bytes(b) => write!(f, "b\"{}\"", b.iter().map(|b| format!("\\x{:02x}", b)).collect::<String>()),
            TupleValue::String(s) => write!(f, "\"{}\"", s),
            TupleValue::Nested(t) => write!(f, "{}", t),
            TupleValue::Int(i) => write!(f, "{}", i),
            TupleValue::Float(v) => write!(f, "{}", v),
            TupleValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for TupleValue {
    fn from(val: &str) -> Self { TupleValue::String(val.to_string()) }
}
impl From<String> for TupleValue {
    fn from(val: String) -> Self { TupleValue::String(val) }
}
impl From<i64> for TupleValue {
    fn from(val: i64) -> Self { TupleValue::Int(val) }
}
impl From<i32> for TupleValue {
    fn from(val: i32) -> Self { TupleValue::Int(val as i64) }
}
impl From<f64> for TupleValue {
    fn from(val: f64) -> Self { TupleValue::Float(val) }
}
impl From<f32> for TupleValue {
    fn from(val: f32) -> Self { TupleValue::Float(val as f64) }
}
impl From<bool> for TupleValue {
    fn from(val: bool) -> Self { TupleValue::Bool(val) }
}
impl From<Vec<u8>> for TupleValue {
    fn from(val: Vec<u8>) -> Self { TupleValue::Bytes(val) }
}
impl From<Tuple> for TupleValue {
    fn from(val: Tuple) -> Self { TupleValue::Nested(val) }
}

/// An ordered list of elements; compares lexicographically, shorter prefixes first.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tuple(Vec<TupleValue>);

impl Tuple {
    pub fn new() -> Self { Tuple(Vec::new()) }

    pub fn from_values(values: Vec<TupleValue>) -> Self { Tuple(values) }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn get(&self, index: usize) -> Option<&TupleValue> { self.0.get(index) }

    pub fn values(&self) -> &[TupleValue] { &self.0 }

    pub fn into_values(self) -> Vec<TupleValue> { self.0 }

    pub fn push(&mut self, value: impl Into<TupleValue>) { self.0.push(value.into()) }

    pub fn with(mut self, value: impl Into<TupleValue>) -> Self {
        self.0.push(value.into());
        self
    }

    /// Concatenate `other` after the elements of this tuple
    pub fn add_all(mut self, other: &Tuple) -> Self {
        self.0.extend(other.0.iter().cloned());
        self
    }

    pub fn starts_with(&self, prefix: &Tuple) -> bool { self.0.starts_with(&prefix.0) }

    /// Order-preserving binary encoding: `a < b` iff `a.pack() < b.pack()`.
    pub fn pack(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for value in &self.0 {
            encode_value(&mut out, value, false);
        }
        out
    }

    pub fn unpack(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut pos = 0;
        let mut values = Vec::new();
        while pos < bytes.len() {
            let (value, next) = decode_value(bytes, pos, false)?;
            values.push(value);
            pos = next;
        }
        Ok(Tuple(values))
    }
}

impl FromIterator<TupleValue> for Tuple {
    fn from_iter<I: IntoIterator<Item = TupleValue>>(iter: I) -> Self { Tuple(iter.into_iter().collect()) }
}

impl From<Vec<TupleValue>> for Tuple {
    fn from(values: Vec<TupleValue>) -> Self { Tuple(values) }
}

impl std::fmt::Display for Tuple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({})", self.0.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", "))
    }
}

/// Build a tuple from a heterogeneous list of elements: `tuple![1, "a", true]`
#[macro_export]
macro_rules! tuple {
    () => { $crate::Tuple::new() };
    ($($value:expr),+ $(,)?) => {
        $crate::Tuple::from_values(vec![$($crate::TupleValue::from($value)),+])
    };
}

fn encode_escaped(out: &mut Vec<u8>, bytes: &[u8]) {
    // [escaped payload][0x00] - 0x00 inside the payload becomes 0x00 0xFF
    for &b in bytes {
        out.push(b);
        if b == 0x00 {
            out.push(ESCAPE);
        }
    }
    out.push(0x00);
}

fn encode_value(out: &mut Vec<u8>, value: &TupleValue, nested: bool) {
    match value {
        TupleValue::Null => {
            out.push(NULL_CODE);
            if nested {
                out.push(ESCAPE);
            }
        }
        TupleValue::Bytes(b) => {
            out.push(BYTES_CODE);
            encode_escaped(out, b);
        }
        TupleValue::String(s) => {
            out.push(STRING_CODE);
            encode_escaped(out, s.as_bytes());
        }
        TupleValue::Nested(t) => {
            out.push(NESTED_CODE);
            for v in &t.0 {
                encode_value(out, v, true);
            }
            out.push(0x00);
        }
        TupleValue::Int(i) => {
            // Flip the sign bit so negative numbers sort before positive ones
            out.push(INT_CODE);
            out.extend_from_slice(&((*i as u64) ^ (1 << 63)).to_be_bytes());
        }
        TupleValue::Float(f) => {
            let bits = f.to_bits();
            let ordered = if (bits >> 63) == 0 { bits ^ (1 << 63) } else { !bits };
            out.push(FLOAT_CODE);
            out.extend_from_slice(&ordered.to_be_bytes());
        }
        TupleValue::Bool(false) => out.push(FALSE_CODE),
        TupleValue::Bool(true) => out.push(TRUE_CODE),
    }
}

fn decode_escaped(bytes: &[u8], mut pos: usize) -> Result<(Vec<u8>, usize), DecodeError> {
    let mut out = Vec::new();
    loop {
        let b = *bytes.get(pos).ok_or(DecodeError::InvalidLength)?;
        if b == 0x00 {
            if bytes.get(pos + 1) == Some(&ESCAPE) {
                out.push(0x00);
                pos += 2;
                continue;
            }
            return Ok((out, pos + 1));
        }
        out.push(b);
        pos += 1;
    }
}

fn decode_fixed(bytes: &[u8], pos: usize) -> Result<u64, DecodeError> {
    let slice = bytes.get(pos..pos + 8).ok_or(DecodeError::InvalidLength)?;
    let mut array = [0u8; 8];
    array.copy_from_slice(slice);
    Ok(u64::from_be_bytes(array))
}

fn decode_value(bytes: &[u8], pos: usize, nested: bool) -> Result<(TupleValue, usize), DecodeError> {
    let code = bytes[pos];
    let pos = pos + 1;
    match code {
        NULL_CODE => {
            if nested {
                // nested nulls are escaped; a bare 0x00 terminates the nested tuple
                if bytes.get(pos) != Some(&ESCAPE) {
                    return Err(DecodeError::InvalidFormat);
                }
                Ok((TupleValue::Null, pos + 1))
            } else {
                Ok((TupleValue::Null, pos))
            }
        }
        BYTES_CODE => {
            let (payload, next) = decode_escaped(bytes, pos)?;
            Ok((TupleValue::Bytes(payload), next))
        }
        STRING_CODE => {
            let (payload, next) = decode_escaped(bytes, pos)?;
            let s = String::from_utf8(payload).map_err(|_| DecodeError::InvalidUtf8)?;
            Ok((TupleValue::String(s), next))
        }
        NESTED_CODE => {
            let mut values = Vec::new();
            let mut pos = pos;
            loop {
                match bytes.get(pos) {
                    None => return Err(DecodeError::InvalidLength),
                    Some(0x00) if bytes.get(pos + 1) != Some(&ESCAPE) => return Ok((TupleValue::Nested(Tuple(values)), pos + 1)),
                    Some(_) => {
                        let (value, next) = decode_value(bytes, pos, true)?;
                        values.push(value);
                        pos = next;
                    }
                }
            }
        }
        INT_CODE => {
            let raw = decode_fixed(bytes, pos)?;
            Ok((TupleValue::Int((raw ^ (1 << 63)) as i64), pos + 8))
        }
        FLOAT_CODE => {
            let ordered = decode_fixed(bytes, pos)?;
            let bits = if (ordered >> 63) == 1 { ordered ^ (1 << 63) } else { !ordered };
            Ok((TupleValue::Float(f64::from_bits(bits)), pos + 8))
        }
        FALSE_CODE => Ok((TupleValue::Bool(false), pos)),
        TRUE_CODE => Ok((TupleValue::Bool(true), pos)),
        other => Err(DecodeError::InvalidTypeCode(other)),
    }
}
