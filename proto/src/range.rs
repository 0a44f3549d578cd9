use serde::{Deserialize, Serialize};

use crate::tuple::Tuple;

/// One side of a `TupleRange`. Endpoints are prefix-aware: an inclusive high
/// endpoint covers every tuple that starts with it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endpoint {
    Unbounded,
    Inclusive(Tuple),
    Exclusive(Tuple),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TupleRange {
    pub low: Endpoint,
    pub high: Endpoint,
}

impl TupleRange {
    pub fn new(low: Endpoint, high: Endpoint) -> Self { Self { low, high } }

    pub fn all() -> Self { Self { low: Endpoint::Unbounded, high: Endpoint::Unbounded } }

    /// Every tuple that starts with `prefix`
    pub fn prefix(prefix: Tuple) -> Self { Self { low: Endpoint::Inclusive(prefix.clone()), high: Endpoint::Inclusive(prefix) } }

    /// Half-open range `[low, high)`
    pub fn between(low: Tuple, high: Tuple) -> Self { Self { low: Endpoint::Inclusive(low), high: Endpoint::Exclusive(high) } }

    pub fn is_all(&self) -> bool { self.low == Endpoint::Unbounded && self.high == Endpoint::Unbounded }

    /// Lower this range to raw keys inside `subspace`
    pub fn to_key_range(&self, subspace: &[u8]) -> KeyRange {
        let packed = |t: &Tuple| {
            let mut key = subspace.to_vec();
            key.extend_from_slice(&t.pack());
            key
        };
        let begin = match &self.low {
            Endpoint::Unbounded => subspace.to_vec(),
            Endpoint::Inclusive(t) => packed(t),
            Endpoint::Exclusive(t) => strinc(&packed(t)),
        };
        let end = match &self.high {
            Endpoint::Unbounded => strinc(subspace),
            Endpoint::Inclusive(t) => strinc(&packed(t)),
            Endpoint::Exclusive(t) => packed(t),
        };
        KeyRange { begin, end }
    }
}

impl std::fmt::Display for TupleRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.low {
            Endpoint::Unbounded => write!(f, "(-∞")?,
            Endpoint::Inclusive(t) => write!(f, "[{}", t)?,
            Endpoint::Exclusive(t) => write!(f, "({}", t)?,
        }
        match &self.high {
            Endpoint::Unbounded => write!(f, ", +∞)"),
            Endpoint::Inclusive(t) => write!(f, ", {}]", t),
            Endpoint::Exclusive(t) => write!(f, ", {})", t),
        }
    }
}

/// Raw key interval `[begin, end)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyRange {
    pub begin: Vec<u8>,
    pub end: Vec<u8>,
}

impl KeyRange {
    pub fn new(begin: Vec<u8>, end: Vec<u8>) -> Self { Self { begin, end } }

    pub fn is_empty(&self) -> bool { self.begin >= self.end }

    pub fn contains(&self, key: &[u8]) -> bool { key >= self.begin.as_slice() && key < self.end.as_slice() }
}

/// Smallest key greater than every key prefixed by `key`. Trailing 0xFF bytes
/// are dropped before incrementing; an all-0xFF or empty key maps to `[0xFF]`.
pub fn strinc(key: &[u8]) -> Vec<u8> {
    let mut out = key.to_vec();
    while let Some(&last) = out.last() {
        if last == 0xFF {
            out.pop();
        } else {
            let len = out.len();
            out[len - 1] = last + 1;
            return out;
        }
    }
    vec![0xFF]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple;

    #[test]
    fn test_prefix_range_covers_extensions() {
        let range = TupleRange::prefix(tuple!["a"]).to_key_range(b"s");
        let mut inside = b"s".to_vec();
        inside.extend_from_slice(&tuple!["a", 4].pack());
        let mut outside = b"s".to_vec();
        outside.extend_from_slice(&tuple!["b"].pack());
        assert!(range.contains(&inside));
        assert!(!range.contains(&outside));
    }

    #[test]
    fn test_exclusive_bounds() {
        let range = TupleRange::new(Endpoint::Exclusive(tuple![2]), Endpoint::Exclusive(tuple![5])).to_key_range(b"");
        assert!(!range.contains(&tuple![2].pack()));
        assert!(!range.contains(&tuple![2, "x"].pack()));
        assert!(range.contains(&tuple![3].pack()));
        assert!(!range.contains(&tuple![5].pack()));
    }

    #[test]
    fn test_strinc() {
        assert_eq!(strinc(b"ab"), b"ac".to_vec());
        assert_eq!(strinc(&[0x01, 0xFF]), vec![0x02]);
        assert_eq!(strinc(&[]), vec![0xFF]);
    }
}
