use serde::Serialize;

/// A hash of a plan's shape that is stable across processes and releases,
/// suitable for embedding in continuations.
pub trait PlanHashable {
    fn plan_hash(&self) -> u64;
}

/// blake3 over the bincode encoding, truncated to 64 bits.
///
/// Plan shapes are derived `Serialize` data with known lengths, and the
/// hasher accepts every write, so the encoding cannot fail.
pub fn stable_hash<T: Serialize + ?Sized>(value: &T) -> u64 {
    let mut hasher = blake3::Hasher::new();
    bincode::serialize_into(&mut hasher, value).expect("plan shapes always encode");
    let digest = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(head)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_hash_is_deterministic() {
        assert_eq!(stable_hash(&("scan", 1u32)), stable_hash(&("scan", 1u32)));
        assert_ne!(stable_hash(&("scan", 1u32)), stable_hash(&("scan", 2u32)));
    }

    #[test]
    fn test_stable_hash_matches_buffered_encoding() {
        let shape = ("union", vec![3u64, 7], Some("year"));
        let digest = blake3::hash(&bincode::serialize(&shape).unwrap());
        let expected = u64::from_le_bytes(digest.as_bytes()[..8].try_into().unwrap());
        assert_eq!(stable_hash(&shape), expected);
    }
}
