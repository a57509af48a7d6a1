//! BLAKE2b hashing with domain separation helpers.

use blake2::{digest::consts::U32, Blake2b, Digest};

use snsd_primitives::Hash32;

type Blake2b256 = Blake2b<U32>;

/// Hashes arbitrary bytes to a 32-byte digest.
pub fn hash(data: &[u8]) -> Hash32 {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    let out = hasher.finalize();
    Hash32::from_slice(&out).expect("Blake2b<U32> always outputs 32 bytes")
}

/// Hashes the concatenation of several byte slices, avoiding an
/// intermediate allocation — used for the Pulse message-signing domain
/// (`top_block_hash || quorum_position || round || payload`).
pub fn hash_concat(parts: &[&[u8]]) -> Hash32 {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    let out = hasher.finalize();
    Hash32::from_slice(&out).expect("Blake2b<U32> always outputs 32 bytes")
}

/// Domain-separated seed digest used to initialise the quorum generator's
/// PRNG: `blake2b(type || block_hash_u32s)`.
pub fn quorum_seed_digest(quorum_type: u8, block_hash: &Hash32) -> Hash32 {
    hash_concat(&[&[quorum_type], block_hash.as_bytes()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        assert_eq!(hash(b"hello"), hash(b"hello"));
        assert_ne!(hash(b"hello"), hash(b"world"));
    }

    #[test]
    fn concat_matches_manual_concat() {
        let a = hash_concat(&[b"foo", b"bar"]);
        let b = hash(b"foobar");
        assert_eq!(a, b);
    }
}
