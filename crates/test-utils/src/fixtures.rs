//! Fixed-entropy fixtures for the Pulse quorum determinism golden test:
//! given the same entropy hash and active set, `generate_pulse_quorum` must
//! always produce the same quorum, so the fixture pins the entropy and the
//! active set's pubkeys instead of drawing them from `OsRng`.

use snsd_primitives::PubKey;
use snsd_state::node::PulseSorter;

/// 20 sequential pubkeys `0x01.., 0x02.., ..., 0x14..` used as the active
/// set for the golden quorum-generation test. Sequential rather than random
/// so a diff against a new golden output is readable byte-for-byte.
pub fn sequential_active_set(count: usize) -> Vec<(PubKey, PulseSorter)> {
    (1..=count as u8)
        .map(|b| {
            let mut bytes = [0u8; 32];
            bytes[0] = b;
            (
                PubKey::from_slice(&bytes).expect("32-byte buffer"),
                PulseSorter::default(),
            )
        })
        .collect()
}

/// The entropy hash used by scenario S5: bytes `0x01, 0x02, ..., 0x20`.
pub fn golden_entropy_hash() -> snsd_primitives::Hash32 {
    let mut bytes = [0u8; 32];
    for (i, b) in bytes.iter_mut().enumerate() {
        *b = (i + 1) as u8;
    }
    snsd_primitives::Hash32::from_slice(&bytes).expect("32-byte buffer")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_active_set_is_sorted_ascending() {
        let set = sequential_active_set(20);
        assert_eq!(set.len(), 20);
        for pair in set.windows(2) {
            assert!(pair[0].0 < pair[1].0);
        }
    }
}
