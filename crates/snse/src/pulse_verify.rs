//! Pulse block verification (SPEC_FULL §4.5.2). Grounded on the
//! verify-signature-against-quorum pattern used throughout the crypto
//! wrappers in `snsd-crypto`.

use snsd_crypto::ed25519;
use snsd_primitives::constants::{PULSE_BLOCK_REQUIRED_SIGNATURES, PULSE_ROUND_TIMEOUT_SECS};
use snsd_state::Quorum;

use crate::{errors::Error, types::{Block, PulseBlockInfo}};

/// Verifies a Pulse block's signature set and timing against the quorum
/// that should have produced it.
pub fn verify_pulse_block(block: &Block, pulse: &PulseBlockInfo, quorum: &Quorum) -> Result<(), Error> {
    let bits_set = pulse.validator_bitset.count_ones() as usize;
    if bits_set < PULSE_BLOCK_REQUIRED_SIGNATURES {
        return Err(Error::ConsensusMismatch(format!(
            "validator_bitset has {bits_set} bits set, need {PULSE_BLOCK_REQUIRED_SIGNATURES}"
        )));
    }
    if pulse.signatures.len() != PULSE_BLOCK_REQUIRED_SIGNATURES {
        return Err(Error::ConsensusMismatch(format!(
            "expected exactly {PULSE_BLOCK_REQUIRED_SIGNATURES} signatures, got {}",
            pulse.signatures.len()
        )));
    }

    for sig in &pulse.signatures {
        let voter = quorum
            .validators
            .get(sig.voter_index as usize)
            .ok_or_else(|| Error::ConsensusMismatch(format!("signature voter_index {} out of range", sig.voter_index)))?;
        ed25519::verify(voter, block.hash.as_bytes(), &sig.signature)
            .map_err(|e| Error::ConsensusMismatch(format!("signature verification failed: {e}")))?;
    }

    let round_start = pulse.r0_timestamp + pulse.round as u64 * PULSE_ROUND_TIMEOUT_SECS;
    let round_end = round_start + PULSE_ROUND_TIMEOUT_SECS;
    if block.timestamp < round_start || block.timestamp > round_end {
        return Err(Error::ConsensusMismatch(format!(
            "block timestamp {} outside round window [{round_start}, {round_end}]",
            block.timestamp
        )));
    }

    if pulse.nonce != 0 {
        return Err(Error::ConsensusMismatch(
            "nonzero nonce on a pulse block".into(),
        ));
    }

    Ok(())
}

/// Whether the active set is large enough to attempt a Pulse quorum at
/// all; if not, the block must fall back to a miner-produced block with a
/// nonzero nonce.
pub fn has_enough_nodes_for_pulse(active_count: usize) -> bool {
    active_count >= snsd_primitives::constants::PULSE_MIN_SERVICE_NODES
}

#[cfg(test)]
mod tests {
    use super::*;
    use snsd_primitives::{Hash32, HardFork, PubKey};
    use snsd_state::QuorumKind;

    fn sample_block(ts: u64) -> Block {
        Block {
            height: 10,
            hash: Hash32::new([1u8; 32]),
            parent_hash: Hash32::default(),
            timestamp: ts,
            miner: None,
            hf: HardFork::Hf16Pulse,
            pulse: None,
            sn_winner_tail: None,
        }
    }

    #[test]
    fn rejects_insufficient_bitset() {
        let quorum = Quorum::new(QuorumKind::Pulse, (0..11).map(|b| PubKey::new([b; 32])).collect(), vec![]);
        let pulse = PulseBlockInfo {
            round: 0,
            r0_timestamp: 1000,
            validator_bitset: 0b1,
            signatures: vec![],
            nonce: 0,
        };
        let block = sample_block(1000);
        assert!(verify_pulse_block(&block, &pulse, &quorum).is_err());
    }

    #[test]
    fn rejects_out_of_window_timestamp() {
        let quorum = Quorum::new(QuorumKind::Pulse, (0..11).map(|b| PubKey::new([b; 32])).collect(), vec![]);
        let sigs: Vec<_> = (0..PULSE_BLOCK_REQUIRED_SIGNATURES)
            .map(|i| crate::types::PulseSignature { voter_index: i as u16, signature: snsd_primitives::Signature::default() })
            .collect();
        let pulse = PulseBlockInfo {
            round: 0,
            r0_timestamp: 1000,
            validator_bitset: 0b0111_1111,
            signatures: sigs,
            nonce: 0,
        };
        let block = sample_block(5000);
        let err = verify_pulse_block(&block, &pulse, &quorum);
        assert!(err.is_err());
    }

    #[test]
    fn pulse_min_nodes_threshold() {
        assert!(!has_enough_nodes_for_pulse(5));
        assert!(has_enough_nodes_for_pulse(11));
    }
}
