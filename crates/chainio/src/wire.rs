//! Pulse round wire messages (SPEC_FULL §6). All payload variants sign over
//! `(top_block_hash, quorum_position, round, payload)`; the message struct
//! carries the signature alongside the already-assembled domain.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use snsd_primitives::{Hash32, Signature};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum PulsePayload {
    Handshake,
    HandshakeBitset(u16),
    BlockTemplate(Vec<u8>),
    RandomValueHash([u8; 32]),
    RandomValue([u8; 32]),
    SignedBlock(Signature),
}

impl PulsePayload {
    /// Short tag used only for logging/metrics, not part of the signed
    /// domain (the full payload already is).
    pub fn kind_name(&self) -> &'static str {
        match self {
            PulsePayload::Handshake => "handshake",
            PulsePayload::HandshakeBitset(_) => "handshake_bitset",
            PulsePayload::BlockTemplate(_) => "block_template",
            PulsePayload::RandomValueHash(_) => "random_value_hash",
            PulsePayload::RandomValue(_) => "random_value",
            PulsePayload::SignedBlock(_) => "signed_block",
        }
    }
}

/// A single signed Pulse-round message exchanged via [`crate::traits::QuorumNet`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct PulseMessage {
    pub top_block_hash: Hash32,
    pub quorum_position: u16,
    pub round: u32,
    pub payload: PulsePayload,
    pub signature: Signature,
}

impl PulseMessage {
    /// Bytes covered by the signature: everything except the signature
    /// itself, borsh-encoded in field order.
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(self.top_block_hash.as_bytes());
        buf.extend_from_slice(&self.quorum_position.to_le_bytes());
        buf.extend_from_slice(&self.round.to_le_bytes());
        borsh::to_writer(&mut buf, &self.payload).expect("Vec<u8> writer never fails");
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signing_bytes_change_with_round() {
        let base = PulseMessage {
            top_block_hash: Hash32::new([1u8; 32]),
            quorum_position: 0,
            round: 0,
            payload: PulsePayload::Handshake,
            signature: Signature::default(),
        };
        let mut bumped = base.clone();
        bumped.round = 1;
        assert_ne!(base.signing_bytes(), bumped.signing_bytes());
    }

    #[test]
    fn kind_name_matches_variant() {
        assert_eq!(PulsePayload::RandomValue([0u8; 32]).kind_name(), "random_value");
    }
}
