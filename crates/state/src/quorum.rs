//! Quorum value types shared by [`crate::snapshot::StateSnapshot`] and the
//! quorum generator in `snsd-chaintsn`.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use snsd_primitives::PubKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum QuorumKind {
    Pulse,
    Obligations,
    Checkpointing,
    Blink,
}

impl QuorumKind {
    /// Domain-separation tag mixed into the PRNG seed digest, matching the
    /// `type` discriminant described in SPEC_FULL §4.4 step 1.
    pub fn domain_tag(self) -> u8 {
        match self {
            QuorumKind::Pulse => 0,
            QuorumKind::Obligations => 1,
            QuorumKind::Checkpointing => 2,
            QuorumKind::Blink => 3,
        }
    }
}

/// A deterministically-selected subset of active service nodes assigned a
/// role for one height (or height/round for Pulse).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Quorum {
    pub kind: QuorumKind,
    pub validators: Vec<PubKey>,
    pub workers: Vec<PubKey>,
}

impl Quorum {
    pub fn new(kind: QuorumKind, validators: Vec<PubKey>, workers: Vec<PubKey>) -> Self {
        Self {
            kind,
            validators,
            workers,
        }
    }

    pub fn position_of(&self, pubkey: &PubKey) -> Option<usize> {
        self.validators.iter().position(|p| p == pubkey)
    }

    pub fn contains_validator(&self, pubkey: &PubKey) -> bool {
        self.validators.contains(pubkey)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Quorums {
    pub pulse: Option<Quorum>,
    pub obligations: Option<Quorum>,
    pub checkpointing: Option<Quorum>,
    pub blink: Option<Quorum>,
}
