//! Versioned persistence record shapes for the auxiliary KV slot a
//! [`crate::traits::ChainStore`] implementation exposes (SPEC_FULL §6).
//!
//! `snsd_state::history` encodes `StateHistory` itself through its own
//! self-contained Borsh DTOs (to avoid this crate depending back on
//! `snsd-state`); the shapes here describe the wire-level layout a
//! `ChainStore` backend would actually store those bytes under, plus the
//! one record `snsd-state` does not cover: per-node uptime `ProofInfo`
//! persisted independently of a full snapshot so a restart does not lose
//! recent reachability history.

use borsh::{BorshDeserialize, BorshSerialize};

use snsd_primitives::PubKey;

pub const SHORT_TERM_BLOB_KEY: &str = "snse/short_term_blob";
pub const LONG_TERM_BLOB_KEY: &str = "snse/long_term_blob";
pub const PROOF_INFO_PREFIX: &str = "snse/proof_info/";

/// Opaque container for the bytes `snsd_state::history::StateHistory::save`
/// produces; `ChainStore` implementations store and retrieve this under
/// [`SHORT_TERM_BLOB_KEY`] without needing to understand its contents.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ShortTermBlob {
    pub version: u8,
    pub bytes: Vec<u8>,
}

/// Same idea as [`ShortTermBlob`] for the archive half, stored under
/// [`LONG_TERM_BLOB_KEY`].
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct LongTermBlob {
    pub version: u8,
    pub bytes: Vec<u8>,
}

/// Per-node uptime-proof record, persisted keyed by primary pubkey under
/// `PROOF_INFO_PREFIX || hex(pubkey)` so a restart does not re-derive
/// reachability history from scratch.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ProofInfoRecord {
    pub version: u8,
    pub primary_pubkey: PubKey,
    pub last_proof_timestamp: u64,
    pub reachability_history: Vec<bool>,
}

impl ProofInfoRecord {
    pub fn aux_key(primary_pubkey: &PubKey) -> String {
        format!("{PROOF_INFO_PREFIX}{primary_pubkey}")
    }
}
