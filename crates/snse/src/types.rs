//! Minimal data carriers for the block/tx/proof shapes SNSE consumes.
//!
//! Full block validation, the fork-choice rule, and tx-pool admission are
//! explicitly out of scope (SPEC_FULL §1); these structs only carry the
//! fields the state transition and coinbase/pulse validation actually read,
//! not a complete block format.

use snsd_primitives::{Amount, Hash32, HardFork, PubKey};

#[derive(Debug, Clone)]
pub struct PulseBlockInfo {
    pub round: u32,
    pub r0_timestamp: u64,
    pub validator_bitset: u16,
    pub signatures: Vec<PulseSignature>,
    pub nonce: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct PulseSignature {
    pub voter_index: u16,
    pub signature: snsd_primitives::Signature,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub height: u64,
    pub hash: Hash32,
    pub parent_hash: Hash32,
    pub timestamp: u64,
    pub miner: Option<PubKey>,
    pub hf: HardFork,
    pub pulse: Option<PulseBlockInfo>,
    pub sn_winner_tail: Option<[u8; 4]>,
}

#[derive(Debug, Clone)]
pub struct Tx {
    pub hash: Hash32,
}

#[derive(Debug, Clone)]
pub struct Checkpoint {
    pub height: u64,
    pub block_hash: Hash32,
}

#[derive(Debug, Clone)]
pub struct NodeKeys {
    pub primary_pubkey: PubKey,
}

#[derive(Debug, Clone)]
pub struct UptimeProof {
    pub primary_pubkey: PubKey,
    pub timestamp: u64,
    pub public_ip: [u8; 4],
    pub storage_port: u16,
    pub quorumnet_port: u16,
    pub version: (u8, u8, u8),
    pub ed25519_pubkey: PubKey,
    pub x25519_pubkey: snsd_primitives::X25519PubKey,
    pub bls_pubkey: Option<snsd_primitives::BlsPublicKey>,
    pub signature: snsd_primitives::Signature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReachabilityNet {
    ServiceNode,
    Lokinet,
}

#[derive(Debug, Clone)]
pub struct RewardOutput {
    pub recipient: PubKey,
    pub amount: Amount,
}

#[derive(Debug, Clone, Default)]
pub struct RewardParts {
    pub miner_output: Option<RewardOutput>,
    pub sn_outputs: Vec<RewardOutput>,
    pub governance_output: Option<RewardOutput>,
}

#[derive(Debug, Clone)]
pub struct BatchedPayment {
    pub recipient: PubKey,
    pub vout_amount: u64,
    pub out_index: u32,
}

/// Outcome of [`crate::driver::Snse::handle_uptime_proof`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UptimeProofOutcome {
    pub accepted: bool,
    pub my_confirmation: bool,
    pub new_x25519_pk: Option<snsd_primitives::X25519PubKey>,
}
