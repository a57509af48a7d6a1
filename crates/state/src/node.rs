//! [`NodeInfo`]: the per-service-node record.
//!
//! `NodeInfo` exposes no general `&mut self` API; the small `apply_*`
//! mutators below are the only way to change a field, and are meant to be
//! called only by `snsd-chaintsn`'s transition algorithm, which
//! clone-then-replaces the `Arc` held in the snapshot's node map
//! (copy-on-write) rather than mutating a shared instance in place.

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use snsd_primitives::{
    constants::{DECOMMISSION_MAX_CREDIT, UNASSIGNED_SWARM_ID},
    Address, Amount, BlsPublicKey, HardFork, KeyImage, Network, PubKey,
};

use crate::errors::StateError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct LockedContribution {
    pub key_image: KeyImage,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Contributor {
    pub address: Address,
    pub reserved: Amount,
    pub amount: Amount,
    pub locked_contributions: Vec<LockedContribution>,
}

impl Contributor {
    pub fn num_locked(&self) -> usize {
        self.locked_contributions.len()
    }
}

/// Ordering key used to rotate Pulse validator duty: nodes that validated
/// least recently (or never) sort first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
    BorshSerialize, BorshDeserialize,
)]
pub struct PulseSorter {
    pub last_height_validating_in_quorum: u64,
    pub quorum_index: u16,
}

/// Per-height obligations-quorum votes accumulated against a pending
/// state-change (see SPEC_FULL §10): concrete vote-tally bookkeeping
/// backing the "validate votes" step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct ObligationVotes {
    pub votes: BTreeMap<PubKey, bool>,
}

impl ObligationVotes {
    pub fn record(&mut self, voter: PubKey, approve: bool) {
        self.votes.insert(voter, approve);
    }

    pub fn approvals(&self) -> usize {
        self.votes.values().filter(|v| **v).count()
    }
}

/// Per-node network/reachability bookkeeping updated by uptime proofs,
/// consumed by the obligations quorum's worker testing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct ProofInfo {
    pub last_proof_timestamp: u64,
    pub public_ip: [u8; 4],
    pub storage_port: u16,
    pub quorumnet_port: u16,
    pub version: (u8, u8, u8),
    pub ed25519_pubkey: PubKey,
    pub x25519_pubkey: snsd_primitives::X25519PubKey,
    pub bls_pubkey: Option<BlsPublicKey>,
    /// Bounded reachability ping history consulted by obligations testing;
    /// `true` = reachable at that check. Oldest entries drop off the front.
    pub reachability_history: Vec<bool>,
}

impl ProofInfo {
    const MAX_HISTORY: usize = 16;

    pub fn record_reachable(&mut self, reachable: bool) {
        self.reachability_history.push(reachable);
        if self.reachability_history.len() > Self::MAX_HISTORY {
            self.reachability_history.remove(0);
        }
    }

    pub fn is_currently_reachable(&self) -> bool {
        self.reachability_history.last().copied().unwrap_or(true)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, BorshSerialize,
    BorshDeserialize, Default,
)]
pub enum NodeInfoVersion {
    #[default]
    V0,
    V1UnifiedPubkey,
    V2Eth,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct NodeInfo {
    pub staking_requirement: Amount,
    pub operator_address: Address,
    pub contributors: Vec<Contributor>,
    pub total_reserved: Amount,
    pub total_contributed: Amount,
    pub registration_height: u64,
    pub registration_hf_version: HardFork,
    pub last_reward_block_height: u64,
    pub last_reward_transaction_index: u32,
    /// Positive while active; `-|height|` while decommissioned.
    pub active_since_height: i64,
    pub last_decommission_height: u64,
    pub decommission_count: u32,
    pub recommission_credit: i64,
    pub last_ip_change_height: u64,
    pub swarm_id: u64,
    pub portions_for_operator: u64,
    pub requested_unlock_height: u64,
    pub pulse_sorter: PulseSorter,
    pub bls_public_key: Option<BlsPublicKey>,
    pub version: NodeInfoVersion,
    pub obligation_votes: ObligationVotes,
    pub proof: ProofInfo,
}

impl NodeInfo {
    pub fn is_active(&self) -> bool {
        self.active_since_height > 0
    }

    pub fn is_decommissioned(&self) -> bool {
        self.active_since_height < 0
    }

    pub fn is_fully_funded(&self) -> bool {
        self.total_contributed >= self.staking_requirement
    }

    pub fn is_payable(&self, height: u64, _net: Network) -> bool {
        self.is_active() && self.registration_height < height
    }

    pub fn total_num_locked_contributions(&self) -> usize {
        self.contributors.iter().map(|c| c.num_locked()).sum()
    }

    /// Validates a proposed state change against current status and
    /// minimum-height spacing rules, without applying it.
    pub fn can_transition_to_state(
        &self,
        _hf: HardFork,
        height: u64,
        proposed: NewNodeState,
    ) -> Result<(), StateError> {
        match proposed {
            NewNodeState::Decommission => {
                if !self.is_active() {
                    return Err(StateError::InvariantViolated(
                        "cannot decommission a node that is not active".into(),
                    ));
                }
            }
            NewNodeState::Recommission => {
                if !self.is_decommissioned() {
                    return Err(StateError::InvariantViolated(
                        "cannot recommission a node that is not decommissioned".into(),
                    ));
                }
            }
            NewNodeState::Deregister => {
                if self.requested_unlock_height != 0 && self.requested_unlock_height > height {
                    return Err(StateError::InvariantViolated(
                        "node already has a pending unlock".into(),
                    ));
                }
            }
            NewNodeState::IpChangePenalty => {
                if height < self.last_ip_change_height
                    + snsd_primitives::constants::IP_CHANGE_COOLDOWN_BLOCKS
                {
                    return Err(StateError::InvariantViolated(
                        "ip change penalty is on cooldown".into(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Applies a decommission transition (copy-on-write caller clones
    /// first); sets `active_since_height` negative and clears the swarm
    /// assignment (SPEC_FULL §4.2.2).
    pub fn apply_decommission(&mut self, height: u64) {
        self.active_since_height = -(height as i64);
        self.last_decommission_height = height;
        self.decommission_count += 1;
        self.swarm_id = UNASSIGNED_SWARM_ID;
    }

    /// Applies a recommission transition (see SPEC_FULL §10): credit grows
    /// by the number of blocks the node spent active before this
    /// decommission, capped at `DECOMMISSION_MAX_CREDIT`.
    pub fn apply_recommission(&mut self, height: u64, blocks_active: i64) {
        self.active_since_height = height as i64;
        self.recommission_credit =
            (self.recommission_credit + blocks_active).min(DECOMMISSION_MAX_CREDIT);
    }

    pub fn apply_ip_change_penalty(&mut self, height: u64) {
        self.last_ip_change_height = height;
    }

    /// Schedules this node's unlock if one isn't already pending (a second
    /// `key_image_unlock`/`RemovalRequest` against an already-scheduled node
    /// is a no-op, matching the "if not already set" rule).
    pub fn apply_request_unlock(&mut self, unlock_height: u64) {
        if self.requested_unlock_height == 0 {
            self.requested_unlock_height = unlock_height;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewNodeState {
    Decommission,
    Recommission,
    Deregister,
    IpChangePenalty,
}
