//! [`StateSnapshot`]: C2 of the design spec, an immutable value object keyed
//! by height.
//!
//! The actual `update_from_block` transition algorithm lives in
//! `snsd-chaintsn` (which depends on this crate), since it also needs the
//! quorum generator (C4) and sits above `StateSnapshot` in the dependency
//! order of SPEC_FULL §2. This module provides the pure, `&self` query
//! surface plus the `pub(crate)`-visible builder the transition algorithm
//! drives through [`crate::node::NodeInfo`]'s copy-on-write mutators.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, OnceLock},
};

use snsd_primitives::{Amount, BlsPublicKey, Hash32, Network, PubKey, X25519PubKey};

use crate::{
    node::NodeInfo,
    quorum::{Quorum, QuorumKind, Quorums},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyImageBlacklistEntry {
    pub key_image: snsd_primitives::KeyImage,
    pub unlock_height: u64,
    pub amount: Amount,
}

/// A node expired from the registry, kept around briefly so a late-arriving
/// `RemovalRequest`/`Removal` L2 event can still resolve its BLS pubkey.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentlyExpiredEntry {
    pub bls_public_key: BlsPublicKey,
    pub ttl_height: u64,
}

/// A removal refund owed to an operator, matured and paid out by the wallet
/// layer once `due_height` is reached; tracked here only as bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRefund {
    pub operator: PubKey,
    pub amount: Amount,
    pub due_height: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum L2EventKind {
    NewServiceNode,
    RemovalRequest,
    Removal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingL2Event {
    pub height_added: u64,
    pub confirmations: u64,
    pub denials: u64,
    pub initial_score: u64,
    pub kind: L2EventKind,
}

impl PendingL2Event {
    pub fn is_expired(&self, height: u64, max_age: u64) -> bool {
        height.saturating_sub(self.height_added) > max_age
    }
}

/// An immutable service-node registry snapshot at a given height.
///
/// Cloning a [`StateSnapshot`] is cheap in the sense that matters for this
/// spec: consumers hold it behind `Arc<StateSnapshot>`, never clone the
/// whole map to mutate one entry. Internal node mutation during a
/// transition is always clone-one-entry, replace-the-Arc, never in place.
#[derive(Debug)]
pub struct StateSnapshot {
    pub height: u64,
    pub block_hash: Hash32,
    pub nodes: BTreeMap<PubKey, Arc<NodeInfo>>,
    pub quorums: Quorums,
    pub key_image_blacklist: Vec<KeyImageBlacklistEntry>,
    pub pending_l2: BTreeMap<Hash32, PendingL2Event>,
    pub recently_expired: Vec<RecentlyExpiredEntry>,
    pub pending_refunds: Vec<PendingRefund>,
    pub x25519_map: HashMap<X25519PubKey, PubKey>,
    pub block_leader: Option<PubKey>,
    next_block_leader: OnceLock<Option<PubKey>>,
}

impl Clone for StateSnapshot {
    /// The cached next-block-leader is deliberately not carried over: a
    /// clone is conceptually a new value and recomputes it lazily, which
    /// also sidesteps `OnceLock` not being `Clone`-derivable here.
    fn clone(&self) -> Self {
        Self {
            height: self.height,
            block_hash: self.block_hash,
            nodes: self.nodes.clone(),
            quorums: self.quorums.clone(),
            key_image_blacklist: self.key_image_blacklist.clone(),
            pending_l2: self.pending_l2.clone(),
            recently_expired: self.recently_expired.clone(),
            pending_refunds: self.pending_refunds.clone(),
            x25519_map: self.x25519_map.clone(),
            block_leader: self.block_leader,
            next_block_leader: OnceLock::new(),
        }
    }
}

impl StateSnapshot {
    pub fn genesis() -> Self {
        Self {
            height: 0,
            block_hash: Hash32::default(),
            nodes: BTreeMap::new(),
            quorums: Quorums::default(),
            key_image_blacklist: Vec::new(),
            pending_l2: BTreeMap::new(),
            recently_expired: Vec::new(),
            pending_refunds: Vec::new(),
            x25519_map: HashMap::new(),
            block_leader: None,
            next_block_leader: OnceLock::new(),
        }
    }

    /// Constructs a snapshot from scratch (used by history load and by the
    /// transition algorithm in `snsd-chaintsn` once it has computed the
    /// next state). Never called directly to "edit" an existing snapshot.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        height: u64,
        block_hash: Hash32,
        nodes: BTreeMap<PubKey, Arc<NodeInfo>>,
        quorums: Quorums,
        key_image_blacklist: Vec<KeyImageBlacklistEntry>,
        pending_l2: BTreeMap<Hash32, PendingL2Event>,
        recently_expired: Vec<RecentlyExpiredEntry>,
        pending_refunds: Vec<PendingRefund>,
        x25519_map: HashMap<X25519PubKey, PubKey>,
        block_leader: Option<PubKey>,
    ) -> Self {
        Self {
            height,
            block_hash,
            nodes,
            quorums,
            key_image_blacklist,
            pending_l2,
            recently_expired,
            pending_refunds,
            x25519_map,
            block_leader,
            next_block_leader: OnceLock::new(),
        }
    }

    pub fn active_nodes(&self) -> Vec<(&PubKey, &Arc<NodeInfo>)> {
        let mut v: Vec<_> = self.nodes.iter().filter(|(_, n)| n.is_active()).collect();
        v.sort_by_key(|(pk, _)| **pk);
        v
    }

    pub fn decommissioned_nodes(&self) -> Vec<(&PubKey, &Arc<NodeInfo>)> {
        let mut v: Vec<_> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.is_decommissioned() && n.is_fully_funded())
            .collect();
        v.sort_by_key(|(pk, _)| **pk);
        v
    }

    pub fn payable_nodes(&self, height: u64, net: Network) -> Vec<(&PubKey, &Arc<NodeInfo>)> {
        let mut v: Vec<_> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.is_payable(height, net))
            .collect();
        v.sort_by_key(|(pk, _)| **pk);
        v
    }

    /// Tuple-min over active nodes on `(last_reward_block_height,
    /// last_reward_transaction_index, pubkey)`, cached for the lifetime of
    /// this snapshot.
    pub fn get_next_block_leader(&self) -> Option<PubKey> {
        *self.next_block_leader.get_or_init(|| {
            self.active_nodes()
                .into_iter()
                .min_by_key(|(pk, n)| (n.last_reward_block_height, n.last_reward_transaction_index, **pk))
                .map(|(pk, _)| *pk)
        })
    }

    pub fn quorum(&self, kind: QuorumKind) -> Option<&Quorum> {
        match kind {
            QuorumKind::Pulse => self.quorums.pulse.as_ref(),
            QuorumKind::Obligations => self.quorums.obligations.as_ref(),
            QuorumKind::Checkpointing => self.quorums.checkpointing.as_ref(),
            QuorumKind::Blink => self.quorums.blink.as_ref(),
        }
    }

    pub fn get_node(&self, pubkey: &PubKey) -> Option<&Arc<NodeInfo>> {
        self.nodes.get(pubkey)
    }
}
