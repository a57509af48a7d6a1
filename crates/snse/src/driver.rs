//! `Snse`: the top-level service-node state driver (SPEC_FULL §4.5), built
//! around a `params`/`current`/`history` shape, generalized to the coarse
//! `sn_mutex`-guarded driver of SPEC_FULL §5: the whole current snapshot +
//! history live behind one lock held for the entirety of a block add,
//! never released mid-transition.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use snsd_primitives::{Amount, Network, PubKey, X25519PubKey};
use snsd_state::{history::DetachOutcome, node::ProofInfo, QuorumKind, StateHistory, StateSnapshot};

use crate::{
    errors::Error,
    pulse_verify::{has_enough_nodes_for_pulse, verify_pulse_block},
    reward::{validate_reward_split, RewardMode},
    types::{BatchedPayment, Block, Checkpoint, ReachabilityNet, RewardParts, Tx, UptimeProof, UptimeProofOutcome},
};

impl snsd_chaintsn::context::BlockContext for Block {
    fn height(&self) -> u64 {
        self.height
    }
    fn timestamp(&self) -> u64 {
        self.timestamp
    }
    fn parent_hash(&self) -> snsd_primitives::Hash32 {
        self.parent_hash
    }
    fn block_hash(&self) -> snsd_primitives::Hash32 {
        self.hash
    }
    fn pulse_round(&self) -> u32 {
        self.pulse.as_ref().map(|p| p.round).unwrap_or(0)
    }
    fn network(&self) -> Network {
        // Caller-level concern: the network a block belongs to is fixed
        // for the whole daemon, not carried per-block. `Snse::net` is the
        // source of truth; this default only matters for unit tests that
        // construct a `Block` directly.
        Network::Mainnet
    }
}

/// Minimum interval, in seconds, between accepted uptime proofs from the
/// same node (half of `UPTIME_PROOF_FREQUENCY_SECS`, per SPEC_FULL §4.5).
const UPTIME_PROOF_MIN_INTERVAL_SECS: u64 =
    snsd_primitives::constants::UPTIME_PROOF_FREQUENCY_SECS / 2;

struct Inner {
    current: Arc<StateSnapshot>,
    history: StateHistory,
}

/// Applies blocks/txs to produce successive [`StateSnapshot`]s, validates
/// coinbase and Pulse blocks, and tracks uptime proofs.
pub struct Snse {
    net: Network,
    inner: Mutex<Inner>,
}

impl Snse {
    pub fn new(net: Network, max_short_term: u64) -> Self {
        Self {
            net,
            inner: Mutex::new(Inner {
                current: Arc::new(StateSnapshot::genesis()),
                history: StateHistory::new(max_short_term),
            }),
        }
    }

    pub fn current(&self) -> Arc<StateSnapshot> {
        self.inner.lock().current.clone()
    }

    /// Applies `block`/`txs` to the current snapshot, validating the
    /// coinbase and (if present) the Pulse signature set first. On success
    /// the new snapshot becomes current and is inserted into history.
    pub fn block_add(
        &self,
        block: &Block,
        _txs: &[Tx],
        ops: &snsd_chaintsn::transition::BlockOps,
        reward_parts: &RewardParts,
        batched: &[BatchedPayment],
        _checkpoint: Option<&Checkpoint>,
    ) -> Result<(), Error> {
        let mut guard = self.inner.lock();

        if let Some(pulse) = &block.pulse {
            let quorum = guard
                .current
                .quorum(QuorumKind::Pulse)
                .ok_or_else(|| Error::ConsensusMismatch("no pulse quorum to verify against".into()))?;
            verify_pulse_block(block, pulse, quorum)?;
        } else if has_enough_nodes_for_pulse(guard.current.active_nodes().len()) && block.hf.has_pulse() {
            return Err(Error::ConsensusMismatch(
                "miner block submitted while a pulse quorum was achievable".into(),
            ));
        }

        self.validate_miner_tx_locked(&guard.current, block, reward_parts, batched)?;

        let next = snsd_chaintsn::transition::update_from_block(&guard.current, block, block.hf, ops)?;
        let next = Arc::new(next);
        guard.history.insert(next.clone());
        guard.current = next;
        Ok(())
    }

    /// Detaches history back to `height` on a reorg, per §4.3.
    pub fn blockchain_detached(&self, height: u64) -> Result<(), Error> {
        let mut guard = self.inner.lock();
        match guard.history.detach(height) {
            DetachOutcome::Truncated { new_head_height } => {
                info!(new_head_height, "blockchain detached, history truncated");
                let restored = guard.history.get(new_head_height);
                guard.current = restored.unwrap_or_else(|| Arc::new(StateSnapshot::genesis()));
                Ok(())
            }
            DetachOutcome::Rescan => {
                warn!("blockchain detached past retained history, full rescan required");
                guard.current = Arc::new(StateSnapshot::genesis());
                Ok(())
            }
        }
    }

    /// Computes an alt-chain snapshot without committing it as current.
    pub fn alt_block_add(
        &self,
        block: &Block,
        _txs: &[Tx],
        ops: &snsd_chaintsn::transition::BlockOps,
        _checkpoint: Option<&Checkpoint>,
    ) -> Result<Arc<StateSnapshot>, Error> {
        let mut guard = self.inner.lock();
        let parent = guard
            .history
            .alt_state()
            .get(&block.parent_hash)
            .cloned()
            .unwrap_or_else(|| guard.current.clone());
        let next = snsd_chaintsn::transition::update_from_block(&parent, block, block.hf, ops)?;
        let next = Arc::new(next);
        guard.history.insert_alt(next.clone());
        Ok(next)
    }

    pub fn validate_miner_tx(
        &self,
        block: &Block,
        reward_parts: &RewardParts,
        batched: &[BatchedPayment],
    ) -> Result<(), Error> {
        let guard = self.inner.lock();
        self.validate_miner_tx_locked(&guard.current, block, reward_parts, batched)
    }

    fn validate_miner_tx_locked(
        &self,
        current: &StateSnapshot,
        block: &Block,
        reward_parts: &RewardParts,
        batched: &[BatchedPayment],
    ) -> Result<(), Error> {
        let is_pulse_block = block.pulse.is_some();
        let producer_is_leader = block.pulse.is_some() && current.block_leader == block.miner;
        let mode = RewardMode::for_block(block.hf, is_pulse_block, producer_is_leader);

        let sn_total = self.net.staking_requirement(block.height);
        let miner_fee = Amount::ZERO;
        let max_contributors = block.hf.max_contributors();

        validate_reward_split(mode, block.hf, reward_parts, batched, sn_total, miner_fee, max_contributors)?;

        if let Some(winner) = current.get_next_block_leader() {
            crate::reward::check_winner_tail(block.hf, winner, block.sn_winner_tail)?;
        }
        Ok(())
    }

    pub fn validate_pulse_block(&self, block: &Block) -> Result<(), Error> {
        let guard = self.inner.lock();
        let Some(pulse) = &block.pulse else {
            return Err(Error::InternalLogicError("block has no pulse payload".into()));
        };
        let quorum = guard
            .current
            .quorum(QuorumKind::Pulse)
            .ok_or_else(|| Error::ConsensusMismatch("no pulse quorum available".into()))?;
        verify_pulse_block(block, pulse, quorum)
    }

    /// Validates and records an uptime proof, rate-limited to once per
    /// [`UPTIME_PROOF_MIN_INTERVAL_SECS`] per node.
    pub fn handle_uptime_proof(&self, proof: &UptimeProof, now: u64) -> Result<UptimeProofOutcome, Error> {
        let mut guard = self.inner.lock();
        let Some(node) = guard.current.get_node(&proof.primary_pubkey) else {
            return Err(Error::InvalidRegistration(
                "uptime proof for unknown node".into(),
            ));
        };

        if now.saturating_sub(node.proof.last_proof_timestamp) < UPTIME_PROOF_MIN_INTERVAL_SECS {
            return Ok(UptimeProofOutcome {
                accepted: false,
                my_confirmation: false,
                new_x25519_pk: None,
            });
        }

        snsd_crypto::ed25519::verify(&proof.ed25519_pubkey, &proof_signing_bytes(proof), &proof.signature)
            .map_err(|e| Error::InvalidRegistration(format!("uptime proof signature invalid: {e}")))?;

        let x25519_changed = node.proof.x25519_pubkey != proof.x25519_pubkey;
        let mut next_node = (**node).clone();
        next_node.proof = ProofInfo {
            last_proof_timestamp: now,
            public_ip: proof.public_ip,
            storage_port: proof.storage_port,
            quorumnet_port: proof.quorumnet_port,
            version: proof.version,
            ed25519_pubkey: proof.ed25519_pubkey,
            x25519_pubkey: proof.x25519_pubkey,
            bls_pubkey: proof.bls_pubkey.or(node.proof.bls_pubkey),
            reachability_history: node.proof.reachability_history.clone(),
        };

        let mut nodes = guard.current.nodes.clone();
        nodes.insert(proof.primary_pubkey, Arc::new(next_node));
        let mut x25519_map = guard.current.x25519_map.clone();
        x25519_map.insert(proof.x25519_pubkey, proof.primary_pubkey);

        let replacement = StateSnapshot::from_parts(
            guard.current.height,
            guard.current.block_hash,
            nodes,
            guard.current.quorums.clone(),
            guard.current.key_image_blacklist.clone(),
            guard.current.pending_l2.clone(),
            guard.current.recently_expired.clone(),
            guard.current.pending_refunds.clone(),
            x25519_map,
            guard.current.block_leader,
        );
        guard.current = Arc::new(replacement);

        Ok(UptimeProofOutcome {
            accepted: true,
            my_confirmation: true,
            new_x25519_pk: if x25519_changed { Some(proof.x25519_pubkey) } else { None },
        })
    }

    /// Records a reachability observation for `pubkey` from `net`, consumed
    /// by obligations-quorum worker testing.
    pub fn set_peer_reachable(&self, _net: ReachabilityNet, pubkey: &PubKey, reachable: bool) {
        let mut guard = self.inner.lock();
        let Some(node) = guard.current.get_node(pubkey) else {
            return;
        };
        let mut next_node = (**node).clone();
        next_node.proof.record_reachable(reachable);
        let mut nodes = guard.current.nodes.clone();
        nodes.insert(*pubkey, Arc::new(next_node));
        let replacement = StateSnapshot::from_parts(
            guard.current.height,
            guard.current.block_hash,
            nodes,
            guard.current.quorums.clone(),
            guard.current.key_image_blacklist.clone(),
            guard.current.pending_l2.clone(),
            guard.current.recently_expired.clone(),
            guard.current.pending_refunds.clone(),
            guard.current.x25519_map.clone(),
            guard.current.block_leader,
        );
        guard.current = Arc::new(replacement);
    }
}

fn proof_signing_bytes(proof: &UptimeProof) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(proof.primary_pubkey.as_bytes());
    buf.extend_from_slice(&proof.timestamp.to_le_bytes());
    buf.extend_from_slice(&proof.public_ip);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use snsd_primitives::Hash32;

    #[test]
    fn genesis_snse_has_no_current_nodes() {
        let snse = Snse::new(Network::Devnet, 1000);
        assert!(snse.current().active_nodes().is_empty());
    }

    #[test]
    fn empty_block_advances_height() {
        let snse = Snse::new(Network::Devnet, 1000);
        let block = Block {
            height: 1,
            hash: Hash32::new([1u8; 32]),
            parent_hash: Hash32::default(),
            timestamp: 1000,
            miner: None,
            hf: snsd_primitives::HardFork::Hf12,
            pulse: None,
            sn_winner_tail: None,
        };
        let ops = snsd_chaintsn::transition::BlockOps::default();
        let reward_parts = RewardParts {
            miner_output: Some(crate::types::RewardOutput {
                recipient: PubKey::default(),
                amount: Amount::ZERO,
            }),
            sn_outputs: vec![],
            governance_output: Some(crate::types::RewardOutput {
                recipient: PubKey::default(),
                amount: Amount::ZERO,
            }),
        };
        snse.block_add(&block, &[], &ops, &reward_parts, &[], None).unwrap();
        assert_eq!(snse.current().height, 1);
    }

    #[test]
    fn uptime_proof_for_unknown_node_is_rejected() {
        let snse = Snse::new(Network::Devnet, 1000);
        let proof = UptimeProof {
            primary_pubkey: PubKey::new([9u8; 32]),
            timestamp: 100,
            public_ip: [0, 0, 0, 0],
            storage_port: 1,
            quorumnet_port: 2,
            version: (1, 0, 0),
            ed25519_pubkey: PubKey::new([9u8; 32]),
            x25519_pubkey: X25519PubKey::default(),
            bls_pubkey: None,
            signature: snsd_primitives::Signature::default(),
        };
        assert!(snse.handle_uptime_proof(&proof, 100).is_err());
    }
}
