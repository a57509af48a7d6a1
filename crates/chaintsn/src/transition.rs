//! `update_from_block`: the ordered state transition algorithm, tying
//! together registration, stake, state-change, L2 event, swarm, and
//! quorum-generation logic into one pure function from `(prior snapshot,
//! block, ops)` to the next snapshot.
//!
//! Order of operations within a block:
//! 1. Validate height and parent linkage.
//! 2. Apply confirmed registrations (new nodes).
//! 3. Apply stake contributions.
//! 4. Apply key-image-unlock txs (pre-ETH): schedule the matching locked
//!    contribution's node for unlock.
//! 5. Apply state-change txs (decommission/recommission/deregister/ip
//!    penalty), each gated on its obligations-quorum signature set.
//! 6. Tally L2 event votes and materialize/evict nodes whose event just
//!    crossed a threshold.
//! 7. Expire nodes whose lock period has elapsed or whose scheduled unlock
//!    height has been reached, and stale pending L2 events / key-image
//!    blacklist / recently-expired / pending-refund entries.
//! 8. Re-run swarm partitioning over whatever activated/deactivated this
//!    block.
//! 9. Resolve the block leader for the block about to follow this one, and
//!    bump the outgoing winner's reward-rotation bookkeeping.
//! 10. Regenerate all four quorums from the new node set.

use std::{collections::BTreeMap, sync::Arc};

use snsd_primitives::{
    constants::{DEREGISTRATION_LOCK_DURATION, ETH_REMOVAL_BUFFER, L2_MAX_AGE_BLOCKS, UNLOCK_DURATION},
    Amount, Hash32, HardFork, KeyImage, PubKey,
};
use snsd_state::{
    node::{NewNodeState, NodeInfo},
    snapshot::{KeyImageBlacklistEntry, L2EventKind, PendingL2Event, PendingRefund, RecentlyExpiredEntry},
    QuorumKind, Quorums, StateSnapshot,
};

use crate::{
    checkin::{
        apply_key_image_unlock, apply_state_change, materialize_confirmed_registration, record_l2_vote,
        verify_quorum_signers, L2VoteOutcome,
    },
    context::BlockContext,
    errors::TsnError,
    leader::resolve_block_leader,
    quorum_gen::{generate_blink_quorum, generate_checkpoint_quorum, generate_obligations_quorum, generate_pulse_quorum},
    registration::{apply_stake, build_node_info, validate_registration, RegistrationTx, StakeTx},
    swarm::repartition,
};

/// One block's worth of parsed operations, already extracted from the
/// block's transactions by the caller (`snsd-snse`).
#[derive(Debug, Clone, Default)]
pub struct BlockOps {
    pub registrations: Vec<RegistrationTx>,
    pub stakes: Vec<StakeTx>,
    pub key_image_unlocks: Vec<KeyImageUnlockOp>,
    pub state_changes: Vec<StateChangeOp>,
    pub l2_votes: Vec<L2VoteOp>,
    pub fee_portions: u64,
    pub miner: Option<PubKey>,
}

#[derive(Debug, Clone)]
pub struct StateChangeOp {
    pub tx_hash: Hash32,
    pub target: PubKey,
    pub proposed: NewNodeState,
    pub signers: Vec<PubKey>,
}

/// Pre-ETH `key_image_unlock` tx: the contributor identifies their locked
/// stake by key image and requests it start unlocking.
#[derive(Debug, Clone)]
pub struct KeyImageUnlockOp {
    pub tx_hash: Hash32,
    pub key_image: KeyImage,
}

#[derive(Debug, Clone)]
pub struct L2VoteOp {
    pub event_hash: Hash32,
    pub kind: L2EventKind,
    pub target: Option<PubKey>,
    pub round: u32,
    pub approve: bool,
    pub registration: Option<RegistrationTx>,
    /// `Removal` only: stake actually returned to the node on L1/L2,
    /// compared against `staking_requirement` to size any refund shortfall.
    pub returned_amount: Option<Amount>,
}

/// Computes the next [`StateSnapshot`] from `prior` plus this block's
/// operations. On any `TsnError` the whole block is rejected and `prior` is
/// left untouched by the caller (this function never mutates its input).
pub fn update_from_block<C: BlockContext>(
    prior: &StateSnapshot,
    ctx: &C,
    hf: HardFork,
    ops: &BlockOps,
) -> Result<StateSnapshot, TsnError> {
    if ctx.height() != prior.height + 1 {
        return Err(TsnError::HeightMismatch {
            expected: prior.height + 1,
            got: ctx.height(),
        });
    }
    if prior.height > 0 && ctx.parent_hash() != prior.block_hash {
        return Err(TsnError::ParentMismatch);
    }

    let mut nodes: BTreeMap<PubKey, Arc<NodeInfo>> = prior.nodes.clone();
    let mut pending_l2 = prior.pending_l2.clone();
    let mut blacklist = prior.key_image_blacklist.clone();
    let mut recently_expired = prior.recently_expired.clone();
    let mut pending_refunds = prior.pending_refunds.clone();

    // 2. registrations (pre-ETH path: a registration tx is itself the
    // confirmation; ETH path registrations instead arrive as L2 votes,
    // handled below).
    if !hf.has_eth_transition() {
        for reg in &ops.registrations {
            validate_registration(hf, reg).map_err(|e| TsnError::InternalLogicError(e.to_string()))?;
            let node = build_node_info(hf, ctx.height(), ops.fee_portions, reg);
            let pubkey = match &reg.operator_address {
                snsd_primitives::Address::Native(pk) => *pk,
                snsd_primitives::Address::Ethereum(_) => {
                    return Err(TsnError::InternalLogicError(
                        "ethereum operator address pre-eth-transition".into(),
                    ))
                }
            };
            nodes.insert(pubkey, materialize_confirmed_registration(node));
        }
    }

    // 3. stakes
    for stake in &ops.stakes {
        let Some(existing) = nodes.get(&stake.target) else {
            return Err(TsnError::InternalLogicError(format!(
                "stake tx targets unknown node {}",
                stake.target
            )));
        };
        let next = apply_stake(hf, ctx.height(), existing, stake).map_err(|e| TsnError::InternalLogicError(e.to_string()))?;
        nodes.insert(stake.target, Arc::new(next));
    }

    // 4. key-image-unlock txs (pre-ETH): schedule the node whose locked
    // contribution carries the matching key image for unlock.
    if !hf.has_eth_transition() {
        for op in &ops.key_image_unlocks {
            let (target, next) = apply_key_image_unlock(&nodes, op.key_image, ctx.height() + UNLOCK_DURATION)
                .map_err(|e| TsnError::InternalLogicError(e.to_string()))?;
            nodes.insert(target, Arc::new(next));
        }
    }

    // 5. state changes, gated on the obligations quorum that was active
    // when the tx was authored.
    for change in &ops.state_changes {
        let Some(quorum) = prior.quorum(QuorumKind::Obligations) else {
            return Err(TsnError::InternalLogicError(
                "no obligations quorum available to validate state-change tx".into(),
            ));
        };
        verify_quorum_signers(quorum, &change.signers, change.tx_hash)
            .map_err(|e| TsnError::InternalLogicError(e.to_string()))?;
        let Some(existing) = nodes.get(&change.target) else {
            return Err(TsnError::InternalLogicError(format!(
                "state-change tx targets unknown node {}",
                change.target
            )));
        };
        if change.proposed == NewNodeState::Deregister {
            for contributor in &existing.contributors {
                for locked in &contributor.locked_contributions {
                    blacklist.push(KeyImageBlacklistEntry {
                        key_image: locked.key_image,
                        unlock_height: ctx.height() + DEREGISTRATION_LOCK_DURATION,
                        amount: locked.amount,
                    });
                }
            }
        }
        let next = apply_state_change(existing, hf, ctx.height(), change.proposed)
            .map_err(|e| TsnError::InternalLogicError(e.to_string()))?;
        nodes.insert(change.target, Arc::new(next));
    }

    // 6. L2 event votes (ETH-era only).
    for vote in &ops.l2_votes {
        let pending = pending_l2.entry(vote.event_hash).or_insert_with(|| PendingL2Event {
            height_added: ctx.height(),
            confirmations: 0,
            denials: 0,
            initial_score: 0,
            kind: vote.kind,
        });
        match record_l2_vote(pending, vote.round, vote.approve) {
            L2VoteOutcome::Confirmed => {
                pending_l2.remove(&vote.event_hash);
                match vote.kind {
                    L2EventKind::NewServiceNode => {
                        if let Some(reg) = &vote.registration {
                            validate_registration(hf, reg)
                                .map_err(|e| TsnError::InternalLogicError(e.to_string()))?;
                            let node = build_node_info(hf, ctx.height(), ops.fee_portions, reg);
                            if let snsd_primitives::Address::Ethereum(bytes) = reg.operator_address {
                                let pk = PubKey::from_slice(&[&bytes[..], &[0u8; 12]].concat())
                                    .unwrap_or_default();
                                nodes.insert(pk, materialize_confirmed_registration(node));
                            }
                        }
                    }
                    L2EventKind::RemovalRequest => {
                        if let Some(target) = vote.target {
                            if let Some(existing) = nodes.get(&target) {
                                let mut next = (**existing).clone();
                                next.apply_request_unlock(ctx.height() + UNLOCK_DURATION);
                                nodes.insert(target, Arc::new(next));
                            }
                        }
                    }
                    L2EventKind::Removal => {
                        if let Some(target) = vote.target {
                            if let Some(existing) = nodes.get(&target) {
                                let returned = vote.returned_amount.unwrap_or(existing.staking_requirement);
                                if returned < existing.staking_requirement {
                                    let shortfall = existing.staking_requirement.saturating_sub(returned);
                                    let operator_contribution = existing
                                        .contributors
                                        .first()
                                        .map(|c| c.amount)
                                        .unwrap_or(Amount::ZERO);
                                    if shortfall > operator_contribution {
                                        return Err(TsnError::InternalLogicError(format!(
                                            "removal shortfall for {target} exceeds operator contribution"
                                        )));
                                    }
                                    pending_refunds.push(PendingRefund {
                                        operator: target,
                                        amount: operator_contribution.saturating_sub(shortfall),
                                        due_height: ctx.height() + DEREGISTRATION_LOCK_DURATION,
                                    });
                                }
                            }
                            nodes.remove(&target);
                        }
                    }
                }
            }
            L2VoteOutcome::Denied => {
                pending_l2.remove(&vote.event_hash);
            }
            L2VoteOutcome::StillPending => {}
        }
    }

    // 7. expire nodes whose registration-plus-lock period has elapsed or
    // whose requested unlock height has been reached; remember each one's
    // BLS pubkey for a while in case a late L2 event still targets it.
    let expiring: Vec<PubKey> = nodes
        .iter()
        .filter(|(_, node)| {
            let lock_elapsed = node.is_decommissioned()
                && ctx.height().saturating_sub(node.active_since_height.unsigned_abs())
                    >= DEREGISTRATION_LOCK_DURATION;
            let unlock_reached =
                node.requested_unlock_height != 0 && node.requested_unlock_height <= ctx.height();
            lock_elapsed || unlock_reached
        })
        .map(|(pk, _)| *pk)
        .collect();
    for pubkey in expiring {
        if let Some(node) = nodes.remove(&pubkey) {
            if let Some(bls_public_key) = node.bls_public_key {
                recently_expired.push(RecentlyExpiredEntry {
                    bls_public_key,
                    ttl_height: ctx.height() + ETH_REMOVAL_BUFFER,
                });
            }
        }
    }

    // expire stale pending events, unlocked key images, expired-node
    // memory, and matured refunds.
    pending_l2.retain(|_, event| !event.is_expired(ctx.height(), L2_MAX_AGE_BLOCKS));
    blacklist.retain(|entry| entry.unlock_height > ctx.height());
    recently_expired.retain(|entry| entry.ttl_height > ctx.height());
    pending_refunds.retain(|refund| refund.due_height > ctx.height());

    // 8. swarm re-partitioning over nodes that just (de)activated.
    let mut swarms: BTreeMap<u64, Vec<PubKey>> = BTreeMap::new();
    let mut unassigned = Vec::new();
    for (pubkey, node) in &nodes {
        if !node.is_active() {
            continue;
        }
        if node.swarm_id == snsd_primitives::constants::UNASSIGNED_SWARM_ID {
            unassigned.push(*pubkey);
        } else {
            swarms.entry(node.swarm_id).or_default().push(*pubkey);
        }
    }
    if !unassigned.is_empty() {
        let assignments = repartition(&swarms, &unassigned, ctx.block_hash());
        for (pubkey, swarm_id) in assignments {
            if let Some(node) = nodes.get(&pubkey) {
                let mut next = (**node).clone();
                next.swarm_id = swarm_id;
                nodes.insert(pubkey, Arc::new(next));
            }
        }
    }

    // 9. leader for the block about to follow this one.
    let interim = StateSnapshot::from_parts(
        ctx.height(),
        ctx.block_hash(),
        nodes.clone(),
        Quorums::default(),
        blacklist.clone(),
        pending_l2.clone(),
        recently_expired.clone(),
        pending_refunds.clone(),
        prior.x25519_map.clone(),
        None,
    );
    let block_leader = resolve_block_leader(hf, ops.miner, &interim);

    // bump the outgoing winner's reward-rotation bookkeeping so the tuple-min
    // leader selection rotates to someone else next time, before quorums
    // (which read `requested_unlock_height`/`pulse_sorter`, not the reward
    // fields) are regenerated from the node set.
    if let Some(winner) = block_leader {
        if let Some(existing) = nodes.get(&winner) {
            let mut next = (**existing).clone();
            next.last_reward_block_height = ctx.height();
            next.last_reward_transaction_index = u32::MAX;
            nodes.insert(winner, Arc::new(next));
        }
    }

    // 10. regenerate quorums.
    let active: Vec<PubKey> = interim.active_nodes().into_iter().map(|(pk, _)| *pk).collect();
    let decommissioned: Vec<PubKey> = interim.decommissioned_nodes().into_iter().map(|(pk, _)| *pk).collect();
    let active_with_sorter: Vec<(PubKey, snsd_state::node::PulseSorter)> = interim
        .active_nodes()
        .into_iter()
        .map(|(pk, n)| (*pk, n.pulse_sorter))
        .collect();
    let active_with_unlock: Vec<(PubKey, u64)> = interim
        .active_nodes()
        .into_iter()
        .map(|(pk, n)| (*pk, n.requested_unlock_height))
        .collect();

    let pulse = generate_pulse_quorum(hf, block_leader, &active_with_sorter, ctx.block_hash(), ctx.pulse_round());
    let obligations = generate_obligations_quorum(hf, &active, &decommissioned, ctx.block_hash());
    let checkpointing = generate_checkpoint_quorum(hf, &active, ctx.block_hash());
    let blink = generate_blink_quorum(hf, &active_with_unlock, ctx.height(), ctx.block_hash());

    let quorums = Quorums {
        pulse,
        obligations,
        checkpointing,
        blink,
    };

    Ok(StateSnapshot::from_parts(
        ctx.height(),
        ctx.block_hash(),
        nodes,
        quorums,
        blacklist,
        pending_l2,
        recently_expired,
        pending_refunds,
        prior.x25519_map.clone(),
        block_leader,
    ))
}
