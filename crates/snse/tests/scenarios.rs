//! End-to-end scenarios driving the full `Snse::block_add` pipeline:
//! registration, decommission/recommission, deregister-blacklist, reorg,
//! Pulse quorum determinism, and an L2 confirm vote sequence.

use snsd_chaintsn::{
    registration::{RegistrationTx, ReservedSlot, StakeTx},
    transition::{BlockOps, L2VoteOp, StateChangeOp},
};
use snsd_primitives::{constants::DEREGISTRATION_LOCK_DURATION, Address, Amount, HardFork, Hash32, KeyImage, Network, PubKey};
use snsd_snse::types::{Block, RewardOutput, RewardParts};
use snsd_snse::Snse;
use snsd_state::{node::NewNodeState, snapshot::L2EventKind, QuorumKind};

fn pk(b: u8) -> PubKey {
    PubKey::new([b; 32])
}

fn hash(b: u8) -> Hash32 {
    Hash32::new([b; 32])
}

fn miner_block(height: u64, parent_hash: Hash32) -> Block {
    Block {
        height,
        hash: hash(height as u8),
        parent_hash,
        timestamp: 1_000 + height,
        miner: None,
        hf: HardFork::Hf12,
        pulse: None,
        sn_winner_tail: None,
    }
}

fn miner_reward() -> RewardParts {
    RewardParts {
        miner_output: Some(RewardOutput {
            recipient: PubKey::default(),
            amount: Amount::ZERO,
        }),
        sn_outputs: vec![],
        governance_output: None,
    }
}

fn add_empty_block(snse: &Snse, height: u64, parent_hash: Hash32) -> Hash32 {
    let block = miner_block(height, parent_hash);
    let hash = block.hash;
    snse.block_add(&block, &[], &BlockOps::default(), &miner_reward(), &[], None)
        .unwrap();
    hash
}

// S1: a single-output registration tx fully funded in the same block it is
// staked (one block for the registration, a following block with the
// matching stake tx) produces a fully-funded, active node.
#[test]
fn s1_registration_then_stake_activates_node() {
    let snse = Snse::new(Network::Devnet, 1000);
    let operator = pk(1);

    let mut ops = BlockOps::default();
    ops.fee_portions = 3_277; // ~5% of the pre-HF19 1<<16 portions basis
    ops.registrations.push(RegistrationTx {
        tx_hash: hash(10),
        operator_address: Address::Native(operator),
        staking_requirement: Amount::from_atomic(1_000),
        reserved: vec![ReservedSlot {
            address: Address::Native(operator),
            amount: Amount::from_atomic(1_000),
        }],
        signature_valid: true,
    });
    let block1 = miner_block(1, Hash32::default());
    snse.block_add(&block1, &[], &ops, &miner_reward(), &[], None).unwrap();

    let registered = snse.current().get_node(&operator).cloned().unwrap();
    assert_eq!(registered.operator_address, Address::Native(operator));
    assert_eq!(registered.contributors.len(), 1);
    assert!(!registered.is_fully_funded());

    let mut ops2 = BlockOps::default();
    ops2.stakes.push(StakeTx {
        tx_hash: hash(11),
        target: operator,
        contributor: Address::Native(operator),
        amount: Amount::from_atomic(1_000),
        key_image: KeyImage::new([1u8; 32]),
    });
    let block2 = miner_block(2, block1.hash);
    snse.block_add(&block2, &[], &ops2, &miner_reward(), &[], None).unwrap();

    let active = snse.current().get_node(&operator).cloned().unwrap();
    assert!(active.is_fully_funded());
    assert_eq!(active.active_since_height, 2);
}

/// Registers and fully funds `count` nodes in a single block, so the active
/// set clears `STATE_CHANGE_QUORUM_SIZE` and state-change txs targeting any
/// one of them can gather the minimum obligations-quorum approvals. Passing
/// every candidate's pubkey back lets a test sign with the whole pool,
/// which is guaranteed to cover whichever subset the quorum PRNG actually
/// selects as validators.
fn register_active_set(snse: &Snse, height: u64, parent_hash: Hash32, count: u8, tag: u8) -> (Vec<PubKey>, Hash32) {
    let mut ops = BlockOps::default();
    let mut pubkeys = Vec::new();
    for i in 0..count {
        let operator = pk(tag.wrapping_add(i));
        pubkeys.push(operator);
        ops.registrations.push(RegistrationTx {
            tx_hash: hash(tag.wrapping_add(i)),
            operator_address: Address::Native(operator),
            staking_requirement: Amount::from_atomic(100),
            reserved: vec![ReservedSlot {
                address: Address::Native(operator),
                amount: Amount::from_atomic(100),
            }],
            signature_valid: true,
        });
        ops.stakes.push(StakeTx {
            tx_hash: hash(tag.wrapping_add(i).wrapping_add(50)),
            target: operator,
            contributor: Address::Native(operator),
            amount: Amount::from_atomic(100),
            key_image: KeyImage::new([tag.wrapping_add(i); 32]),
        });
    }
    let block = miner_block(height, parent_hash);
    let block_hash = block.hash;
    snse.block_add(&block, &[], &ops, &miner_reward(), &[], None).unwrap();
    (pubkeys, block_hash)
}

// S2: decommission an active node, then recommission it 10 blocks later;
// recommission credit grows by the blocks spent decommissioned.
#[test]
fn s2_decommission_then_recommission() {
    let snse = Snse::new(Network::Devnet, 1000);
    let (pool, mut last_hash) = register_active_set(&snse, 1, Hash32::default(), 8, 0);
    let operator = pool[0];
    assert!(snse.current().get_node(&operator).unwrap().is_active());

    let mut ops = BlockOps::default();
    ops.state_changes.push(StateChangeOp {
        tx_hash: hash(200),
        target: operator,
        proposed: NewNodeState::Decommission,
        signers: pool.clone(),
    });
    let block3 = miner_block(3, last_hash);
    last_hash = block3.hash;
    snse.block_add(&block3, &[], &ops, &miner_reward(), &[], None).unwrap();

    let decommissioned = snse.current().get_node(&operator).cloned().unwrap();
    assert!(decommissioned.is_decommissioned());
    assert!(decommissioned.active_since_height < 0);
    assert_eq!(decommissioned.swarm_id, snsd_primitives::constants::UNASSIGNED_SWARM_ID);
    let prev_credit = decommissioned.recommission_credit;

    for h in 4..13 {
        last_hash = add_empty_block(&snse, h, last_hash);
    }

    let mut ops2 = BlockOps::default();
    ops2.state_changes.push(StateChangeOp {
        tx_hash: hash(201),
        target: operator,
        proposed: NewNodeState::Recommission,
        signers: pool.clone(),
    });
    let block13 = miner_block(13, last_hash);
    snse.block_add(&block13, &[], &ops2, &miner_reward(), &[], None).unwrap();

    let recommissioned = snse.current().get_node(&operator).cloned().unwrap();
    assert!(recommissioned.is_active());
    assert_eq!(recommissioned.decommission_count, 1);
    assert_eq!(recommissioned.active_since_height, 13);
    // credit accrues by the blocks spent decommissioned (13 - last_decommission_height 3)
    let blocks_since_decommission = 13i64 - 3;
    assert_eq!(recommissioned.recommission_credit, prev_credit + blocks_since_decommission);
}

// S3: deregistering a node with a locked contribution pushes the key image
// onto the blacklist for `DEREGISTRATION_LOCK_DURATION` blocks.
#[test]
fn s3_deregister_blacklists_locked_contribution() {
    let snse = Snse::new(Network::Devnet, 1000);
    let (pool, last_hash) = register_active_set(&snse, 1, Hash32::default(), 8, 10);
    let operator = pool[0];
    let key_image = KeyImage::new([10u8; 32]); // tag 10, offset 0 matches register_active_set's key image

    let mut ops = BlockOps::default();
    ops.state_changes.push(StateChangeOp {
        tx_hash: hash(210),
        target: operator,
        proposed: NewNodeState::Deregister,
        signers: pool.clone(),
    });
    let block2 = miner_block(2, last_hash);
    snse.block_add(&block2, &[], &ops, &miner_reward(), &[], None).unwrap();

    let snap = snse.current();
    let entry = snap
        .key_image_blacklist
        .iter()
        .find(|e| e.key_image == key_image)
        .expect("deregistered contribution should be blacklisted");
    assert_eq!(entry.unlock_height, 2 + DEREGISTRATION_LOCK_DURATION);
    assert_eq!(entry.amount, Amount::from_atomic(100));
}

// S4: `add(1..100)` then `detach(80)` restores the snapshot at height 79
// and forgets everything registered from block 80 onward.
#[test]
fn s4_reorg_restores_prior_snapshot_and_drops_history() {
    let snse = Snse::new(Network::Devnet, 1000);
    let mut last_hash = Hash32::default();

    for h in 1..80 {
        last_hash = add_empty_block(&snse, h, last_hash);
    }

    // one node registered at height 80, inside the range that gets detached
    let operator = pk(4);
    let mut ops = BlockOps::default();
    ops.registrations.push(RegistrationTx {
        tx_hash: hash(40),
        operator_address: Address::Native(operator),
        staking_requirement: Amount::from_atomic(100),
        reserved: vec![ReservedSlot {
            address: Address::Native(operator),
            amount: Amount::from_atomic(100),
        }],
        signature_valid: true,
    });
    let block80 = miner_block(80, last_hash);
    snse.block_add(&block80, &[], &ops, &miner_reward(), &[], None).unwrap();
    last_hash = block80.hash;
    assert!(snse.current().get_node(&operator).is_some());

    for h in 81..100 {
        last_hash = add_empty_block(&snse, h, last_hash);
    }
    assert_eq!(snse.current().height, 99);

    snse.blockchain_detached(80).unwrap();

    let restored = snse.current();
    assert_eq!(restored.height, 79);
    assert!(
        restored.get_node(&operator).is_none(),
        "node registered at height 80 must not survive a detach back to 79"
    );
}

// S6: three consecutive blocks voting to confirm a pending `NewServiceNode`
// L2 event materialize the node once the weighted score crosses threshold.
// Each vote is cast at round 0 (full weight 1_000_000); two votes
// (2_000_000) fall short of L2_CONFIRM_THRESHOLD (2_500_000), so a third is
// needed to cross it.
#[test]
fn s6_l2_new_service_node_confirms_after_enough_votes() {
    let snse = Snse::new(Network::Devnet, 1000);
    let event_hash = hash(60);
    let eth_operator = [9u8; 20];

    let reg = RegistrationTx {
        tx_hash: hash(61),
        operator_address: Address::Ethereum(eth_operator),
        staking_requirement: Amount::from_atomic(100),
        reserved: vec![ReservedSlot {
            address: Address::Ethereum(eth_operator),
            amount: Amount::from_atomic(100),
        }],
        signature_valid: true,
    };

    let mut ops = BlockOps::default();
    ops.l2_votes.push(L2VoteOp {
        event_hash,
        kind: L2EventKind::NewServiceNode,
        target: None,
        round: 0,
        approve: true,
        registration: Some(reg),
    });

    let block1 = miner_block(1, Hash32::default());
    snse.block_add(&block1, &[], &ops, &miner_reward(), &[], None).unwrap();

    assert!(snse.current().pending_l2.contains_key(&event_hash));

    let expected_pk = {
        let mut bytes = [0u8; 32];
        bytes[..20].copy_from_slice(&eth_operator);
        PubKey::from_slice(&bytes).unwrap()
    };
    assert!(snse.current().get_node(&expected_pk).is_none());

    let block2 = miner_block(2, block1.hash);
    let mut ops2 = BlockOps::default();
    ops2.l2_votes.push(L2VoteOp {
        event_hash,
        kind: L2EventKind::NewServiceNode,
        target: None,
        round: 0,
        approve: true,
        registration: None,
    });
    snse.block_add(&block2, &[], &ops2, &miner_reward(), &[], None).unwrap();
    assert!(snse.current().pending_l2.contains_key(&event_hash));

    let block3 = miner_block(3, block2.hash);
    let mut ops3 = BlockOps::default();
    ops3.l2_votes.push(L2VoteOp {
        event_hash,
        kind: L2EventKind::NewServiceNode,
        target: None,
        round: 0,
        approve: true,
        registration: None,
    });
    snse.block_add(&block3, &[], &ops3, &miner_reward(), &[], None).unwrap();

    assert!(!snse.current().pending_l2.contains_key(&event_hash));
    assert!(snse.current().get_node(&expected_pk).is_some());
}

// A quorum can only exist once enough nodes are active; the obligations
// quorum gates state-change acceptance, so confirm it is generated as soon
// as the active set crosses `STATE_CHANGE_QUORUM_SIZE`.
#[test]
fn obligations_quorum_exists_once_enough_nodes_active() {
    let snse = Snse::new(Network::Devnet, 1000);
    register_active_set(&snse, 1, Hash32::default(), 10, 100);
    assert_eq!(snse.current().active_nodes().len(), 10);
    assert!(snse.current().quorum(QuorumKind::Obligations).is_some());
}

// S5: Pulse quorum generation is a pure function of (active set, entropy
// hash, leader, round) -- replaying the identical block sequence against
// two independently built drivers must regenerate the identical quorum.
#[test]
fn s5_pulse_quorum_is_deterministic_across_independent_drivers() {
    let build = || {
        let snse = Snse::new(Network::Devnet, 1000);
        let (_, last_hash) = register_active_set(&snse, 1, Hash32::default(), 12, 150);
        let block2 = miner_block(2, last_hash);
        let mut ops = BlockOps::default();
        ops.miner = Some(pk(150)); // leader resolution reads `ops.miner`, not `Block::miner`
        snse.block_add(&block2, &[], &ops, &miner_reward(), &[], None).unwrap();
        snse
    };

    let snse_a = build();
    let snse_b = build();

    let quorum_a = snse_a.current().quorum(QuorumKind::Pulse).cloned();
    let quorum_b = snse_b.current().quorum(QuorumKind::Pulse).cloned();
    assert!(quorum_a.is_some(), "12 active nodes should clear PULSE_QUORUM_NUM_VALIDATORS");
    assert_eq!(quorum_a, quorum_b);
}
