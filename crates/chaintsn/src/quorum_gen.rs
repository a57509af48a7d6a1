//! C4 `QuorumGenerator`: deterministic shuffling from block-derived entropy
//! producing Pulse/Obligations/Checkpoint/Blink quorums.
//!
//! Every function here is a pure function of its arguments — no I/O, no
//! hidden state — which is what makes property 1 (determinism, SPEC_FULL
//! §8) checkable at all.

use snsd_crypto::{blake2b, mt64::Mt19937_64, shuffle::partial_shuffle};
use snsd_primitives::{
    constants::{
        BLINK_EXPIRY_BUFFER, BLINK_SUBQUORUM_SIZE, CHECKPOINT_QUORUM_SIZE,
        MIN_NODES_TO_TEST, NTH_TO_TEST, PULSE_QUORUM_NUM_VALIDATORS, STATE_CHANGE_QUORUM_SIZE,
    },
    Hash32, HardFork, PubKey,
};
use snsd_state::{node::PulseSorter, Quorum, QuorumKind};

/// Seeds the generator's PRNG, matching SPEC_FULL §4.4 step 1: for HF >=
/// pulse, a domain-separated BLAKE2b digest of `(type, block_hash)`; for
/// older HF, the first 8 bytes of the block hash plus the type tag.
pub fn seed_for(hf: HardFork, kind: QuorumKind, block_hash: Hash32) -> u64 {
    if hf.has_pulse() {
        let digest = blake2b::quorum_seed_digest(kind.domain_tag(), &block_hash);
        u64::from_le_bytes(digest.as_bytes()[..8].try_into().unwrap())
    } else {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&block_hash.as_bytes()[..8]);
        u64::from_le_bytes(buf).wrapping_add(kind.domain_tag() as u64)
    }
}

/// Generates the Pulse quorum (1 producer/worker + 11 validators) for the
/// given round.
///
/// `active_sorted` must already be sorted ascending by pubkey; entries
/// carry their `pulse_sorter` so least-recently-used validators can be
/// prioritised.
pub fn generate_pulse_quorum(
    hf: HardFork,
    block_leader: Option<PubKey>,
    active_sorted: &[(PubKey, PulseSorter)],
    entropy_hash: Hash32,
    round: u32,
) -> Option<Quorum> {
    if active_sorted.len() < PULSE_QUORUM_NUM_VALIDATORS {
        return None;
    }

    let mut candidates: Vec<(PubKey, PulseSorter)> = active_sorted.to_vec();
    if round == 0 {
        if let Some(leader) = block_leader {
            candidates.retain(|(pk, _)| *pk != leader);
        }
    }

    // least-recently-used validators first
    candidates.sort_by_key(|(pk, sorter)| (*sorter, *pk));

    let seed = seed_for(hf, QuorumKind::Pulse, entropy_hash).wrapping_add(round as u64);
    let mut rng = Mt19937_64::new(seed);

    let producer = if round == 0 {
        block_leader?
    } else {
        if candidates.is_empty() {
            return None;
        }
        let idx = rng.next_below(candidates.len());
        candidates.remove(idx).0
    };

    if candidates.len() < PULSE_QUORUM_NUM_VALIDATORS {
        return None;
    }

    let mut pubkeys: Vec<PubKey> = candidates.iter().map(|(pk, _)| *pk).collect();
    let half = pubkeys.len() / 2;

    for i in 0..PULSE_QUORUM_NUM_VALIDATORS {
        let stage_seed = seed_for(hf, QuorumKind::Pulse, entropy_hash)
            .wrapping_add(round as u64)
            .wrapping_add(i as u64 + 1);
        let mut stage_rng = Mt19937_64::new(stage_seed);
        let swap_target = stage_rng.next_below(half.max(1));
        if swap_target < pubkeys.len() && i < pubkeys.len() {
            pubkeys.swap(i, swap_target);
        }
    }

    let validators: Vec<PubKey> = pubkeys.into_iter().take(PULSE_QUORUM_NUM_VALIDATORS).collect();

    Some(Quorum::new(QuorumKind::Pulse, validators, vec![producer]))
}

/// Obligations quorum: `STATE_CHANGE_QUORUM_SIZE` validators drawn from
/// actives, plus a worker subset from the remainder of `active ∪
/// decommissioned`.
pub fn generate_obligations_quorum(
    hf: HardFork,
    active: &[PubKey],
    decommissioned: &[PubKey],
    block_hash: Hash32,
) -> Option<Quorum> {
    let mut all: Vec<PubKey> = active.iter().chain(decommissioned.iter()).copied().collect();
    if all.is_empty() {
        return None;
    }
    all.sort();

    let seed = seed_for(hf, QuorumKind::Obligations, block_hash);
    let n = all.len();
    partial_shuffle(&mut all, n, n.min(STATE_CHANGE_QUORUM_SIZE), seed);

    let validator_count = STATE_CHANGE_QUORUM_SIZE.min(active.len()).min(all.len());
    let validators: Vec<PubKey> = all[..validator_count].to_vec();

    let remaining = all.len().saturating_sub(validator_count);
    let worker_count = MIN_NODES_TO_TEST.max(remaining / NTH_TO_TEST.max(1)).min(remaining);
    let workers: Vec<PubKey> = all[validator_count..validator_count + worker_count].to_vec();

    Some(Quorum::new(QuorumKind::Obligations, validators, workers))
}

/// Checkpoint quorum, only meaningful when the height modulus check in
/// `crate::transition` says this height is a checkpoint height.
pub fn generate_checkpoint_quorum(hf: HardFork, active: &[PubKey], block_hash: Hash32) -> Option<Quorum> {
    if active.is_empty() {
        return None;
    }
    let mut all = active.to_vec();
    all.sort();
    let seed = seed_for(hf, QuorumKind::Checkpointing, block_hash);
    let n = all.len();
    let k = CHECKPOINT_QUORUM_SIZE.min(n);
    partial_shuffle(&mut all, n, k, seed);
    Some(Quorum::new(QuorumKind::Checkpointing, all[..k].to_vec(), vec![]))
}

/// Blink quorum: actives not scheduled to unlock within
/// `BLINK_EXPIRY_BUFFER` blocks of `height`.
pub fn generate_blink_quorum(
    hf: HardFork,
    active_with_unlock: &[(PubKey, u64)],
    height: u64,
    block_hash: Hash32,
) -> Option<Quorum> {
    let mut eligible: Vec<PubKey> = active_with_unlock
        .iter()
        .filter(|(_, unlock)| *unlock == 0 || *unlock > height + BLINK_EXPIRY_BUFFER)
        .map(|(pk, _)| *pk)
        .collect();
    if eligible.len() < BLINK_SUBQUORUM_SIZE {
        return None;
    }
    eligible.sort();
    let seed = seed_for(hf, QuorumKind::Blink, block_hash);
    let n = eligible.len();
    partial_shuffle(&mut eligible, n, BLINK_SUBQUORUM_SIZE, seed);
    Some(Quorum::new(
        QuorumKind::Blink,
        eligible[..BLINK_SUBQUORUM_SIZE].to_vec(),
        vec![],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pk(b: u8) -> PubKey {
        PubKey::new([b; 32])
    }

    fn sample_active(n: u8) -> Vec<(PubKey, PulseSorter)> {
        (0..n).map(|i| (pk(i), PulseSorter::default())).collect()
    }

    #[test]
    fn pulse_quorum_deterministic_across_calls() {
        let active = sample_active(20);
        let leader = Some(pk(0));
        let entropy = Hash32::new([7u8; 32]);
        let a = generate_pulse_quorum(HardFork::Hf16Pulse, leader, &active, entropy, 0);
        let b = generate_pulse_quorum(HardFork::Hf16Pulse, leader, &active, entropy, 0);
        assert_eq!(a, b);
        assert!(a.is_some());
    }

    #[test]
    fn pulse_quorum_none_when_too_few_nodes() {
        let active = sample_active(3);
        let entropy = Hash32::new([1u8; 32]);
        assert!(generate_pulse_quorum(HardFork::Hf16Pulse, Some(pk(0)), &active, entropy, 0).is_none());
    }

    #[test]
    fn obligations_quorum_sizes() {
        let active: Vec<PubKey> = (0..30).map(pk).collect();
        let q = generate_obligations_quorum(
            HardFork::Hf16Pulse,
            &active,
            &[],
            Hash32::new([2u8; 32]),
        )
        .unwrap();
        assert_eq!(q.validators.len(), STATE_CHANGE_QUORUM_SIZE);
        assert!(q.workers.len() >= MIN_NODES_TO_TEST || q.workers.len() == 20 - STATE_CHANGE_QUORUM_SIZE);
    }

    #[test]
    fn checkpoint_quorum_deterministic() {
        let active: Vec<PubKey> = (0..25).map(pk).collect();
        let block_hash = Hash32::new([3u8; 32]);
        let a = generate_checkpoint_quorum(HardFork::Hf16Pulse, &active, block_hash);
        let b = generate_checkpoint_quorum(HardFork::Hf16Pulse, &active, block_hash);
        assert_eq!(a, b);
    }

    #[test]
    fn blink_quorum_excludes_soon_to_unlock() {
        let mut active_with_unlock: Vec<(PubKey, u64)> = (0..15).map(|i| (pk(i), 0)).collect();
        active_with_unlock[0].1 = 100; // unlocks soon
        let q = generate_blink_quorum(HardFork::Hf16Pulse, &active_with_unlock, 95, Hash32::new([4u8; 32]));
        if let Some(q) = q {
            assert!(!q.validators.contains(&pk(0)));
        }
    }
}
