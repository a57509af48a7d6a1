//! Swarm re-partitioning (SPEC_FULL §4.2.2): balances active nodes across
//! swarms as the active set grows, shrinks, or a decommission/deregistration
//! empties one out, in the pure-function style the rest of this crate uses.

use std::collections::BTreeMap;

use snsd_crypto::{blake2b, mt64::Mt19937_64};
use snsd_primitives::{Hash32, PubKey};

/// Minimum nodes a swarm must hold; below this the swarm is dissolved and
/// its members redistributed.
pub const MIN_SWARM_SIZE: usize = 10;
/// Above this many nodes a swarm is split in two.
pub const MAX_SWARM_SIZE: usize = 20;

/// One step of swarm re-partitioning: takes the current `swarm_id ->
/// members` mapping plus the newly-unassigned nodes (just activated, or
/// freed by a dissolved swarm) and returns the updated assignment for every
/// node that moved.
///
/// Pure function of its inputs; `block_hash` seeds the only randomness
/// (which swarm absorbs an odd node out, which half of a split keeps the
/// original id).
pub fn repartition(
    swarms: &BTreeMap<u64, Vec<PubKey>>,
    unassigned: &[PubKey],
    block_hash: Hash32,
) -> BTreeMap<PubKey, u64> {
    let seed_digest = blake2b::quorum_seed_digest(0xFF, &block_hash);
    let seed = u64::from_le_bytes(seed_digest.as_bytes()[..8].try_into().unwrap());
    let mut rng = Mt19937_64::new(seed);

    let mut working: BTreeMap<u64, Vec<PubKey>> = swarms.clone();
    let mut assignments = BTreeMap::new();

    // Dissolve undersized swarms first, folding their members into the
    // unassigned pool.
    let mut pool: Vec<PubKey> = unassigned.to_vec();
    let undersized: Vec<u64> = working
        .iter()
        .filter(|(_, members)| members.len() < MIN_SWARM_SIZE)
        .map(|(id, _)| *id)
        .collect();
    for id in undersized {
        if let Some(members) = working.remove(&id) {
            pool.extend(members);
        }
    }

    // Assign pooled nodes to the smallest existing swarm, or open a new one
    // once none exists or all are already at capacity.
    pool.sort();
    for node in pool {
        let target = working
            .iter()
            .filter(|(_, members)| members.len() < MAX_SWARM_SIZE)
            .min_by_key(|(id, members)| (members.len(), **id))
            .map(|(id, _)| *id);

        let target = match target {
            Some(id) => id,
            None => {
                let new_id = rng.next_u64();
                working.insert(new_id, Vec::new());
                new_id
            }
        };

        working.get_mut(&target).unwrap().push(node);
        assignments.insert(node, target);
    }

    // Split any swarm that grew past the max, carving off its upper half
    // into a fresh id.
    let overgrown: Vec<u64> = working
        .iter()
        .filter(|(_, members)| members.len() > MAX_SWARM_SIZE)
        .map(|(id, _)| *id)
        .collect();
    for id in overgrown {
        let members = working.get_mut(&id).unwrap();
        members.sort();
        let half = members.len() / 2;
        let moved: Vec<PubKey> = members.split_off(half);
        let new_id = rng.next_u64();
        for node in &moved {
            assignments.insert(*node, new_id);
        }
        working.insert(new_id, moved);
    }

    assignments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pk(b: u8) -> PubKey {
        PubKey::new([b; 32])
    }

    #[test]
    fn unassigned_nodes_fill_the_smallest_swarm() {
        let mut swarms = BTreeMap::new();
        swarms.insert(1u64, (0..5).map(pk).collect());
        swarms.insert(2u64, (5..15).map(pk).collect());
        let unassigned = vec![pk(200)];
        let assignments = repartition(&swarms, &unassigned, Hash32::new([1u8; 32]));
        assert_eq!(assignments.get(&pk(200)), Some(&1));
    }

    #[test]
    fn empty_swarm_state_opens_a_new_swarm() {
        let swarms = BTreeMap::new();
        let unassigned: Vec<PubKey> = (0..5).map(pk).collect();
        let assignments = repartition(&swarms, &unassigned, Hash32::new([2u8; 32]));
        assert_eq!(assignments.len(), 5);
        let ids: std::collections::HashSet<u64> = assignments.values().copied().collect();
        assert_eq!(ids.len(), 1);
    }

    #[test]
    fn undersized_swarm_is_dissolved_and_redistributed() {
        let mut swarms = BTreeMap::new();
        swarms.insert(1u64, (0..3).map(pk).collect()); // below MIN_SWARM_SIZE
        swarms.insert(2u64, (3..15).map(pk).collect());
        let assignments = repartition(&swarms, &[], Hash32::new([3u8; 32]));
        for i in 0..3 {
            assert_eq!(assignments.get(&pk(i)), Some(&2));
        }
    }

    #[test]
    fn deterministic_for_same_block_hash() {
        let swarms = BTreeMap::new();
        let unassigned: Vec<PubKey> = (0..25).map(pk).collect();
        let hash = Hash32::new([9u8; 32]);
        let a = repartition(&swarms, &unassigned, hash);
        let b = repartition(&swarms, &unassigned, hash);
        assert_eq!(a, b);
    }
}
