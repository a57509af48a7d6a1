//! Block leader resolution (SPEC_FULL §4.2, §9 Open Question 1): pre-HF20
//! the leader is the miner; HF20+ the leader comes from the snapshot's
//! tuple-min reward rotation instead.

use snsd_primitives::{HardFork, PubKey};
use snsd_state::StateSnapshot;

/// Resolves the block leader for the block about to be produced at
/// `next_height`.
///
/// Pre-HF20, the leader is whoever mined the block (`miner`, passed through
/// from the block header); from HF20 onward mining is irrelevant to
/// leadership and the snapshot's cached reward-rotation leader is used
/// instead, so `miner` is ignored.
pub fn resolve_block_leader(hf: HardFork, miner: Option<PubKey>, prior: &StateSnapshot) -> Option<PubKey> {
    if hf.has_eth_transition() {
        prior.get_next_block_leader()
    } else {
        miner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pk(b: u8) -> PubKey {
        PubKey::new([b; 32])
    }

    #[test]
    fn pre_eth_transition_uses_miner() {
        let snap = StateSnapshot::genesis();
        let leader = resolve_block_leader(HardFork::Hf18, Some(pk(7)), &snap);
        assert_eq!(leader, Some(pk(7)));
    }

    #[test]
    fn post_eth_transition_ignores_miner() {
        let snap = StateSnapshot::genesis();
        let leader = resolve_block_leader(HardFork::Hf20EthTransition, Some(pk(7)), &snap);
        assert_eq!(leader, None); // genesis has no active nodes to rotate through
    }
}
