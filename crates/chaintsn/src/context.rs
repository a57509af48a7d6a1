//! Context traits the transition algorithm is generic over: a
//! `BlockContext`/`StateProvider`/`AuxProvider` split so the pure
//! transition logic never depends on how a block is sourced.

use snsd_primitives::{Hash32, Network};
use snsd_state::StateSnapshot;

/// Per-block metadata needed by the transition, independent of how the
/// caller represents a full block.
pub trait BlockContext {
    fn height(&self) -> u64;
    fn timestamp(&self) -> u64;
    fn parent_hash(&self) -> Hash32;
    fn block_hash(&self) -> Hash32;
    fn pulse_round(&self) -> u32;
    fn network(&self) -> Network;
}

/// Read access to prior state needed while computing a transition (current
/// snapshot plus whatever historical quorum lookups a state-change tx
/// needs).
pub trait StateProvider {
    fn current(&self) -> &StateSnapshot;
    fn quorum_at(
        &self,
        kind: snsd_state::QuorumKind,
        height: u64,
    ) -> Option<std::sync::Arc<snsd_state::Quorum>>;
}
