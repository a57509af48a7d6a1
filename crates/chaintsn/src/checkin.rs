//! State-change transaction and L2 event-vote handling (SPEC_FULL §4.2.1).
//!
//! These functions are the per-operation half of `update_from_block`: given
//! an already-fetched target [`NodeInfo`] and the quorum that signed off on
//! it, they validate and produce the patched record. They never touch the
//! snapshot's map directly — the caller (`crate::transition`) does the
//! clone-and-replace.

use std::{collections::BTreeMap, sync::Arc};

use snsd_primitives::{
    constants::{L2_CONFIRM_THRESHOLD, L2_DENY_THRESHOLD, L2_FULL_SCORE},
    HardFork, KeyImage, PubKey,
};
use snsd_state::{
    node::{NewNodeState, NodeInfo},
    snapshot::{L2EventKind, PendingL2Event},
    Quorum,
};

use crate::errors::OpError;

/// Minimum distinct quorum validator approvals required to act on a
/// state-change tx, per SPEC_FULL §4.2.1.
pub const STATE_CHANGE_MIN_APPROVALS: usize = 7;

/// Verifies that at least [`STATE_CHANGE_MIN_APPROVALS`] of `signers` are
/// members of `quorum`'s validator set, and that there are no duplicates.
pub fn verify_quorum_signers(quorum: &Quorum, signers: &[PubKey], tx_hash: snsd_primitives::Hash32) -> Result<(), OpError> {
    let mut seen = std::collections::HashSet::new();
    let mut approvals = 0usize;
    for signer in signers {
        if !seen.insert(*signer) {
            continue;
        }
        if quorum.contains_validator(signer) {
            approvals += 1;
        }
    }
    if approvals < STATE_CHANGE_MIN_APPROVALS {
        return Err(OpError::InvalidRegistration {
            tx_hash,
            reason: format!(
                "only {approvals} valid quorum signatures, need {STATE_CHANGE_MIN_APPROVALS}"
            ),
        });
    }
    Ok(())
}

/// Applies a validated state-change to a cloned copy of `target`, returning
/// the new record. Does not touch the snapshot; the caller replaces the
/// `Arc` entry.
pub fn apply_state_change(
    target: &NodeInfo,
    hf: HardFork,
    height: u64,
    proposed: NewNodeState,
) -> Result<NodeInfo, snsd_state::StateError> {
    target.can_transition_to_state(hf, height, proposed)?;
    let mut next = target.clone();
    match proposed {
        NewNodeState::Decommission => next.apply_decommission(height),
        NewNodeState::Recommission => {
            let blocks_active = height.saturating_sub(target.last_decommission_height) as i64;
            next.apply_recommission(height, blocks_active)
        }
        NewNodeState::Deregister => next.apply_decommission(height),
        NewNodeState::IpChangePenalty => next.apply_ip_change_penalty(height),
    }
    Ok(next)
}

/// Finds the node holding a locked contribution with the given key image
/// and applies a request-unlock schedule to a cloned copy of it. Errors if
/// no node's locked contributions carry that key image.
pub fn apply_key_image_unlock(
    nodes: &BTreeMap<PubKey, Arc<NodeInfo>>,
    key_image: KeyImage,
    unlock_height: u64,
) -> Result<(PubKey, NodeInfo), OpError> {
    let (pubkey, node) = nodes
        .iter()
        .find(|(_, n)| {
            n.contributors
                .iter()
                .any(|c| c.locked_contributions.iter().any(|l| l.key_image == key_image))
        })
        .ok_or(OpError::UnknownKeyImage(key_image))?;
    let mut next = (**node).clone();
    next.apply_request_unlock(unlock_height);
    Ok((*pubkey, next))
}

/// Outcome of folding a new vote into a [`PendingL2Event`]'s running score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum L2VoteOutcome {
    StillPending,
    Confirmed,
    Denied,
}

/// Records one quorum member's vote on a pending L2 event, using the
/// round-decayed weight from SPEC_FULL §4.2.1 (`L2_FULL_SCORE / (1 +
/// round)` per approving vote, symmetric for denials), and reports whether
/// either threshold has now been crossed.
pub fn record_l2_vote(pending: &mut PendingL2Event, round: u32, approve: bool) -> L2VoteOutcome {
    let weight = L2_FULL_SCORE / (1 + round as u64);
    if approve {
        pending.confirmations = pending.confirmations.saturating_add(weight);
    } else {
        pending.denials = pending.denials.saturating_add(weight);
    }

    if pending.confirmations >= L2_CONFIRM_THRESHOLD {
        L2VoteOutcome::Confirmed
    } else if pending.denials >= L2_DENY_THRESHOLD {
        L2VoteOutcome::Denied
    } else {
        L2VoteOutcome::StillPending
    }
}

/// Builds a fresh pending record for a newly observed L2 event.
pub fn new_pending_l2_event(height: u64, kind: L2EventKind) -> PendingL2Event {
    PendingL2Event {
        height_added: height,
        confirmations: 0,
        denials: 0,
        initial_score: 0,
        kind,
    }
}

/// Applies a confirmed `NewServiceNode` L2 event by constructing the
/// initial [`NodeInfo`] for the freshly registered node.
pub fn materialize_confirmed_registration(
    node: NodeInfo,
) -> Arc<NodeInfo> {
    Arc::new(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use snsd_state::QuorumKind;

    fn pk(b: u8) -> PubKey {
        PubKey::new([b; 32])
    }

    #[test]
    fn quorum_signers_requires_minimum_approvals() {
        let quorum = Quorum::new(QuorumKind::Obligations, (0..10).map(pk).collect(), vec![]);
        let signers: Vec<PubKey> = (0..6).map(pk).collect();
        let err = verify_quorum_signers(&quorum, &signers, snsd_primitives::Hash32::default());
        assert!(err.is_err());

        let signers: Vec<PubKey> = (0..7).map(pk).collect();
        assert!(verify_quorum_signers(&quorum, &signers, snsd_primitives::Hash32::default()).is_ok());
    }

    #[test]
    fn quorum_signers_ignores_duplicates_and_non_members() {
        let quorum = Quorum::new(QuorumKind::Obligations, (0..10).map(pk).collect(), vec![]);
        let mut signers: Vec<PubKey> = (0..7).map(pk).collect();
        signers.push(pk(0)); // duplicate
        signers.push(pk(200)); // not a member
        assert!(verify_quorum_signers(&quorum, &signers, snsd_primitives::Hash32::default()).is_ok());
    }

    #[test]
    fn l2_vote_confirms_after_enough_weight() {
        let mut pending = new_pending_l2_event(10, L2EventKind::NewServiceNode);
        // one full-weight vote (1_000_000) is short of the 2_500_000
        // threshold; three full-weight votes cross it.
        assert_eq!(record_l2_vote(&mut pending, 0, true), L2VoteOutcome::StillPending);
        assert_eq!(record_l2_vote(&mut pending, 0, true), L2VoteOutcome::StillPending);
        assert_eq!(record_l2_vote(&mut pending, 0, true), L2VoteOutcome::Confirmed);
    }

    #[test]
    fn l2_vote_decays_with_round() {
        let mut pending = new_pending_l2_event(10, L2EventKind::NewServiceNode);
        let outcome = record_l2_vote(&mut pending, 5, true);
        assert_eq!(outcome, L2VoteOutcome::StillPending);
        assert!(pending.confirmations < L2_CONFIRM_THRESHOLD);
    }
}
