//! Registration and stake transaction handling (SPEC_FULL §4.2.1,
//! "stake"/"standard" tx kinds) plus the HF19 unlock-predicate bug
//! reproduction recorded as an Open Question decision in DESIGN.md.

use snsd_primitives::{
    constants::{HF19_SMALL_CONTRIBUTOR_THRESHOLD_BUG, PORTIONS_HF19_BASIS_POINTS, PORTIONS_PRE_HF19},
    Address, Amount, Hash32, HardFork, KeyImage, PubKey,
};
use snsd_state::node::{Contributor, LockedContribution, NodeInfo, NodeInfoVersion, ObligationVotes, ProofInfo, PulseSorter};

use crate::errors::OpError;

/// A single reserved contribution slot declared at registration time.
#[derive(Debug, Clone)]
pub struct ReservedSlot {
    pub address: Address,
    pub amount: Amount,
}

/// Parsed "standard"/"stake" registration transaction, prior to becoming a
/// [`NodeInfo`].
#[derive(Debug, Clone)]
pub struct RegistrationTx {
    pub tx_hash: Hash32,
    pub operator_address: Address,
    pub staking_requirement: Amount,
    pub reserved: Vec<ReservedSlot>,
    pub signature_valid: bool,
}

/// Validates a registration tx's structural invariants: non-empty reserved
/// slots, no duplicate addresses, contributor count within the HF-gated
/// maximum, and a verified signature.
pub fn validate_registration(hf: HardFork, tx: &RegistrationTx) -> Result<(), OpError> {
    if !tx.signature_valid {
        return Err(OpError::InvalidSignature(tx.tx_hash));
    }
    if tx.reserved.is_empty() {
        return Err(OpError::InvalidRegistration {
            tx_hash: tx.tx_hash,
            reason: "registration has no reserved contributors".into(),
        });
    }
    if tx.reserved.len() > hf.max_contributors() {
        return Err(OpError::InvalidRegistration {
            tx_hash: tx.tx_hash,
            reason: format!(
                "{} reserved contributors exceeds max {}",
                tx.reserved.len(),
                hf.max_contributors()
            ),
        });
    }
    let mut seen = std::collections::HashSet::new();
    for slot in &tx.reserved {
        if !seen.insert(slot.address.clone()) {
            return Err(OpError::DuplicateReservedAddress(tx.tx_hash));
        }
    }
    let total: Amount = tx.reserved.iter().map(|s| s.amount).sum();
    if total > tx.staking_requirement {
        return Err(OpError::InvalidRegistration {
            tx_hash: tx.tx_hash,
            reason: "reserved amounts exceed staking requirement".into(),
        });
    }
    Ok(())
}

/// Portions-accounting basis for a registration, HF-gated per SPEC_FULL §9.
pub fn portions_basis(hf: HardFork) -> u64 {
    if hf.has_reward_batching() {
        PORTIONS_HF19_BASIS_POINTS
    } else {
        PORTIONS_PRE_HF19
    }
}

/// Builds the initial [`NodeInfo`] for a validated registration.
pub fn build_node_info(
    hf: HardFork,
    height: u64,
    fee_portions: u64,
    tx: &RegistrationTx,
) -> NodeInfo {
    let contributors = tx
        .reserved
        .iter()
        .map(|slot| Contributor {
            address: slot.address.clone(),
            reserved: slot.amount,
            amount: Amount::ZERO,
            locked_contributions: Vec::new(),
        })
        .collect();

    let total_reserved: Amount = tx.reserved.iter().map(|s| s.amount).sum();

    NodeInfo {
        staking_requirement: tx.staking_requirement,
        operator_address: tx.operator_address.clone(),
        contributors,
        total_reserved,
        total_contributed: Amount::ZERO,
        registration_height: height,
        registration_hf_version: hf,
        last_reward_block_height: height,
        last_reward_transaction_index: u32::MAX,
        active_since_height: 0,
        last_decommission_height: 0,
        decommission_count: 0,
        recommission_credit: snsd_primitives::constants::DECOMMISSION_INITIAL_CREDIT,
        last_ip_change_height: 0,
        swarm_id: snsd_primitives::constants::UNASSIGNED_SWARM_ID,
        portions_for_operator: fee_portions,
        requested_unlock_height: 0,
        pulse_sorter: PulseSorter::default(),
        bls_public_key: None,
        version: NodeInfoVersion::V0,
        obligation_votes: ObligationVotes::default(),
        proof: ProofInfo::default(),
    }
}

/// A "stake" tx contributing funds toward an existing, not-yet-funded
/// registration.
#[derive(Debug, Clone)]
pub struct StakeTx {
    pub tx_hash: Hash32,
    pub target: PubKey,
    pub contributor: Address,
    pub amount: Amount,
    pub key_image: KeyImage,
}

/// Applies a stake contribution to a cloned copy of `node`, matching the
/// contributor by address (reserved slots only; unreserved "open"
/// contributions are out of scope per the registration's fixed contributor
/// list). Pre-HF16, any dust left over once the node becomes fully funded is
/// folded into the contributing contributor's amount rather than refunded.
pub fn apply_stake(hf: HardFork, height: u64, node: &NodeInfo, stake: &StakeTx) -> Result<NodeInfo, OpError> {
    let mut next = node.clone();
    let Some(contributor) = next
        .contributors
        .iter_mut()
        .find(|c| c.address == stake.contributor)
    else {
        return Err(OpError::InvalidRegistration {
            tx_hash: stake.tx_hash,
            reason: "stake tx targets an unreserved contributor slot".into(),
        });
    };

    let mut credited = stake.amount;
    if !hf.has_pulse() {
        let remaining_capacity = next.staking_requirement.saturating_sub(next.total_contributed);
        if credited >= remaining_capacity {
            credited = remaining_capacity;
        }
    }

    let contributor = next
        .contributors
        .iter_mut()
        .find(|c| c.address == stake.contributor)
        .expect("checked above");
    contributor.amount = contributor
        .amount
        .checked_add(credited)
        .map_err(|_| OpError::InvalidRegistration {
            tx_hash: stake.tx_hash,
            reason: "contribution overflow".into(),
        })?;
    contributor.locked_contributions.push(LockedContribution {
        key_image: stake.key_image,
        amount: credited,
    });

    next.total_contributed = next
        .total_contributed
        .checked_add(credited)
        .map_err(|_| OpError::InvalidRegistration {
            tx_hash: stake.tx_hash,
            reason: "total contribution overflow".into(),
        })?;

    if next.is_fully_funded() && next.active_since_height == 0 {
        next.active_since_height = height as i64;
    }

    Ok(next)
}

/// Whether `contributor`'s locked contribution is eligible for an "early"
/// unlock under the HF19 small-contributor fast path.
///
/// This is a known historical bug: the threshold is compared against the
/// raw, unscaled `amount` field rather than atomic units, so it fires far
/// more often than intended. Blocks validated against this logic
/// historically depend on the bug, so it is kept rather than "fixed" (see
/// DESIGN.md Open Question 2).
pub fn is_hf19_small_contributor(contributor_amount: Amount) -> bool {
    contributor_amount.atomic() < HF19_SMALL_CONTRIBUTOR_THRESHOLD_BUG
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> Address {
        Address::Native(PubKey::new([b; 32]))
    }

    fn sample_tx() -> RegistrationTx {
        RegistrationTx {
            tx_hash: Hash32::default(),
            operator_address: addr(1),
            staking_requirement: Amount::from_atomic(1000),
            reserved: vec![
                ReservedSlot { address: addr(1), amount: Amount::from_atomic(600) },
                ReservedSlot { address: addr(2), amount: Amount::from_atomic(400) },
            ],
            signature_valid: true,
        }
    }

    #[test]
    fn validates_well_formed_registration() {
        assert!(validate_registration(HardFork::Hf16Pulse, &sample_tx()).is_ok());
    }

    #[test]
    fn rejects_duplicate_reserved_address() {
        let mut tx = sample_tx();
        tx.reserved.push(ReservedSlot { address: addr(1), amount: Amount::ZERO });
        assert!(validate_registration(HardFork::Hf16Pulse, &tx).is_err());
    }

    #[test]
    fn rejects_over_max_contributors() {
        let mut tx = sample_tx();
        tx.reserved = (0..20)
            .map(|i| ReservedSlot { address: addr(i), amount: Amount::ZERO })
            .collect();
        assert!(validate_registration(HardFork::Hf18, &tx).is_err());
    }

    #[test]
    fn stake_accumulates_and_activates_when_funded() {
        let tx = sample_tx();
        let node = build_node_info(HardFork::Hf16Pulse, 100, 0, &tx);
        let stake = StakeTx {
            tx_hash: Hash32::default(),
            target: PubKey::default(),
            contributor: addr(1),
            amount: Amount::from_atomic(600),
            key_image: KeyImage::default(),
        };
        let next = apply_stake(HardFork::Hf16Pulse, 100, &node, &stake).unwrap();
        assert_eq!(next.total_contributed, Amount::from_atomic(600));
        assert!(!next.is_fully_funded());

        let stake2 = StakeTx {
            tx_hash: Hash32::default(),
            target: PubKey::default(),
            contributor: addr(2),
            amount: Amount::from_atomic(400),
            key_image: KeyImage::new([9u8; 32]),
        };
        let final_node = apply_stake(HardFork::Hf16Pulse, 100, &next, &stake2).unwrap();
        assert!(final_node.is_fully_funded());
        assert!(final_node.is_active());
    }

    #[test]
    fn stake_to_unreserved_address_is_rejected() {
        let tx = sample_tx();
        let node = build_node_info(HardFork::Hf16Pulse, 0, 0, &tx);
        let stake = StakeTx {
            tx_hash: Hash32::default(),
            target: PubKey::default(),
            contributor: addr(99),
            amount: Amount::from_atomic(1),
            key_image: KeyImage::default(),
        };
        assert!(apply_stake(HardFork::Hf16Pulse, 100, &node, &stake).is_err());
    }

    #[test]
    fn hf19_small_contributor_bug_reproduced() {
        // Atomic units, not display units: an attacker-sized "small" stake
        // of under 3749 atomic units takes the fast path even though it is
        // economically tiny, matching the historical behaviour.
        assert!(is_hf19_small_contributor(Amount::from_atomic(100)));
        assert!(!is_hf19_small_contributor(Amount::from_atomic(1_000_000)));
    }
}
