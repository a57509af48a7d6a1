//! Hard-fork version table. Variants are ordered so `hf >= HardFork::Hf16Pulse`
//! style comparisons work directly via derived `Ord`.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Default,
    BorshSerialize,
    BorshDeserialize,
)]
pub enum HardFork {
    #[default]
    Hf7,
    Hf9ServiceNodes,
    Hf10,
    Hf11InfiniteStaking,
    Hf12,
    Hf13,
    Hf14,
    Hf15,
    Hf16Pulse,
    Hf17,
    Hf18,
    Hf19RewardBatching,
    Hf20EthTransition,
    Hf21EthBls,
}

impl HardFork {
    pub fn has_pulse(self) -> bool {
        self >= HardFork::Hf16Pulse
    }

    pub fn has_reward_batching(self) -> bool {
        (HardFork::Hf19RewardBatching..HardFork::Hf20EthTransition).contains(&self)
    }

    pub fn has_eth_transition(self) -> bool {
        self >= HardFork::Hf20EthTransition
    }

    pub fn has_eth_bls(self) -> bool {
        self >= HardFork::Hf21EthBls
    }

    pub fn max_contributors(self) -> usize {
        if self >= HardFork::Hf19RewardBatching {
            10
        } else {
            4
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_matches_rollout() {
        assert!(HardFork::Hf9ServiceNodes < HardFork::Hf16Pulse);
        assert!(HardFork::Hf16Pulse.has_pulse());
        assert!(!HardFork::Hf15.has_pulse());
    }

    #[test]
    fn reward_batching_window() {
        assert!(HardFork::Hf19RewardBatching.has_reward_batching());
        assert!(!HardFork::Hf20EthTransition.has_reward_batching());
        assert!(!HardFork::Hf18.has_reward_batching());
    }

    #[test]
    fn max_contributors_bump() {
        assert_eq!(HardFork::Hf18.max_contributors(), 4);
        assert_eq!(HardFork::Hf19RewardBatching.max_contributors(), 10);
    }
}
