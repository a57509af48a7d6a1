//! Small plain-data parameter structs threaded through the workspace.

use serde::{Deserialize, Serialize};

use crate::{hf::HardFork, network::Network};

/// Consensus-level parameters fixed for a given network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainParams {
    pub network: Network,
    pub genesis_timestamp: u64,
}

impl ChainParams {
    pub fn new(network: Network, genesis_timestamp: u64) -> Self {
        Self {
            network,
            genesis_timestamp,
        }
    }
}

/// Resolves the hard fork in effect at a given height for a network.
///
/// Devnet/testnet activate every fork at genesis so local development
/// networks always run against current consensus rules.
pub fn hf_at_height(network: Network, height: u64) -> HardFork {
    match network {
        Network::Devnet | Network::Testnet => HardFork::Hf21EthBls,
        Network::Mainnet => mainnet_hf_at_height(height),
    }
}

fn mainnet_hf_at_height(height: u64) -> HardFork {
    const HF16_HEIGHT: u64 = 640_000;
    const HF19_HEIGHT: u64 = 1_030_000;
    const HF20_HEIGHT: u64 = 1_500_000;
    const HF21_HEIGHT: u64 = 1_700_000;

    if height >= HF21_HEIGHT {
        HardFork::Hf21EthBls
    } else if height >= HF20_HEIGHT {
        HardFork::Hf20EthTransition
    } else if height >= HF19_HEIGHT {
        HardFork::Hf19RewardBatching
    } else if height >= HF16_HEIGHT {
        HardFork::Hf16Pulse
    } else {
        HardFork::Hf7
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn devnet_is_always_latest() {
        assert_eq!(hf_at_height(Network::Devnet, 0), HardFork::Hf21EthBls);
    }

    #[test]
    fn mainnet_thresholds() {
        assert_eq!(hf_at_height(Network::Mainnet, 0), HardFork::Hf7);
        assert_eq!(hf_at_height(Network::Mainnet, 640_000), HardFork::Hf16Pulse);
        assert_eq!(
            hf_at_height(Network::Mainnet, 1_700_000),
            HardFork::Hf21EthBls
        );
    }
}
