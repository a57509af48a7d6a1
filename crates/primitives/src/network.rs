//! Network discriminant (mainnet/testnet/devnet), threaded through anywhere
//! a staking requirement or reward schedule depends on it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Network {
    Mainnet,
    Testnet,
    Devnet,
}

impl Network {
    /// Minimum stake required to run a service node at the given height.
    ///
    /// Mainnet uses the fixed post-genesis requirement; testnet/devnet use a
    /// much smaller figure so local networks can be bootstrapped with a
    /// handful of nodes.
    pub fn staking_requirement(self, _height: u64) -> crate::Amount {
        match self {
            Network::Mainnet => crate::Amount::from_atomic(15_000 * 1_000_000_000),
            Network::Testnet => crate::Amount::from_atomic(100 * 1_000_000_000),
            Network::Devnet => crate::Amount::from_atomic(10 * 1_000_000_000),
        }
    }
}
