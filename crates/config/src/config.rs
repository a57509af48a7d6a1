use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which network a node is operating on, and the staking/quorum parameters
/// that follow from that choice. Kept separate from `snsd_primitives::Network`
/// so config parsing doesn't need to depend on the primitives crate's enum
/// shape directly (deserialization is validated independently here).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkConfig {
    Mainnet,
    Testnet,
    Devnet,
}

impl NetworkConfig {
    pub fn to_primitives(self) -> snsd_primitives::Network {
        match self {
            NetworkConfig::Mainnet => snsd_primitives::Network::Mainnet,
            NetworkConfig::Testnet => snsd_primitives::Network::Testnet,
            NetworkConfig::Devnet => snsd_primitives::Network::Devnet,
        }
    }
}

/// Overrides for the otherwise-fixed Pulse timing constants, used only by
/// devnets/tests that need a faster round cadence than mainnet's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PulseTimingOverrides {
    pub round_timeout_secs: Option<u64>,
    pub stage_timeout_secs: Option<u64>,
    pub max_start_adjustment_secs: Option<u64>,
}

/// Where the node keeps its persisted history snapshots (`snsd_state`'s
/// borsh-encoded `AuxStore`) and its service-node keypair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataDirConfig {
    pub datadir: PathBuf,
    pub node_key_path: PathBuf,
}

/// Placeholder RPC bind config: this workspace has no RPC surface of its
/// own (see Non-goals), but the datadir/network config it would sit beside
/// is real, so the field is kept for a future RPC crate to consume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcConfig {
    pub bind_host: String,
    pub bind_port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub network: NetworkConfig,
    pub datadir: DataDirConfig,
    pub rpc: RpcConfig,
    #[serde(default)]
    pub pulse_timing: PulseTimingOverrides,
    /// Maximum length of the in-memory short-term snapshot history
    /// (`snsd_state::history::StateHistory::new`'s `max_short_term`).
    pub max_short_term_history: usize,
}
