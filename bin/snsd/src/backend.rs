//! Placeholder `ChainStore`/`QuorumNet` used until this workspace grows a
//! real LMDB-backed store and P2P transport (both explicitly out of scope
//! per the engine's own non-goals). `main()` wires the Pulse task loop
//! against these so the bootstrap path is exercised end to end; swap this
//! module out once a concrete storage/P2P crate exists.

use async_trait::async_trait;

use snsd_chainio::{errors::ChainIoError, traits::{ChainStore, QuorumNet}, wire::PulseMessage};
use snsd_primitives::{Hash32, Network, PubKey};

pub struct UnwiredChainStore;

#[async_trait]
impl ChainStore for UnwiredChainStore {
    async fn height(&self) -> Result<u64, ChainIoError> {
        Err(ChainIoError::Unavailable("no storage backend wired".into()))
    }

    async fn get_block(&self, _hash: Hash32) -> Result<Vec<u8>, ChainIoError> {
        Err(ChainIoError::Unavailable("no storage backend wired".into()))
    }

    async fn get_block_by_height(&self, _height: u64) -> Result<Vec<u8>, ChainIoError> {
        Err(ChainIoError::Unavailable("no storage backend wired".into()))
    }

    async fn get_block_timestamp(&self, _hash: Hash32) -> Result<u64, ChainIoError> {
        Err(ChainIoError::Unavailable("no storage backend wired".into()))
    }

    async fn get_tx(&self, _hash: Hash32) -> Result<Vec<u8>, ChainIoError> {
        Err(ChainIoError::Unavailable("no storage backend wired".into()))
    }

    async fn get_alt_block(&self, _hash: Hash32) -> Result<Vec<u8>, ChainIoError> {
        Err(ChainIoError::Unavailable("no storage backend wired".into()))
    }

    async fn pending_batched_reward(&self, _recipient: Hash32) -> Result<u64, ChainIoError> {
        Ok(0)
    }

    async fn record_batched_reward_payout(
        &self,
        _recipient: Hash32,
        _paid: u64,
    ) -> Result<(), ChainIoError> {
        Err(ChainIoError::Unavailable("no storage backend wired".into()))
    }

    async fn load_transactions(&self, _hashes: &[Hash32]) -> Result<Vec<Vec<u8>>, ChainIoError> {
        Err(ChainIoError::Unavailable("no storage backend wired".into()))
    }

    async fn get_vote_for(&self, _event_hash: Hash32) -> Result<Option<bool>, ChainIoError> {
        Ok(None)
    }

    async fn create_next_pulse_block_template(
        &self,
        _producer_payout: Hash32,
        _round: u32,
        _bitset: u16,
    ) -> Result<Vec<u8>, ChainIoError> {
        Err(ChainIoError::Unavailable("no storage backend wired".into()))
    }

    async fn read_aux(&self, _key: &str) -> Result<Option<Vec<u8>>, ChainIoError> {
        Ok(None)
    }

    async fn write_aux(&self, _key: &str, _bytes: Vec<u8>) -> Result<(), ChainIoError> {
        Err(ChainIoError::Unavailable("no storage backend wired".into()))
    }
}

pub struct UnwiredQuorumNet {
    network: Network,
}

impl UnwiredQuorumNet {
    pub fn new(network: Network) -> Self {
        Self { network }
    }
}

#[async_trait]
impl QuorumNet for UnwiredQuorumNet {
    async fn relay_pulse_message(
        &self,
        _msg: PulseMessage,
        _quorum: &[PubKey],
        _is_producer: bool,
    ) -> Result<(), ChainIoError> {
        Err(ChainIoError::Unavailable("no p2p transport wired".into()))
    }

    fn network(&self) -> Network {
        self.network
    }
}
