//! In-memory `ChainStore`/`QuorumNet` stand-ins for integration tests, per
//! `snsd_chainio::traits`'s doc comment that this crate ships them. Not a
//! real storage or transport layer: blocks/aux blobs live in a `HashMap`
//! behind a lock, and relayed messages are recorded rather than sent
//! anywhere.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use snsd_chainio::{errors::ChainIoError, traits::{ChainStore, QuorumNet}, wire::PulseMessage};
use snsd_primitives::{Hash32, Network, PubKey};

#[derive(Default)]
struct Inner {
    height: u64,
    blocks_by_hash: HashMap<Hash32, Vec<u8>>,
    blocks_by_height: HashMap<u64, Vec<u8>>,
    alt_blocks: HashMap<Hash32, Vec<u8>>,
    txs: HashMap<Hash32, Vec<u8>>,
    timestamps: HashMap<Hash32, u64>,
    aux: HashMap<String, Vec<u8>>,
    batched_rewards: HashMap<Hash32, u64>,
    votes: HashMap<Hash32, bool>,
    next_template: Vec<u8>,
}

/// An in-memory `ChainStore`. Construct with [`InMemoryChainStore::new`],
/// then use the `insert_*`/`set_*` helpers to seed whatever state a test
/// scenario needs before handing a `&dyn ChainStore` to the code under
/// test.
#[derive(Default)]
pub struct InMemoryChainStore {
    inner: Mutex<Inner>,
}

impl InMemoryChainStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_height(&self, height: u64) {
        self.inner.lock().height = height;
    }

    pub fn insert_block(&self, hash: Hash32, height: u64, bytes: Vec<u8>, timestamp: u64) {
        let mut inner = self.inner.lock();
        inner.blocks_by_hash.insert(hash, bytes.clone());
        inner.blocks_by_height.insert(height, bytes);
        inner.timestamps.insert(hash, timestamp);
    }

    pub fn insert_alt_block(&self, hash: Hash32, bytes: Vec<u8>) {
        self.inner.lock().alt_blocks.insert(hash, bytes);
    }

    pub fn insert_tx(&self, hash: Hash32, bytes: Vec<u8>) {
        self.inner.lock().txs.insert(hash, bytes);
    }

    pub fn set_pending_batched_reward(&self, recipient: Hash32, amount: u64) {
        self.inner.lock().batched_rewards.insert(recipient, amount);
    }

    pub fn set_vote(&self, event_hash: Hash32, approve: bool) {
        self.inner.lock().votes.insert(event_hash, approve);
    }

    pub fn set_next_template(&self, bytes: Vec<u8>) {
        self.inner.lock().next_template = bytes;
    }
}

#[async_trait]
impl ChainStore for InMemoryChainStore {
    async fn height(&self) -> Result<u64, ChainIoError> {
        Ok(self.inner.lock().height)
    }

    async fn get_block(&self, hash: Hash32) -> Result<Vec<u8>, ChainIoError> {
        self.inner
            .lock()
            .blocks_by_hash
            .get(&hash)
            .cloned()
            .ok_or(ChainIoError::NotFound)
    }

    async fn get_block_by_height(&self, height: u64) -> Result<Vec<u8>, ChainIoError> {
        self.inner
            .lock()
            .blocks_by_height
            .get(&height)
            .cloned()
            .ok_or(ChainIoError::NotFound)
    }

    async fn get_block_timestamp(&self, hash: Hash32) -> Result<u64, ChainIoError> {
        self.inner
            .lock()
            .timestamps
            .get(&hash)
            .copied()
            .ok_or(ChainIoError::NotFound)
    }

    async fn get_tx(&self, hash: Hash32) -> Result<Vec<u8>, ChainIoError> {
        self.inner
            .lock()
            .txs
            .get(&hash)
            .cloned()
            .ok_or(ChainIoError::NotFound)
    }

    async fn get_alt_block(&self, hash: Hash32) -> Result<Vec<u8>, ChainIoError> {
        self.inner
            .lock()
            .alt_blocks
            .get(&hash)
            .cloned()
            .ok_or(ChainIoError::NotFound)
    }

    async fn pending_batched_reward(&self, recipient: Hash32) -> Result<u64, ChainIoError> {
        Ok(self
            .inner
            .lock()
            .batched_rewards
            .get(&recipient)
            .copied()
            .unwrap_or(0))
    }

    async fn record_batched_reward_payout(
        &self,
        recipient: Hash32,
        paid: u64,
    ) -> Result<(), ChainIoError> {
        let mut inner = self.inner.lock();
        let entry = inner.batched_rewards.entry(recipient).or_insert(0);
        *entry = entry.saturating_sub(paid);
        Ok(())
    }

    async fn load_transactions(&self, hashes: &[Hash32]) -> Result<Vec<Vec<u8>>, ChainIoError> {
        let inner = self.inner.lock();
        hashes
            .iter()
            .map(|h| inner.txs.get(h).cloned().ok_or(ChainIoError::NotFound))
            .collect()
    }

    async fn get_vote_for(&self, event_hash: Hash32) -> Result<Option<bool>, ChainIoError> {
        Ok(self.inner.lock().votes.get(&event_hash).copied())
    }

    async fn create_next_pulse_block_template(
        &self,
        _producer_payout: Hash32,
        _round: u32,
        _bitset: u16,
    ) -> Result<Vec<u8>, ChainIoError> {
        Ok(self.inner.lock().next_template.clone())
    }

    async fn read_aux(&self, key: &str) -> Result<Option<Vec<u8>>, ChainIoError> {
        Ok(self.inner.lock().aux.get(key).cloned())
    }

    async fn write_aux(&self, key: &str, bytes: Vec<u8>) -> Result<(), ChainIoError> {
        self.inner.lock().aux.insert(key.to_string(), bytes);
        Ok(())
    }
}

/// An in-memory `QuorumNet` that records every relayed message instead of
/// sending it anywhere; tests assert against [`InMemoryQuorumNet::sent`].
pub struct InMemoryQuorumNet {
    network: Network,
    sent: Mutex<Vec<(PulseMessage, Vec<PubKey>, bool)>>,
}

impl InMemoryQuorumNet {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<(PulseMessage, Vec<PubKey>, bool)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl QuorumNet for InMemoryQuorumNet {
    async fn relay_pulse_message(
        &self,
        msg: PulseMessage,
        quorum: &[PubKey],
        is_producer: bool,
    ) -> Result<(), ChainIoError> {
        self.sent.lock().push((msg, quorum.to_vec(), is_producer));
        Ok(())
    }

    fn network(&self) -> Network {
        self.network
    }
}
