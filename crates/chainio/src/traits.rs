//! Trait-only external collaborators. Nothing in this workspace implements
//! these concretely; `snsd-test-utils` ships an in-memory stub for tests.
//!
//! Both traits are `#[async_trait]` so a real implementation can talk to an
//! LMDB-backed store or a P2P transport without blocking the caller's
//! thread, per SPEC_FULL §5's "no blocking I/O inside the Pulse thread"
//! constraint.

use async_trait::async_trait;

use snsd_primitives::{Hash32, Network};

use crate::{errors::ChainIoError, wire::PulseMessage};

/// Read access to the underlying blockchain/tx storage layer, plus the one
/// write operation SNSE/PSM need (auxiliary-slot persistence) and the one
/// block-construction operation PSM needs (assembling a pulse block
/// template). No validation, fork-choice, or tx-pool logic is exposed —
/// those stay entirely out of scope.
#[async_trait]
pub trait ChainStore: Send + Sync {
    /// Current chain tip height as the store sees it.
    async fn height(&self) -> Result<u64, ChainIoError>;

    /// Raw encoded block bytes by hash.
    async fn get_block(&self, hash: Hash32) -> Result<Vec<u8>, ChainIoError>;

    /// Raw encoded block bytes by height (main chain only).
    async fn get_block_by_height(&self, height: u64) -> Result<Vec<u8>, ChainIoError>;

    async fn get_block_timestamp(&self, hash: Hash32) -> Result<u64, ChainIoError>;

    /// Raw encoded tx bytes by hash.
    async fn get_tx(&self, hash: Hash32) -> Result<Vec<u8>, ChainIoError>;

    /// Raw encoded block bytes for a known alt-chain (non-main) block.
    async fn get_alt_block(&self, hash: Hash32) -> Result<Vec<u8>, ChainIoError>;

    /// Batched reward accounting: total milli-atomic units owed to
    /// `recipient` but not yet paid out, HF19-HF20 reward-batching only.
    async fn pending_batched_reward(&self, recipient: Hash32) -> Result<u64, ChainIoError>;

    async fn record_batched_reward_payout(
        &self,
        recipient: Hash32,
        paid: u64,
    ) -> Result<(), ChainIoError>;

    async fn load_transactions(&self, hashes: &[Hash32]) -> Result<Vec<Vec<u8>>, ChainIoError>;

    /// This node's own vote (if cast) for a pending L2 event, keyed by its
    /// event hash.
    async fn get_vote_for(&self, event_hash: Hash32) -> Result<Option<bool>, ChainIoError>;

    /// Assembles the next Pulse block template for a producer to sign and
    /// broadcast (SPEC_FULL §5 template stage).
    async fn create_next_pulse_block_template(
        &self,
        producer_payout: Hash32,
        round: u32,
        bitset: u16,
    ) -> Result<Vec<u8>, ChainIoError>;

    /// Reads a named auxiliary byte blob (used by `StateHistory::load`).
    async fn read_aux(&self, key: &str) -> Result<Option<Vec<u8>>, ChainIoError>;

    /// Writes a named auxiliary byte blob (used by `StateHistory::save`).
    async fn write_aux(&self, key: &str, bytes: Vec<u8>) -> Result<(), ChainIoError>;
}

/// The signed, quorum-scoped transport Pulse uses to exchange round
/// messages. A concrete implementation posts inbound messages back to the
/// Pulse thread's queue; that posting mechanism is out of scope here.
#[async_trait]
pub trait QuorumNet: Send + Sync {
    /// Relays `msg` to every member of `quorum` (or just the producer, when
    /// `is_producer` addresses a producer-bound message like the signed
    /// block template).
    async fn relay_pulse_message(
        &self,
        msg: PulseMessage,
        quorum: &[snsd_primitives::PubKey],
        is_producer: bool,
    ) -> Result<(), ChainIoError>;

    /// The network this transport is configured for, used to validate
    /// messages never cross networks.
    fn network(&self) -> Network;
}
