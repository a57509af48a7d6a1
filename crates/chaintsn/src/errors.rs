//! Two-enum split between block-level and operation-level transition
//! errors.

use snsd_primitives::Hash32;
use thiserror::Error;

/// Errors that abort the whole `update_from_block` transition (the block is
/// rejected, the prior snapshot is unaffected since the next one is never
/// committed).
#[derive(Debug, Error)]
pub enum TsnError {
    #[error("block height mismatch: expected {expected}, got {got}")]
    HeightMismatch { expected: u64, got: u64 },
    #[error("block parent hash mismatch")]
    ParentMismatch,
    #[error("insufficient service nodes to form a pulse quorum ({active} active, need {min})")]
    InsufficientServiceNodes { active: usize, min: usize },
    #[error("pulse block verification failed: {0}")]
    PulseVerification(String),
    #[error("internal logic error: {0}")]
    InternalLogicError(String),
}

/// Errors scoped to a single transaction or L2 event within a block;
/// callers reject just that tx/event rather than the whole block unless
/// explicitly noted.
#[derive(Debug, Error)]
pub enum OpError {
    #[error("invalid registration for tx {tx_hash}: {reason}")]
    InvalidRegistration { tx_hash: Hash32, reason: String },
    #[error("signature verification failed for tx {0}")]
    InvalidSignature(Hash32),
    #[error("bls proof-of-possession verification failed for tx {0}")]
    InvalidProofOfPossession(Hash32),
    #[error("unknown target node for state-change tx {0}")]
    UnknownTarget(Hash32),
    #[error("duplicate reserved contributor address in tx {0}")]
    DuplicateReservedAddress(Hash32),
    #[error("key image {0} not found among locked contributions")]
    UnknownKeyImage(snsd_primitives::KeyImage),
}
