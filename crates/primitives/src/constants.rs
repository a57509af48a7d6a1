//! Protocol constants enumerated in full in the design spec (§6).
//!
//! These are not derivable from first principles and must match the
//! network exactly for consensus to hold.

/// Blocks a short-term history entry is retained for before culling.
pub const STATE_CHANGE_TX_LIFETIME_IN_BLOCKS: u64 = 720;

/// Window (in multiples of [`STATE_CHANGE_TX_LIFETIME_IN_BLOCKS`]) retained
/// in [`crate`] history's short-term ring.
pub const SHORT_TERM_HISTORY_MULTIPLIER: u64 = 6;

pub const MAX_SHORT_TERM_HISTORY: u64 =
    STATE_CHANGE_TX_LIFETIME_IN_BLOCKS * SHORT_TERM_HISTORY_MULTIPLIER;

/// Interval, in blocks, at which a quorums-only archive snapshot is stored.
pub const STORE_LONG_TERM_STATE_INTERVAL: u64 = 10_000;

/// Duration of a single Pulse round, in seconds.
pub const PULSE_ROUND_TIMEOUT_SECS: u64 = 60;

/// Duration of a single Pulse stage within a round, in seconds.
pub const PULSE_STAGE_TIMEOUT_SECS: u64 = 5;

/// Maximum clock drift tolerated when computing a round's start time.
pub const PULSE_MAX_START_ADJUSTMENT_SECS: u64 = 15;

/// Blocks of lag between the reference block and the block whose hash seeds
/// the Pulse quorum, so the quorum is unpredictable at reward-slot
/// assignment time.
pub const PULSE_QUORUM_ENTROPY_LAG: u64 = 10;

pub const PULSE_QUORUM_NUM_VALIDATORS: usize = 11;

/// Minimum validator signatures required for a Pulse block to be valid.
pub const PULSE_BLOCK_REQUIRED_SIGNATURES: usize = 7;

/// Minimum number of active service nodes needed to attempt a Pulse quorum.
pub const PULSE_MIN_SERVICE_NODES: usize = 11;

pub const MAX_CONTRIBUTORS_V1: usize = 4;
pub const MAX_CONTRIBUTORS_HF19: usize = 10;

/// Extra blocks of buffer added before a checkpoint quorum's modulus check,
/// to keep checkpoint heights safely behind the reorg-safety horizon.
pub const REORG_SAFETY_BUFFER_BLOCKS_POST_HF12: u64 = 11;

pub const CHECKPOINT_INTERVAL: u64 = 60;
pub const CHECKPOINT_QUORUM_SIZE: usize = 20;

pub const BLINK_QUORUM_INTERVAL: u64 = 5;
pub const BLINK_SUBQUORUM_SIZE: usize = 10;
pub const BLINK_EXPIRY_BUFFER: u64 = 15;

pub const STATE_CHANGE_QUORUM_SIZE: usize = 10;
pub const MIN_NODES_TO_TEST: usize = 5;
pub const NTH_TO_TEST: usize = 100;

/// Interval, in seconds, at which service nodes broadcast uptime proofs.
pub const UPTIME_PROOF_FREQUENCY_SECS: u64 = 60 * 60;
pub const UPTIME_PROOF_TOLERANCE_SECS: u64 = 60 * 5;

/// Initial recommission credit (in blocks) granted on registration.
pub const DECOMMISSION_INITIAL_CREDIT: i64 = 120;
/// Maximum recommission credit a node may accrue.
pub const DECOMMISSION_MAX_CREDIT: i64 = 240;
/// Blocks of active duty required to accrue one block of recommission
/// credit.
pub const DECOMMISSION_CREDIT_PER_BLOCK: i64 = 1;

pub const DEREGISTRATION_LOCK_DURATION: u64 = 30 * 24 * 60; // ~30 days at 1 block/min
pub const UNLOCK_DURATION: u64 = 30 * 24 * 60;

/// Blocks for which an expired node's BLS pubkey is remembered so a late
/// `RemovalRequest`/`Removal` L2 event can still resolve to it.
pub const ETH_REMOVAL_BUFFER: u64 = 10_000;

/// Multiplier converting a batched-reward vout amount into the
/// db-recorded milli-atomic figure (HF19-HF20).
pub const BATCH_REWARD_FACTOR: u64 = 1000;

/// L2 vote scoring: full weight for a round-0 vote, halved for each
/// subsequent round a tx survives unconfirmed.
pub const L2_FULL_SCORE: u64 = 1_000_000;
pub const L2_CONFIRM_THRESHOLD: u64 = 2_500_000;
pub const L2_DENY_THRESHOLD: u64 = 2_500_000;
pub const L2_MAX_AGE_BLOCKS: u64 = 10_000;

/// Sentinel value for an unassigned swarm.
pub const UNASSIGNED_SWARM_ID: u64 = u64::MAX;

/// Fee units for pre-HF19 "portions" accounting (basis is 2^16).
pub const PORTIONS_PRE_HF19: u64 = 1 << 16;

/// Basis-point denominator used for portions accounting from HF19 onward.
pub const PORTIONS_HF19_BASIS_POINTS: u64 = 10_000;

/// Cooldown, in blocks, before a node may submit another `ip_change_penalty`
/// state-change tx against itself (see SPEC_FULL §10).
pub const IP_CHANGE_COOLDOWN_BLOCKS: u64 = 720;

/// HF19 small-contributor unlock predicate threshold. Deliberately
/// unscaled (should be compared against atomic units, not raw `amount`) —
/// a known historical bug that must remain for old-block validation (see
/// SPEC_FULL §9 open question 2).
pub const HF19_SMALL_CONTRIBUTOR_THRESHOLD_BUG: u64 = 3749;
