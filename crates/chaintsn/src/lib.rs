//! C4 `QuorumGenerator` and the per-transaction state transition functions
//! invoked from `StateSnapshot::update_from_block`.

pub mod checkin;
pub mod context;
pub mod errors;
pub mod leader;
pub mod quorum_gen;
pub mod registration;
pub mod swarm;
pub mod transition;

pub use errors::{OpError, TsnError};
