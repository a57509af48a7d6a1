//! `snsd-pulse`: the cooperative Pulse state machine (C6). Runs entirely on
//! its own dedicated thread, communicating with SNSE via brief snapshot
//! reads and with the network via `QuorumNet`; see [`machine::Context`] for
//! the entry point.

pub mod clock;
pub mod errors;
pub mod machine;
pub mod stages;

pub use clock::{Clock, SystemClock};
pub use errors::Error;
pub use machine::{Context, TickOutcome};
pub use stages::Stage;
