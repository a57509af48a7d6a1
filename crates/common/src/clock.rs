//! Re-exports the default wall-clock [`Clock`] impl for `bin/snsd` wiring.
//! The trait itself lives in `snsd-pulse`, since the Pulse state machine is
//! its only consumer; everything else in this workspace gets timestamps
//! from the block it's processing, not from the wall clock.

pub use snsd_pulse::clock::{Clock, SystemClock};
