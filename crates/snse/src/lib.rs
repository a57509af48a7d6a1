//! `snsd-snse`: the service-node state engine driver (C5). Owns the current
//! [`snsd_state::StateSnapshot`] plus its [`snsd_state::StateHistory`],
//! applies blocks through `snsd_chaintsn::transition::update_from_block`,
//! and validates coinbase/Pulse-block shape before a block is accepted.

pub mod driver;
pub mod errors;
pub mod pulse_verify;
pub mod reward;
pub mod types;

pub use driver::Snse;
pub use errors::Error;
pub use reward::RewardMode;
