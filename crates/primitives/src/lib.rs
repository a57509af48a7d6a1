//! Shared value types for the service-node state engine and Pulse.

pub mod address;
pub mod amount;
pub mod buf;
pub mod constants;
pub mod errors;
pub mod hf;
pub mod network;
pub mod params;

pub use address::Address;
pub use amount::Amount;
pub use buf::{BlsPublicKey, BlsSignature, Hash32, KeyImage, PubKey, Signature, X25519PubKey};
pub use errors::PrimitivesError;
pub use hf::HardFork;
pub use network::Network;
