//! Cryptographic primitives consumed by the state engine and Pulse: BLAKE2b
//! hashing, Ed25519/X25519 signing and key agreement, BLS proof-of-possession
//! signatures, and the deterministic PRNG/shuffle used by quorum generation.

pub mod blake2b;
pub mod bls;
pub mod ed25519;
pub mod errors;
pub mod mt64;
pub mod shuffle;
pub mod x25519;

pub use errors::CryptoError;
