//! Shared test-only helpers: an `arbitrary`-backed instance generator
//! used wherever tests across `snsd-state`/`snsd-chaintsn`/`snsd-snse` need
//! a quick throwaway value of some type, plus fixed-entropy fixtures for
//! determinism goldens.

pub mod chainio_stub;
pub mod fixtures;

pub use chainio_stub::{InMemoryChainStore, InMemoryQuorumNet};

use arbitrary::{Arbitrary, Unstructured};
use rand::Rng;

/// Generates arbitrary instances of any `Arbitrary` type from a fixed pool
/// of random bytes sampled once at construction.
pub struct ArbitraryGenerator {
    buffer: Vec<u8>,
}

impl Default for ArbitraryGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ArbitraryGenerator {
    pub fn new() -> Self {
        let mut rng = rand::thread_rng();
        // 256 bytes is enough entropy for the structs this crate generates;
        // bump if a new type needs deeper nesting than `Unstructured` can fill.
        let buffer: Vec<u8> = (0..256).map(|_| rng.gen()).collect();
        ArbitraryGenerator { buffer }
    }

    /// Builds the generator from caller-supplied bytes instead of OS
    /// randomness, for reproducible fixtures (see [`fixtures`]).
    pub fn from_seed_bytes(buffer: Vec<u8>) -> Self {
        ArbitraryGenerator { buffer }
    }

    pub fn generate<'a, T: Arbitrary<'a> + Clone>(&'a self) -> T {
        let mut u = Unstructured::new(&self.buffer);
        T::arbitrary(&mut u).expect("failed to generate arbitrary instance")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_deterministic_output_from_same_seed() {
        let bytes = vec![7u8; 64];
        let a = ArbitraryGenerator::from_seed_bytes(bytes.clone());
        let b = ArbitraryGenerator::from_seed_bytes(bytes);
        let x: u64 = a.generate();
        let y: u64 = b.generate();
        assert_eq!(x, y);
    }
}
