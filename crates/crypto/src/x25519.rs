//! X25519 key agreement and derivation from an Ed25519 identity key.

use curve25519_dalek::edwards::CompressedEdwardsY;
use ed25519_dalek::SigningKey;
use x25519_dalek::{PublicKey, StaticSecret};

use snsd_primitives::X25519PubKey;

use crate::errors::CryptoError;

/// Derives the X25519 public key corresponding to an Ed25519 signing key,
/// used by service nodes to publish a Diffie-Hellman-capable identity
/// alongside their primary Ed25519 pubkey.
pub fn derive_x25519_public(signing_key: &SigningKey) -> X25519PubKey {
    let secret = ed25519_signing_key_to_x25519_secret(signing_key);
    let public = PublicKey::from(&secret);
    X25519PubKey::new(*public.as_bytes())
}

fn ed25519_signing_key_to_x25519_secret(signing_key: &SigningKey) -> StaticSecret {
    // Standard Ed25519 -> X25519 secret conversion: hash the seed with
    // SHA-512 and clamp, matching the birational map libsodium uses.
    use sha2::{Digest, Sha512};
    let mut hasher = Sha512::new();
    hasher.update(signing_key.to_bytes());
    let hash = hasher.finalize();
    let mut scalar_bytes = [0u8; 32];
    scalar_bytes.copy_from_slice(&hash[..32]);
    StaticSecret::from(scalar_bytes)
}

/// Converts an Ed25519 *public* key to its corresponding X25519 public key
/// via the standard Edwards-to-Montgomery birational map, for peers who
/// only publish an Ed25519 identity.
pub fn ed25519_pubkey_to_x25519(ed25519_pubkey: &[u8; 32]) -> Result<X25519PubKey, CryptoError> {
    let compressed = CompressedEdwardsY(*ed25519_pubkey);
    let point = compressed
        .decompress()
        .ok_or(CryptoError::MalformedPublicKey)?;
    let montgomery = point.to_montgomery();
    Ok(X25519PubKey::new(montgomery.to_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let sk = SigningKey::from_bytes(&[7u8; 32]);
        let a = derive_x25519_public(&sk);
        let b = derive_x25519_public(&sk);
        assert_eq!(a, b);
    }

    #[test]
    fn public_conversion_matches_private_derivation() {
        let sk = SigningKey::from_bytes(&[3u8; 32]);
        let vk = sk.verifying_key();
        let from_private = derive_x25519_public(&sk);
        let from_public = ed25519_pubkey_to_x25519(&vk.to_bytes()).unwrap();
        assert_eq!(from_private, from_public);
    }
}
