//! Ed25519 sign/verify, the primary service-node keypair scheme.

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use rand_core::{CryptoRng, RngCore};

use snsd_primitives::{PubKey, Signature};

use crate::errors::CryptoError;

pub struct Keypair {
    signing: SigningKey,
}

impl Keypair {
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self {
            signing: SigningKey::generate(rng),
        }
    }

    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            signing: SigningKey::from_bytes(&seed),
        }
    }

    pub fn public_key(&self) -> PubKey {
        PubKey::new(self.signing.verifying_key().to_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        let sig = self.signing.sign(message);
        Signature::new(sig.to_bytes())
    }
}

/// Verifies an Ed25519 signature over `message` made by `pubkey`.
pub fn verify(pubkey: &PubKey, message: &[u8], signature: &Signature) -> Result<(), CryptoError> {
    let vk = VerifyingKey::from_bytes(&pubkey.0).map_err(|_| CryptoError::MalformedPublicKey)?;
    let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    vk.verify(message, &sig)
        .map_err(|_| CryptoError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use rand::rngs::OsRng;

    use super::*;

    #[test]
    fn sign_then_verify_roundtrip() {
        let mut rng = OsRng;
        let kp = Keypair::generate(&mut rng);
        let msg = b"service node registration";
        let sig = kp.sign(msg);
        verify(&kp.public_key(), msg, &sig).unwrap();
    }

    #[test]
    fn verify_rejects_tampered_message() {
        let mut rng = OsRng;
        let kp = Keypair::generate(&mut rng);
        let sig = kp.sign(b"original");
        assert!(verify(&kp.public_key(), b"tampered", &sig).is_err());
    }
}
