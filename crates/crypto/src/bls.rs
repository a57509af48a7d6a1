//! BLS signatures using a proof-of-possession (PoP) scheme: the message
//! signed by `prove_possession` is `bls_pubkey || primary_pubkey`, binding
//! the BLS key to the node's Ed25519 identity so registration cannot be
//! front-run with someone else's BLS key (rogue-key attack mitigation via
//! possession of the matching Ed25519 secret).

use blst::min_pk::{PublicKey, SecretKey, Signature};
use blst::BLST_ERROR;

use snsd_primitives::{BlsPublicKey, BlsSignature, PubKey};

use crate::errors::CryptoError;

const DST: &[u8] = b"SNSD_BLS_POP_V1";

pub struct BlsKeypair {
    secret: SecretKey,
}

impl BlsKeypair {
    pub fn from_ikm(ikm: &[u8]) -> Result<Self, CryptoError> {
        let secret = SecretKey::key_gen(ikm, &[]).map_err(|_| CryptoError::MalformedPublicKey)?;
        Ok(Self { secret })
    }

    pub fn public_key(&self) -> BlsPublicKey {
        BlsPublicKey::new(self.secret.sk_to_pk().to_bytes())
    }

    /// Signs `bls_pubkey || primary_pubkey` to prove possession of the BLS
    /// secret key bound to `primary_pubkey`.
    pub fn prove_possession(&self, primary_pubkey: &PubKey) -> BlsSignature {
        let message = pop_message(&self.public_key(), primary_pubkey);
        let sig = self.secret.sign(&message, DST, &[]);
        BlsSignature::new(sig.to_bytes())
    }
}

fn pop_message(bls_pubkey: &BlsPublicKey, primary_pubkey: &PubKey) -> Vec<u8> {
    let mut msg = Vec::with_capacity(BlsPublicKey::LEN + PubKey::LEN);
    msg.extend_from_slice(bls_pubkey.as_bytes());
    msg.extend_from_slice(primary_pubkey.as_bytes());
    msg
}

/// Verifies a proof-of-possession signature over `(bls_pubkey,
/// primary_pubkey)`.
pub fn verify_proof_of_possession(
    bls_pubkey: &BlsPublicKey,
    primary_pubkey: &PubKey,
    signature: &BlsSignature,
) -> Result<(), CryptoError> {
    let pk = PublicKey::from_bytes(bls_pubkey.as_bytes())
        .map_err(|_| CryptoError::MalformedPublicKey)?;
    let sig = Signature::from_bytes(signature.as_bytes())
        .map_err(|_| CryptoError::MalformedSignature)?;
    let message = pop_message(bls_pubkey, primary_pubkey);

    let result = sig.verify(true, &message, DST, &[], &pk, true);
    if result == BLST_ERROR::BLST_SUCCESS {
        Ok(())
    } else {
        Err(CryptoError::InvalidProofOfPossession)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proof_of_possession_roundtrip() {
        let kp = BlsKeypair::from_ikm(&[9u8; 32]).unwrap();
        let primary = PubKey::new([1u8; 32]);
        let pop = kp.prove_possession(&primary);
        verify_proof_of_possession(&kp.public_key(), &primary, &pop).unwrap();
    }

    #[test]
    fn proof_of_possession_rejects_wrong_primary_key() {
        let kp = BlsKeypair::from_ikm(&[9u8; 32]).unwrap();
        let primary = PubKey::new([1u8; 32]);
        let other = PubKey::new([2u8; 32]);
        let pop = kp.prove_possession(&primary);
        assert!(verify_proof_of_possession(&kp.public_key(), &other, &pop).is_err());
    }
}
