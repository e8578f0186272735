//! Ed25519 signing of canonical transaction payloads
//!
//! The remote verifier checks the signature against the exact bytes we
//! produce, so callers must sign the same serialization they submit.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};

use crate::error::{Error, Result};

/// Seed length expected by [`Signer::from_seed`]
pub const SEED_LEN: usize = 32;

/// Keypair derived from a wallet seed
pub struct Signer {
    signing_key: SigningKey,
}

impl Signer {
    /// Derive the keypair deterministically from a 32-byte seed
    pub fn from_seed(seed: &[u8]) -> Result<Self> {
        let seed: [u8; SEED_LEN] = seed.try_into().map_err(|_| {
            Error::InvalidKeyMaterial(format!(
                "seed must be {} bytes, got {}",
                SEED_LEN,
                seed.len()
            ))
        })?;

        Ok(Self {
            signing_key: SigningKey::from_bytes(&seed),
        })
    }

    /// Raw public key bytes
    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Public key as base64, the form the RPC expects
    pub fn public_key_b64(&self) -> String {
        BASE64.encode(self.public_key())
    }

    /// Detached signature over `message`
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("public_key", &self.public_key_b64())
            .finish()
    }
}

/// Sign `message` with the key derived from `seed`
///
/// Returns `(signature, public_key)`.
pub fn sign(seed: &[u8], message: &[u8]) -> Result<([u8; 64], [u8; 32])> {
    let signer = Signer::from_seed(seed)?;
    Ok((signer.sign(message), signer.public_key()))
}

/// Check a detached signature
pub fn verify(public_key: &[u8; 32], message: &[u8], signature: &[u8; 64]) -> bool {
    let Ok(key) = VerifyingKey::from_bytes(public_key) else {
        return false;
    };
    key.verify(message, &Signature::from_bytes(signature)).is_ok()
}
