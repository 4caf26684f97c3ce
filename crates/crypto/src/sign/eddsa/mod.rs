// Path: crates/crypto/src/sign/eddsa/mod.rs
//! Ed25519 backend over ed25519-dalek.

use crate::error::CryptoError;
use ed25519_dalek::Signer as DalekSigner;
use rand::rngs::OsRng;
use tessera_api::crypto::{CryptoCodec, DetachedSignature, Keypair, Signer, Verifier};

/// Ed25519 public keys are 32 raw bytes.
pub const PUBLIC_KEY_SIZE: usize = 32;
/// Ed25519 private keys are 32 seed bytes.
pub const PRIVATE_KEY_SIZE: usize = 32;
/// Ed25519 signatures are exactly 64 bytes.
pub const SIGNATURE_SIZE: usize = 64;

/// An Ed25519 signing identity.
#[derive(Clone)]
pub struct Ed25519KeyPair {
    /// Seed key; the public half is derived on demand.
    secret_key: ed25519_dalek::SigningKey,
}

/// A detached Ed25519 signature, 64 bytes on the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ed25519Signature(ed25519_dalek::Signature);

/// An Ed25519 verifying key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ed25519PublicKey(ed25519_dalek::VerifyingKey);

/// An Ed25519 seed key.
#[derive(Clone)]
pub struct Ed25519PrivateKey(ed25519_dalek::SigningKey);

impl Ed25519KeyPair {
    /// Draws a fresh identity from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut rng = OsRng;
        Self {
            secret_key: ed25519_dalek::SigningKey::generate(&mut rng),
        }
    }

    /// Rebuilds the identity around an existing seed key.
    pub fn from_private_key(private_key: &Ed25519PrivateKey) -> Self {
        Self {
            secret_key: private_key.0.clone(),
        }
    }
}

impl Keypair for Ed25519KeyPair {
    type Public = Ed25519PublicKey;
    type Secret = Ed25519PrivateKey;
    type Signature = Ed25519Signature;

    fn public(&self) -> Self::Public {
        Ed25519PublicKey(self.secret_key.verifying_key())
    }

    fn secret(&self) -> Self::Secret {
        Ed25519PrivateKey(self.secret_key.clone())
    }

    fn sign(&self, message: &[u8]) -> Result<Self::Signature, CryptoError> {
        Ok(Ed25519Signature(self.secret_key.sign(message)))
    }
}

impl Verifier for Ed25519PublicKey {
    type Signature = Ed25519Signature;

    fn verify(&self, message: &[u8], signature: &Self::Signature) -> Result<(), CryptoError> {
        // Strict verification: no cofactored or non-canonical encodings.
        self.0
            .verify_strict(message, &signature.0)
            .map_err(|_| CryptoError::SignatureRejected)
    }
}

impl CryptoCodec for Ed25519PublicKey {
    fn to_raw(&self) -> Vec<u8> {
        self.0.to_bytes().to_vec()
    }

    fn from_raw(bytes: &[u8]) -> Result<Self, CryptoError> {
        let raw: [u8; PUBLIC_KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKeySize(bytes.len()))?;
        ed25519_dalek::VerifyingKey::from_bytes(&raw)
            .map(Ed25519PublicKey)
            .map_err(|e| CryptoError::InvalidKey(format!("failed to parse public key: {e}")))
    }
}

impl Signer for Ed25519PrivateKey {
    type Signature = Ed25519Signature;

    fn sign(&self, message: &[u8]) -> Result<Self::Signature, CryptoError> {
        Ok(Ed25519Signature(self.0.sign(message)))
    }
}

impl Ed25519PrivateKey {
    /// Derives the matching verifying key.
    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.0.verifying_key())
    }
}

impl CryptoCodec for Ed25519PrivateKey {
    fn to_raw(&self) -> Vec<u8> {
        self.0.to_bytes().to_vec()
    }

    fn from_raw(bytes: &[u8]) -> Result<Self, CryptoError> {
        let raw: [u8; PRIVATE_KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKeySize(bytes.len()))?;
        Ok(Ed25519PrivateKey(ed25519_dalek::SigningKey::from_bytes(
            &raw,
        )))
    }
}

impl CryptoCodec for Ed25519Signature {
    fn to_raw(&self) -> Vec<u8> {
        self.0.to_bytes().to_vec()
    }

    fn from_raw(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != SIGNATURE_SIZE {
            return Err(CryptoError::InvalidSignatureSize(bytes.len()));
        }
        ed25519_dalek::Signature::from_slice(bytes)
            .map(Ed25519Signature)
            .map_err(|_| CryptoError::InvalidSignatureSize(bytes.len()))
    }
}

impl DetachedSignature for Ed25519Signature {}

#[cfg(test)]
mod tests;
