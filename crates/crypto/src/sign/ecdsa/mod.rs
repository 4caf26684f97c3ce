// Path: crates/crypto/src/sign/ecdsa/mod.rs
//! SECP256R1 (NIST P-256) ECDSA backend over p256.

use crate::error::CryptoError;
use p256::ecdsa::signature::{Signer as P256Signer, Verifier as P256Verifier};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use tessera_api::crypto::{CryptoCodec, DetachedSignature, Keypair, Signer, Verifier};

/// SECP256R1 public keys are 33 compressed SEC1 bytes (0x02/0x03 prefix).
pub const PUBLIC_KEY_SIZE: usize = 33;
/// SECP256R1 private keys are 32 scalar bytes.
pub const PRIVATE_KEY_SIZE: usize = 32;
/// DER-encoded ECDSA P-256 signatures are between 68 and 72 bytes.
pub const MIN_SIGNATURE_SIZE: usize = 68;
/// Upper bound of the DER signature length.
pub const MAX_SIGNATURE_SIZE: usize = 72;

/// A P-256 signing identity.
#[derive(Clone)]
pub struct P256KeyPair {
    /// Scalar key; the public half is derived on demand.
    secret_key: p256::ecdsa::SigningKey,
}

/// A detached P-256 signature, DER-encoded on the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct P256Signature(Vec<u8>);

/// A P-256 verifying key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct P256PublicKey(p256::ecdsa::VerifyingKey);

/// A P-256 scalar key.
#[derive(Clone)]
pub struct P256PrivateKey(p256::ecdsa::SigningKey);

impl P256KeyPair {
    /// Draws a fresh identity from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut rng = OsRng;
        Self {
            secret_key: p256::ecdsa::SigningKey::random(&mut rng),
        }
    }

    /// Rebuilds the identity around an existing scalar key.
    pub fn from_private_key(private_key: &P256PrivateKey) -> Self {
        Self {
            secret_key: private_key.0.clone(),
        }
    }
}

impl Keypair for P256KeyPair {
    type Public = P256PublicKey;
    type Secret = P256PrivateKey;
    type Signature = P256Signature;

    fn public(&self) -> Self::Public {
        P256PublicKey(*self.secret_key.verifying_key())
    }

    fn secret(&self) -> Self::Secret {
        P256PrivateKey(self.secret_key.clone())
    }

    fn sign(&self, message: &[u8]) -> Result<Self::Signature, CryptoError> {
        // RFC 6979 deterministic ECDSA, re-encoded to DER for the wire.
        let signature: p256::ecdsa::Signature = self.secret_key.sign(message);
        Ok(P256Signature(signature.to_der().as_bytes().to_vec()))
    }
}

impl Verifier for P256PublicKey {
    type Signature = P256Signature;

    fn verify(&self, message: &[u8], signature: &Self::Signature) -> Result<(), CryptoError> {
        let parsed = p256::ecdsa::Signature::from_der(&signature.0)
            .map_err(|_| CryptoError::InvalidSignatureSize(signature.0.len()))?;
        self.0
            .verify(message, &parsed)
            .map_err(|_| CryptoError::SignatureRejected)
    }
}

impl CryptoCodec for P256PublicKey {
    fn to_raw(&self) -> Vec<u8> {
        self.0.to_encoded_point(true).as_bytes().to_vec()
    }

    fn from_raw(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != PUBLIC_KEY_SIZE {
            return Err(CryptoError::InvalidKeySize(bytes.len()));
        }
        p256::ecdsa::VerifyingKey::from_sec1_bytes(bytes)
            .map(P256PublicKey)
            .map_err(|e| CryptoError::InvalidKey(format!("failed to parse public key: {e}")))
    }
}

impl Signer for P256PrivateKey {
    type Signature = P256Signature;

    fn sign(&self, message: &[u8]) -> Result<Self::Signature, CryptoError> {
        let signature: p256::ecdsa::Signature = self.0.sign(message);
        Ok(P256Signature(signature.to_der().as_bytes().to_vec()))
    }
}

impl P256PrivateKey {
    /// Derives the matching verifying key.
    pub fn public_key(&self) -> P256PublicKey {
        P256PublicKey(*self.0.verifying_key())
    }
}

impl CryptoCodec for P256PrivateKey {
    fn to_raw(&self) -> Vec<u8> {
        self.0.to_bytes().to_vec()
    }

    fn from_raw(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != PRIVATE_KEY_SIZE {
            return Err(CryptoError::InvalidKeySize(bytes.len()));
        }
        p256::ecdsa::SigningKey::from_slice(bytes)
            .map(P256PrivateKey)
            .map_err(|e| CryptoError::InvalidKey(format!("failed to parse private key: {e}")))
    }
}

impl CryptoCodec for P256Signature {
    fn to_raw(&self) -> Vec<u8> {
        self.0.clone()
    }

    fn from_raw(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() < MIN_SIGNATURE_SIZE || bytes.len() > MAX_SIGNATURE_SIZE {
            return Err(CryptoError::InvalidSignatureSize(bytes.len()));
        }
        // Reject byte strings that are not valid DER right away.
        p256::ecdsa::Signature::from_der(bytes)
            .map_err(|_| CryptoError::InvalidSignatureSize(bytes.len()))?;
        Ok(P256Signature(bytes.to_vec()))
    }
}

impl DetachedSignature for P256Signature {}

#[cfg(test)]
mod tests;
