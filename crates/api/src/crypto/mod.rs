// Path: crates/api/src/crypto/mod.rs
//! Trait contracts between the token chain and its signature backends.
//!
//! The chain never touches curve arithmetic directly. It signs and checks
//! byte buffers through the traits below, and a backend crate supplies one
//! implementation per supported algorithm.

use crate::error::CryptoError;
use zeroize::Zeroizing;

/// Byte-level codec for cryptographic material.
///
/// Each algorithm pins an exact layout: raw 32-byte Ed25519 keys and
/// scalars, 33-byte compressed P-256 points, DER signatures within their
/// size bounds. Parsing validates the layout up front, so malformed input
/// fails at the boundary instead of mid-verification.
pub trait CryptoCodec {
    /// The canonical encoding, as carried inside tokens.
    fn to_raw(&self) -> Vec<u8>;

    /// Rebuilds the value from its canonical encoding.
    fn from_raw(bytes: &[u8]) -> Result<Self, CryptoError>
    where
        Self: Sized;
}

/// A detached signature produced by one of the supported schemes.
pub trait DetachedSignature: CryptoCodec {}

/// The public half of a signature scheme.
pub trait Verifier: CryptoCodec {
    /// The signature form this key accepts.
    type Signature: DetachedSignature;

    /// Checks a signature over a message, failing on any mismatch.
    fn verify(&self, message: &[u8], signature: &Self::Signature) -> Result<(), CryptoError>;
}

/// The secret half of a signature scheme.
pub trait Signer: CryptoCodec {
    /// The signature form this key produces.
    type Signature: DetachedSignature;

    /// Signs a message.
    fn sign(&self, message: &[u8]) -> Result<Self::Signature, CryptoError>;

    /// Encodes the secret into a buffer that is wiped on drop.
    fn to_raw_zeroizing(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(self.to_raw())
    }
}

/// A complete signing identity: a secret together with the public half
/// derived from it.
pub trait Keypair {
    /// The public half.
    type Public: Verifier<Signature = Self::Signature>;
    /// The secret half.
    type Secret: Signer<Signature = Self::Signature>;
    /// The signature form produced by this scheme.
    type Signature: DetachedSignature;

    /// Derives the public half.
    fn public(&self) -> Self::Public;

    /// Hands out the secret half.
    fn secret(&self) -> Self::Secret;

    /// Signs a message with the secret half.
    fn sign(&self, message: &[u8]) -> Result<Self::Signature, CryptoError>;
}
