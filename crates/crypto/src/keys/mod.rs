// Path: crates/crypto/src/keys/mod.rs
//! Algorithm-erased key material for the signed block chain.
//!
//! The signature backends in [`crate::sign`] are strongly typed per curve;
//! the block chain stores whichever algorithm each block was signed with,
//! so it operates on the erased [`KeyPair`], [`PublicKey`], [`PrivateKey`]
//! and [`Signature`] types defined here.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use tessera_api::crypto::{CryptoCodec, Keypair, Signer, Verifier};
use tessera_api::error::CryptoError;
use zeroize::Zeroizing;

use crate::sign::ecdsa::{P256KeyPair, P256PrivateKey, P256PublicKey, P256Signature};
use crate::sign::eddsa::{
    Ed25519KeyPair, Ed25519PrivateKey, Ed25519PublicKey, Ed25519Signature,
};

pub use tessera_types::wire::Algorithm;

/// The lowercase protocol name of an algorithm, as used in scope
/// annotations like `ed25519/<hex>`.
pub fn algorithm_name(algorithm: Algorithm) -> &'static str {
    match algorithm {
        Algorithm::Ed25519 => "ed25519",
        Algorithm::Secp256r1 => "secp256r1",
    }
}

/// A key pair for either supported curve.
#[derive(Clone)]
pub enum KeyPair {
    /// An Ed25519 key pair.
    Ed25519(Ed25519KeyPair),
    /// A SECP256R1 key pair.
    P256(P256KeyPair),
}

impl KeyPair {
    /// Generates a fresh key pair from the OS CSPRNG.
    pub fn generate(algorithm: Algorithm) -> Self {
        log::trace!("generating {} key pair", algorithm_name(algorithm));
        match algorithm {
            Algorithm::Ed25519 => KeyPair::Ed25519(Ed25519KeyPair::generate()),
            Algorithm::Secp256r1 => KeyPair::P256(P256KeyPair::generate()),
        }
    }

    /// Rebuilds a key pair from 32 private key bytes.
    pub fn from_private_key_bytes(
        algorithm: Algorithm,
        bytes: &[u8],
    ) -> Result<Self, CryptoError> {
        Ok(Self::from_private_key(&PrivateKey::from_bytes(
            algorithm, bytes,
        )?))
    }

    /// Rebuilds a key pair from a hex-encoded private key.
    pub fn from_private_key_hex(algorithm: Algorithm, hex_key: &str) -> Result<Self, CryptoError> {
        let bytes =
            hex::decode(hex_key).map_err(|e| CryptoError::InvalidKey(format!("invalid hex: {e}")))?;
        Self::from_private_key_bytes(algorithm, &bytes)
    }

    /// Rebuilds a key pair from an erased private key.
    pub fn from_private_key(private_key: &PrivateKey) -> Self {
        match private_key {
            PrivateKey::Ed25519(k) => KeyPair::Ed25519(Ed25519KeyPair::from_private_key(k)),
            PrivateKey::P256(k) => KeyPair::P256(P256KeyPair::from_private_key(k)),
        }
    }

    /// The algorithm of this key pair.
    pub fn algorithm(&self) -> Algorithm {
        match self {
            KeyPair::Ed25519(_) => Algorithm::Ed25519,
            KeyPair::P256(_) => Algorithm::Secp256r1,
        }
    }

    /// The public half.
    pub fn public(&self) -> PublicKey {
        match self {
            KeyPair::Ed25519(k) => PublicKey::Ed25519(k.public()),
            KeyPair::P256(k) => PublicKey::P256(k.public()),
        }
    }

    /// The private half.
    pub fn private(&self) -> PrivateKey {
        match self {
            KeyPair::Ed25519(k) => PrivateKey::Ed25519(k.secret()),
            KeyPair::P256(k) => PrivateKey::P256(k.secret()),
        }
    }

    /// Signs a message, producing wire-ready signature bytes.
    pub fn sign(&self, message: &[u8]) -> Result<Signature, CryptoError> {
        match self {
            KeyPair::Ed25519(k) => Ok(Signature(k.sign(message)?.to_raw())),
            KeyPair::P256(k) => Ok(Signature(k.sign(message)?.to_raw())),
        }
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Private key material is never printed.
        f.debug_struct("KeyPair")
            .field("public", &self.public())
            .finish()
    }
}

/// A public key for either supported curve.
#[derive(Clone, Debug)]
pub enum PublicKey {
    /// An Ed25519 public key.
    Ed25519(Ed25519PublicKey),
    /// A SECP256R1 public key.
    P256(P256PublicKey),
}

impl PublicKey {
    /// Parses a public key from raw bytes for the given algorithm.
    pub fn from_bytes(algorithm: Algorithm, bytes: &[u8]) -> Result<Self, CryptoError> {
        match algorithm {
            Algorithm::Ed25519 => Ok(PublicKey::Ed25519(Ed25519PublicKey::from_raw(bytes)?)),
            Algorithm::Secp256r1 => Ok(PublicKey::P256(P256PublicKey::from_raw(bytes)?)),
        }
    }

    /// Parses a public key from its wire representation.
    pub fn from_wire(key: &tessera_types::wire::PublicKey) -> Result<Self, CryptoError> {
        let algorithm = Algorithm::try_from(key.algorithm)
            .map_err(|_| CryptoError::UnsupportedAlgorithm(key.algorithm))?;
        Self::from_bytes(algorithm, &key.key)
    }

    /// The wire representation of this key.
    pub fn to_wire(&self) -> tessera_types::wire::PublicKey {
        tessera_types::wire::PublicKey {
            algorithm: self.algorithm() as i32,
            key: self.to_bytes(),
        }
    }

    /// The algorithm of this key.
    pub fn algorithm(&self) -> Algorithm {
        match self {
            PublicKey::Ed25519(_) => Algorithm::Ed25519,
            PublicKey::P256(_) => Algorithm::Secp256r1,
        }
    }

    /// The raw key bytes (32 for Ed25519, 33 compressed for SECP256R1).
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            PublicKey::Ed25519(k) => k.to_raw(),
            PublicKey::P256(k) => k.to_raw(),
        }
    }

    /// Verifies a signature over a message, enforcing the per-algorithm
    /// signature size constraints first.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), CryptoError> {
        match self {
            PublicKey::Ed25519(k) => {
                let parsed = Ed25519Signature::from_raw(&signature.0)?;
                k.verify(message, &parsed)
            }
            PublicKey::P256(k) => {
                let parsed = P256Signature::from_raw(&signature.0)?;
                k.verify(message, &parsed)
            }
        }
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            algorithm_name(self.algorithm()),
            hex::encode(self.to_bytes())
        )
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.algorithm() == other.algorithm() && self.to_bytes() == other.to_bytes()
    }
}

impl Eq for PublicKey {}

impl Hash for PublicKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.algorithm() as i32).hash(state);
        self.to_bytes().hash(state);
    }
}

impl PartialOrd for PublicKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PublicKey {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.algorithm(), self.to_bytes()).cmp(&(other.algorithm(), other.to_bytes()))
    }
}

/// A private key for either supported curve.
#[derive(Clone)]
pub enum PrivateKey {
    /// An Ed25519 private key.
    Ed25519(Ed25519PrivateKey),
    /// A SECP256R1 private key.
    P256(P256PrivateKey),
}

impl PrivateKey {
    /// Parses a private key from its 32 raw bytes.
    pub fn from_bytes(algorithm: Algorithm, bytes: &[u8]) -> Result<Self, CryptoError> {
        match algorithm {
            Algorithm::Ed25519 => Ok(PrivateKey::Ed25519(Ed25519PrivateKey::from_raw(bytes)?)),
            Algorithm::Secp256r1 => Ok(PrivateKey::P256(P256PrivateKey::from_raw(bytes)?)),
        }
    }

    /// Parses a private key from a hex string.
    pub fn from_hex(algorithm: Algorithm, hex_key: &str) -> Result<Self, CryptoError> {
        let bytes =
            hex::decode(hex_key).map_err(|e| CryptoError::InvalidKey(format!("invalid hex: {e}")))?;
        Self::from_bytes(algorithm, &bytes)
    }

    /// The algorithm of this key.
    pub fn algorithm(&self) -> Algorithm {
        match self {
            PrivateKey::Ed25519(_) => Algorithm::Ed25519,
            PrivateKey::P256(_) => Algorithm::Secp256r1,
        }
    }

    /// The key bytes, in a buffer wiped on drop.
    pub fn to_bytes(&self) -> Zeroizing<Vec<u8>> {
        match self {
            PrivateKey::Ed25519(k) => k.to_raw_zeroizing(),
            PrivateKey::P256(k) => k.to_raw_zeroizing(),
        }
    }

    /// Derives the matching public key.
    pub fn public_key(&self) -> PublicKey {
        match self {
            PrivateKey::Ed25519(k) => PublicKey::Ed25519(k.public_key()),
            PrivateKey::P256(k) => PublicKey::P256(k.public_key()),
        }
    }
}

/// Wire-ready signature bytes, validated lazily against the verifying
/// key's algorithm.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Signature(Vec<u8>);

impl Signature {
    /// Wraps raw signature bytes from the wire.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Signature(bytes)
    }

    /// The raw signature bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes the signature, returning its bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}
