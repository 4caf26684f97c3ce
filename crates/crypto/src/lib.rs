// Path: crates/crypto/src/lib.rs
//! # Tessera Kernel Crypto Crate Lints
//!
//! This crate enforces a strict set of lints to ensure high-quality,
//! panic-free, and well-documented code. Panics are disallowed in non-test
//! code to promote robust error handling.
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]
#![forbid(unsafe_code)]
//! # Tessera Kernel Cryptography
//!
//! Concrete signature backends (Ed25519 and SECP256R1) for the Tessera
//! authorization kernel, and the algorithm-erased key types the signed
//! block chain operates on.

pub mod error;
pub mod keys;
pub mod sign;

pub use keys::{Algorithm, KeyPair, PrivateKey, PublicKey, Signature};

#[cfg(test)]
mod tests {
    // Simple canary test to verify test discovery is working
    #[test]
    fn test_crypto_canary() {}
}
