// Path: crates/api/src/lib.rs

//! # Tessera Kernel API Crate Lints
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
        clippy::todo,
        clippy::unimplemented,
        clippy::indexing_slicing
    )
)]
#![forbid(unsafe_code)]
//! # Tessera Kernel API
//!
//! Core traits for the Tessera authorization kernel. This crate defines the
//! stable contract between the token chain and its cryptographic backends.

/// Trait contracts between the token chain and its signature backends.
pub mod crypto;
/// One import path for the error taxonomy defined in `tessera-types`.
pub mod error;

/// Frequently used traits and types, importable in one line.
pub mod prelude {
    pub use crate::crypto::{CryptoCodec, DetachedSignature, Keypair, Signer, Verifier};
    pub use crate::error::{CryptoError, ErrorCode, TokenError};
}
