// Path: crates/token/src/lib.rs
//! # Tessera Kernel Token Crate Lints
//!
//! This crate enforces a strict set of lints to ensure high-quality,
//! panic-free, and well-documented code. Panics are disallowed in non-test
//! code to promote robust error handling.
#![cfg_attr(
    not(test),
    deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)
)]
#![forbid(unsafe_code)]
//! # Tessera Kernel Token
//!
//! The bearer token itself: an append-only chain of signed blocks carrying
//! Datalog programs, the Protocol Buffers container binding it to the wire,
//! builder APIs mirroring the AST, the third-party signing exchange, and
//! the authorizer that decides allow or deny.
//!
//! A token starts with an authority block signed by the root key. Every
//! attenuation appends a block signed by the previous block's next key, so
//! the whole chain verifies from the root public key alone. Sealing
//! replaces the next secret with a final signature, preventing further
//! appends.

/// The decoded logical content of one block.
pub mod block;
/// Builder APIs mirroring the Datalog AST.
pub mod builder;
/// The signed block chain and its signature payload formats.
pub mod chain;
/// The wire container and conversions between proto and Datalog form.
pub mod format;
/// The authorizer: world assembly, checks and policies.
pub mod authorizer;
/// Root public key resolution for verification.
pub mod root;
/// The third-party block signing exchange.
pub mod third_party;
/// The token lifecycle: build, append, seal, serialize, verify.
pub mod token;

pub use authorizer::{Authorizer, AuthorizerLimits};
pub use builder::BlockBuilder;
pub use root::RootKeyProvider;
pub use third_party::{ThirdPartyBlock, ThirdPartyRequest};
pub use token::{Token, TokenBuilder};

pub use tessera_crypto::{Algorithm, KeyPair, PrivateKey, PublicKey};
pub use tessera_types::error::TokenError;
