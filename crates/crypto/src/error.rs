// Path: crates/crypto/src/error.rs
//! Error surface of the `tessera-crypto` crate.

// The canonical definitions live in the base types crate; backends pull
// them through the api crate so every layer names the same type.
pub use tessera_api::error::CryptoError;
