// Path: crates/types/src/lib.rs
#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! # Tessera Kernel Types
//!
//! This crate is the foundational library for the Tessera authorization
//! kernel, containing the error taxonomy, protocol constants, and the
//! Protocol Buffers wire schema shared by every other crate in the
//! workspace.
//!
//! ## Architectural Role
//!
//! As the base crate, `tessera-types` has minimal dependencies and is itself
//! a dependency for almost every other crate in the workspace. This
//! structure prevents circular dependencies and provides a stable, canonical
//! definition for shared concerns like the [`error::TokenError`] hierarchy
//! and the [`wire`] container messages.

/// The lowest block schema version this implementation accepts.
pub const MIN_SCHEMA_VERSION: u32 = 3;
/// The highest block schema version this implementation produces or accepts.
pub const MAX_SCHEMA_VERSION: u32 = 6;
/// Schema version introducing scoped rules, `check all` and bitwise operators.
pub const DATALOG_3_1: u32 = 4;
/// Schema version introducing `reject if` checks.
pub const DATALOG_3_2: u32 = 5;
/// Schema version introducing closures, heterogeneous equality, `.type()`,
/// `.get()`, arrays, maps, null and SECP256R1 keys.
pub const DATALOG_3_3: u32 = 6;

/// A top-level, crate-wide `Result` type alias with a default error type.
pub type Result<T, E = crate::error::TokenError> = std::result::Result<T, E>;

/// A unified set of all error types used across the workspace.
pub mod error;
/// The Protocol Buffers wire schema for tokens and third-party exchanges.
pub mod wire;
