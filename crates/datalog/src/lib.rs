// Path: crates/datalog/src/lib.rs
//! # Tessera Kernel Datalog Crate Lints
//!
//! This crate enforces a strict set of lints to ensure high-quality,
//! panic-free, and well-documented code. Panics are disallowed in non-test
//! code to promote robust error handling.
#![cfg_attr(
    not(test),
    deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)
)]
#![forbid(unsafe_code)]
//! # Tessera Kernel Datalog
//!
//! The restricted Datalog dialect evaluated by the authorizer: terms,
//! predicates, facts, rules, checks and policies, the symbol and public-key
//! interning tables binding them to the wire format, origin tracking across
//! trust boundaries, the expression stack machine, and the bounded
//! fixed-point solver.

/// Rendering of Datalog structures back to source text.
pub mod display;
/// The expression stack machine and its op set.
pub mod expression;
/// The core data model: terms, predicates, facts, rules, checks, policies.
pub mod model;
/// Fact origins and trusted-origin resolution.
pub mod origin;
/// Symbol and public-key interning.
pub mod symbol;
/// The fact store, rule store and fixed-point solver.
pub mod world;

pub use expression::{Binary, Expression, Op, Unary};
pub use model::{
    Check, CheckKind, Fact, MapKey, Policy, PolicyKind, Predicate, Rule, Scope, Term,
};
pub use origin::{Origin, TrustedOrigins, AUTHORIZER_ID};
pub use symbol::{
    default_symbol_table, KeyTable, SymbolIndex, SymbolTable, TemporarySymbolTable,
    DEFAULT_SYMBOLS_OFFSET,
};
pub use world::{FactSet, RuleSet, RunError, RunLimits, World};
