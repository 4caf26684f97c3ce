// Path: crates/token/src/block/mod.rs
//! The decoded logical content of one block.

use tessera_crypto::{Algorithm, PublicKey};
use tessera_datalog::{
    Binary, Check, CheckKind, Fact, KeyTable, Op, Rule, Scope, SymbolTable, Term, Unary,
};
use tessera_types::{DATALOG_3_1, DATALOG_3_2, DATALOG_3_3, MIN_SCHEMA_VERSION};

/// One block of a token, in Datalog form.
///
/// `symbols` holds only the strings this block introduced. For regular
/// blocks they extend the token's accumulated table; externally signed
/// blocks resolve against their own table alone.
#[derive(Debug, Clone)]
pub struct Block {
    /// Strings newly interned by this block.
    pub symbols: SymbolTable,
    /// Free-form context describing the block.
    pub context: Option<String>,
    /// Facts asserted by this block.
    pub facts: Vec<Fact>,
    /// Rules contributed by this block.
    pub rules: Vec<Rule>,
    /// Checks that must hold for the token to be accepted.
    pub checks: Vec<Check>,
    /// Default trust scopes for rules and checks without their own.
    pub scopes: Vec<Scope>,
    /// Public keys newly interned by this block.
    pub public_keys: KeyTable,
    /// The third-party signer's key, when this block is externally signed.
    pub external_key: Option<PublicKey>,
    /// The Datalog schema version declared by the block.
    pub version: u32,
}

impl Block {
    /// Renders the block as Datalog source, using the given resolution
    /// table (the token table for regular blocks, the block's own for
    /// third-party blocks).
    pub fn print_source(&self, symbols: &SymbolTable) -> String {
        let mut lines: Vec<String> = Vec::new();
        lines.extend(self.facts.iter().map(|f| symbols.print_fact(f)));
        lines.extend(self.rules.iter().map(|r| symbols.print_rule(r)));
        lines.extend(self.checks.iter().map(|c| symbols.print_check(c)));
        lines.join(";\n")
    }
}

/// Computes the lowest schema version able to express the given content.
pub fn required_schema_version(
    facts: &[Fact],
    rules: &[Rule],
    checks: &[Check],
    scopes: &[Scope],
    external_key_algorithm: Option<Algorithm>,
) -> u32 {
    let mut version = MIN_SCHEMA_VERSION;

    let all_rules = rules
        .iter()
        .chain(checks.iter().flat_map(|c| c.queries.iter()));

    if !scopes.is_empty() || all_rules.clone().any(|r| !r.scopes.is_empty()) {
        version = version.max(DATALOG_3_1);
    }
    if checks.iter().any(|c| c.kind == CheckKind::All) {
        version = version.max(DATALOG_3_1);
    }
    if checks.iter().any(|c| c.kind == CheckKind::Reject) {
        version = version.max(DATALOG_3_2);
    }
    if external_key_algorithm.is_some_and(|a| a != Algorithm::Ed25519) {
        version = version.max(DATALOG_3_3);
    }

    let mut terms = facts
        .iter()
        .flat_map(|f| f.predicate.terms.iter())
        .chain(all_rules.clone().flat_map(rule_terms));
    if terms.any(uses_3_3_term) {
        version = version.max(DATALOG_3_3);
    }

    let mut ops = all_rules
        .flat_map(|r| r.expressions.iter())
        .flat_map(|e| e.ops.iter());
    if ops.any(uses_3_3_op) {
        version = version.max(DATALOG_3_3);
    }

    version
}

fn rule_terms(rule: &Rule) -> impl Iterator<Item = &Term> {
    rule.head
        .terms
        .iter()
        .chain(rule.body.iter().flat_map(|p| p.terms.iter()))
}

fn uses_3_3_term(term: &Term) -> bool {
    match term {
        Term::Null | Term::Array(_) | Term::Map(_) => true,
        Term::Set(set) => set.iter().any(uses_3_3_term),
        _ => false,
    }
}

fn uses_3_3_op(op: &Op) -> bool {
    match op {
        Op::Closure(..) => true,
        Op::Unary(Unary::TypeOf) => true,
        Op::Binary(
            Binary::HeterogeneousEqual
            | Binary::HeterogeneousNotEqual
            | Binary::LazyAnd
            | Binary::LazyOr
            | Binary::Any
            | Binary::All
            | Binary::Get
            | Binary::TryOr,
        ) => true,
        Op::Value(term) => uses_3_3_term(term),
        _ => false,
    }
}
