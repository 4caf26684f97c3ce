// Path: crates/token/src/builder/mod.rs
//! Builder APIs mirroring the Datalog AST.
//!
//! The textual Datalog parser is a separate concern; programs are
//! assembled from these types instead. Builder values carry plain strings
//! and concrete public keys; converting them into a block interns
//! everything through the token's symbol and key tables.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{SystemTime, UNIX_EPOCH};

use tessera_crypto::PublicKey;
use tessera_datalog as datalog;
use tessera_datalog::{CheckKind, KeyTable, PolicyKind, SymbolTable};
use tessera_types::error::{LanguageError, TokenError};

use crate::block::{required_schema_version, Block};

/// A builder-side term, carrying strings instead of interned ids.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Term {
    /// A variable, like `$resource`.
    Variable(String),
    /// A signed 64-bit integer.
    Integer(i64),
    /// A string literal.
    Str(String),
    /// Seconds since the Unix epoch.
    Date(u64),
    /// An opaque byte string.
    Bytes(Vec<u8>),
    /// A boolean.
    Bool(bool),
    /// An unordered set of ground terms.
    Set(BTreeSet<Term>),
    /// An ordered sequence of ground terms.
    Array(Vec<Term>),
    /// An unordered mapping from keys to ground terms.
    Map(BTreeMap<MapKey, Term>),
    /// The null value.
    Null,
}

/// A builder-side map key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum MapKey {
    /// A signed 64-bit integer key.
    Integer(i64),
    /// A string key.
    Str(String),
}

impl Term {
    fn convert(&self, symbols: &mut SymbolTable) -> datalog::Term {
        match self {
            Term::Variable(name) => datalog::Term::Variable(symbols.insert(name) as u32),
            Term::Integer(i) => datalog::Term::Integer(*i),
            Term::Str(s) => datalog::Term::Str(symbols.insert(s)),
            Term::Date(d) => datalog::Term::Date(*d),
            Term::Bytes(b) => datalog::Term::Bytes(b.clone()),
            Term::Bool(b) => datalog::Term::Bool(*b),
            Term::Set(set) => {
                datalog::Term::Set(set.iter().map(|t| t.convert(symbols)).collect())
            }
            Term::Array(array) => {
                datalog::Term::Array(array.iter().map(|t| t.convert(symbols)).collect())
            }
            Term::Map(map) => datalog::Term::Map(
                map.iter()
                    .map(|(key, value)| {
                        let key = match key {
                            MapKey::Integer(i) => datalog::MapKey::Integer(*i),
                            MapKey::Str(s) => datalog::MapKey::Str(symbols.insert(s)),
                        };
                        (key, value.convert(symbols))
                    })
                    .collect(),
            ),
            Term::Null => datalog::Term::Null,
        }
    }

    fn collect_variables(&self, out: &mut BTreeSet<String>) {
        match self {
            Term::Variable(name) => {
                out.insert(name.clone());
            }
            Term::Set(set) => set.iter().for_each(|t| t.collect_variables(out)),
            Term::Array(array) => array.iter().for_each(|t| t.collect_variables(out)),
            Term::Map(map) => map.values().for_each(|t| t.collect_variables(out)),
            _ => {}
        }
    }
}

/// Shorthand for a variable term.
pub fn var(name: &str) -> Term {
    Term::Variable(name.to_string())
}

/// Shorthand for a string term.
pub fn string(value: &str) -> Term {
    Term::Str(value.to_string())
}

/// Shorthand for an integer term.
pub fn int(value: i64) -> Term {
    Term::Integer(value)
}

/// Shorthand for a date term from a system time.
pub fn date(value: SystemTime) -> Term {
    let seconds = value
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    Term::Date(seconds)
}

/// Shorthand for an array term.
pub fn array(values: Vec<Term>) -> Term {
    Term::Array(values)
}

/// Shorthand for a set term.
pub fn set(values: impl IntoIterator<Item = Term>) -> Term {
    Term::Set(values.into_iter().collect())
}

impl From<i64> for Term {
    fn from(value: i64) -> Self {
        Term::Integer(value)
    }
}

impl From<&str> for Term {
    fn from(value: &str) -> Self {
        Term::Str(value.to_string())
    }
}

impl From<String> for Term {
    fn from(value: String) -> Self {
        Term::Str(value)
    }
}

impl From<bool> for Term {
    fn from(value: bool) -> Self {
        Term::Bool(value)
    }
}

impl From<Vec<u8>> for Term {
    fn from(value: Vec<u8>) -> Self {
        Term::Bytes(value)
    }
}

/// A builder-side predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    /// The predicate name.
    pub name: String,
    /// The terms, in order.
    pub terms: Vec<Term>,
}

impl Predicate {
    /// Creates a predicate.
    pub fn new(name: &str, terms: Vec<Term>) -> Self {
        Predicate {
            name: name.to_string(),
            terms,
        }
    }

    fn convert(&self, symbols: &mut SymbolTable) -> datalog::Predicate {
        datalog::Predicate {
            name: symbols.insert(&self.name),
            terms: self.terms.iter().map(|t| t.convert(symbols)).collect(),
        }
    }
}

/// A builder-side fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fact {
    /// The predicate; must be ground.
    pub predicate: Predicate,
}

impl Fact {
    /// Creates a fact.
    pub fn new(name: &str, terms: Vec<Term>) -> Self {
        Fact {
            predicate: Predicate::new(name, terms),
        }
    }

    /// Converts the fact, rejecting variables.
    pub fn convert(&self, symbols: &mut SymbolTable) -> Result<datalog::Fact, TokenError> {
        let mut variables = BTreeSet::new();
        for term in &self.predicate.terms {
            term.collect_variables(&mut variables);
        }
        if !variables.is_empty() {
            return Err(
                LanguageError::InvalidVariables(variables.into_iter().collect()).into(),
            );
        }
        Ok(datalog::Fact {
            predicate: self.predicate.convert(symbols),
        })
    }
}

/// A builder-side expression op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// Push a term.
    Value(Term),
    /// Apply a unary operator.
    Unary(datalog::Unary),
    /// Apply a binary operator.
    Binary(datalog::Binary),
    /// Push a closure with named parameters.
    Closure(Vec<String>, Vec<Op>),
}

impl Op {
    fn convert(&self, symbols: &mut SymbolTable) -> datalog::Op {
        match self {
            Op::Value(term) => datalog::Op::Value(term.convert(symbols)),
            Op::Unary(unary) => datalog::Op::Unary(*unary),
            Op::Binary(binary) => datalog::Op::Binary(*binary),
            Op::Closure(params, body) => datalog::Op::Closure(
                params
                    .iter()
                    .map(|p| symbols.insert(p) as u32)
                    .collect(),
                body.iter().map(|op| op.convert(symbols)).collect(),
            ),
        }
    }
}

/// A builder-side expression: a postfix op sequence with combinators for
/// assembling it in infix order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Expression {
    /// The ops, in evaluation order.
    pub ops: Vec<Op>,
}

impl Expression {
    /// A single-value expression.
    pub fn value(term: Term) -> Self {
        Expression {
            ops: vec![Op::Value(term)],
        }
    }

    /// Applies a unary operator to this expression.
    pub fn unary(self, op: datalog::Unary) -> Self {
        let mut ops = self.ops;
        ops.push(Op::Unary(op));
        Expression { ops }
    }

    /// Combines two expressions with a binary operator.
    pub fn binary(left: Expression, right: Expression, op: datalog::Binary) -> Self {
        let mut ops = left.ops;
        ops.extend(right.ops);
        ops.push(Op::Binary(op));
        Expression { ops }
    }

    /// Combines this expression with a closure operand (for the lazy and
    /// quantifier operators).
    pub fn closure_op(self, params: Vec<String>, body: Expression, op: datalog::Binary) -> Self {
        let mut ops = self.ops;
        ops.push(Op::Closure(params, body.ops));
        ops.push(Op::Binary(op));
        Expression { ops }
    }

    fn convert(&self, symbols: &mut SymbolTable) -> datalog::Expression {
        datalog::Expression {
            ops: self.ops.iter().map(|op| op.convert(symbols)).collect(),
        }
    }
}

/// A builder-side trust scope, carrying a concrete public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Trust facts from the authority block.
    Authority,
    /// Trust facts from all previous blocks.
    Previous,
    /// Trust facts from blocks signed by this key.
    PublicKey(PublicKey),
}

impl Scope {
    fn convert(&self, keys: &mut KeyTable) -> datalog::Scope {
        match self {
            Scope::Authority => datalog::Scope::Authority,
            Scope::Previous => datalog::Scope::Previous,
            Scope::PublicKey(key) => datalog::Scope::PublicKey(keys.insert(key)),
        }
    }
}

/// A builder-side rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// The derived predicate.
    pub head: Predicate,
    /// The body predicates.
    pub body: Vec<Predicate>,
    /// The constraining expressions.
    pub expressions: Vec<Expression>,
    /// The trust scopes.
    pub scopes: Vec<Scope>,
}

impl Rule {
    /// Creates a rule.
    pub fn new(
        head: Predicate,
        body: Vec<Predicate>,
        expressions: Vec<Expression>,
        scopes: Vec<Scope>,
    ) -> Self {
        Rule {
            head,
            body,
            expressions,
            scopes,
        }
    }

    /// Converts and validates the rule.
    pub fn convert(
        &self,
        symbols: &mut SymbolTable,
        keys: &mut KeyTable,
    ) -> Result<datalog::Rule, TokenError> {
        let rule = datalog::Rule::new(
            self.head.convert(symbols),
            self.body.iter().map(|p| p.convert(symbols)).collect(),
            self.expressions.iter().map(|e| e.convert(symbols)).collect(),
            self.scopes.iter().map(|s| s.convert(keys)).collect(),
        );
        rule.validate_variables(symbols)
            .map_err(TokenError::Language)?;
        Ok(rule)
    }
}

/// A builder-side query: a rule without a meaningful head, as used by
/// checks and policies.
pub fn query(body: Vec<Predicate>, expressions: Vec<Expression>, scopes: Vec<Scope>) -> Rule {
    Rule::new(Predicate::new("query", vec![]), body, expressions, scopes)
}

/// A builder-side check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    /// The rule-shaped queries.
    pub queries: Vec<Rule>,
    /// The matching kind.
    pub kind: CheckKind,
}

impl Check {
    /// A `check if` with a single query.
    pub fn one(query: Rule) -> Self {
        Check {
            queries: vec![query],
            kind: CheckKind::One,
        }
    }

    /// A `check all` with a single query.
    pub fn all(query: Rule) -> Self {
        Check {
            queries: vec![query],
            kind: CheckKind::All,
        }
    }

    /// A `reject if` with a single query.
    pub fn reject(query: Rule) -> Self {
        Check {
            queries: vec![query],
            kind: CheckKind::Reject,
        }
    }

    /// Converts and validates the check.
    pub fn convert(
        &self,
        symbols: &mut SymbolTable,
        keys: &mut KeyTable,
    ) -> Result<datalog::Check, TokenError> {
        Ok(datalog::Check {
            queries: self
                .queries
                .iter()
                .map(|q| q.convert(symbols, keys))
                .collect::<Result<Vec<_>, _>>()?,
            kind: self.kind,
        })
    }
}

/// A builder-side policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    /// The rule-shaped queries.
    pub queries: Vec<Rule>,
    /// Whether a match accepts or rejects.
    pub kind: PolicyKind,
}

impl Policy {
    /// An `allow if` with a single query.
    pub fn allow(query: Rule) -> Self {
        Policy {
            queries: vec![query],
            kind: PolicyKind::Allow,
        }
    }

    /// An unconditional `allow if true`.
    pub fn allow_all() -> Self {
        Policy::allow(crate::builder::query(
            vec![],
            vec![Expression::value(Term::Bool(true))],
            vec![],
        ))
    }

    /// A `deny if` with a single query.
    pub fn deny(query: Rule) -> Self {
        Policy {
            queries: vec![query],
            kind: PolicyKind::Deny,
        }
    }

    /// An unconditional `deny if true`.
    pub fn deny_all() -> Self {
        Policy::deny(crate::builder::query(
            vec![],
            vec![Expression::value(Term::Bool(true))],
            vec![],
        ))
    }

    /// Converts and validates the policy.
    pub fn convert(
        &self,
        symbols: &mut SymbolTable,
        keys: &mut KeyTable,
    ) -> Result<datalog::Policy, TokenError> {
        Ok(datalog::Policy {
            queries: self
                .queries
                .iter()
                .map(|q| q.convert(symbols, keys))
                .collect::<Result<Vec<_>, _>>()?,
            kind: self.kind,
        })
    }
}

/// Accumulates the contents of one block before it is signed.
#[derive(Debug, Clone, Default)]
pub struct BlockBuilder {
    facts: Vec<Fact>,
    rules: Vec<Rule>,
    checks: Vec<Check>,
    scopes: Vec<Scope>,
    context: Option<String>,
}

impl BlockBuilder {
    /// Creates an empty block builder.
    pub fn new() -> Self {
        BlockBuilder::default()
    }

    /// Adds a fact.
    pub fn fact(mut self, fact: Fact) -> Self {
        self.facts.push(fact);
        self
    }

    /// Adds a rule.
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Adds a check.
    pub fn check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    /// Adds a block-level trust scope, inherited by rules and checks that
    /// declare none of their own.
    pub fn scope(mut self, scope: Scope) -> Self {
        self.scopes.push(scope);
        self
    }

    /// Sets the block context string.
    pub fn context(mut self, context: &str) -> Self {
        self.context = Some(context.to_string());
        self
    }

    /// True when nothing was added.
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
            && self.rules.is_empty()
            && self.checks.is_empty()
            && self.scopes.is_empty()
    }

    /// Interns the block against a base table and assembles it.
    ///
    /// `base_symbols` is the token's accumulated table (or a fresh default
    /// table for third-party blocks); only the strings and keys introduced
    /// beyond it are stored in the block.
    pub(crate) fn build(self, base_symbols: &SymbolTable) -> Result<Block, TokenError> {
        let mut symbols = base_symbols.clone();
        let symbols_base_len = symbols.len();
        let keys_base_len = symbols.public_keys.len();

        let facts = self
            .facts
            .iter()
            .map(|f| f.convert(&mut symbols))
            .collect::<Result<Vec<_>, _>>()?;
        let mut keys = symbols.public_keys.clone();
        let rules = self
            .rules
            .iter()
            .map(|r| r.convert(&mut symbols, &mut keys))
            .collect::<Result<Vec<_>, _>>()?;
        let checks = self
            .checks
            .iter()
            .map(|c| c.convert(&mut symbols, &mut keys))
            .collect::<Result<Vec<_>, _>>()?;
        let scopes: Vec<datalog::Scope> =
            self.scopes.iter().map(|s| s.convert(&mut keys)).collect();

        let version = required_schema_version(&facts, &rules, &checks, &scopes, None);

        let new_symbols = symbols.split_at(symbols_base_len);
        let new_keys = keys.split_at(keys_base_len);
        let mut public_keys = KeyTable::new();
        for key in &new_keys {
            public_keys.insert(key);
        }

        Ok(Block {
            symbols: SymbolTable::from_symbols(new_symbols),
            context: self.context,
            facts,
            rules,
            checks,
            scopes,
            public_keys,
            external_key: None,
            version,
        })
    }
}

#[cfg(test)]
mod tests;
