// Path: crates/datalog/src/model/mod.rs
//! The core Datalog data model.
//!
//! Terms, predicates, facts, rules, checks and policies are plain data with
//! structural equality and hashing. Rule application (unification against
//! the fact store plus expression evaluation) lives here; the fixed-point
//! loop that drives it lives in [`crate::world`].

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};
use tessera_types::error::{ExecutionError, LanguageError};

use crate::expression::{Expression, Op};
use crate::origin::Origin;
use crate::symbol::{SymbolIndex, SymbolTable, TemporarySymbolTable};

/// A Datalog term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Term {
    /// A variable, identified by an interned symbol id.
    Variable(u32),
    /// A signed 64-bit integer.
    Integer(i64),
    /// An interned string.
    Str(SymbolIndex),
    /// Seconds since the Unix epoch.
    Date(u64),
    /// An opaque byte string.
    Bytes(Vec<u8>),
    /// A boolean.
    Bool(bool),
    /// An unordered set of ground, non-set terms.
    Set(BTreeSet<Term>),
    /// An ordered sequence of ground terms.
    Array(Vec<Term>),
    /// An unordered mapping from keys to ground terms.
    Map(BTreeMap<MapKey, Term>),
    /// The null value.
    Null,
}

impl Term {
    /// True when the term contains no variable, at any depth.
    pub fn is_ground(&self) -> bool {
        match self {
            Term::Variable(_) => false,
            Term::Set(set) => set.iter().all(Term::is_ground),
            Term::Array(array) => array.iter().all(Term::is_ground),
            Term::Map(map) => map.values().all(Term::is_ground),
            _ => true,
        }
    }
}

/// A map key: an integer or an interned string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MapKey {
    /// A signed 64-bit integer key.
    Integer(i64),
    /// An interned string key.
    Str(SymbolIndex),
}

/// An interned name applied to an ordered list of terms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Predicate {
    /// The interned predicate name.
    pub name: SymbolIndex,
    /// The terms, in order.
    pub terms: Vec<Term>,
}

impl Predicate {
    /// Creates a predicate.
    pub fn new(name: SymbolIndex, terms: Vec<Term>) -> Self {
        Predicate { name, terms }
    }
}

/// A ground predicate, stored in the world together with its origin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fact {
    /// The predicate; every term is ground.
    pub predicate: Predicate,
}

impl Fact {
    /// Creates a fact.
    pub fn new(name: SymbolIndex, terms: Vec<Term>) -> Self {
        Fact {
            predicate: Predicate::new(name, terms),
        }
    }
}

/// A trust scope annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    /// Trust facts from the authority block.
    Authority,
    /// Trust facts from all previous blocks.
    Previous,
    /// Trust facts from blocks signed by the referenced public key.
    PublicKey(u64),
}

/// A rule: a head derived from body predicates under expression constraints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    /// The derived predicate.
    pub head: Predicate,
    /// The predicates matched against the fact store.
    pub body: Vec<Predicate>,
    /// Expressions that must all evaluate to `true`.
    pub expressions: Vec<Expression>,
    /// Trust scope annotations.
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

    /// Applies the rule against the given facts, producing derived facts
    /// tagged with the union of the contributing origins and the rule's own
    /// block id.
    pub fn apply(
        &self,
        facts: &[(&Origin, &Fact)],
        rule_origin: usize,
        symbols: &SymbolTable,
    ) -> Result<Vec<(Origin, Fact)>, ExecutionError> {
        let mut results = Vec::new();
        self.for_each_match(facts, symbols, &mut |bindings, origin| {
            let mut derived_origin = origin.clone();
            derived_origin.insert(rule_origin);
            results.push((derived_origin, self.substitute_head(bindings)?));
            Ok(ControlFlow::Continue(()))
        })?;
        Ok(results)
    }

    /// True when at least one unification satisfies every expression.
    pub fn find_match(
        &self,
        facts: &[(&Origin, &Fact)],
        symbols: &SymbolTable,
    ) -> Result<bool, ExecutionError> {
        let mut found = false;
        self.for_each_match(facts, symbols, &mut |_, _| {
            found = true;
            Ok(ControlFlow::Break(()))
        })?;
        Ok(found)
    }

    /// True when at least one unification exists and every unification
    /// satisfies every expression.
    pub fn check_match_all(
        &self,
        facts: &[(&Origin, &Fact)],
        symbols: &SymbolTable,
    ) -> Result<bool, ExecutionError> {
        let mut found = false;
        let mut all_hold = true;
        self.for_each_unification(facts, &mut |bindings, _| {
            if self.expressions_hold(bindings, symbols)? {
                found = true;
                Ok(ControlFlow::Continue(()))
            } else {
                all_hold = false;
                Ok(ControlFlow::Break(()))
            }
        })?;
        Ok(found && all_hold)
    }

    /// Enumerates unifications that also satisfy every expression.
    fn for_each_match<F>(
        &self,
        facts: &[(&Origin, &Fact)],
        symbols: &SymbolTable,
        visitor: &mut F,
    ) -> Result<(), ExecutionError>
    where
        F: FnMut(&HashMap<u32, Term>, &Origin) -> Result<ControlFlow<()>, ExecutionError>,
    {
        self.for_each_unification(facts, &mut |bindings, origin| {
            if self.expressions_hold(bindings, symbols)? {
                visitor(bindings, origin)
            } else {
                Ok(ControlFlow::Continue(()))
            }
        })
    }

    /// Enumerates every assignment of body predicates to candidate facts
    /// with consistent variable bindings.
    fn for_each_unification<F>(
        &self,
        facts: &[(&Origin, &Fact)],
        visitor: &mut F,
    ) -> Result<(), ExecutionError>
    where
        F: FnMut(&HashMap<u32, Term>, &Origin) -> Result<ControlFlow<()>, ExecutionError>,
    {
        let mut bindings = HashMap::new();
        self.unify_from(facts, 0, &mut bindings, &Origin::new(), visitor)
            .map(|_| ())
    }

    fn unify_from<F>(
        &self,
        facts: &[(&Origin, &Fact)],
        index: usize,
        bindings: &mut HashMap<u32, Term>,
        origin: &Origin,
        visitor: &mut F,
    ) -> Result<ControlFlow<()>, ExecutionError>
    where
        F: FnMut(&HashMap<u32, Term>, &Origin) -> Result<ControlFlow<()>, ExecutionError>,
    {
        let Some(predicate) = self.body.get(index) else {
            return visitor(bindings, origin);
        };

        for (fact_origin, fact) in facts {
            if fact.predicate.name != predicate.name
                || fact.predicate.terms.len() != predicate.terms.len()
            {
                continue;
            }

            // Track fresh bindings so they can be undone on backtrack.
            let mut introduced = Vec::new();
            let matched = predicate
                .terms
                .iter()
                .zip(fact.predicate.terms.iter())
                .all(|(rule_term, fact_term)| match rule_term {
                    Term::Variable(v) => match bindings.get(v) {
                        Some(bound) => bound == fact_term,
                        None => {
                            bindings.insert(*v, fact_term.clone());
                            introduced.push(*v);
                            true
                        }
                    },
                    _ => rule_term == fact_term,
                });

            if matched {
                let combined = origin.union(fact_origin);
                let flow = self.unify_from(facts, index + 1, bindings, &combined, visitor)?;
                if flow == ControlFlow::Break(()) {
                    return Ok(ControlFlow::Break(()));
                }
            }

            for v in introduced {
                bindings.remove(&v);
            }
        }

        Ok(ControlFlow::Continue(()))
    }

    /// Evaluates every expression under the bindings; all must be `true`.
    fn expressions_hold(
        &self,
        bindings: &HashMap<u32, Term>,
        symbols: &SymbolTable,
    ) -> Result<bool, ExecutionError> {
        let mut temporary = TemporarySymbolTable::new(symbols);
        for expression in &self.expressions {
            match expression.evaluate(bindings, &mut temporary)? {
                Term::Bool(true) => {}
                Term::Bool(false) => return Ok(false),
                _ => return Err(ExecutionError::InvalidType),
            }
        }
        Ok(true)
    }

    fn substitute_head(&self, bindings: &HashMap<u32, Term>) -> Result<Fact, ExecutionError> {
        let mut terms = Vec::with_capacity(self.head.terms.len());
        for term in &self.head.terms {
            match term {
                Term::Variable(v) => match bindings.get(v) {
                    Some(bound) => terms.push(bound.clone()),
                    None => {
                        return Err(ExecutionError::Execution(format!(
                            "head variable {v} is not bound by the rule body"
                        )))
                    }
                },
                _ => terms.push(term.clone()),
            }
        }
        Ok(Fact::new(self.head.name, terms))
    }

    /// Validates that every variable in the head or in any expression is
    /// introduced by a body predicate.
    pub fn validate_variables(&self, symbols: &SymbolTable) -> Result<(), LanguageError> {
        let mut body_variables = BTreeSet::new();
        for predicate in &self.body {
            for term in &predicate.terms {
                if let Term::Variable(v) = term {
                    body_variables.insert(*v);
                }
            }
        }

        let mut undefined = BTreeSet::new();
        for term in &self.head.terms {
            if let Term::Variable(v) = term {
                if !body_variables.contains(v) {
                    undefined.insert(*v);
                }
            }
        }
        for expression in &self.expressions {
            collect_free_variables(&expression.ops, &mut |v| {
                if !body_variables.contains(&v) {
                    undefined.insert(v);
                }
            });
        }

        if undefined.is_empty() {
            Ok(())
        } else {
            Err(LanguageError::InvalidVariables(
                undefined
                    .into_iter()
                    .map(|v| symbols.print_symbol(v as u64))
                    .collect(),
            ))
        }
    }
}

/// Walks an op sequence, reporting variables that are not closure-bound.
fn collect_free_variables(ops: &[Op], report: &mut impl FnMut(u32)) {
    fn walk(ops: &[Op], bound: &mut Vec<u32>, report: &mut impl FnMut(u32)) {
        for op in ops {
            match op {
                Op::Value(Term::Variable(v)) => {
                    if !bound.contains(v) {
                        report(*v);
                    }
                }
                Op::Closure(params, body) => {
                    let depth = bound.len();
                    bound.extend(params.iter().copied());
                    walk(body, bound, report);
                    bound.truncate(depth);
                }
                _ => {}
            }
        }
    }
    walk(ops, &mut Vec::new(), report);
}

/// How a check's queries decide success.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckKind {
    /// At least one query must produce a match.
    #[default]
    One,
    /// Every unification of every query must satisfy its expressions.
    All,
    /// No query may produce a match.
    Reject,
}

/// A requirement that must hold for the token to be accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Check {
    /// The rule-shaped queries.
    pub queries: Vec<Rule>,
    /// The matching kind.
    pub kind: CheckKind,
}

/// Whether a matching policy accepts or rejects the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyKind {
    /// Accept the request.
    Allow,
    /// Reject the request.
    Deny,
}

/// An authorizer policy: the first policy with a matching query decides.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Policy {
    /// The rule-shaped queries.
    pub queries: Vec<Rule>,
    /// Whether a match accepts or rejects.
    pub kind: PolicyKind,
}

#[cfg(test)]
mod tests;
