// Path: crates/datalog/src/world/mod.rs
//! The fact store, rule store and bounded fixed-point solver.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tessera_types::error::{ExecutionError, RunLimitError};

use crate::model::{Fact, Rule};
use crate::origin::{Origin, TrustedOrigins};
use crate::symbol::SymbolTable;

/// Resource limits for one solver run.
///
/// Limits are deliberately conservative: tokens are attacker-supplied, so
/// the solver must terminate no matter what program it is handed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLimits {
    /// Maximum number of facts the world may hold.
    pub max_facts: u64,
    /// Maximum number of fixed-point iterations.
    pub max_iterations: u64,
    /// Deadline for the whole run, sampled between rule applications.
    pub max_time: Duration,
}

impl Default for RunLimits {
    fn default() -> Self {
        RunLimits {
            max_facts: 1000,
            max_iterations: 100,
            max_time: Duration::from_millis(5),
        }
    }
}

/// Facts grouped by the origin set that produced them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactSet {
    inner: HashMap<Origin, HashSet<Fact>>,
}

impl FactSet {
    /// Creates an empty fact set.
    pub fn new() -> Self {
        FactSet::default()
    }

    /// Adds a fact under an origin set.
    pub fn insert(&mut self, origin: Origin, fact: Fact) {
        self.inner.entry(origin).or_default().insert(fact);
    }

    /// The total number of stored facts.
    pub fn len(&self) -> u64 {
        self.inner.values().map(|facts| facts.len() as u64).sum()
    }

    /// True when no facts are stored.
    pub fn is_empty(&self) -> bool {
        self.inner.values().all(HashSet::is_empty)
    }

    /// Iterates over every fact, with its origin.
    pub fn iter_all(&self) -> impl Iterator<Item = (&Origin, &Fact)> {
        self.inner
            .iter()
            .flat_map(|(origin, facts)| facts.iter().map(move |fact| (origin, fact)))
    }

    /// The facts readable under the given trusted origins.
    pub fn trusted(&self, trusted: &TrustedOrigins) -> Vec<(&Origin, &Fact)> {
        self.inner
            .iter()
            .filter(|(origin, _)| trusted.contains(origin))
            .flat_map(|(origin, facts)| facts.iter().map(move |fact| (origin, fact)))
            .collect()
    }
}

/// Rules grouped by their trusted-origin set, so each group's fact view is
/// computed once per iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    inner: HashMap<TrustedOrigins, Vec<(usize, Rule)>>,
}

impl RuleSet {
    /// Creates an empty rule set.
    pub fn new() -> Self {
        RuleSet::default()
    }

    /// Adds a rule declared by `block_id` under its trusted origins.
    pub fn insert(&mut self, block_id: usize, trusted: TrustedOrigins, rule: Rule) {
        self.inner.entry(trusted).or_default().push((block_id, rule));
    }

    /// Iterates over the rule groups.
    pub fn iter(&self) -> impl Iterator<Item = (&TrustedOrigins, &[(usize, Rule)])> {
        self.inner
            .iter()
            .map(|(trusted, rules)| (trusted, rules.as_slice()))
    }

    /// The total number of rules.
    pub fn len(&self) -> usize {
        self.inner.values().map(Vec::len).sum()
    }

    /// True when no rules are stored.
    pub fn is_empty(&self) -> bool {
        self.inner.values().all(Vec::is_empty)
    }
}

/// The Datalog world: facts, rules and the solver state.
#[derive(Debug, Clone, Default)]
pub struct World {
    /// The fact store.
    pub facts: FactSet,
    /// The rule store.
    pub rules: RuleSet,
    /// Iterations spent by the last solver run.
    pub iterations: u64,
}

impl World {
    /// Creates an empty world.
    pub fn new() -> Self {
        World::default()
    }

    /// Adds a fact under an origin set.
    pub fn add_fact(&mut self, origin: Origin, fact: Fact) {
        self.facts.insert(origin, fact);
    }

    /// Adds a rule declared by `block_id` under its trusted origins.
    pub fn add_rule(&mut self, block_id: usize, trusted: TrustedOrigins, rule: Rule) {
        self.rules.insert(block_id, trusted, rule);
    }

    /// Runs every rule to fixed point under the given limits.
    ///
    /// Each iteration applies every rule against the facts its trusted
    /// origins allow, merges the derived facts, and stops when a pass
    /// produces nothing new. The clock is sampled after each rule
    /// application; the fact and iteration counts are checked per pass.
    pub fn run_with_limits(
        &mut self,
        limits: &RunLimits,
        symbols: &SymbolTable,
    ) -> Result<(), crate::world::RunError> {
        let deadline = Instant::now() + limits.max_time;
        self.iterations = 0;

        log::debug!(
            "solver start: {} facts, {} rules",
            self.facts.len(),
            self.rules.len()
        );

        loop {
            let mut derived: Vec<(Origin, Fact)> = Vec::new();

            for (trusted, rules) in self.rules.iter() {
                let readable = self.facts.trusted(trusted);
                for (block_id, rule) in rules {
                    derived.extend(rule.apply(&readable, *block_id, symbols)?);
                    if Instant::now() >= deadline {
                        return Err(RunError::RunLimit(RunLimitError::Timeout));
                    }
                }
            }

            let before = self.facts.len();
            for (origin, fact) in derived {
                self.facts.insert(origin, fact);
            }

            if self.facts.len() == before {
                break;
            }
            if self.facts.len() > limits.max_facts {
                return Err(RunError::RunLimit(RunLimitError::TooManyFacts));
            }

            self.iterations += 1;
            if self.iterations > limits.max_iterations {
                return Err(RunError::RunLimit(RunLimitError::TooManyIterations));
            }
        }

        log::debug!(
            "solver done after {} iterations: {} facts",
            self.iterations,
            self.facts.len()
        );
        Ok(())
    }

    /// Applies one rule against the trusted facts, returning the derived
    /// facts tagged with their origins.
    pub fn query_rule(
        &self,
        rule: &Rule,
        origin: usize,
        trusted: &TrustedOrigins,
        symbols: &SymbolTable,
    ) -> Result<Vec<(Origin, Fact)>, ExecutionError> {
        rule.apply(&self.facts.trusted(trusted), origin, symbols)
    }

    /// True when at least one unification satisfies the rule.
    pub fn query_match(
        &self,
        rule: &Rule,
        origin: usize,
        trusted: &TrustedOrigins,
        symbols: &SymbolTable,
    ) -> Result<bool, ExecutionError> {
        log::trace!("matching query for block {origin}");
        rule.find_match(&self.facts.trusted(trusted), symbols)
    }

    /// True when at least one unification exists and every unification
    /// satisfies the rule's expressions.
    pub fn check_match_all(
        &self,
        rule: &Rule,
        trusted: &TrustedOrigins,
        symbols: &SymbolTable,
    ) -> Result<bool, ExecutionError> {
        rule.check_match_all(&self.facts.trusted(trusted), symbols)
    }
}

/// Why a solver run stopped early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    /// A resource limit tripped.
    RunLimit(RunLimitError),
    /// An expression failed to evaluate.
    Execution(ExecutionError),
}

impl From<ExecutionError> for RunError {
    fn from(e: ExecutionError) -> Self {
        RunError::Execution(e)
    }
}

impl From<RunError> for tessera_types::error::TokenError {
    fn from(e: RunError) -> Self {
        match e {
            RunError::RunLimit(e) => tessera_types::error::TokenError::RunLimit(e),
            RunError::Execution(e) => tessera_types::error::TokenError::Execution(e),
        }
    }
}

#[cfg(test)]
mod tests;
