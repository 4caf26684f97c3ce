// Path: crates/token/src/authorizer/mod.rs
//! The authorizer: world assembly, checks and policies.
//!
//! The authorizer rebuilds the full logical context from a verified token,
//! adds its own facts, rules, checks and policies, runs the solver under
//! resource limits, then walks every check and the ordered policy list to
//! produce a single allow/deny outcome with a complete failure report.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tessera_datalog as datalog;
use tessera_datalog::{
    default_symbol_table, CheckKind, Origin, PolicyKind, RunLimits, Scope, SymbolTable,
    TrustedOrigins, World, AUTHORIZER_ID,
};
use tessera_types::error::{
    FailedAuthorizerCheck, FailedBlockCheck, FailedCheck, LogicError, MatchedPolicy, TokenError,
};

use crate::builder;
use crate::token::Token;

mod translate;
use translate::{translate_check, translate_fact, translate_rule, translate_scope};

/// Resource limits for one authorization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizerLimits {
    /// Limits handed to the Datalog solver.
    pub run: RunLimits,
}

/// One token block, re-interned into the authorizer's tables.
#[derive(Debug, Clone)]
struct LoadedBlock {
    facts: Vec<datalog::Fact>,
    rules: Vec<datalog::Rule>,
    checks: Vec<datalog::Check>,
    scopes: Vec<Scope>,
}

/// Decides whether a request carrying a token is allowed.
#[derive(Debug, Clone, Default)]
pub struct Authorizer {
    symbols: SymbolTable,
    world: World,
    world_ready: bool,
    token_blocks: Vec<LoadedBlock>,
    /// Per block, the authorizer-table id of its external key, if any.
    external_key_ids: Vec<Option<u64>>,
    facts: Vec<datalog::Fact>,
    rules: Vec<datalog::Rule>,
    checks: Vec<datalog::Check>,
    policies: Vec<datalog::Policy>,
    limits: AuthorizerLimits,
}

impl Authorizer {
    /// Creates an empty authorizer.
    pub fn new() -> Self {
        Authorizer {
            symbols: default_symbol_table(),
            ..Authorizer::default()
        }
    }

    /// Replaces the resource limits.
    pub fn set_limits(&mut self, limits: AuthorizerLimits) {
        self.limits = limits;
    }

    /// The current resource limits.
    pub fn limits(&self) -> &AuthorizerLimits {
        &self.limits
    }

    /// Loads a verified token's blocks, re-interning every block's content
    /// into the authorizer's own tables.
    pub fn add_token(&mut self, token: &Token) -> Result<(), TokenError> {
        if !self.token_blocks.is_empty() {
            return Err(LogicError::AuthorizerNotEmpty.into());
        }

        for block in &token.blocks {
            let resolution = token.resolution_table(block);

            let facts = block
                .facts
                .iter()
                .map(|f| translate_fact(f, &resolution, &mut self.symbols))
                .collect::<Result<Vec<_>, _>>()?;
            let rules = block
                .rules
                .iter()
                .map(|r| translate_rule(r, &resolution, &mut self.symbols))
                .collect::<Result<Vec<_>, _>>()?;
            let checks = block
                .checks
                .iter()
                .map(|c| translate_check(c, &resolution, &mut self.symbols))
                .collect::<Result<Vec<_>, _>>()?;
            let scopes = block
                .scopes
                .iter()
                .map(|s| translate_scope(s, &resolution, &mut self.symbols))
                .collect::<Result<Vec<_>, _>>()?;

            self.token_blocks.push(LoadedBlock {
                facts,
                rules,
                checks,
                scopes,
            });
        }

        // External keys feed the `trusting <key>` scope resolution.
        self.external_key_ids = token
            .blocks
            .iter()
            .map(|block| {
                block
                    .external_key
                    .as_ref()
                    .map(|key| self.symbols.public_keys.insert(key))
            })
            .collect();

        self.world_ready = false;
        Ok(())
    }

    /// Adds an authorizer-local fact.
    pub fn add_fact(&mut self, fact: builder::Fact) -> Result<(), TokenError> {
        let fact = fact.convert(&mut self.symbols)?;
        self.facts.push(fact);
        self.world_ready = false;
        Ok(())
    }

    /// Adds an authorizer-local rule.
    pub fn add_rule(&mut self, rule: builder::Rule) -> Result<(), TokenError> {
        let mut keys = self.symbols.public_keys.clone();
        let rule = rule.convert(&mut self.symbols, &mut keys)?;
        self.symbols.public_keys = keys;
        self.rules.push(rule);
        self.world_ready = false;
        Ok(())
    }

    /// Adds an authorizer-local check.
    pub fn add_check(&mut self, check: builder::Check) -> Result<(), TokenError> {
        let mut keys = self.symbols.public_keys.clone();
        let check = check.convert(&mut self.symbols, &mut keys)?;
        self.symbols.public_keys = keys;
        self.checks.push(check);
        self.world_ready = false;
        Ok(())
    }

    /// Adds a policy. Policies are evaluated in insertion order.
    pub fn add_policy(&mut self, policy: builder::Policy) -> Result<(), TokenError> {
        let mut keys = self.symbols.public_keys.clone();
        let policy = policy.convert(&mut self.symbols, &mut keys)?;
        self.symbols.public_keys = keys;
        self.policies.push(policy);
        Ok(())
    }

    /// The map from interned public key ids to the block ids they signed.
    fn public_key_to_block_id(&self) -> HashMap<u64, Vec<usize>> {
        let mut map: HashMap<u64, Vec<usize>> = HashMap::new();
        for (block_id, key_id) in self.external_key_ids.iter().enumerate() {
            if let Some(key_id) = key_id {
                map.entry(*key_id).or_default().push(block_id);
            }
        }
        map
    }

    /// Assembles the world and runs the solver to fixed point.
    fn build_world(&mut self) -> Result<(), TokenError> {
        let key_map = self.public_key_to_block_id();
        let mut world = World::new();

        for (block_id, block) in self.token_blocks.iter().enumerate() {
            for fact in &block.facts {
                world.add_fact(Origin::from(block_id), fact.clone());
            }
            for rule in &block.rules {
                rule.validate_variables(&self.symbols).map_err(|_| {
                    LogicError::InvalidBlockRule(block_id, self.symbols.print_rule(rule))
                })?;
                let scopes = effective_scopes(&rule.scopes, &block.scopes);
                let trusted = TrustedOrigins::from_scopes(scopes, block_id, &key_map);
                world.add_rule(block_id, trusted, rule.clone());
            }
        }

        for fact in &self.facts {
            world.add_fact(Origin::authorizer(), fact.clone());
        }
        for rule in &self.rules {
            let trusted = TrustedOrigins::from_scopes(&rule.scopes, AUTHORIZER_ID, &key_map);
            world.add_rule(AUTHORIZER_ID, trusted, rule.clone());
        }

        world
            .run_with_limits(&self.limits.run, &self.symbols)
            .map_err(TokenError::from)?;

        self.world = world;
        self.world_ready = true;
        Ok(())
    }

    /// Evaluates one check against the world.
    fn check_passes(
        &self,
        check: &datalog::Check,
        block_id: usize,
        block_scopes: &[Scope],
        key_map: &HashMap<u64, Vec<usize>>,
    ) -> Result<bool, TokenError> {
        let mut matched = false;
        for query in &check.queries {
            let scopes = effective_scopes(&query.scopes, block_scopes);
            let trusted = TrustedOrigins::from_scopes(scopes, block_id, key_map);
            let query_result = match check.kind {
                CheckKind::One | CheckKind::Reject => {
                    self.world
                        .query_match(query, block_id, &trusted, &self.symbols)?
                }
                CheckKind::All => self.world.check_match_all(query, &trusted, &self.symbols)?,
            };
            if query_result {
                matched = true;
                break;
            }
        }
        Ok(match check.kind {
            CheckKind::One | CheckKind::All => matched,
            CheckKind::Reject => !matched,
        })
    }

    /// Runs the full authorization sequence.
    ///
    /// Returns the index of the matching allow policy. Every failed check
    /// is reported, even once the decision is known.
    pub fn authorize(&mut self) -> Result<usize, TokenError> {
        self.build_world()?;
        let key_map = self.public_key_to_block_id();

        let mut failed: Vec<FailedCheck> = Vec::new();

        // Block checks, in declaration order of (block id, check index).
        for (block_id, block) in self.token_blocks.iter().enumerate() {
            for (check_id, check) in block.checks.iter().enumerate() {
                if !self.check_passes(check, block_id, &block.scopes, &key_map)? {
                    failed.push(FailedCheck::Block(FailedBlockCheck {
                        block_id,
                        check_id,
                        rule: self.symbols.print_check(check),
                    }));
                }
            }
        }

        // Authorizer checks.
        for (check_id, check) in self.checks.iter().enumerate() {
            if !self.check_passes(check, AUTHORIZER_ID, &[], &key_map)? {
                failed.push(FailedCheck::Authorizer(FailedAuthorizerCheck {
                    check_id,
                    rule: self.symbols.print_check(check),
                }));
            }
        }

        log::debug!(
            "authorization: {} failed checks, {} policies to evaluate",
            failed.len(),
            self.policies.len()
        );

        // The first policy with a matching query fixes the decision.
        let mut decision: Option<MatchedPolicy> = None;
        'policies: for (policy_id, policy) in self.policies.iter().enumerate() {
            for query in &policy.queries {
                let trusted =
                    TrustedOrigins::from_scopes(&query.scopes, AUTHORIZER_ID, &key_map);
                if self
                    .world
                    .query_match(query, AUTHORIZER_ID, &trusted, &self.symbols)?
                {
                    decision = Some(match policy.kind {
                        PolicyKind::Allow => MatchedPolicy::Allow(policy_id),
                        PolicyKind::Deny => MatchedPolicy::Deny(policy_id),
                    });
                    break 'policies;
                }
            }
        }

        match decision {
            Some(MatchedPolicy::Allow(policy_id)) if failed.is_empty() => Ok(policy_id),
            Some(policy) => Err(LogicError::Unauthorized {
                policy,
                checks: failed,
            }
            .into()),
            None => Err(LogicError::NoMatchingPolicy { checks: failed }.into()),
        }
    }

    /// Runs a rule-shaped query against the solved world and returns the
    /// derived facts.
    pub fn query(&mut self, rule: builder::Rule) -> Result<Vec<datalog::Fact>, TokenError> {
        if !self.world_ready {
            self.build_world()?;
        }
        let mut keys = self.symbols.public_keys.clone();
        let rule = rule.convert(&mut self.symbols, &mut keys)?;
        self.symbols.public_keys = keys;

        let key_map = self.public_key_to_block_id();
        let trusted = TrustedOrigins::from_scopes(&rule.scopes, AUTHORIZER_ID, &key_map);
        let derived = self
            .world
            .query_rule(&rule, AUTHORIZER_ID, &trusted, &self.symbols)
            .map_err(TokenError::Execution)?;
        Ok(derived.into_iter().map(|(_, fact)| fact).collect())
    }

    /// Dumps the authorizer state as Datalog source, for diagnostics.
    pub fn print_world(&self) -> String {
        let mut lines: Vec<String> = Vec::new();
        for block in &self.token_blocks {
            lines.extend(block.facts.iter().map(|f| self.symbols.print_fact(f)));
            lines.extend(block.rules.iter().map(|r| self.symbols.print_rule(r)));
            lines.extend(block.checks.iter().map(|c| self.symbols.print_check(c)));
        }
        lines.extend(self.facts.iter().map(|f| self.symbols.print_fact(f)));
        lines.extend(self.rules.iter().map(|r| self.symbols.print_rule(r)));
        lines.extend(self.checks.iter().map(|c| self.symbols.print_check(c)));
        lines.extend(self.policies.iter().map(|p| self.symbols.print_policy(p)));
        lines.join(";\n")
    }
}

/// Rules and checks without their own scopes inherit the block's.
fn effective_scopes<'a>(own: &'a [Scope], block: &'a [Scope]) -> &'a [Scope] {
    if own.is_empty() {
        block
    } else {
        own
    }
}
