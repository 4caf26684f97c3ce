// Path: crates/token/src/authorizer/translate.rs
//! Re-interning of block contents into the authorizer's tables.
//!
//! Each block resolves its symbols against its own table (the token's
//! accumulated one, or a self-contained table for third-party blocks).
//! The authorizer owns an independent table, so everything is mapped
//! through string and key values on load.

use tessera_datalog::{
    Check, Expression, Fact, MapKey, Op, Predicate, Rule, Scope, SymbolTable, Term,
};
use tessera_types::error::StructureError;

fn translate_symbol(
    id: u64,
    from: &SymbolTable,
    to: &mut SymbolTable,
) -> Result<u64, StructureError> {
    let symbol = from.get_symbol(id).ok_or(StructureError::MissingSymbols)?;
    Ok(to.insert(symbol))
}

fn translate_variable(
    id: u32,
    from: &SymbolTable,
    to: &mut SymbolTable,
) -> Result<u32, StructureError> {
    translate_symbol(id as u64, from, to).map(|id| id as u32)
}

pub(crate) fn translate_term(
    term: &Term,
    from: &SymbolTable,
    to: &mut SymbolTable,
) -> Result<Term, StructureError> {
    Ok(match term {
        Term::Variable(v) => Term::Variable(translate_variable(*v, from, to)?),
        Term::Str(id) => Term::Str(translate_symbol(*id, from, to)?),
        Term::Set(set) => Term::Set(
            set.iter()
                .map(|t| translate_term(t, from, to))
                .collect::<Result<_, _>>()?,
        ),
        Term::Array(array) => Term::Array(
            array
                .iter()
                .map(|t| translate_term(t, from, to))
                .collect::<Result<_, _>>()?,
        ),
        Term::Map(map) => Term::Map(
            map.iter()
                .map(|(key, value)| {
                    let key = match key {
                        MapKey::Integer(i) => MapKey::Integer(*i),
                        MapKey::Str(id) => MapKey::Str(translate_symbol(*id, from, to)?),
                    };
                    Ok((key, translate_term(value, from, to)?))
                })
                .collect::<Result<_, StructureError>>()?,
        ),
        other => other.clone(),
    })
}

fn translate_predicate(
    predicate: &Predicate,
    from: &SymbolTable,
    to: &mut SymbolTable,
) -> Result<Predicate, StructureError> {
    Ok(Predicate {
        name: translate_symbol(predicate.name, from, to)?,
        terms: predicate
            .terms
            .iter()
            .map(|t| translate_term(t, from, to))
            .collect::<Result<_, _>>()?,
    })
}

pub(crate) fn translate_fact(
    fact: &Fact,
    from: &SymbolTable,
    to: &mut SymbolTable,
) -> Result<Fact, StructureError> {
    Ok(Fact {
        predicate: translate_predicate(&fact.predicate, from, to)?,
    })
}

fn translate_op(op: &Op, from: &SymbolTable, to: &mut SymbolTable) -> Result<Op, StructureError> {
    Ok(match op {
        Op::Value(term) => Op::Value(translate_term(term, from, to)?),
        Op::Unary(unary) => Op::Unary(*unary),
        Op::Binary(binary) => Op::Binary(*binary),
        Op::Closure(params, body) => Op::Closure(
            params
                .iter()
                .map(|p| translate_variable(*p, from, to))
                .collect::<Result<_, _>>()?,
            body.iter()
                .map(|op| translate_op(op, from, to))
                .collect::<Result<_, _>>()?,
        ),
    })
}

pub(crate) fn translate_scope(
    scope: &Scope,
    from: &SymbolTable,
    to: &mut SymbolTable,
) -> Result<Scope, StructureError> {
    Ok(match scope {
        Scope::Authority => Scope::Authority,
        Scope::Previous => Scope::Previous,
        Scope::PublicKey(id) => {
            let key = from
                .public_keys
                .get_key(*id)
                .ok_or(StructureError::MissingSymbols)?;
            Scope::PublicKey(to.public_keys.insert(key))
        }
    })
}

pub(crate) fn translate_rule(
    rule: &Rule,
    from: &SymbolTable,
    to: &mut SymbolTable,
) -> Result<Rule, StructureError> {
    Ok(Rule {
        head: translate_predicate(&rule.head, from, to)?,
        body: rule
            .body
            .iter()
            .map(|p| translate_predicate(p, from, to))
            .collect::<Result<_, _>>()?,
        expressions: rule
            .expressions
            .iter()
            .map(|e| {
                Ok(Expression {
                    ops: e
                        .ops
                        .iter()
                        .map(|op| translate_op(op, from, to))
                        .collect::<Result<_, _>>()?,
                })
            })
            .collect::<Result<_, StructureError>>()?,
        scopes: rule
            .scopes
            .iter()
            .map(|s| translate_scope(s, from, to))
            .collect::<Result<_, _>>()?,
    })
}

pub(crate) fn translate_check(
    check: &Check,
    from: &SymbolTable,
    to: &mut SymbolTable,
) -> Result<Check, StructureError> {
    Ok(Check {
        queries: check
            .queries
            .iter()
            .map(|q| translate_rule(q, from, to))
            .collect::<Result<_, _>>()?,
        kind: check.kind,
    })
}
