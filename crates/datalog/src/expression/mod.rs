// Path: crates/datalog/src/expression/mod.rs
//! The expression stack machine.
//!
//! An expression is a linear op sequence evaluated over a term stack. A
//! well-formed sequence leaves exactly one term. Closures are compiled op
//! sequences with formal parameters; they exist on the stack only as
//! operands of `Any`, `All`, `LazyAnd`, `LazyOr` and `TryOr`, and are not
//! general callable values.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tessera_types::error::ExecutionError;

use crate::model::{MapKey, Term};
use crate::symbol::TemporarySymbolTable;

/// A compiled expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Expression {
    /// The ops, in evaluation order.
    pub ops: Vec<Op>,
}

/// One stack machine op.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Op {
    /// Push a term; variables resolve from the bindings map.
    Value(Term),
    /// Apply a unary operator.
    Unary(Unary),
    /// Apply a binary operator.
    Binary(Binary),
    /// Push a closure (parameter symbol ids and a compiled body).
    Closure(Vec<u32>, Vec<Op>),
}

/// The unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unary {
    /// Logical negation.
    Negate,
    /// Identity, preserved so printed expressions keep their parentheses.
    Parens,
    /// Cardinality, or byte length for strings and byte strings.
    Length,
    /// The canonical type name, interned into the temporary table.
    TypeOf,
}

/// The binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Binary {
    /// `<` on integers or dates.
    LessThan,
    /// `>` on integers or dates.
    GreaterThan,
    /// `<=` on integers or dates.
    LessOrEqual,
    /// `>=` on integers or dates.
    GreaterOrEqual,
    /// `===`, strict same-type equality.
    Equal,
    /// Substring, membership, subset or key lookup.
    Contains,
    /// String or array prefix.
    Prefix,
    /// String or array suffix.
    Suffix,
    /// Regular expression search.
    Regex,
    /// Checked addition, or string concatenation.
    Add,
    /// Checked subtraction.
    Sub,
    /// Checked multiplication.
    Mul,
    /// Truncating division.
    Div,
    /// Eager logical and.
    And,
    /// Eager logical or.
    Or,
    /// Set intersection.
    Intersection,
    /// Set union.
    Union,
    /// Bitwise and.
    BitwiseAnd,
    /// Bitwise or.
    BitwiseOr,
    /// Bitwise xor.
    BitwiseXor,
    /// `!==`, strict same-type inequality.
    NotEqual,
    /// `==`, permissive equality.
    HeterogeneousEqual,
    /// `!=`, permissive inequality.
    HeterogeneousNotEqual,
    /// Short-circuit and; the right operand is an arity-0 closure.
    LazyAnd,
    /// Short-circuit or; the right operand is an arity-0 closure.
    LazyOr,
    /// Every element satisfies an arity-1 closure.
    All,
    /// Some element satisfies an arity-1 closure.
    Any,
    /// Array index or map key lookup, `null` when absent.
    Get,
    /// Evaluate an arity-0 closure, falling back to a default on failure.
    TryOr,
}

/// A stack slot: a term, or a closure awaiting one of the closure ops.
enum StackElem<'a> {
    Term(Term),
    Closure(&'a [u32], &'a [Op]),
}

impl Expression {
    /// Evaluates the expression under the given variable bindings.
    pub fn evaluate(
        &self,
        values: &HashMap<u32, Term>,
        symbols: &mut TemporarySymbolTable<'_>,
    ) -> Result<Term, ExecutionError> {
        evaluate_ops(&self.ops, values, symbols)
    }
}

fn underflow() -> ExecutionError {
    ExecutionError::Execution("stack underflow".to_string())
}

fn evaluate_ops(
    ops: &[Op],
    values: &HashMap<u32, Term>,
    symbols: &mut TemporarySymbolTable<'_>,
) -> Result<Term, ExecutionError> {
    let mut stack: Vec<StackElem<'_>> = Vec::new();

    for op in ops {
        match op {
            Op::Value(Term::Variable(v)) => match values.get(v) {
                Some(term) => stack.push(StackElem::Term(term.clone())),
                None => {
                    return Err(ExecutionError::Execution(format!("unknown variable {v}")));
                }
            },
            Op::Value(term) => stack.push(StackElem::Term(term.clone())),
            Op::Closure(params, body) => {
                if let Some(param) = params.iter().find(|p| values.contains_key(*p)) {
                    return Err(ExecutionError::ShadowedVariable(*param));
                }
                stack.push(StackElem::Closure(params, body));
            }
            Op::Unary(unary) => {
                let value = match stack.pop() {
                    Some(StackElem::Term(term)) => term,
                    Some(StackElem::Closure(..)) => return Err(ExecutionError::InvalidType),
                    None => return Err(underflow()),
                };
                stack.push(StackElem::Term(unary.evaluate(value, symbols)?));
            }
            Op::Binary(binary) => {
                let right = stack.pop().ok_or_else(underflow)?;
                let left = stack.pop().ok_or_else(underflow)?;
                stack.push(StackElem::Term(
                    binary.evaluate(left, right, values, symbols)?,
                ));
            }
        }
    }

    if stack.len() == 1 {
        match stack.pop() {
            Some(StackElem::Term(term)) => Ok(term),
            _ => Err(ExecutionError::Execution(
                "the expression returned a closure".to_string(),
            )),
        }
    } else {
        Err(ExecutionError::Execution(format!(
            "invalid expression: {} values remain on the stack",
            stack.len()
        )))
    }
}

/// Invokes a closure with the given arguments on top of the outer bindings.
fn apply_closure(
    params: &[u32],
    body: &[Op],
    args: &[Term],
    values: &HashMap<u32, Term>,
    symbols: &mut TemporarySymbolTable<'_>,
) -> Result<Term, ExecutionError> {
    if params.len() != args.len() {
        return Err(ExecutionError::Execution(format!(
            "closure expects {} arguments, got {}",
            params.len(),
            args.len()
        )));
    }

    let mut inner = values.clone();
    for (param, arg) in params.iter().zip(args.iter()) {
        if inner.insert(*param, arg.clone()).is_some() {
            return Err(ExecutionError::ShadowedVariable(*param));
        }
    }
    evaluate_ops(body, &inner, symbols)
}

impl Unary {
    fn evaluate(
        &self,
        value: Term,
        symbols: &mut TemporarySymbolTable<'_>,
    ) -> Result<Term, ExecutionError> {
        match (self, value) {
            (Unary::Negate, Term::Bool(b)) => Ok(Term::Bool(!b)),
            (Unary::Parens, value) => Ok(value),
            (Unary::Length, Term::Str(id)) => symbols
                .get_symbol(id)
                .map(|s| Term::Integer(s.len() as i64))
                .ok_or_else(|| {
                    ExecutionError::Execution(format!("unknown symbol {id}"))
                }),
            (Unary::Length, Term::Bytes(bytes)) => Ok(Term::Integer(bytes.len() as i64)),
            (Unary::Length, Term::Set(set)) => Ok(Term::Integer(set.len() as i64)),
            (Unary::Length, Term::Array(array)) => Ok(Term::Integer(array.len() as i64)),
            (Unary::Length, Term::Map(map)) => Ok(Term::Integer(map.len() as i64)),
            (Unary::TypeOf, value) => {
                let name = match value {
                    Term::Variable(_) => {
                        return Err(ExecutionError::Execution(
                            "unresolved variable in type()".to_string(),
                        ))
                    }
                    Term::Integer(_) => "integer",
                    Term::Str(_) => "string",
                    Term::Date(_) => "date",
                    Term::Bytes(_) => "bytes",
                    Term::Bool(_) => "bool",
                    Term::Set(_) => "set",
                    Term::Array(_) => "array",
                    Term::Map(_) => "map",
                    Term::Null => "null",
                };
                Ok(Term::Str(symbols.insert(name)))
            }
            _ => Err(ExecutionError::InvalidType),
        }
    }
}

impl Binary {
    fn evaluate(
        &self,
        left: StackElem<'_>,
        right: StackElem<'_>,
        values: &HashMap<u32, Term>,
        symbols: &mut TemporarySymbolTable<'_>,
    ) -> Result<Term, ExecutionError> {
        match (self, left, right) {
            // Short-circuit boolean operators.
            (Binary::LazyAnd, StackElem::Term(Term::Bool(false)), StackElem::Closure(..)) => {
                Ok(Term::Bool(false))
            }
            (
                Binary::LazyAnd,
                StackElem::Term(Term::Bool(true)),
                StackElem::Closure(params, body),
            ) => match apply_closure(params, body, &[], values, symbols)? {
                Term::Bool(b) => Ok(Term::Bool(b)),
                _ => Err(ExecutionError::InvalidType),
            },
            (Binary::LazyOr, StackElem::Term(Term::Bool(true)), StackElem::Closure(..)) => {
                Ok(Term::Bool(true))
            }
            (
                Binary::LazyOr,
                StackElem::Term(Term::Bool(false)),
                StackElem::Closure(params, body),
            ) => match apply_closure(params, body, &[], values, symbols)? {
                Term::Bool(b) => Ok(Term::Bool(b)),
                _ => Err(ExecutionError::InvalidType),
            },

            // Collection quantifiers.
            (Binary::Any, StackElem::Term(collection), StackElem::Closure(params, body)) => {
                for item in collection_items(collection)? {
                    match apply_closure(params, body, &[item], values, symbols)? {
                        Term::Bool(true) => return Ok(Term::Bool(true)),
                        Term::Bool(false) => {}
                        _ => return Err(ExecutionError::InvalidType),
                    }
                }
                Ok(Term::Bool(false))
            }
            (Binary::All, StackElem::Term(collection), StackElem::Closure(params, body)) => {
                for item in collection_items(collection)? {
                    match apply_closure(params, body, &[item], values, symbols)? {
                        Term::Bool(true) => {}
                        Term::Bool(false) => return Ok(Term::Bool(false)),
                        _ => return Err(ExecutionError::InvalidType),
                    }
                }
                Ok(Term::Bool(true))
            }

            // Error recovery.
            (Binary::TryOr, StackElem::Closure(params, body), StackElem::Term(default)) => {
                match apply_closure(params, body, &[], values, symbols) {
                    Ok(term) => Ok(term),
                    Err(_) => Ok(default),
                }
            }

            // Everything else operates on two terms.
            (op, StackElem::Term(left), StackElem::Term(right)) => {
                op.evaluate_terms(left, right, symbols)
            }
            _ => Err(ExecutionError::InvalidType),
        }
    }

    fn evaluate_terms(
        &self,
        left: Term,
        right: Term,
        symbols: &mut TemporarySymbolTable<'_>,
    ) -> Result<Term, ExecutionError> {
        match (self, left, right) {
            (Binary::LessThan, Term::Integer(l), Term::Integer(r)) => Ok(Term::Bool(l < r)),
            (Binary::LessThan, Term::Date(l), Term::Date(r)) => Ok(Term::Bool(l < r)),
            (Binary::GreaterThan, Term::Integer(l), Term::Integer(r)) => Ok(Term::Bool(l > r)),
            (Binary::GreaterThan, Term::Date(l), Term::Date(r)) => Ok(Term::Bool(l > r)),
            (Binary::LessOrEqual, Term::Integer(l), Term::Integer(r)) => Ok(Term::Bool(l <= r)),
            (Binary::LessOrEqual, Term::Date(l), Term::Date(r)) => Ok(Term::Bool(l <= r)),
            (Binary::GreaterOrEqual, Term::Integer(l), Term::Integer(r)) => Ok(Term::Bool(l >= r)),
            (Binary::GreaterOrEqual, Term::Date(l), Term::Date(r)) => Ok(Term::Bool(l >= r)),

            (Binary::Equal, left, right) => strict_equal(&left, &right).map(Term::Bool),
            (Binary::NotEqual, left, right) => strict_equal(&left, &right).map(|b| Term::Bool(!b)),
            (Binary::HeterogeneousEqual, left, right) => Ok(Term::Bool(permissive_equal(&left, &right))),
            (Binary::HeterogeneousNotEqual, left, right) => {
                Ok(Term::Bool(!permissive_equal(&left, &right)))
            }

            (Binary::Contains, Term::Str(l), Term::Str(r)) => {
                let haystack = resolve_symbol(symbols, l)?;
                let needle = resolve_symbol(symbols, r)?;
                Ok(Term::Bool(haystack.contains(&needle)))
            }
            (Binary::Contains, Term::Set(set), Term::Set(other)) => {
                Ok(Term::Bool(other.is_subset(&set)))
            }
            (Binary::Contains, Term::Set(set), term) => match term {
                Term::Variable(_) => Err(ExecutionError::InvalidType),
                term => Ok(Term::Bool(set.contains(&term))),
            },
            (Binary::Contains, Term::Array(array), term) => match term {
                Term::Variable(_) => Err(ExecutionError::InvalidType),
                term => Ok(Term::Bool(array.contains(&term))),
            },
            (Binary::Contains, Term::Map(map), key) => match map_key(&key) {
                Some(key) => Ok(Term::Bool(map.contains_key(&key))),
                None => Ok(Term::Bool(false)),
            },

            (Binary::Prefix, Term::Str(l), Term::Str(r)) => {
                let value = resolve_symbol(symbols, l)?;
                let prefix = resolve_symbol(symbols, r)?;
                Ok(Term::Bool(value.starts_with(&prefix)))
            }
            (Binary::Prefix, Term::Array(l), Term::Array(r)) => Ok(Term::Bool(l.starts_with(&r))),
            (Binary::Suffix, Term::Str(l), Term::Str(r)) => {
                let value = resolve_symbol(symbols, l)?;
                let suffix = resolve_symbol(symbols, r)?;
                Ok(Term::Bool(value.ends_with(&suffix)))
            }
            (Binary::Suffix, Term::Array(l), Term::Array(r)) => Ok(Term::Bool(l.ends_with(&r))),

            (Binary::Regex, Term::Str(l), Term::Str(r)) => {
                let target = resolve_symbol(symbols, l)?;
                let pattern = resolve_symbol(symbols, r)?;
                let regex = regex::Regex::new(&pattern).map_err(|e| {
                    ExecutionError::Execution(format!("invalid regular expression: {e}"))
                })?;
                Ok(Term::Bool(regex.is_match(&target)))
            }

            (Binary::Add, Term::Integer(l), Term::Integer(r)) => l
                .checked_add(r)
                .map(Term::Integer)
                .ok_or(ExecutionError::Overflow),
            (Binary::Add, Term::Str(l), Term::Str(r)) => {
                let left = resolve_symbol(symbols, l)?;
                let right = resolve_symbol(symbols, r)?;
                let concatenated = format!("{left}{right}");
                Ok(Term::Str(symbols.insert(&concatenated)))
            }
            (Binary::Sub, Term::Integer(l), Term::Integer(r)) => l
                .checked_sub(r)
                .map(Term::Integer)
                .ok_or(ExecutionError::Overflow),
            (Binary::Mul, Term::Integer(l), Term::Integer(r)) => l
                .checked_mul(r)
                .map(Term::Integer)
                .ok_or(ExecutionError::Overflow),
            (Binary::Div, Term::Integer(_), Term::Integer(0)) => Err(ExecutionError::Execution(
                "division by zero".to_string(),
            )),
            (Binary::Div, Term::Integer(l), Term::Integer(r)) => l
                .checked_div(r)
                .map(Term::Integer)
                .ok_or(ExecutionError::Overflow),

            (Binary::And, Term::Bool(l), Term::Bool(r)) => Ok(Term::Bool(l && r)),
            (Binary::Or, Term::Bool(l), Term::Bool(r)) => Ok(Term::Bool(l || r)),

            (Binary::Intersection, Term::Set(l), Term::Set(r)) => {
                Ok(Term::Set(l.intersection(&r).cloned().collect()))
            }
            (Binary::Union, Term::Set(l), Term::Set(r)) => {
                Ok(Term::Set(l.union(&r).cloned().collect()))
            }

            (Binary::BitwiseAnd, Term::Integer(l), Term::Integer(r)) => Ok(Term::Integer(l & r)),
            (Binary::BitwiseOr, Term::Integer(l), Term::Integer(r)) => Ok(Term::Integer(l | r)),
            (Binary::BitwiseXor, Term::Integer(l), Term::Integer(r)) => Ok(Term::Integer(l ^ r)),

            (Binary::Get, Term::Array(array), Term::Integer(index)) => Ok(usize::try_from(index)
                .ok()
                .and_then(|i| array.get(i).cloned())
                .unwrap_or(Term::Null)),
            (Binary::Get, Term::Map(map), key) => match map_key(&key) {
                Some(key) => Ok(map.get(&key).cloned().unwrap_or(Term::Null)),
                None => Err(ExecutionError::InvalidType),
            },

            _ => Err(ExecutionError::InvalidType),
        }
    }
}

fn resolve_symbol(
    symbols: &TemporarySymbolTable<'_>,
    id: u64,
) -> Result<String, ExecutionError> {
    symbols
        .get_symbol(id)
        .map(|s| s.to_string())
        .ok_or_else(|| ExecutionError::Execution(format!("unknown symbol {id}")))
}

/// Strict equality: both terms must have the same type.
fn strict_equal(left: &Term, right: &Term) -> Result<bool, ExecutionError> {
    match (left, right) {
        (Term::Integer(l), Term::Integer(r)) => Ok(l == r),
        (Term::Str(l), Term::Str(r)) => Ok(l == r),
        (Term::Date(l), Term::Date(r)) => Ok(l == r),
        (Term::Bytes(l), Term::Bytes(r)) => Ok(l == r),
        (Term::Bool(l), Term::Bool(r)) => Ok(l == r),
        (Term::Set(l), Term::Set(r)) => Ok(l == r),
        (Term::Array(l), Term::Array(r)) => Ok(l == r),
        (Term::Map(l), Term::Map(r)) => Ok(l == r),
        (Term::Null, Term::Null) => Ok(true),
        _ => Err(ExecutionError::InvalidType),
    }
}

/// Permissive equality: a type mismatch compares unequal instead of failing.
fn permissive_equal(left: &Term, right: &Term) -> bool {
    strict_equal(left, right).unwrap_or(false)
}

/// The elements a quantifier closure iterates over. Map entries are passed
/// as two-element `[key, value]` arrays.
fn collection_items(collection: Term) -> Result<Vec<Term>, ExecutionError> {
    match collection {
        Term::Set(set) => Ok(set.into_iter().collect()),
        Term::Array(array) => Ok(array),
        Term::Map(map) => Ok(map
            .into_iter()
            .map(|(key, value)| {
                let key_term = match key {
                    MapKey::Integer(i) => Term::Integer(i),
                    MapKey::Str(s) => Term::Str(s),
                };
                Term::Array(vec![key_term, value])
            })
            .collect()),
        _ => Err(ExecutionError::InvalidType),
    }
}

/// Projects a term onto a map key, when it has a key-compatible type.
fn map_key(term: &Term) -> Option<MapKey> {
    match term {
        Term::Integer(i) => Some(MapKey::Integer(*i)),
        Term::Str(s) => Some(MapKey::Str(*s)),
        _ => None,
    }
}

#[cfg(test)]
mod tests;
