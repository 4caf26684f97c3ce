// Path: crates/token/src/format/convert.rs
//! Conversions between the wire schema and the Datalog form.

use tessera_crypto::PublicKey;
use tessera_datalog::{
    Binary, Check, CheckKind, Expression, Fact, KeyTable, MapKey, Op, Predicate, Rule, Scope,
    SymbolTable, Term, Unary,
};
use tessera_types::error::FormatError;
use tessera_types::{wire, MAX_SCHEMA_VERSION, MIN_SCHEMA_VERSION};

use crate::block::{required_schema_version, Block};

/// Decodes a wire block into Datalog form, validating the declared schema
/// version against the supported range and the features actually used.
pub fn proto_block_to_token_block(
    input: &wire::Block,
    external_key: Option<PublicKey>,
) -> Result<Block, FormatError> {
    let version = input.version.unwrap_or(MIN_SCHEMA_VERSION);
    if !(MIN_SCHEMA_VERSION..=MAX_SCHEMA_VERSION).contains(&version) {
        return Err(FormatError::Version {
            minimum: MIN_SCHEMA_VERSION,
            maximum: MAX_SCHEMA_VERSION,
            actual: version,
        });
    }

    let symbols = SymbolTable::from_symbols(input.symbols.clone());

    let facts = input
        .facts
        .iter()
        .map(proto_fact_to_fact)
        .collect::<Result<Vec<_>, _>>()?;
    let rules = input
        .rules
        .iter()
        .map(proto_rule_to_rule)
        .collect::<Result<Vec<_>, _>>()?;
    let checks = input
        .checks
        .iter()
        .map(proto_check_to_check)
        .collect::<Result<Vec<_>, _>>()?;
    let scopes = input
        .scope
        .iter()
        .map(proto_scope_to_scope)
        .collect::<Result<Vec<_>, _>>()?;

    let mut public_keys = KeyTable::new();
    for key in &input.public_keys {
        public_keys.insert(&PublicKey::from_wire(key).map_err(FormatError::from)?);
    }

    for fact in &facts {
        if fact.predicate.terms.iter().any(|t| !t.is_ground()) {
            return Err(FormatError::BlockDeserializationError(
                "facts must not contain variables".to_string(),
            ));
        }
    }

    let required = required_schema_version(
        &facts,
        &rules,
        &checks,
        &scopes,
        external_key.as_ref().map(|k| k.algorithm()),
    );
    if required > version {
        return Err(FormatError::BlockDeserializationError(format!(
            "block uses version {required} features but declares version {version}"
        )));
    }

    Ok(Block {
        symbols,
        context: input.context.clone(),
        facts,
        rules,
        checks,
        scopes,
        public_keys,
        external_key,
        version,
    })
}

/// Encodes a Datalog block into its wire form.
pub fn token_block_to_proto_block(block: &Block) -> wire::Block {
    wire::Block {
        symbols: block.symbols.strings().to_vec(),
        context: block.context.clone(),
        version: Some(block.version),
        facts: block.facts.iter().map(fact_to_proto_fact).collect(),
        rules: block.rules.iter().map(rule_to_proto_rule).collect(),
        checks: block.checks.iter().map(check_to_proto_check).collect(),
        scope: block.scopes.iter().map(scope_to_proto_scope).collect(),
        public_keys: block
            .public_keys
            .keys()
            .iter()
            .map(|k| k.to_wire())
            .collect(),
    }
}

fn deserialization(detail: &str) -> FormatError {
    FormatError::DeserializationError(detail.to_string())
}

pub(crate) fn proto_fact_to_fact(input: &wire::Fact) -> Result<Fact, FormatError> {
    Ok(Fact {
        predicate: proto_predicate_to_predicate(&input.predicate)?,
    })
}

fn fact_to_proto_fact(fact: &Fact) -> wire::Fact {
    wire::Fact {
        predicate: predicate_to_proto_predicate(&fact.predicate),
    }
}

fn proto_predicate_to_predicate(input: &wire::Predicate) -> Result<Predicate, FormatError> {
    Ok(Predicate {
        name: input.name,
        terms: input
            .terms
            .iter()
            .map(proto_term_to_term)
            .collect::<Result<Vec<_>, _>>()?,
    })
}

fn predicate_to_proto_predicate(predicate: &Predicate) -> wire::Predicate {
    wire::Predicate {
        name: predicate.name,
        terms: predicate.terms.iter().map(term_to_proto_term).collect(),
    }
}

pub(crate) fn proto_rule_to_rule(input: &wire::Rule) -> Result<Rule, FormatError> {
    Ok(Rule {
        head: proto_predicate_to_predicate(&input.head)?,
        body: input
            .body
            .iter()
            .map(proto_predicate_to_predicate)
            .collect::<Result<Vec<_>, _>>()?,
        expressions: input
            .expressions
            .iter()
            .map(proto_expression_to_expression)
            .collect::<Result<Vec<_>, _>>()?,
        scopes: input
            .scope
            .iter()
            .map(proto_scope_to_scope)
            .collect::<Result<Vec<_>, _>>()?,
    })
}

fn rule_to_proto_rule(rule: &Rule) -> wire::Rule {
    wire::Rule {
        head: predicate_to_proto_predicate(&rule.head),
        body: rule.body.iter().map(predicate_to_proto_predicate).collect(),
        expressions: rule
            .expressions
            .iter()
            .map(expression_to_proto_expression)
            .collect(),
        scope: rule.scopes.iter().map(scope_to_proto_scope).collect(),
    }
}

pub(crate) fn proto_check_to_check(input: &wire::Check) -> Result<Check, FormatError> {
    let kind = match input.kind {
        None => CheckKind::One,
        Some(kind) => match wire::check::Kind::try_from(kind) {
            Ok(wire::check::Kind::One) => CheckKind::One,
            Ok(wire::check::Kind::All) => CheckKind::All,
            Ok(wire::check::Kind::Reject) => CheckKind::Reject,
            Err(_) => return Err(deserialization("invalid check kind")),
        },
    };
    Ok(Check {
        queries: input
            .queries
            .iter()
            .map(proto_rule_to_rule)
            .collect::<Result<Vec<_>, _>>()?,
        kind,
    })
}

fn check_to_proto_check(check: &Check) -> wire::Check {
    let kind = match check.kind {
        CheckKind::One => None,
        CheckKind::All => Some(wire::check::Kind::All as i32),
        CheckKind::Reject => Some(wire::check::Kind::Reject as i32),
    };
    wire::Check {
        queries: check.queries.iter().map(rule_to_proto_rule).collect(),
        kind,
    }
}

pub(crate) fn proto_scope_to_scope(input: &wire::Scope) -> Result<Scope, FormatError> {
    match &input.content {
        Some(wire::scope::Content::ScopeType(scope_type)) => {
            match wire::ScopeType::try_from(*scope_type) {
                Ok(wire::ScopeType::Authority) => Ok(Scope::Authority),
                Ok(wire::ScopeType::Previous) => Ok(Scope::Previous),
                Err(_) => Err(deserialization("invalid scope type")),
            }
        }
        Some(wire::scope::Content::PublicKey(key_id)) => u64::try_from(*key_id)
            .map(Scope::PublicKey)
            .map_err(|_| deserialization("invalid public key reference")),
        None => Err(deserialization("empty scope")),
    }
}

fn scope_to_proto_scope(scope: &Scope) -> wire::Scope {
    let content = match scope {
        Scope::Authority => {
            wire::scope::Content::ScopeType(wire::ScopeType::Authority as i32)
        }
        Scope::Previous => wire::scope::Content::ScopeType(wire::ScopeType::Previous as i32),
        Scope::PublicKey(key_id) => wire::scope::Content::PublicKey(*key_id as i64),
    };
    wire::Scope {
        content: Some(content),
    }
}

fn proto_term_to_term(input: &wire::Term) -> Result<Term, FormatError> {
    match input.content.as_ref().ok_or_else(|| deserialization("empty term"))? {
        wire::term::Content::Variable(v) => Ok(Term::Variable(*v)),
        wire::term::Content::Integer(i) => Ok(Term::Integer(*i)),
        wire::term::Content::String(s) => Ok(Term::Str(*s)),
        wire::term::Content::Date(d) => Ok(Term::Date(*d)),
        wire::term::Content::Bytes(b) => Ok(Term::Bytes(b.clone())),
        wire::term::Content::Bool(b) => Ok(Term::Bool(*b)),
        wire::term::Content::Set(set) => {
            let mut out = std::collections::BTreeSet::new();
            for item in &set.set {
                match proto_term_to_term(item)? {
                    Term::Variable(_) => {
                        return Err(deserialization("sets cannot contain variables"))
                    }
                    Term::Set(_) => return Err(deserialization("sets cannot contain sets")),
                    term => {
                        out.insert(term);
                    }
                }
            }
            Ok(Term::Set(out))
        }
        wire::term::Content::Null(_) => Ok(Term::Null),
        wire::term::Content::Array(array) => {
            let mut out = Vec::with_capacity(array.array.len());
            for item in &array.array {
                let term = proto_term_to_term(item)?;
                if !term.is_ground() {
                    return Err(deserialization("arrays cannot contain variables"));
                }
                out.push(term);
            }
            Ok(Term::Array(out))
        }
        wire::term::Content::Map(map) => {
            let mut out = std::collections::BTreeMap::new();
            for entry in &map.entries {
                let key = proto_map_key_to_map_key(&entry.key)?;
                let value = proto_term_to_term(&entry.value)?;
                if !value.is_ground() {
                    return Err(deserialization("maps cannot contain variables"));
                }
                out.insert(key, value);
            }
            Ok(Term::Map(out))
        }
    }
}

fn term_to_proto_term(term: &Term) -> wire::Term {
    let content = match term {
        Term::Variable(v) => wire::term::Content::Variable(*v),
        Term::Integer(i) => wire::term::Content::Integer(*i),
        Term::Str(s) => wire::term::Content::String(*s),
        Term::Date(d) => wire::term::Content::Date(*d),
        Term::Bytes(b) => wire::term::Content::Bytes(b.clone()),
        Term::Bool(b) => wire::term::Content::Bool(*b),
        Term::Set(set) => wire::term::Content::Set(wire::TermSet {
            set: set.iter().map(term_to_proto_term).collect(),
        }),
        Term::Array(array) => wire::term::Content::Array(wire::Array {
            array: array.iter().map(term_to_proto_term).collect(),
        }),
        Term::Map(map) => wire::term::Content::Map(wire::Map {
            entries: map
                .iter()
                .map(|(key, value)| wire::MapEntry {
                    key: map_key_to_proto_map_key(key),
                    value: term_to_proto_term(value),
                })
                .collect(),
        }),
        Term::Null => wire::term::Content::Null(wire::Empty {}),
    };
    wire::Term {
        content: Some(content),
    }
}

fn proto_map_key_to_map_key(input: &wire::MapKey) -> Result<MapKey, FormatError> {
    match input
        .content
        .as_ref()
        .ok_or_else(|| deserialization("empty map key"))?
    {
        wire::map_key::Content::Integer(i) => Ok(MapKey::Integer(*i)),
        wire::map_key::Content::String(s) => Ok(MapKey::Str(*s)),
    }
}

fn map_key_to_proto_map_key(key: &MapKey) -> wire::MapKey {
    let content = match key {
        MapKey::Integer(i) => wire::map_key::Content::Integer(*i),
        MapKey::Str(s) => wire::map_key::Content::String(*s),
    };
    wire::MapKey {
        content: Some(content),
    }
}

fn proto_expression_to_expression(input: &wire::Expression) -> Result<Expression, FormatError> {
    Ok(Expression {
        ops: input
            .ops
            .iter()
            .map(proto_op_to_op)
            .collect::<Result<Vec<_>, _>>()?,
    })
}

fn expression_to_proto_expression(expression: &Expression) -> wire::Expression {
    wire::Expression {
        ops: expression.ops.iter().map(op_to_proto_op).collect(),
    }
}

fn proto_op_to_op(input: &wire::Op) -> Result<Op, FormatError> {
    match input.content.as_ref().ok_or_else(|| deserialization("empty op"))? {
        wire::op::Content::Value(term) => Ok(Op::Value(proto_term_to_term(term)?)),
        wire::op::Content::Unary(unary) => {
            let kind = wire::op_unary::Kind::try_from(unary.kind)
                .map_err(|_| deserialization("invalid unary operator"))?;
            Ok(Op::Unary(match kind {
                wire::op_unary::Kind::Negate => Unary::Negate,
                wire::op_unary::Kind::Parens => Unary::Parens,
                wire::op_unary::Kind::Length => Unary::Length,
                wire::op_unary::Kind::TypeOf => Unary::TypeOf,
            }))
        }
        wire::op::Content::Binary(binary) => {
            let kind = wire::op_binary::Kind::try_from(binary.kind)
                .map_err(|_| deserialization("invalid binary operator"))?;
            Ok(Op::Binary(proto_binary_kind(kind)))
        }
        wire::op::Content::Closure(closure) => Ok(Op::Closure(
            closure.params.clone(),
            closure
                .ops
                .iter()
                .map(proto_op_to_op)
                .collect::<Result<Vec<_>, _>>()?,
        )),
    }
}

fn op_to_proto_op(op: &Op) -> wire::Op {
    let content = match op {
        Op::Value(term) => wire::op::Content::Value(term_to_proto_term(term)),
        Op::Unary(unary) => wire::op::Content::Unary(wire::OpUnary {
            kind: match unary {
                Unary::Negate => wire::op_unary::Kind::Negate,
                Unary::Parens => wire::op_unary::Kind::Parens,
                Unary::Length => wire::op_unary::Kind::Length,
                Unary::TypeOf => wire::op_unary::Kind::TypeOf,
            } as i32,
        }),
        Op::Binary(binary) => wire::op::Content::Binary(wire::OpBinary {
            kind: binary_proto_kind(*binary) as i32,
        }),
        Op::Closure(params, ops) => wire::op::Content::Closure(wire::OpClosure {
            params: params.clone(),
            ops: ops.iter().map(op_to_proto_op).collect(),
        }),
    };
    wire::Op {
        content: Some(content),
    }
}

fn proto_binary_kind(kind: wire::op_binary::Kind) -> Binary {
    use wire::op_binary::Kind;
    match kind {
        Kind::LessThan => Binary::LessThan,
        Kind::GreaterThan => Binary::GreaterThan,
        Kind::LessOrEqual => Binary::LessOrEqual,
        Kind::GreaterOrEqual => Binary::GreaterOrEqual,
        Kind::Equal => Binary::Equal,
        Kind::Contains => Binary::Contains,
        Kind::Prefix => Binary::Prefix,
        Kind::Suffix => Binary::Suffix,
        Kind::Regex => Binary::Regex,
        Kind::Add => Binary::Add,
        Kind::Sub => Binary::Sub,
        Kind::Mul => Binary::Mul,
        Kind::Div => Binary::Div,
        Kind::And => Binary::And,
        Kind::Or => Binary::Or,
        Kind::Intersection => Binary::Intersection,
        Kind::Union => Binary::Union,
        Kind::BitwiseAnd => Binary::BitwiseAnd,
        Kind::BitwiseOr => Binary::BitwiseOr,
        Kind::BitwiseXor => Binary::BitwiseXor,
        Kind::NotEqual => Binary::NotEqual,
        Kind::HeterogeneousEqual => Binary::HeterogeneousEqual,
        Kind::HeterogeneousNotEqual => Binary::HeterogeneousNotEqual,
        Kind::LazyAnd => Binary::LazyAnd,
        Kind::LazyOr => Binary::LazyOr,
        Kind::All => Binary::All,
        Kind::Any => Binary::Any,
        Kind::Get => Binary::Get,
        Kind::TryOr => Binary::TryOr,
    }
}

fn binary_proto_kind(binary: Binary) -> wire::op_binary::Kind {
    use wire::op_binary::Kind;
    match binary {
        Binary::LessThan => Kind::LessThan,
        Binary::GreaterThan => Kind::GreaterThan,
        Binary::LessOrEqual => Kind::LessOrEqual,
        Binary::GreaterOrEqual => Kind::GreaterOrEqual,
        Binary::Equal => Kind::Equal,
        Binary::Contains => Kind::Contains,
        Binary::Prefix => Kind::Prefix,
        Binary::Suffix => Kind::Suffix,
        Binary::Regex => Kind::Regex,
        Binary::Add => Kind::Add,
        Binary::Sub => Kind::Sub,
        Binary::Mul => Kind::Mul,
        Binary::Div => Kind::Div,
        Binary::And => Kind::And,
        Binary::Or => Kind::Or,
        Binary::Intersection => Kind::Intersection,
        Binary::Union => Kind::Union,
        Binary::BitwiseAnd => Kind::BitwiseAnd,
        Binary::BitwiseOr => Kind::BitwiseOr,
        Binary::BitwiseXor => Kind::BitwiseXor,
        Binary::NotEqual => Kind::NotEqual,
        Binary::HeterogeneousEqual => Kind::HeterogeneousEqual,
        Binary::HeterogeneousNotEqual => Kind::HeterogeneousNotEqual,
        Binary::LazyAnd => Kind::LazyAnd,
        Binary::LazyOr => Kind::LazyOr,
        Binary::All => Kind::All,
        Binary::Any => Kind::Any,
        Binary::Get => Kind::Get,
        Binary::TryOr => Kind::TryOr,
    }
}
