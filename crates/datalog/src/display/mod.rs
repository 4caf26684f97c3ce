// Path: crates/datalog/src/display/mod.rs
//! Rendering of Datalog structures back to source text.
//!
//! Failure reports carry the offending check as source text, and tokens can
//! dump their blocks for inspection. Printing needs the symbol table, so it
//! lives on [`SymbolTable`] rather than on `Display` impls.

use chrono::{DateTime, SecondsFormat};

use crate::expression::{Binary, Expression, Op, Unary};
use crate::model::{Check, CheckKind, Fact, MapKey, Policy, PolicyKind, Predicate, Rule, Scope, Term};
use crate::symbol::SymbolTable;

impl SymbolTable {
    /// Renders a term.
    pub fn print_term(&self, term: &Term) -> String {
        match term {
            Term::Variable(v) => format!("${}", self.print_symbol(*v as u64)),
            Term::Integer(i) => i.to_string(),
            Term::Str(id) => format!("\"{}\"", escape_string(&self.print_symbol(*id))),
            Term::Date(seconds) => print_date(*seconds),
            Term::Bytes(bytes) => format!("hex:{}", hex::encode(bytes)),
            Term::Bool(b) => b.to_string(),
            Term::Set(set) => format!(
                "{{{}}}",
                set.iter()
                    .map(|t| self.print_term(t))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Term::Array(array) => format!(
                "[{}]",
                array
                    .iter()
                    .map(|t| self.print_term(t))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Term::Map(map) => format!(
                "{{{}}}",
                map.iter()
                    .map(|(key, value)| format!(
                        "{}: {}",
                        self.print_map_key(key),
                        self.print_term(value)
                    ))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Term::Null => "null".to_string(),
        }
    }

    /// Renders a map key.
    pub fn print_map_key(&self, key: &MapKey) -> String {
        match key {
            MapKey::Integer(i) => i.to_string(),
            MapKey::Str(id) => format!("\"{}\"", escape_string(&self.print_symbol(*id))),
        }
    }

    /// Renders a predicate.
    pub fn print_predicate(&self, predicate: &Predicate) -> String {
        format!(
            "{}({})",
            self.print_symbol(predicate.name),
            predicate
                .terms
                .iter()
                .map(|t| self.print_term(t))
                .collect::<Vec<_>>()
                .join(", ")
        )
    }

    /// Renders a fact.
    pub fn print_fact(&self, fact: &Fact) -> String {
        self.print_predicate(&fact.predicate)
    }

    /// Renders an expression, falling back to the op dump for malformed
    /// programs.
    pub fn print_expression(&self, expression: &Expression) -> String {
        print_ops(&expression.ops, self).unwrap_or_else(|| format!("{:?}", expression.ops))
    }

    /// Renders a trust scope.
    pub fn print_scope(&self, scope: &Scope) -> String {
        match scope {
            Scope::Authority => "authority".to_string(),
            Scope::Previous => "previous".to_string(),
            Scope::PublicKey(id) => match self.public_keys.get_key(*id) {
                Some(key) => key.to_string(),
                None => format!("<unknown key {id}>"),
            },
        }
    }

    /// Renders the body of a rule-shaped query: predicates, expressions and
    /// scope annotations.
    pub fn print_rule_body(&self, rule: &Rule) -> String {
        let mut parts: Vec<String> = rule
            .body
            .iter()
            .map(|p| self.print_predicate(p))
            .collect();
        parts.extend(rule.expressions.iter().map(|e| self.print_expression(e)));

        let mut rendered = parts.join(", ");
        if !rule.scopes.is_empty() {
            rendered.push_str(" trusting ");
            rendered.push_str(
                &rule
                    .scopes
                    .iter()
                    .map(|s| self.print_scope(s))
                    .collect::<Vec<_>>()
                    .join(", "),
            );
        }
        rendered
    }

    /// Renders a rule.
    pub fn print_rule(&self, rule: &Rule) -> String {
        format!(
            "{} <- {}",
            self.print_predicate(&rule.head),
            self.print_rule_body(rule)
        )
    }

    /// Renders a check.
    pub fn print_check(&self, check: &Check) -> String {
        let prefix = match check.kind {
            CheckKind::One => "check if",
            CheckKind::All => "check all",
            CheckKind::Reject => "reject if",
        };
        format!(
            "{} {}",
            prefix,
            check
                .queries
                .iter()
                .map(|q| self.print_rule_body(q))
                .collect::<Vec<_>>()
                .join(" or ")
        )
    }

    /// Renders a policy.
    pub fn print_policy(&self, policy: &Policy) -> String {
        let prefix = match policy.kind {
            PolicyKind::Allow => "allow if",
            PolicyKind::Deny => "deny if",
        };
        format!(
            "{} {}",
            prefix,
            policy
                .queries
                .iter()
                .map(|q| self.print_rule_body(q))
                .collect::<Vec<_>>()
                .join(" or ")
        )
    }
}

fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn print_date(seconds: u64) -> String {
    match DateTime::from_timestamp(seconds as i64, 0) {
        Some(date) => date.to_rfc3339_opts(SecondsFormat::Secs, true),
        None => seconds.to_string(),
    }
}

/// Reconstructs infix source from an op sequence with a string stack.
fn print_ops(ops: &[Op], symbols: &SymbolTable) -> Option<String> {
    let mut stack: Vec<String> = Vec::new();

    for op in ops {
        match op {
            Op::Value(term) => stack.push(symbols.print_term(term)),
            Op::Closure(params, body) => {
                let rendered_body = print_ops(body, symbols)?;
                if params.is_empty() {
                    stack.push(rendered_body);
                } else {
                    let rendered_params = params
                        .iter()
                        .map(|p| format!("${}", symbols.print_symbol(*p as u64)))
                        .collect::<Vec<_>>()
                        .join(", ");
                    stack.push(format!("{rendered_params} -> {rendered_body}"));
                }
            }
            Op::Unary(unary) => {
                let value = stack.pop()?;
                stack.push(match unary {
                    Unary::Negate => format!("!{value}"),
                    Unary::Parens => format!("({value})"),
                    Unary::Length => format!("{value}.length()"),
                    Unary::TypeOf => format!("{value}.type()"),
                });
            }
            Op::Binary(binary) => {
                let right = stack.pop()?;
                let left = stack.pop()?;
                stack.push(print_binary(*binary, &left, &right));
            }
        }
    }

    if stack.len() == 1 {
        stack.pop()
    } else {
        None
    }
}

fn print_binary(op: Binary, left: &str, right: &str) -> String {
    let infix = match op {
        Binary::LessThan => Some("<"),
        Binary::GreaterThan => Some(">"),
        Binary::LessOrEqual => Some("<="),
        Binary::GreaterOrEqual => Some(">="),
        Binary::Equal => Some("==="),
        Binary::NotEqual => Some("!=="),
        Binary::HeterogeneousEqual => Some("=="),
        Binary::HeterogeneousNotEqual => Some("!="),
        Binary::Add => Some("+"),
        Binary::Sub => Some("-"),
        Binary::Mul => Some("*"),
        Binary::Div => Some("/"),
        Binary::And | Binary::LazyAnd => Some("&&"),
        Binary::Or | Binary::LazyOr => Some("||"),
        Binary::BitwiseAnd => Some("&"),
        Binary::BitwiseOr => Some("|"),
        Binary::BitwiseXor => Some("^"),
        _ => None,
    };

    match (infix, op) {
        (Some(symbol), _) => format!("{left} {symbol} {right}"),
        (None, Binary::Contains) => format!("{left}.contains({right})"),
        (None, Binary::Prefix) => format!("{left}.starts_with({right})"),
        (None, Binary::Suffix) => format!("{left}.ends_with({right})"),
        (None, Binary::Regex) => format!("{left}.matches({right})"),
        (None, Binary::Intersection) => format!("{left}.intersection({right})"),
        (None, Binary::Union) => format!("{left}.union({right})"),
        (None, Binary::Get) => format!("{left}.get({right})"),
        (None, Binary::Any) => format!("{left}.any({right})"),
        (None, Binary::All) => format!("{left}.all({right})"),
        (None, _) => format!("{left}.try_or({right})"),
    }
}
