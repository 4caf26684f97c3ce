// Path: crates/datalog/src/world/tests/mod.rs
use std::collections::HashMap;
use std::time::Duration;

use super::*;
use crate::expression::{Binary, Expression, Op};
use crate::model::{Predicate, Scope, Term};
use crate::origin::AUTHORIZER_ID;
use crate::symbol::default_symbol_table;

fn fact(name: u64, terms: Vec<Term>) -> Fact {
    Fact::new(name, terms)
}

#[test]
fn test_transitive_closure_reaches_fixed_point() {
    let mut symbols = default_symbol_table();
    let parent = symbols.insert("parent");
    let ancestor = symbols.insert("ancestor");
    let alice = symbols.insert("alice");
    let bob = symbols.insert("bob");
    let carol = symbols.insert("carol");
    let var_a = symbols.insert("a") as u32;
    let var_b = symbols.insert("b") as u32;
    let var_c = symbols.insert("c") as u32;

    let mut world = World::new();
    world.add_fact(
        Origin::from(0),
        fact(parent, vec![Term::Str(alice), Term::Str(bob)]),
    );
    world.add_fact(
        Origin::from(0),
        fact(parent, vec![Term::Str(bob), Term::Str(carol)]),
    );

    let trusted = TrustedOrigins::from_scopes(&[], 0, &HashMap::new());

    // ancestor($a, $b) <- parent($a, $b)
    world.add_rule(
        0,
        trusted.clone(),
        Rule::new(
            Predicate::new(
                ancestor,
                vec![Term::Variable(var_a), Term::Variable(var_b)],
            ),
            vec![Predicate::new(
                parent,
                vec![Term::Variable(var_a), Term::Variable(var_b)],
            )],
            vec![],
            vec![],
        ),
    );
    // ancestor($a, $c) <- ancestor($a, $b), ancestor($b, $c)
    world.add_rule(
        0,
        trusted.clone(),
        Rule::new(
            Predicate::new(
                ancestor,
                vec![Term::Variable(var_a), Term::Variable(var_c)],
            ),
            vec![
                Predicate::new(ancestor, vec![Term::Variable(var_a), Term::Variable(var_b)]),
                Predicate::new(ancestor, vec![Term::Variable(var_b), Term::Variable(var_c)]),
            ],
            vec![],
            vec![],
        ),
    );

    world
        .run_with_limits(&RunLimits::default(), &symbols)
        .unwrap();

    // parent(2) + ancestor(3): alice->bob, bob->carol, alice->carol.
    assert_eq!(world.facts.len(), 5);

    let query = Rule::new(
        Predicate::new(ancestor, vec![Term::Str(alice), Term::Str(carol)]),
        vec![Predicate::new(ancestor, vec![Term::Str(alice), Term::Str(carol)])],
        vec![],
        vec![],
    );
    assert!(world
        .query_match(&query, AUTHORIZER_ID, &trusted, &symbols)
        .unwrap());
}

#[test]
fn test_derived_facts_carry_their_origins() {
    let mut symbols = default_symbol_table();
    let resource = symbols.insert("resource");
    let operation = symbols.insert("operation");
    let allowed = symbols.insert("allowed");
    let file1 = symbols.insert("file1");
    let read = symbols.insert("read");
    let var_r = symbols.insert("r") as u32;
    let var_o = symbols.insert("o") as u32;

    let mut world = World::new();
    world.add_fact(Origin::from(0), fact(resource, vec![Term::Str(file1)]));
    world.add_fact(Origin::from(1), fact(operation, vec![Term::Str(read)]));

    // Block 2 trusts everything here.
    let trusted = TrustedOrigins::from_scopes(&[Scope::Previous], 2, &HashMap::new());
    let rule = Rule::new(
        Predicate::new(allowed, vec![Term::Variable(var_r), Term::Variable(var_o)]),
        vec![
            Predicate::new(resource, vec![Term::Variable(var_r)]),
            Predicate::new(operation, vec![Term::Variable(var_o)]),
        ],
        vec![],
        vec![],
    );

    let derived = world.query_rule(&rule, 2, &trusted, &symbols).unwrap();
    assert_eq!(derived.len(), 1);

    let (origin, derived_fact) = &derived[0];
    // Union of the contributing facts' origins plus the rule's block id.
    let mut expected = Origin::from(0).union(&Origin::from(1));
    expected.insert(2);
    assert_eq!(origin, &expected);
    assert_eq!(
        derived_fact,
        &fact(allowed, vec![Term::Str(file1), Term::Str(read)])
    );
}

#[test]
fn test_scope_filtering_hides_untrusted_facts() {
    let mut symbols = default_symbol_table();
    let group = symbols.insert("group");
    let admin = symbols.insert("admin");
    let var_g = symbols.insert("g") as u32;

    let mut world = World::new();
    // The fact lives in block 1, which is not in the default trust set.
    world.add_fact(Origin::from(1), fact(group, vec![Term::Str(admin)]));

    let query = Rule::new(
        Predicate::new(group, vec![Term::Variable(var_g)]),
        vec![Predicate::new(group, vec![Term::Variable(var_g)])],
        vec![],
        vec![],
    );

    let default_trust = TrustedOrigins::from_scopes(&[], AUTHORIZER_ID, &HashMap::new());
    assert!(!world
        .query_match(&query, AUTHORIZER_ID, &default_trust, &symbols)
        .unwrap());

    // Naming block 1 through a public key scope makes the fact visible.
    let mut key_map = HashMap::new();
    key_map.insert(0u64, vec![1usize]);
    let trusting_key =
        TrustedOrigins::from_scopes(&[Scope::PublicKey(0)], AUTHORIZER_ID, &key_map);
    assert!(world
        .query_match(&query, AUTHORIZER_ID, &trusting_key, &symbols)
        .unwrap());
}

#[test]
fn test_too_many_facts_is_caught() {
    let mut symbols = default_symbol_table();
    let counter = symbols.insert("counter");
    let var_x = symbols.insert("x") as u32;

    let grow = symbols.insert("grow");

    let mut world = World::new();
    world.add_fact(Origin::from(0), fact(counter, vec![Term::Integer(0)]));

    let trusted = TrustedOrigins::from_scopes(&[], 0, &HashMap::new());
    // grow($x) <- counter($x) pushes the world past a one-fact budget.
    world.add_rule(
        0,
        trusted,
        Rule::new(
            Predicate::new(grow, vec![Term::Variable(var_x)]),
            vec![Predicate::new(counter, vec![Term::Variable(var_x)])],
            vec![],
            vec![],
        ),
    );

    let limits = RunLimits {
        max_facts: 1,
        ..RunLimits::default()
    };
    assert_eq!(
        world.run_with_limits(&limits, &symbols),
        Err(RunError::RunLimit(RunLimitError::TooManyFacts))
    );
}

#[test]
fn test_timeout_is_caught() {
    let mut symbols = default_symbol_table();
    let ping = symbols.insert("ping");
    let pong = symbols.insert("pong");
    let var_x = symbols.insert("x") as u32;

    let mut world = World::new();
    world.add_fact(Origin::from(0), fact(ping, vec![Term::Integer(0)]));

    let trusted = TrustedOrigins::from_scopes(&[], 0, &HashMap::new());
    world.add_rule(
        0,
        trusted,
        Rule::new(
            Predicate::new(pong, vec![Term::Variable(var_x)]),
            vec![Predicate::new(ping, vec![Term::Variable(var_x)])],
            vec![],
            vec![],
        ),
    );

    let limits = RunLimits {
        max_time: Duration::ZERO,
        ..RunLimits::default()
    };
    assert_eq!(
        world.run_with_limits(&limits, &symbols),
        Err(RunError::RunLimit(RunLimitError::Timeout))
    );
}

#[test]
fn test_expression_constraints_filter_derivations() {
    let mut symbols = default_symbol_table();
    let value = symbols.insert("value");
    let big = symbols.insert("big");
    let var_x = symbols.insert("x") as u32;

    let mut world = World::new();
    world.add_fact(Origin::from(0), fact(value, vec![Term::Integer(5)]));
    world.add_fact(Origin::from(0), fact(value, vec![Term::Integer(50)]));

    // big($x) <- value($x), $x > 10
    let trusted = TrustedOrigins::from_scopes(&[], 0, &HashMap::new());
    world.add_rule(
        0,
        trusted.clone(),
        Rule::new(
            Predicate::new(big, vec![Term::Variable(var_x)]),
            vec![Predicate::new(value, vec![Term::Variable(var_x)])],
            vec![Expression {
                ops: vec![
                    Op::Value(Term::Variable(var_x)),
                    Op::Value(Term::Integer(10)),
                    Op::Binary(Binary::GreaterThan),
                ],
            }],
            vec![],
        ),
    );

    world
        .run_with_limits(&RunLimits::default(), &symbols)
        .unwrap();

    let query = Rule::new(
        Predicate::new(big, vec![Term::Variable(var_x)]),
        vec![Predicate::new(big, vec![Term::Variable(var_x)])],
        vec![],
        vec![],
    );
    let matches = world
        .query_rule(&query, AUTHORIZER_ID, &trusted, &symbols)
        .unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(
        matches[0].1,
        fact(big, vec![Term::Integer(50)])
    );
}

#[test]
fn test_check_all_semantics() {
    let mut symbols = default_symbol_table();
    let operation = symbols.insert("operation");
    let allowed_operations = symbols.insert("allowed_operations");
    let read = symbols.insert("read");
    let write = symbols.insert("write");
    let var_op = symbols.insert("op") as u32;
    let var_allowed = symbols.insert("allowed") as u32;

    let mut world = World::new();
    let authorizer = Origin::authorizer();
    world.add_fact(authorizer.clone(), fact(operation, vec![Term::Str(read)]));
    world.add_fact(authorizer.clone(), fact(operation, vec![Term::Str(write)]));

    // check all operation($op), allowed_operations($allowed), $allowed.contains($op)
    let query = Rule::new(
        Predicate::new(operation, vec![Term::Variable(var_op)]),
        vec![
            Predicate::new(operation, vec![Term::Variable(var_op)]),
            Predicate::new(allowed_operations, vec![Term::Variable(var_allowed)]),
        ],
        vec![Expression {
            ops: vec![
                Op::Value(Term::Variable(var_allowed)),
                Op::Value(Term::Variable(var_op)),
                Op::Binary(Binary::Contains),
            ],
        }],
        vec![],
    );
    let trusted = TrustedOrigins::from_scopes(&[], AUTHORIZER_ID, &HashMap::new());

    // Only "write" is allowed: the check must fail on "read".
    world.add_fact(
        authorizer.clone(),
        fact(
            allowed_operations,
            vec![Term::Array(vec![Term::Str(write)])],
        ),
    );
    assert!(!world.check_match_all(&query, &trusted, &symbols).unwrap());

    // Allowing both makes every binding pass.
    let mut world_ok = World::new();
    world_ok.add_fact(authorizer.clone(), fact(operation, vec![Term::Str(read)]));
    world_ok.add_fact(authorizer.clone(), fact(operation, vec![Term::Str(write)]));
    world_ok.add_fact(
        authorizer,
        fact(
            allowed_operations,
            vec![Term::Array(vec![Term::Str(read), Term::Str(write)])],
        ),
    );
    assert!(world_ok.check_match_all(&query, &trusted, &symbols).unwrap());
}
