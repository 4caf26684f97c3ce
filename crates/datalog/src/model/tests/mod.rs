// Path: crates/datalog/src/model/tests/mod.rs
use super::*;
use crate::expression::Binary;
use crate::symbol::default_symbol_table;

#[test]
fn test_unification_binds_consistently() {
    let mut symbols = default_symbol_table();
    let edge = symbols.insert("edge");
    let loops = symbols.insert("loops");
    let a = symbols.insert("a");
    let b = symbols.insert("b");
    let var_x = symbols.insert("x") as u32;

    // loops($x) <- edge($x, $x)
    let rule = Rule::new(
        Predicate::new(loops, vec![Term::Variable(var_x)]),
        vec![Predicate::new(
            edge,
            vec![Term::Variable(var_x), Term::Variable(var_x)],
        )],
        vec![],
        vec![],
    );

    let origin = Origin::from(0);
    let self_edge = Fact::new(edge, vec![Term::Str(a), Term::Str(a)]);
    let cross_edge = Fact::new(edge, vec![Term::Str(a), Term::Str(b)]);
    let facts = vec![(&origin, &self_edge), (&origin, &cross_edge)];

    let derived = rule.apply(&facts, 0, &symbols).unwrap();
    // Only the self edge unifies: $x cannot bind both "a" and "b".
    assert_eq!(derived.len(), 1);
    assert_eq!(derived[0].1, Fact::new(loops, vec![Term::Str(a)]));
}

#[test]
fn test_ground_terms_must_match_exactly() {
    let mut symbols = default_symbol_table();
    let right = symbols.insert("right");
    let file1 = symbols.insert("file1");
    let file2 = symbols.insert("file2");
    let read = symbols.insert("read");
    let var_r = symbols.insert("r") as u32;

    // found($r) <- right($r, "read")
    let found = symbols.insert("found");
    let rule = Rule::new(
        Predicate::new(found, vec![Term::Variable(var_r)]),
        vec![Predicate::new(
            right,
            vec![Term::Variable(var_r), Term::Str(read)],
        )],
        vec![],
        vec![],
    );

    let origin = Origin::from(0);
    let read_fact = Fact::new(right, vec![Term::Str(file1), Term::Str(read)]);
    let write_fact = Fact::new(
        right,
        vec![Term::Str(file2), Term::Str(symbols.insert("write"))],
    );
    let facts = vec![(&origin, &read_fact), (&origin, &write_fact)];

    let derived = rule.apply(&facts, 0, &symbols).unwrap();
    assert_eq!(derived.len(), 1);
    assert_eq!(derived[0].1, Fact::new(found, vec![Term::Str(file1)]));
}

#[test]
fn test_arity_mismatches_never_unify() {
    let mut symbols = default_symbol_table();
    let p = symbols.insert("p");
    let var_x = symbols.insert("x") as u32;

    let rule = Rule::new(
        Predicate::new(p, vec![Term::Variable(var_x)]),
        vec![Predicate::new(p, vec![Term::Variable(var_x)])],
        vec![],
        vec![],
    );

    let origin = Origin::from(0);
    let two_terms = Fact::new(p, vec![Term::Integer(1), Term::Integer(2)]);
    let facts = vec![(&origin, &two_terms)];

    assert!(rule.apply(&facts, 0, &symbols).unwrap().is_empty());
}

#[test]
fn test_validate_variables_rejects_unbound_head_and_expressions() {
    let mut symbols = default_symbol_table();
    let p = symbols.insert("p");
    let q = symbols.insert("q");
    let var_x = symbols.insert("x") as u32;
    let var_y = symbols.insert("y") as u32;

    // p($y) <- q($x): $y never appears in the body.
    let rule = Rule::new(
        Predicate::new(p, vec![Term::Variable(var_y)]),
        vec![Predicate::new(q, vec![Term::Variable(var_x)])],
        vec![],
        vec![],
    );
    assert_eq!(
        rule.validate_variables(&symbols),
        Err(LanguageError::InvalidVariables(vec!["y".to_string()]))
    );

    // p($x) <- q($x), $z > 0: $z is free in the expression.
    let var_z = symbols.insert("z") as u32;
    let rule = Rule::new(
        Predicate::new(p, vec![Term::Variable(var_x)]),
        vec![Predicate::new(q, vec![Term::Variable(var_x)])],
        vec![Expression {
            ops: vec![
                Op::Value(Term::Variable(var_z)),
                Op::Value(Term::Integer(0)),
                Op::Binary(Binary::GreaterThan),
            ],
        }],
        vec![],
    );
    assert_eq!(
        rule.validate_variables(&symbols),
        Err(LanguageError::InvalidVariables(vec!["z".to_string()]))
    );

    // Closure parameters are not free variables.
    let var_item = symbols.insert("item") as u32;
    let rule = Rule::new(
        Predicate::new(p, vec![Term::Variable(var_x)]),
        vec![Predicate::new(q, vec![Term::Variable(var_x)])],
        vec![Expression {
            ops: vec![
                Op::Value(Term::Variable(var_x)),
                Op::Closure(
                    vec![var_item],
                    vec![
                        Op::Value(Term::Variable(var_item)),
                        Op::Value(Term::Integer(0)),
                        Op::Binary(Binary::GreaterThan),
                    ],
                ),
                Op::Binary(Binary::All),
            ],
        }],
        vec![],
    );
    assert_eq!(rule.validate_variables(&symbols), Ok(()));
}

#[test]
fn test_terms_are_ground_checked_recursively() {
    assert!(Term::Integer(1).is_ground());
    assert!(!Term::Variable(0).is_ground());
    assert!(!Term::Array(vec![Term::Integer(1), Term::Variable(0)]).is_ground());

    let mut map = std::collections::BTreeMap::new();
    map.insert(MapKey::Integer(0), Term::Variable(3));
    assert!(!Term::Map(map).is_ground());
}
