// Path: crates/datalog/src/expression/tests/mod.rs
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::*;
use crate::symbol::{default_symbol_table, SymbolTable, TemporarySymbolTable};

fn eval(ops: Vec<Op>) -> Result<Term, ExecutionError> {
    eval_with(ops, &HashMap::new(), &mut default_symbol_table())
}

fn eval_with(
    ops: Vec<Op>,
    values: &HashMap<u32, Term>,
    symbols: &mut SymbolTable,
) -> Result<Term, ExecutionError> {
    let expression = Expression { ops };
    let mut temporary = TemporarySymbolTable::new(symbols);
    expression.evaluate(values, &mut temporary)
}

fn int(i: i64) -> Op {
    Op::Value(Term::Integer(i))
}

#[test]
fn test_parenthesized_arithmetic() {
    // (1 + 2) * 3
    let result = eval(vec![
        int(1),
        int(2),
        Op::Binary(Binary::Add),
        Op::Unary(Unary::Parens),
        int(3),
        Op::Binary(Binary::Mul),
    ])
    .unwrap();
    assert_eq!(result, Term::Integer(9));

    // 1 + 2 * 3
    let result = eval(vec![
        int(1),
        int(2),
        int(3),
        Op::Binary(Binary::Mul),
        Op::Binary(Binary::Add),
    ])
    .unwrap();
    assert_eq!(result, Term::Integer(7));
}

#[test]
fn test_checked_arithmetic_overflows() {
    assert_eq!(
        eval(vec![int(i64::MAX), int(1), Op::Binary(Binary::Add)]),
        Err(ExecutionError::Overflow)
    );
    assert_eq!(
        eval(vec![int(i64::MIN), int(1), Op::Binary(Binary::Sub)]),
        Err(ExecutionError::Overflow)
    );
    assert_eq!(
        eval(vec![int(i64::MAX), int(2), Op::Binary(Binary::Mul)]),
        Err(ExecutionError::Overflow)
    );
    assert_eq!(
        eval(vec![int(1), int(0), Op::Binary(Binary::Div)]),
        Err(ExecutionError::Execution("division by zero".to_string()))
    );
    assert_eq!(
        eval(vec![int(7), int(2), Op::Binary(Binary::Div)]),
        Ok(Term::Integer(3))
    );
}

#[test]
fn test_set_intersection_length() {
    // {1,2,3}.intersection({1,2}).length() === 2
    let large: BTreeSet<Term> = [1, 2, 3].into_iter().map(Term::Integer).collect();
    let small: BTreeSet<Term> = [1, 2].into_iter().map(Term::Integer).collect();

    let result = eval(vec![
        Op::Value(Term::Set(large)),
        Op::Value(Term::Set(small)),
        Op::Binary(Binary::Intersection),
        Op::Unary(Unary::Length),
        int(2),
        Op::Binary(Binary::Equal),
    ])
    .unwrap();
    assert_eq!(result, Term::Bool(true));
}

#[test]
fn test_string_operations() {
    let mut symbols = default_symbol_table();
    let hello = symbols.insert("hello world");
    let hello_prefix = symbols.insert("hello");
    let world_suffix = symbols.insert("world");
    let pattern = symbols.insert("o w");

    for (op, expected) in [
        (Binary::Prefix, true),
        (Binary::Suffix, false),
        (Binary::Contains, true),
    ] {
        let result = eval_with(
            vec![
                Op::Value(Term::Str(hello)),
                Op::Value(Term::Str(hello_prefix)),
                Op::Binary(op),
            ],
            &HashMap::new(),
            &mut symbols,
        )
        .unwrap();
        assert_eq!(result, Term::Bool(expected), "op {op:?}");
    }

    let result = eval_with(
        vec![
            Op::Value(Term::Str(hello)),
            Op::Value(Term::Str(world_suffix)),
            Op::Binary(Binary::Suffix),
        ],
        &HashMap::new(),
        &mut symbols,
    )
    .unwrap();
    assert_eq!(result, Term::Bool(true));

    let result = eval_with(
        vec![
            Op::Value(Term::Str(hello)),
            Op::Value(Term::Str(pattern)),
            Op::Binary(Binary::Regex),
        ],
        &HashMap::new(),
        &mut symbols,
    )
    .unwrap();
    assert_eq!(result, Term::Bool(true));
}

#[test]
fn test_string_concatenation_interns_into_scratch_space() {
    let mut symbols = default_symbol_table();
    let left = symbols.insert("ab");
    let right = symbols.insert("cd");
    let before = symbols.len();

    let expression = Expression {
        ops: vec![
            Op::Value(Term::Str(left)),
            Op::Value(Term::Str(right)),
            Op::Binary(Binary::Add),
        ],
    };
    let mut temporary = TemporarySymbolTable::new(&symbols);
    let result = expression.evaluate(&HashMap::new(), &mut temporary).unwrap();

    match result {
        Term::Str(id) => assert_eq!(temporary.get_symbol(id), Some("abcd")),
        other => panic!("expected string, got {other:?}"),
    }
    // The token table is untouched.
    assert_eq!(symbols.len(), before);
}

#[test]
fn test_strict_and_permissive_equality() {
    assert_eq!(
        eval(vec![int(1), Op::Value(Term::Bool(true)), Op::Binary(Binary::Equal)]),
        Err(ExecutionError::InvalidType)
    );
    assert_eq!(
        eval(vec![
            int(1),
            Op::Value(Term::Bool(true)),
            Op::Binary(Binary::HeterogeneousEqual),
        ]),
        Ok(Term::Bool(false))
    );
    assert_eq!(
        eval(vec![
            int(1),
            Op::Value(Term::Bool(true)),
            Op::Binary(Binary::HeterogeneousNotEqual),
        ]),
        Ok(Term::Bool(true))
    );
    assert_eq!(
        eval(vec![int(2), int(2), Op::Binary(Binary::NotEqual)]),
        Ok(Term::Bool(false))
    );
    assert_eq!(
        eval(vec![Op::Value(Term::Null), Op::Value(Term::Null), Op::Binary(Binary::Equal)]),
        Ok(Term::Bool(true))
    );
}

#[test]
fn test_lazy_operators_short_circuit() {
    // false && (1 / 0 == 0) does not evaluate the right side.
    let poison = vec![int(1), int(0), Op::Binary(Binary::Div), int(0), Op::Binary(Binary::Equal)];

    let result = eval(vec![
        Op::Value(Term::Bool(false)),
        Op::Closure(vec![], poison.clone()),
        Op::Binary(Binary::LazyAnd),
    ])
    .unwrap();
    assert_eq!(result, Term::Bool(false));

    let result = eval(vec![
        Op::Value(Term::Bool(true)),
        Op::Closure(vec![], poison.clone()),
        Op::Binary(Binary::LazyOr),
    ])
    .unwrap();
    assert_eq!(result, Term::Bool(true));

    // When the left side forces evaluation, the failure surfaces.
    let result = eval(vec![
        Op::Value(Term::Bool(true)),
        Op::Closure(vec![], poison),
        Op::Binary(Binary::LazyAnd),
    ]);
    assert!(matches!(result, Err(ExecutionError::Execution(_))));
}

#[test]
fn test_quantifiers_over_collections() {
    let array: Vec<Term> = [1, 2, 3].into_iter().map(Term::Integer).collect();

    // [1,2,3].all($x -> $x > 0)
    let all_positive = eval(vec![
        Op::Value(Term::Array(array.clone())),
        Op::Closure(
            vec![9],
            vec![
                Op::Value(Term::Variable(9)),
                int(0),
                Op::Binary(Binary::GreaterThan),
            ],
        ),
        Op::Binary(Binary::All),
    ])
    .unwrap();
    assert_eq!(all_positive, Term::Bool(true));

    // [1,2,3].any($x -> $x > 2)
    let any_large = eval(vec![
        Op::Value(Term::Array(array)),
        Op::Closure(
            vec![9],
            vec![
                Op::Value(Term::Variable(9)),
                int(2),
                Op::Binary(Binary::GreaterThan),
            ],
        ),
        Op::Binary(Binary::Any),
    ])
    .unwrap();
    assert_eq!(any_large, Term::Bool(true));
}

#[test]
fn test_quantifier_over_map_sees_key_value_pairs() {
    let mut symbols = default_symbol_table();
    let name = symbols.insert("name");

    let mut map = BTreeMap::new();
    map.insert(MapKey::Str(name), Term::Integer(42));

    // {"name": 42}.any($kv -> $kv.get(1) === 42)
    let result = eval_with(
        vec![
            Op::Value(Term::Map(map)),
            Op::Closure(
                vec![9],
                vec![
                    Op::Value(Term::Variable(9)),
                    int(1),
                    Op::Binary(Binary::Get),
                    int(42),
                    Op::Binary(Binary::Equal),
                ],
            ),
            Op::Binary(Binary::Any),
        ],
        &HashMap::new(),
        &mut symbols,
    )
    .unwrap();
    assert_eq!(result, Term::Bool(true));
}

#[test]
fn test_closure_parameters_must_not_shadow() {
    let mut values = HashMap::new();
    values.insert(9u32, Term::Integer(1));

    let result = eval_with(
        vec![
            Op::Value(Term::Array(vec![Term::Integer(1)])),
            Op::Closure(vec![9], vec![Op::Value(Term::Bool(true))]),
            Op::Binary(Binary::Any),
        ],
        &values,
        &mut default_symbol_table(),
    );
    assert_eq!(result, Err(ExecutionError::ShadowedVariable(9)));
}

#[test]
fn test_try_or_recovers_from_execution_failures() {
    // (1/0).try_or(42)
    let result = eval(vec![
        Op::Closure(vec![], vec![int(1), int(0), Op::Binary(Binary::Div)]),
        Op::Value(Term::Integer(42)),
        Op::Binary(Binary::TryOr),
    ])
    .unwrap();
    assert_eq!(result, Term::Integer(42));

    // A successful closure keeps its own value.
    let result = eval(vec![
        Op::Closure(vec![], vec![int(6), int(7), Op::Binary(Binary::Mul)]),
        Op::Value(Term::Integer(0)),
        Op::Binary(Binary::TryOr),
    ])
    .unwrap();
    assert_eq!(result, Term::Integer(42));
}

#[test]
fn test_get_returns_null_when_absent() {
    let array: Vec<Term> = vec![Term::Integer(10)];

    assert_eq!(
        eval(vec![
            Op::Value(Term::Array(array.clone())),
            int(5),
            Op::Binary(Binary::Get),
        ]),
        Ok(Term::Null)
    );
    assert_eq!(
        eval(vec![
            Op::Value(Term::Array(array)),
            int(-1),
            Op::Binary(Binary::Get),
        ]),
        Ok(Term::Null)
    );
}

#[test]
fn test_type_of() {
    let result = eval(vec![int(5), Op::Unary(Unary::TypeOf)]);
    let symbols = default_symbol_table();
    let mut temporary = TemporarySymbolTable::new(&symbols);
    let expected = temporary.insert("integer");
    assert_eq!(result, Ok(Term::Str(expected)));
}

#[test]
fn test_malformed_programs_fail_with_execution_errors() {
    // Leftover operand.
    assert!(matches!(
        eval(vec![int(1), int(2)]),
        Err(ExecutionError::Execution(_))
    ));
    // Stack underflow.
    assert!(matches!(
        eval(vec![Op::Binary(Binary::Add)]),
        Err(ExecutionError::Execution(_))
    ));
    // A closure is not a result value.
    assert!(matches!(
        eval(vec![Op::Closure(vec![], vec![int(1)])]),
        Err(ExecutionError::Execution(_))
    ));
    // Unknown variable.
    assert!(matches!(
        eval(vec![Op::Value(Term::Variable(7))]),
        Err(ExecutionError::Execution(_))
    ));
}

#[test]
fn test_determinism() {
    let ops = vec![
        int(10),
        int(3),
        Op::Binary(Binary::Sub),
        int(2),
        Op::Binary(Binary::Mul),
    ];
    let first = eval(ops.clone()).unwrap();
    let second = eval(ops).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, Term::Integer(14));
}
