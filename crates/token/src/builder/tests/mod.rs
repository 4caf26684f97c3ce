// Path: crates/token/src/builder/tests/mod.rs
use super::*;
use tessera_datalog::default_symbol_table;
use tessera_types::error::LanguageError;

#[test]
fn test_facts_must_be_ground() {
    let fact = Fact::new("right", vec![var("anything")]);
    let mut symbols = default_symbol_table();
    assert_eq!(
        fact.convert(&mut symbols).err(),
        Some(LanguageError::InvalidVariables(vec!["anything".to_string()]).into())
    );
}

#[test]
fn test_rule_head_variables_must_be_bound() {
    let rule = Rule::new(
        Predicate::new("head", vec![var("x")]),
        vec![Predicate::new("body", vec![var("y")])],
        vec![],
        vec![],
    );
    let mut symbols = default_symbol_table();
    let mut keys = KeyTable::new();
    assert_eq!(
        rule.convert(&mut symbols, &mut keys).err(),
        Some(LanguageError::InvalidVariables(vec!["x".to_string()]).into())
    );
}

#[test]
fn test_block_stores_only_new_symbols() {
    let base = default_symbol_table();
    let block = BlockBuilder::new()
        .fact(Fact::new("right", vec![string("file1"), string("read")]))
        .build(&base)
        .unwrap();

    // "right" and "read" are default symbols; only "file1" is new.
    assert_eq!(block.symbols.strings(), &["file1".to_string()]);
    assert_eq!(block.version, tessera_types::MIN_SCHEMA_VERSION);
}

#[test]
fn test_block_version_follows_features() {
    let base = default_symbol_table();
    let block = BlockBuilder::new()
        .check(Check::reject(query(
            vec![Predicate::new("revoked", vec![var("id")])],
            vec![],
            vec![],
        )))
        .build(&base)
        .unwrap();
    assert_eq!(block.version, tessera_types::DATALOG_3_2);
}

#[test]
fn test_expression_builder_produces_postfix_ops() {
    let expression = Expression::binary(
        Expression::value(var("r")),
        Expression::value(string("/folder1/")),
        tessera_datalog::Binary::Prefix,
    );

    let mut symbols = default_symbol_table();
    let converted = expression.convert(&mut symbols);
    assert_eq!(converted.ops.len(), 3);
    assert_eq!(
        symbols.print_expression(&converted),
        "$r.starts_with(\"/folder1/\")"
    );
}

#[test]
fn test_scope_interning_deduplicates_keys() {
    let keypair = tessera_crypto::KeyPair::generate(tessera_crypto::Algorithm::Ed25519);
    let mut keys = KeyTable::new();

    let first = Scope::PublicKey(keypair.public()).convert(&mut keys);
    let second = Scope::PublicKey(keypair.public()).convert(&mut keys);
    assert_eq!(first, second);
    assert_eq!(keys.len(), 1);
}
