//! Integration tests for the rule language
//!
//! Tests that programs land in the meta-schema as the rule compiler expects.

use std::collections::BTreeSet;

use aurora_foundation::{ErrorKind, Row, Value};
use aurora_language::meta::{self, Lifetime};
use aurora_language::{ProgramSummary, parse_program};
use aurora_storage::Memory;

fn facts(memory: &Memory, table: &str) -> BTreeSet<Row> {
    memory
        .table(table)
        .unwrap()
        .rows()
        .map(|(_, r)| r.clone())
        .collect()
}

fn s(text: &str) -> Value {
    Value::from(text)
}

const PROGRAM: &str = "
table persistent edge x y
table transient connected x y

rule simple-edge xx yy
when edge x=xx y=yy
know connected x=xx y=yy

rule transitive-edge xx yy zz
when connected x=xx y=yy
when edge x=yy y=zz
know connected x=xx y=zz
";

#[test]
fn rules_are_staged_in_order() {
    let mut memory = Memory::new();
    let summary = parse_program(&mut memory, PROGRAM).unwrap();
    assert_eq!(
        summary,
        ProgramSummary {
            tables: 2,
            rules: 2,
            clauses: 6
        }
    );
    let staged = facts(&memory, meta::STAGE_IX_RULE);
    assert!(staged.contains(&vec![s(meta::FINAL_STAGE), Value::Int(1), s("simple-edge")]));
    assert!(staged.contains(&vec![
        s(meta::FINAL_STAGE),
        Value::Int(2),
        s("transitive-edge")
    ]));
}

#[test]
fn clause_ids_restart_per_rule() {
    let mut memory = Memory::new();
    parse_program(&mut memory, PROGRAM).unwrap();
    let clauses = facts(&memory, meta::RULE_IX_CLAUSE);
    assert!(clauses.contains(&vec![s("transitive-edge"), Value::Int(1), s("transitive-edge-1")]));
    assert!(clauses.contains(&vec![s("transitive-edge"), Value::Int(3), s("transitive-edge-3")]));
}

#[test]
fn rule_variables_keep_declared_order() {
    let mut memory = Memory::new();
    parse_program(&mut memory, PROGRAM).unwrap();
    let variables = facts(&memory, meta::RULE_IX_VARIABLE);
    for (ix, name) in ["xx", "yy", "zz"].iter().enumerate() {
        assert!(variables.contains(&vec![s("transitive-edge"), Value::from(ix), s(name)]));
    }
}

#[test]
fn actions_and_tables() {
    let mut memory = Memory::new();
    parse_program(&mut memory, PROGRAM).unwrap();
    let actions = facts(&memory, meta::CLAUSE_ACTION);
    assert!(actions.contains(&vec![s("simple-edge-1"), s(meta::action::WHEN)]));
    assert!(actions.contains(&vec![s("simple-edge-2"), s(meta::action::KNOW)]));
    let tables = facts(&memory, meta::CLAUSE_TABLE);
    assert!(tables.contains(&vec![s("transitive-edge-2"), s("edge")]));
}

#[test]
fn declared_tables_exist_with_fields() {
    let mut memory = Memory::new();
    parse_program(&mut memory, PROGRAM).unwrap();
    assert_eq!(memory.table("connected").unwrap().fields(), ["x", "y"]);
    let lifetimes = facts(&memory, meta::TABLE_LIFETIME);
    assert!(lifetimes.contains(&vec![s("connected"), s(Lifetime::Transient.name())]));
}

#[test]
fn programs_accumulate() {
    let mut memory = Memory::new();
    parse_program(&mut memory, "table transient a v").unwrap();
    parse_program(&mut memory, "table transient b v").unwrap();
    assert_eq!(facts(&memory, meta::TABLE_LIFETIME).len(), 2);
}

#[test]
fn meta_tables_are_installed_even_for_empty_programs() {
    let mut memory = Memory::new();
    parse_program(&mut memory, "").unwrap();
    for (name, fields) in meta::META_TABLES {
        assert_eq!(memory.table(name).unwrap().fields(), fields);
    }
}

#[test]
fn bad_expression_reports_program_line() {
    let mut memory = Memory::new();
    let err = parse_program(&mut memory, "rule r x\n\nfilter x >").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ParseError { line: 3, .. }));
}

#[test]
fn lifetime_names_round_trip() {
    for lifetime in [Lifetime::Transient, Lifetime::Persistent] {
        assert_eq!(Lifetime::from_name(lifetime.name()), Some(lifetime));
    }
    assert_eq!(Lifetime::from_name("eternal"), None);
    assert_eq!(meta::delta_table("t"), "delta-t");
    assert_eq!(meta::remember_table("t"), "remember-t");
    assert_eq!(meta::forget_table("t"), "forget-t");
}
