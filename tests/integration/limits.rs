//! Kill switches and runtime failures surface with the rule name

use aurora::engine::{EngineConfig, compile};
use aurora::foundation::{ErrorKind, Row, SemanticLimit, Value};
use aurora::language::parse_program;
use aurora::storage::Memory;

const PAIRS: &str = "
table persistent edge x y
table transient pair a b
rule pairs a b
when edge x=a y=b
know pair a=a b=b
";

fn edges(n: i64) -> Vec<Row> {
    (0..n).map(|i| vec![Value::Int(i), Value::Int(i + 1)]).collect()
}

fn prepared(program: &str, config: &EngineConfig) -> (Memory, aurora::engine::Logic) {
    let mut memory = Memory::new();
    parse_program(&mut memory, program).unwrap();
    let logic = compile(&mut memory, config).unwrap();
    (memory, logic)
}

#[test]
fn search_step_limit() {
    let (mut memory, mut logic) = prepared(PAIRS, &EngineConfig::bounded(3));
    memory.add("edge", &edges(50)).unwrap();
    let err = logic.run(&mut memory).unwrap_err();
    assert!(matches!(
        err.kind,
        ErrorKind::LimitExceeded(SemanticLimit::MaxSearchSteps { limit: 3 })
    ));
    assert_eq!(err.context.unwrap().source.as_deref(), Some("pairs"));
}

#[test]
fn solution_limit() {
    let config = EngineConfig::default().with_max_solutions(2);
    let (mut memory, mut logic) = prepared(PAIRS, &config);

    memory.add("edge", &edges(2)).unwrap();
    assert_eq!(logic.run(&mut memory).unwrap().solutions, 2);

    memory.add("edge", &edges(3)).unwrap();
    let err = logic.run(&mut memory).unwrap_err();
    assert!(matches!(
        err.kind,
        ErrorKind::LimitExceeded(SemanticLimit::MaxSolutions { limit: 2 })
    ));
}

#[test]
fn generous_limits_do_not_interfere() {
    let config = EngineConfig::bounded(10_000).with_max_solutions(100);
    let (mut memory, mut logic) = prepared(PAIRS, &config);
    memory.add("edge", &edges(20)).unwrap();
    assert_eq!(logic.run(&mut memory).unwrap().solutions, 20);
}

#[test]
fn unbound_variable_cannot_split() {
    let (mut memory, mut logic) = prepared(
        "
table persistent n v
table transient out v w
rule dangling v w
when n v=v
know out v=v w=w
",
        &EngineConfig::default(),
    );
    memory.add("n", &[vec![Value::Int(1)]]).unwrap();
    let err = logic.run(&mut memory).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::CannotSplit { variable: 1 }));
    assert_eq!(err.context.unwrap().source.as_deref(), Some("dangling"));
}

#[test]
fn failed_flow_keeps_earlier_writes() {
    let program = "
table persistent edge x y
table transient first a b
table transient second a b w
rule copy-first a b
when edge x=a y=b
know first a=a b=b
rule copy-second a b w
when edge x=a y=b
know second a=a b=b w=w
";
    let (mut memory, mut logic) = prepared(program, &EngineConfig::default());
    memory.add("edge", &edges(1)).unwrap();
    assert!(logic.run(&mut memory).is_err());
    assert_eq!(memory.table("first").unwrap().len(), 1);
    assert!(memory.table("second").unwrap().is_empty());
}
