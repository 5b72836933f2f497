//! Integration tests for tables and memory

use aurora_foundation::{ErrorKind, Row, Value};
use aurora_storage::Memory;

fn row(values: &[i64]) -> Row {
    values.iter().map(|v| Value::Int(*v)).collect()
}

// =============================================================================
// Insert and Delete
// =============================================================================

#[test]
fn add_returns_ids_and_absorbs_duplicates() {
    let mut memory = Memory::new();
    memory.get_table("edge", &["x", "y"]);
    let ids = memory.add("edge", &[row(&[1, 2]), row(&[2, 3])]).unwrap();
    assert_eq!(ids.len(), 2);

    let again = memory.add("edge", &[row(&[1, 2])]).unwrap();
    assert_eq!(again, vec![ids[0]]);

    let table = memory.table("edge").unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.count(&row(&[1, 2])), 1);
}

#[test]
fn del_removes_by_id() {
    let mut memory = Memory::new();
    memory.get_table("edge", &["x", "y"]);
    let ids = memory.add("edge", &[row(&[1, 2]), row(&[2, 3])]).unwrap();
    assert_eq!(memory.del("edge", &[ids[0], 999]).unwrap(), 1);
    let table = memory.table("edge").unwrap();
    assert_eq!(table.len(), 1);
    assert!(table.row(ids[0]).is_none());
    assert_eq!(table.row(ids[1]), Some(&row(&[2, 3])));
}

#[test]
fn malformed_batch_leaves_table_untouched() {
    let mut memory = Memory::new();
    memory.get_table("edge", &["x", "y"]);
    let err = memory
        .add("edge", &[row(&[1, 2]), row(&[1, 2, 3])])
        .unwrap_err();
    assert!(matches!(
        err.kind,
        ErrorKind::FieldCountMismatch {
            expected: 2,
            actual: 3,
            ..
        }
    ));
    assert!(memory.table("edge").unwrap().is_empty());
}

#[test]
fn unknown_table_operations_fail() {
    let mut memory = Memory::new();
    assert!(matches!(
        memory.add("nope", &[row(&[1])]).unwrap_err().kind,
        ErrorKind::UnknownTable(_)
    ));
    assert!(memory.del("nope", &[0]).is_err());
    assert!(memory.clear("nope").is_err());
}

#[test]
fn get_table_keeps_existing_fields() {
    let mut memory = Memory::new();
    let first = memory.get_table("t", &["a", "b"]);
    let second = memory.get_table("t", &["z"]);
    assert_eq!(first, second);
    assert_eq!(memory.table("t").unwrap().fields(), ["a", "b"]);
}

#[test]
fn clear_keeps_registrations() {
    let mut memory = Memory::new();
    memory.get_table("t", &["a"]);
    let source = memory.get_source("t", &["a"]).unwrap();
    memory.add("t", &[row(&[1])]).unwrap();
    memory.clear("t").unwrap();
    assert!(memory.source_index(source).is_empty());

    memory.add("t", &[row(&[2])]).unwrap();
    assert_eq!(memory.source_index(source).elems(), vec![(row(&[2]), 1)]);
}

// =============================================================================
// Multiplicity
// =============================================================================

#[test]
fn sink_updates_accumulate_counts() {
    let mut memory = Memory::new();
    let sink = memory.get_sink("t", &[Some("a")]).unwrap();
    memory.update(sink, &[(row(&[1]), 2), (row(&[1]), 1)]).unwrap();
    assert_eq!(memory.table("t").unwrap().count(&row(&[1])), 3);

    memory.update(sink, &[(row(&[1]), -1)]).unwrap();
    assert_eq!(memory.table("t").unwrap().count(&row(&[1])), 2);

    memory.update(sink, &[(row(&[1]), -5)]).unwrap();
    let table = memory.table("t").unwrap();
    assert_eq!(table.count(&row(&[1])), 0);
    assert!(table.is_empty());
}

#[test]
fn removing_absent_row_is_a_no_op() {
    let mut memory = Memory::new();
    let sink = memory.get_sink("t", &[Some("a")]).unwrap();
    memory.update(sink, &[(row(&[7]), -1)]).unwrap();
    assert!(memory.table("t").unwrap().is_empty());
}

#[test]
fn rows_iterate_in_id_order() {
    let mut memory = Memory::new();
    memory.get_table("t", &["a"]);
    memory.add("t", &[row(&[3]), row(&[1]), row(&[2])]).unwrap();
    let rows: Vec<Row> = memory
        .table("t")
        .unwrap()
        .rows()
        .map(|(_, r)| r.clone())
        .collect();
    assert_eq!(rows, vec![row(&[3]), row(&[1]), row(&[2])]);
}
