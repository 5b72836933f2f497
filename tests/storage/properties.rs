//! Property tests for storage invariants

use std::collections::BTreeSet;

use aurora_foundation::{Row, Value};
use aurora_storage::{Memory, make_fieldmap, remap};
use proptest::prelude::*;

fn rows_strategy() -> impl Strategy<Value = Vec<Row>> {
    prop::collection::vec((0i64..8, 0i64..8), 0..24)
        .prop_map(|pairs| {
            pairs
                .into_iter()
                .map(|(a, b)| vec![Value::Int(a), Value::Int(b)])
                .collect()
        })
}

fn table_rows(memory: &Memory, name: &str) -> BTreeSet<Row> {
    memory
        .table(name)
        .map(|t| t.rows().map(|(_, r)| r.clone()).collect())
        .unwrap_or_default()
}

proptest! {
    #[test]
    fn insert_is_idempotent(rows in rows_strategy()) {
        let mut once = Memory::new();
        once.get_table("t", &["a", "b"]);
        once.add("t", &rows).unwrap();

        let mut twice = once.clone();
        twice.add("t", &rows).unwrap();

        prop_assert_eq!(table_rows(&once, "t"), table_rows(&twice, "t"));
        let distinct: BTreeSet<Row> = rows.iter().cloned().collect();
        prop_assert_eq!(once.table("t").unwrap().len(), distinct.len());
    }

    #[test]
    fn delete_then_readd_restores_rows(rows in rows_strategy()) {
        prop_assume!(!rows.is_empty());
        let mut memory = Memory::new();
        memory.get_table("t", &["a", "b"]);
        let ids = memory.add("t", &rows).unwrap();
        let before = table_rows(&memory, "t");

        memory.del("t", &ids[..1]).unwrap();
        let readded = memory.add("t", &rows[..1]).unwrap();

        prop_assert_eq!(table_rows(&memory, "t"), before);
        prop_assert_ne!(readded[0], ids[0]);
    }

    #[test]
    fn every_source_agrees_with_the_table(rows in rows_strategy()) {
        let mut memory = Memory::new();
        memory.get_table("t", &["a", "b"]);
        let forward = memory.get_source("t", &["a", "b"]).unwrap();
        memory.add("t", &rows).unwrap();
        let backward = memory.get_source("t", &["b", "a"]).unwrap();

        let fwd: BTreeSet<Row> = memory.source_index(forward).rows().map(|(r, _)| r).collect();
        let bwd: BTreeSet<Row> = memory
            .source_index(backward)
            .rows()
            .map(|(r, _)| vec![r[1].clone(), r[0].clone()])
            .collect();
        prop_assert_eq!(&fwd, &table_rows(&memory, "t"));
        prop_assert_eq!(fwd, bwd);
    }

    #[test]
    fn fieldmaps_invert(a in any::<i64>(), b in ".{0,4}", c in any::<bool>()) {
        let abc: Vec<String> = ["a", "b", "c"].iter().map(|s| (*s).to_string()).collect();
        let cab: Vec<String> = ["c", "a", "b"].iter().map(|s| (*s).to_string()).collect();
        let there = make_fieldmap(&abc, &cab).unwrap();
        let back = make_fieldmap(&cab, &abc).unwrap();

        let tuple = vec![Value::Int(a), Value::from(b.as_str()), Value::Bool(c)];
        let moved = remap(&there, &tuple);
        prop_assert_eq!(&moved[0], &Value::Bool(c));
        prop_assert_eq!(remap(&back, &moved), tuple);
    }

    #[test]
    fn sink_and_source_share_an_ordering(a in any::<i64>(), b in ".{0,4}", c in any::<bool>()) {
        let mut memory = Memory::new();
        memory.get_table("t", &["a", "b", "c"]);
        let sink = memory.get_sink("t", &[Some("c"), Some("a"), Some("b")]).unwrap();
        let source = memory.get_source("t", &["c", "a", "b"]).unwrap();

        let tuple = vec![Value::Bool(c), Value::Int(a), Value::from(b.as_str())];
        memory.update(sink, &[(tuple.clone(), 1)]).unwrap();

        prop_assert_eq!(memory.source_index(source).elems(), vec![(tuple, 1)]);
        let native = vec![Value::Int(a), Value::from(b.as_str()), Value::Bool(c)];
        prop_assert_eq!(memory.table("t").unwrap().count(&native), 1);
    }
}
