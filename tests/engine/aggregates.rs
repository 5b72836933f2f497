//! Grouped reductions and their output diffs

use aurora_engine::aggregate::{self, Aggregate, AggregateFlow, Direction};
use aurora_foundation::{ErrorKind, Row, Value};
use aurora_storage::Memory;
use proptest::prelude::*;

fn row(group: &str, values: &[i64]) -> Row {
    let mut row = vec![Value::from(group)];
    row.extend(values.iter().map(|v| Value::Int(*v)));
    row
}

fn sum_by_group() -> Aggregate {
    Aggregate::new(2, 1, None, Direction::Ascending, vec![(1, aggregate::sum())]).unwrap()
}

// =============================================================================
// Diffs
// =============================================================================

#[test]
fn first_run_emits_everything() {
    let mut agg = sum_by_group();
    agg.update(&[(row("a", &[1]), 1), (row("a", &[2]), 1), (row("b", &[5]), 1)]);
    agg.reset();
    assert_eq!(
        agg.elems().unwrap(),
        vec![
            (row("a", &[1, 3]), 1),
            (row("a", &[2, 3]), 1),
            (row("b", &[5, 5]), 1),
        ]
    );
}

#[test]
fn untouched_groups_stay_out_of_the_diff() {
    let mut agg = sum_by_group();
    agg.update(&[(row("a", &[1]), 1), (row("a", &[2]), 1), (row("b", &[5]), 1)]);
    agg.reset();
    agg.elems().unwrap();

    agg.update(&[(row("b", &[6]), 1)]);
    agg.reset();
    assert_eq!(
        agg.elems().unwrap(),
        vec![
            (row("b", &[5, 5]), -1),
            (row("b", &[5, 11]), 1),
            (row("b", &[6, 11]), 1),
        ]
    );
}

#[test]
fn unchanged_input_yields_empty_diff() {
    let mut agg = sum_by_group();
    agg.update(&[(row("a", &[1]), 1)]);
    agg.reset();
    agg.elems().unwrap();
    agg.reset();
    assert!(agg.elems().unwrap().is_empty());
}

#[test]
fn removing_a_group_retracts_it() {
    let mut agg = sum_by_group();
    agg.update(&[(row("a", &[1]), 1)]);
    agg.reset();
    agg.elems().unwrap();
    agg.update(&[(row("a", &[1]), -1)]);
    agg.reset();
    assert_eq!(agg.elems().unwrap(), vec![(row("a", &[1, 1]), -1)]);
    assert!(agg.output().is_empty());
}

// =============================================================================
// Limits and Reducers
// =============================================================================

#[test]
fn limit_keeps_rows_in_walk_order() {
    let input = [
        (row("a", &[2, 1]), 1),
        (row("a", &[2, 2]), 1),
        (row("a", &[2, 3]), 1),
    ];
    let mut ascending =
        Aggregate::new(3, 1, Some(1), Direction::Ascending, vec![(2, aggregate::count())]).unwrap();
    ascending.update(&input);
    ascending.reset();
    assert_eq!(
        ascending.elems().unwrap(),
        vec![(row("a", &[2, 1, 2]), 1), (row("a", &[2, 2, 2]), 1)]
    );

    let mut descending =
        Aggregate::new(3, 1, Some(1), Direction::Descending, vec![(2, aggregate::max())]).unwrap();
    descending.update(&input);
    descending.reset();
    assert_eq!(
        descending.elems().unwrap(),
        vec![(row("a", &[2, 2, 3]), 1), (row("a", &[2, 3, 3]), 1)]
    );
}

#[test]
fn negative_limit_is_a_type_error() {
    let mut agg =
        Aggregate::new(2, 1, Some(1), Direction::Ascending, vec![(1, aggregate::count())]).unwrap();
    agg.update(&[(row("a", &[-1]), 1)]);
    agg.reset();
    assert!(matches!(
        agg.elems().unwrap_err().kind,
        ErrorKind::TypeMismatch { .. }
    ));
}

#[test]
fn several_reducers_append_in_order() {
    let mut agg = Aggregate::new(
        2,
        1,
        None,
        Direction::Ascending,
        vec![
            (1, aggregate::min()),
            (1, aggregate::max()),
            (1, aggregate::count()),
        ],
    )
    .unwrap();
    assert_eq!(agg.output_width(), 5);
    agg.update(&[(row("a", &[4]), 1), (row("a", &[9]), 2)]);
    agg.reset();
    let out: Vec<Row> = agg.elems().unwrap().into_iter().map(|(r, _)| r).collect();
    assert_eq!(out, vec![row("a", &[4, 4, 9, 3]), row("a", &[9, 4, 9, 3])]);
}

#[test]
fn sum_weights_by_multiplicity() {
    let mut agg = sum_by_group();
    agg.update(&[(row("a", &[5]), 3)]);
    agg.reset();
    assert_eq!(agg.elems().unwrap(), vec![(row("a", &[5, 15]), 3)]);
}

#[test]
fn out_of_range_columns_are_rejected() {
    assert!(Aggregate::new(2, 3, None, Direction::Ascending, vec![]).is_err());
    assert!(Aggregate::new(2, 1, None, Direction::Ascending, vec![(2, aggregate::sum())]).is_err());
}

// =============================================================================
// Aggregate Flows
// =============================================================================

#[test]
fn aggregate_flow_keeps_sink_in_step() {
    let mut memory = Memory::new();
    memory.get_table("score", &["team", "points"]);
    let source = memory.get_source("score", &["team", "points"]).unwrap();
    let sink = memory
        .get_sink("total", &[Some("team"), Some("points"), Some("total")])
        .unwrap();
    let mut flow = AggregateFlow::new(&memory, "totals", source, sum_by_group(), sink).unwrap();

    memory
        .add("score", &[row("red", &[3]), row("red", &[4]), row("blue", &[1])])
        .unwrap();
    flow.run(&mut memory).unwrap();
    assert_eq!(memory.table("total").unwrap().count(&row("red", &[4, 7])), 1);

    memory.add("score", &[row("blue", &[2])]).unwrap();
    assert_eq!(flow.run(&mut memory).unwrap(), 3);
    let total = memory.table("total").unwrap();
    assert_eq!(total.len(), 4);
    assert_eq!(total.count(&row("blue", &[1, 1])), 0);
    assert_eq!(total.count(&row("blue", &[2, 3])), 1);
}

#[test]
fn aggregate_flow_checks_widths() {
    let mut memory = Memory::new();
    let source = memory.get_source("score", &["team", "points"]).unwrap();
    let narrow = memory.get_sink("total", &[Some("team"), None]).unwrap();
    let err = AggregateFlow::new(&memory, "totals", source, sum_by_group(), narrow).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::FieldCountMismatch { .. }));
}

proptest! {
    /// Applying every diff in turn reproduces a from-scratch aggregate.
    #[test]
    fn diffs_compose(batches in prop::collection::vec(
        prop::collection::vec((0u8..3, 0i64..5, prop_oneof![Just(1i64), Just(-1i64)]), 0..6),
        1..5,
    )) {
        let mut incremental = sum_by_group();
        let mut applied = aurora_storage::SortedIndex::new(3);
        let mut input = aurora_storage::SortedIndex::new(2);

        for batch in batches {
            let mut delta = Vec::new();
            for (g, v, sign) in batch {
                let r = row(&g.to_string(), &[v]);
                if sign < 0 && !input.contains(&r) {
                    continue;
                }
                let change = if sign < 0 { -input.count(&r) } else { 1 };
                input.update(&r, change);
                delta.push((r, change));
            }
            incremental.update(&delta);
            incremental.reset();
            for (r, c) in incremental.elems().unwrap() {
                applied.update(&r, c);
            }

            let mut scratch = sum_by_group();
            scratch.set_input(input.clone());
            let fresh = scratch.elems().unwrap();
            prop_assert_eq!(applied.elems(), fresh);
        }
    }
}
