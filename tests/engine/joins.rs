//! Join correctness against a nested-loop oracle

use std::collections::BTreeSet;

use aurora_engine::{Constraint, Solver};
use aurora_foundation::{Row, Value};
use aurora_storage::Memory;
use proptest::prelude::*;

fn edges_strategy() -> impl Strategy<Value = BTreeSet<(i64, i64)>> {
    prop::collection::btree_set((0i64..6, 0i64..6), 0..20)
}

fn load(edges: &BTreeSet<(i64, i64)>) -> Memory {
    let mut memory = Memory::new();
    memory.get_table("edge", &["x", "y"]);
    let rows: Vec<Row> = edges
        .iter()
        .map(|&(x, y)| vec![Value::Int(x), Value::Int(y)])
        .collect();
    memory.add("edge", &rows).unwrap();
    memory
}

fn ints(values: &[i64]) -> Row {
    values.iter().map(|v| Value::Int(*v)).collect()
}

fn solutions(solver: &mut Solver, memory: &Memory) -> BTreeSet<Row> {
    let elems = solver.solve(memory).unwrap();
    let rows: BTreeSet<Row> = elems.iter().map(|(r, _)| r.clone()).collect();
    assert_eq!(rows.len(), elems.len(), "solutions must be distinct");
    rows
}

proptest! {
    #[test]
    fn two_hop_matches_oracle(edges in edges_strategy()) {
        let mut memory = load(&edges);
        let source = memory.get_source("edge", &["x", "y"]).unwrap();
        let mut solver = Solver::new(
            3,
            vec![
                Constraint::contains(source, vec![0, 1]),
                Constraint::contains(source, vec![1, 2]),
            ],
        )
        .unwrap();

        let mut expected = BTreeSet::new();
        for &(a, b) in &edges {
            for &(c, d) in &edges {
                if b == c {
                    expected.insert(ints(&[a, b, d]));
                }
            }
        }
        prop_assert_eq!(solutions(&mut solver, &memory), expected);
    }

    #[test]
    fn triangles_match_oracle(edges in edges_strategy()) {
        let mut memory = load(&edges);
        let forward = memory.get_source("edge", &["x", "y"]).unwrap();
        let mut solver = Solver::new(
            3,
            vec![
                Constraint::contains(forward, vec![0, 1]),
                Constraint::contains(forward, vec![1, 2]),
                Constraint::contains(forward, vec![0, 2]),
            ],
        )
        .unwrap();

        let mut expected = BTreeSet::new();
        for &(a, b) in &edges {
            for &(c, d) in &edges {
                if b == c && edges.contains(&(a, d)) {
                    expected.insert(ints(&[a, b, d]));
                }
            }
        }
        prop_assert_eq!(solutions(&mut solver, &memory), expected);
    }

    #[test]
    fn reversed_source_matches_oracle(edges in edges_strategy()) {
        let mut memory = load(&edges);
        let forward = memory.get_source("edge", &["x", "y"]).unwrap();
        let backward = memory.get_source("edge", &["y", "x"]).unwrap();
        // Pairs of edges that share a target.
        let mut solver = Solver::new(
            3,
            vec![
                Constraint::contains(forward, vec![0, 1]),
                Constraint::contains(backward, vec![1, 2]),
            ],
        )
        .unwrap();

        let mut expected = BTreeSet::new();
        for &(a, b) in &edges {
            for &(c, d) in &edges {
                if b == d {
                    expected.insert(ints(&[a, b, c]));
                }
            }
        }
        prop_assert_eq!(solutions(&mut solver, &memory), expected);
    }

    #[test]
    fn filter_matches_oracle(edges in edges_strategy()) {
        let mut memory = load(&edges);
        let source = memory.get_source("edge", &["x", "y"]).unwrap();
        let less = aurora_language::compile_source("x < y").unwrap();
        let mut solver = Solver::new(
            2,
            vec![
                Constraint::contains(source, vec![0, 1]),
                Constraint::filter(less, vec![0, 1]),
            ],
        )
        .unwrap();

        let expected: BTreeSet<Row> = edges
            .iter()
            .filter(|(x, y)| x < y)
            .map(|&(x, y)| ints(&[x, y]))
            .collect();
        prop_assert_eq!(solutions(&mut solver, &memory), expected);
    }
}

// Columns of the mixed join: x, y, lo, hi, a copy of x, x + y.
const X: usize = 0;
const Y: usize = 1;
const LO: usize = 2;
const HI: usize = 3;
const COPY: usize = 4;
const TOTAL: usize = 5;

fn mixed_constraint(
    slot: usize,
    memory: &mut Memory,
    reversed: bool,
    bounds: (i64, i64),
    pin: Option<i64>,
) -> Option<Constraint> {
    match slot {
        0 => Some(Constraint::constant(LO, Value::Int(bounds.0))),
        1 => Some(Constraint::constant(HI, Value::Int(bounds.1))),
        2 => Some(Constraint::interval(LO, Y, HI)),
        3 => pin.map(|x| Constraint::constant(X, Value::Int(x))),
        4 => Some(Constraint::equal(vec![X, COPY])),
        5 => {
            let sum = aurora_language::compile_source("x + y").unwrap();
            Some(Constraint::function(TOTAL, sum, vec![X, Y]))
        }
        _ => Some(if reversed {
            let backward = memory.get_source("edge", &["y", "x"]).unwrap();
            Constraint::contains(backward, vec![Y, X])
        } else {
            let forward = memory.get_source("edge", &["x", "y"]).unwrap();
            Constraint::contains(forward, vec![X, Y])
        }),
    }
}

proptest! {
    #[test]
    fn pinned_columns_match_oracle(
        edges in edges_strategy(),
        order in Just((0..7).collect::<Vec<usize>>()).prop_shuffle(),
        reversed in any::<bool>(),
        bounds in (0i64..6, 0i64..6),
        pin in prop::option::of(0i64..6),
    ) {
        let mut memory = load(&edges);
        let constraints: Vec<Constraint> = order
            .iter()
            .filter_map(|&slot| mixed_constraint(slot, &mut memory, reversed, bounds, pin))
            .collect();
        let mut solver = Solver::new(6, constraints).unwrap();

        let elems = solver.solve(&memory).unwrap();
        for (row, count) in &elems {
            prop_assert!(*count > 0, "{:?} has multiplicity {}", row, count);
        }
        let found: BTreeSet<Row> = elems.into_iter().map(|(r, _)| r).collect();

        let expected: BTreeSet<Row> = edges
            .iter()
            .filter(|&&(x, y)| bounds.0 <= y && y <= bounds.1 && pin.is_none_or(|p| p == x))
            .map(|&(x, y)| ints(&[x, y, bounds.0, bounds.1, x, x + y]))
            .collect();
        prop_assert_eq!(found, expected);
    }
}

#[test]
fn empty_source_has_no_solutions() {
    let mut memory = Memory::new();
    let source = memory.get_source("edge", &["x", "y"]).unwrap();
    let mut solver = Solver::new(2, vec![Constraint::contains(source, vec![0, 1])]).unwrap();
    assert!(solver.solve(&memory).unwrap().is_empty());
}

#[test]
fn constant_selects_rows() {
    let edges: BTreeSet<(i64, i64)> = [(1, 2), (1, 3), (2, 3)].into_iter().collect();
    let mut memory = load(&edges);
    let source = memory.get_source("edge", &["x", "y"]).unwrap();
    let mut solver = Solver::new(
        2,
        vec![
            Constraint::constant(0, Value::Int(1)),
            Constraint::contains(source, vec![0, 1]),
        ],
    )
    .unwrap();
    let expected: BTreeSet<Row> = [ints(&[1, 2]), ints(&[1, 3])].into_iter().collect();
    assert_eq!(solutions(&mut solver, &memory), expected);
}

#[test]
fn solver_can_be_rerun() {
    let edges: BTreeSet<(i64, i64)> = [(1, 2)].into_iter().collect();
    let mut memory = load(&edges);
    let source = memory.get_source("edge", &["x", "y"]).unwrap();
    let mut solver = Solver::new(2, vec![Constraint::contains(source, vec![0, 1])]).unwrap();
    assert_eq!(solver.solve(&memory).unwrap().len(), 1);
    memory.add("edge", &[ints(&[5, 6])]).unwrap();
    assert_eq!(solver.solve(&memory).unwrap().len(), 2);
}
