//! Constraints over solver columns.
//!
//! Each constraint narrows variable domains through [`SolverState`] and may
//! offer to split a domain when propagation alone cannot decide it:
//! - `Constant` pins a column to a value
//! - `Equal` keeps several columns equal
//! - `Contains` requires the tuple of some columns to be a row of a source
//! - `Function` binds a column to an expression over other columns
//! - `Filter` rejects candidates whose predicate is not `true`
//! - `Interval` enumerates the integers between two columns

use aurora_foundation::{Bound, Value};
use aurora_language::CompiledExpr;
use aurora_storage::{Memory, SourceId};
use tracing::trace;

use crate::solver::SolverState;

/// A single constraint in a rule body.
#[derive(Debug)]
pub enum Constraint {
    /// `var == value`
    Constant {
        /// Constrained column.
        var: usize,
        /// The value it must take.
        value: Value,
    },
    /// All `vars` are equal.
    Equal {
        /// Columns that must agree.
        vars: Vec<usize>,
    },
    /// `(vars...)` is a key of `source`.
    Contains {
        /// Source whose field order matches `vars`.
        source: SourceId,
        /// One column per source field.
        vars: Vec<usize>,
    },
    /// `var == func(args...)`
    Function {
        /// Column receiving the result.
        var: usize,
        /// Compiled expression; its parameters line up with `args`.
        func: CompiledExpr,
        /// Argument columns.
        args: Vec<usize>,
    },
    /// `func(args...) == true`
    Filter {
        /// Compiled predicate; its parameters line up with `args`.
        func: CompiledExpr,
        /// Argument columns.
        args: Vec<usize>,
    },
    /// `inner` is an integer in `[ceil(lo), floor(hi)]`.
    Interval {
        /// Column holding the lower end.
        lo: usize,
        /// Column enumerated over the integers in range.
        inner: usize,
        /// Column holding the upper end.
        hi: usize,
    },
}

impl Constraint {
    /// Creates a constant constraint.
    #[must_use]
    pub fn constant(var: usize, value: Value) -> Self {
        Self::Constant { var, value }
    }

    /// Creates an equality constraint.
    #[must_use]
    pub fn equal(vars: Vec<usize>) -> Self {
        Self::Equal { vars }
    }

    /// Creates a membership constraint against a source.
    #[must_use]
    pub fn contains(source: SourceId, vars: Vec<usize>) -> Self {
        Self::Contains { source, vars }
    }

    /// Creates a function constraint.
    #[must_use]
    pub fn function(var: usize, func: CompiledExpr, args: Vec<usize>) -> Self {
        Self::Function { var, func, args }
    }

    /// Creates a filter constraint.
    #[must_use]
    pub fn filter(func: CompiledExpr, args: Vec<usize>) -> Self {
        Self::Filter { func, args }
    }

    /// Creates an interval constraint.
    #[must_use]
    pub fn interval(lo: usize, inner: usize, hi: usize) -> Self {
        Self::Interval { lo, inner, hi }
    }

    /// Returns every column this constraint mentions.
    #[must_use]
    pub fn vars(&self) -> Vec<usize> {
        match self {
            Self::Constant { var, .. } => vec![*var],
            Self::Equal { vars } | Self::Contains { vars, .. } => vars.clone(),
            Self::Function { var, args, .. } => {
                let mut vars = args.clone();
                vars.push(*var);
                vars
            }
            Self::Filter { args, .. } => args.clone(),
            Self::Interval { lo, inner, hi } => vec![*lo, *inner, *hi],
        }
    }

    /// Registers watches at the start of a search.
    pub(crate) fn reset(&self, state: &mut SolverState, me: usize) {
        match self {
            Self::Constant { .. } | Self::Contains { .. } => {}
            Self::Equal { vars } => {
                for &var in vars {
                    state.set_watch(var, me);
                }
            }
            Self::Function { args, .. } | Self::Filter { args, .. } => {
                for &var in args {
                    state.set_watch(var, me);
                }
            }
            Self::Interval { lo, inner, hi } => {
                state.set_watch(*lo, me);
                state.set_watch(*inner, me);
                state.set_watch(*hi, me);
            }
        }
    }

    /// Narrows domains as far as this constraint alone allows.
    pub(crate) fn propagate(&self, state: &mut SolverState, me: usize, memory: &Memory) {
        match self {
            Self::Constant { var, value } => state.set_eq(*var, Bound::Value(value.clone())),
            Self::Equal { vars } => {
                let fixed = vars
                    .iter()
                    .find_map(|&var| state.fixed_value(var).cloned());
                if let Some(value) = fixed {
                    for &var in vars {
                        state.set_eq(var, Bound::Value(value.clone()));
                    }
                }
            }
            Self::Contains { source, vars } => propagate_contains(*source, vars, state, me, memory),
            Self::Function { var, func, args } => {
                if let Some(result) = evaluate(func, args, state) {
                    state.set_eq(*var, Bound::Value(result));
                }
            }
            Self::Filter { func, args } => match evaluate(func, args, state) {
                Some(Value::Bool(true)) | None => {}
                Some(_) => state.fail(),
            },
            Self::Interval { lo, inner, hi } => propagate_interval(*lo, *inner, *hi, state),
        }
    }

    /// Pushes the search into the left half of a split domain.
    ///
    /// Returns false if this constraint has nothing to split.
    pub(crate) fn split_left(&self, state: &mut SolverState, me: usize, memory: &Memory) -> bool {
        match self {
            Self::Contains { source, vars } => {
                let Some(pos) = vars.iter().position(|&var| !state.is_fixed(var)) else {
                    return false;
                };
                let var = vars[pos];
                let lo = state.lo(var).clone();
                state.set_hi(var, lo);
                if let Some(&next) = vars.get(pos + 1) {
                    state.set_watch(next, me);
                }
                propagate_contains(*source, vars, state, me, memory);
                true
            }
            Self::Interval { lo, inner, hi } => {
                if !state.is_fixed(*lo) || !state.is_fixed(*hi) || state.is_fixed(*inner) {
                    return false;
                }
                let Some(point) = state.lo(*inner).value().and_then(ceil_int) else {
                    return false;
                };
                state.set_eq(*inner, Bound::Value(Value::Int(point)));
                true
            }
            _ => false,
        }
    }

    /// Moves the search to the right half after the left half is exhausted.
    ///
    /// Runs on the domains restored to what they were before
    /// [`Constraint::split_left`].
    pub(crate) fn split_right(&self, state: &mut SolverState, me: usize, memory: &Memory) {
        match self {
            Self::Contains { source, vars } => split_right_contains(*source, vars, state, me, memory),
            Self::Interval { inner, .. } => {
                let next = state
                    .lo(*inner)
                    .value()
                    .and_then(ceil_int)
                    .and_then(|point| point.checked_add(1));
                match next {
                    Some(next) => state.set_lo(*inner, Bound::Value(Value::Int(next))),
                    None => state.fail(),
                }
            }
            _ => {}
        }
    }

    /// Returns this constraint's multiplicity for a fully bound row.
    pub(crate) fn val(&self, state: &SolverState, memory: &Memory) -> i64 {
        match self {
            Self::Contains { source, vars } => {
                let key: Vec<Bound> = vars.iter().map(|&var| state.lo(var).clone()).collect();
                memory.source_index(*source).lookup(&key)
            }
            _ => 1,
        }
    }
}

// =============================================================================
// Contains
// =============================================================================

fn propagate_contains(
    source: SourceId,
    vars: &[usize],
    state: &mut SolverState,
    me: usize,
    memory: &Memory,
) {
    let index = memory.source_index(source);
    let mut seek = std::mem::take(&mut state.scratch);
    loop {
        seek.clear();
        for &var in vars {
            seek.push(state.lo(var).clone());
            if !state.is_fixed(var) {
                break;
            }
        }
        seek.resize(vars.len(), Bound::Least);

        match index.seek_gte(&seek) {
            Some(key) => {
                if narrow_to_key(key, vars, state, me) == Narrowed::Done {
                    break;
                }
            }
            None => {
                state.fail();
                break;
            }
        }
    }
    state.scratch = seek;
}

fn split_right_contains(
    source: SourceId,
    vars: &[usize],
    state: &mut SolverState,
    me: usize,
    memory: &Memory,
) {
    let mut seek = std::mem::take(&mut state.scratch);
    seek.clear();
    seek.extend(vars.iter().map(|&var| state.lo(var).clone()));
    if let Some(pos) = vars.iter().position(|&var| !state.is_fixed(var)) {
        seek[pos + 1..].fill(Bound::Greatest);
    }

    let found = memory.source_index(source).seek_gt(&seek);
    state.scratch = seek;
    match found {
        Some(key) => {
            if narrow_to_key(key, vars, state, me) == Narrowed::Reseek {
                propagate_contains(source, vars, state, me, memory);
            }
        }
        None => state.fail(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Narrowed {
    /// Domains agree with the key, or the branch failed.
    Done,
    /// A fixed column sits above the key; seek again from the new prefix.
    Reseek,
}

/// Raises lower bounds to `key` up to the first column it leaves open.
///
/// Every column the key passes through must end up fixed to the key's value.
fn narrow_to_key(key: &[Bound], vars: &[usize], state: &mut SolverState, me: usize) -> Narrowed {
    for (&var, bound) in vars.iter().zip(key) {
        state.set_lo(var, bound.clone());
        if state.failed() {
            return Narrowed::Done;
        }
        state.set_watch(var, me);
        if !state.is_fixed(var) {
            return Narrowed::Done;
        }
        if state.lo(var) != bound {
            return Narrowed::Reseek;
        }
    }
    Narrowed::Done
}

// =============================================================================
// Function / Filter
// =============================================================================

/// Evaluates `func` once every argument is bound.
///
/// An evaluation error kills the current branch and yields `None`.
fn evaluate(func: &CompiledExpr, args: &[usize], state: &mut SolverState) -> Option<Value> {
    let values: Option<Vec<Value>> = args
        .iter()
        .map(|&var| state.fixed_value(var).cloned())
        .collect();
    let values = values?;
    match func.call(&values) {
        Ok(value) => Some(value),
        Err(error) => {
            trace!(%error, "expression failed; rejecting candidate");
            state.fail();
            None
        }
    }
}

// =============================================================================
// Interval
// =============================================================================

fn propagate_interval(lo: usize, inner: usize, hi: usize, state: &mut SolverState) {
    let lower = state.lo(lo).value().map(ceil_int);
    let upper = state.hi(hi).value().map(floor_int);
    if matches!(lower, Some(None)) || matches!(upper, Some(None)) {
        state.fail();
        return;
    }
    if let Some(Some(n)) = lower {
        state.set_lo(inner, Bound::Value(Value::Int(n)));
    }
    if let Some(Some(n)) = upper {
        state.set_hi(inner, Bound::Value(Value::Int(n)));
    }
    if state.fixed_value(inner).is_some_and(|v| !is_integral(v)) {
        state.fail();
    }
}

#[allow(clippy::cast_possible_truncation)]
fn ceil_int(value: &Value) -> Option<i64> {
    match value {
        Value::Int(n) => Some(*n),
        Value::Float(f) if f.is_finite() => Some(f.ceil() as i64),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn floor_int(value: &Value) -> Option<i64> {
    match value {
        Value::Int(n) => Some(*n),
        Value::Float(f) if f.is_finite() => Some(f.floor() as i64),
        _ => None,
    }
}

fn is_integral(value: &Value) -> bool {
    match value {
        Value::Int(_) => true,
        Value::Float(f) => f.fract() == 0.0,
        _ => false,
    }
}
