//! Constraint solver enumerating the solutions of one rule body.
//!
//! Every rule variable is a column with a domain `[lo, hi]` of [`Bound`]s.
//! Constraints narrow domains by propagation; when nothing is dirty and some
//! domain is still wider than a point, a constraint splits it into a left
//! half (searched first) and a right half (searched on backtrack). Each
//! point where every domain has collapsed is a solution, produced in
//! ascending lexicographic order of the solver row.

use aurora_foundation::{Bound, Error, ErrorKind, Result, Row, SemanticLimit};
use aurora_storage::Memory;
use tracing::trace;

use crate::constraint::Constraint;

// =============================================================================
// Solver State
// =============================================================================

/// Variable domains, watch sets and the backtracking stack.
///
/// Snapshots live in flat arenas indexed by `depth * width`, so pushing a
/// frame only copies into storage that was already allocated by an earlier
/// search.
#[derive(Clone, Debug)]
pub struct SolverState {
    num_vars: usize,
    num_constraints: usize,
    los: Vec<Bound>,
    his: Vec<Bound>,
    /// `watching[var * num_constraints + constraint]`
    watching: Vec<bool>,
    dirty: Vec<bool>,
    failed: bool,
    depth: usize,
    pushed_los: Vec<Bound>,
    pushed_his: Vec<Bound>,
    pushed_watching: Vec<bool>,
    pushed_dirty: Vec<bool>,
    splitters: Vec<usize>,
    pub(crate) scratch: Vec<Bound>,
}

impl SolverState {
    fn new(num_vars: usize, num_constraints: usize) -> Self {
        Self {
            num_vars,
            num_constraints,
            los: vec![Bound::Least; num_vars],
            his: vec![Bound::Greatest; num_vars],
            watching: vec![false; num_vars * num_constraints],
            dirty: vec![true; num_constraints],
            failed: false,
            depth: 0,
            pushed_los: Vec::new(),
            pushed_his: Vec::new(),
            pushed_watching: Vec::new(),
            pushed_dirty: Vec::new(),
            splitters: Vec::new(),
            scratch: Vec::new(),
        }
    }

    fn reset(&mut self) {
        self.los.fill(Bound::Least);
        self.his.fill(Bound::Greatest);
        self.watching.fill(false);
        self.dirty.fill(true);
        self.failed = false;
        self.depth = 0;
        self.splitters.clear();
    }

    /// Returns the lower bound of `var`.
    #[must_use]
    pub fn lo(&self, var: usize) -> &Bound {
        &self.los[var]
    }

    /// Returns the upper bound of `var`.
    #[must_use]
    pub fn hi(&self, var: usize) -> &Bound {
        &self.his[var]
    }

    /// Returns true if the domain of `var` is a single point.
    #[must_use]
    pub fn is_fixed(&self, var: usize) -> bool {
        self.los[var] == self.his[var]
    }

    /// Returns the value of `var` if its domain is a single value.
    #[must_use]
    pub fn fixed_value(&self, var: usize) -> Option<&aurora_foundation::Value> {
        if self.is_fixed(var) {
            self.los[var].value()
        } else {
            None
        }
    }

    /// Returns true once the current branch has no solutions.
    #[must_use]
    pub const fn failed(&self) -> bool {
        self.failed
    }

    /// Marks the current branch as dead.
    pub fn fail(&mut self) {
        self.failed = true;
    }

    /// Raises the lower bound of `var`. Lowering is a no-op.
    pub fn set_lo(&mut self, var: usize, lo: Bound) {
        if lo <= self.los[var] {
            return;
        }
        if lo > self.his[var] {
            self.failed = true;
            return;
        }
        self.los[var] = lo;
        self.touch(var);
    }

    /// Lowers the upper bound of `var`. Raising is a no-op.
    pub fn set_hi(&mut self, var: usize, hi: Bound) {
        if hi >= self.his[var] {
            return;
        }
        if hi < self.los[var] {
            self.failed = true;
            return;
        }
        self.his[var] = hi;
        self.touch(var);
    }

    /// Collapses the domain of `var` to the single point `value`.
    pub fn set_eq(&mut self, var: usize, value: Bound) {
        if value < self.los[var] || value > self.his[var] {
            self.failed = true;
            return;
        }
        if self.los[var] == value && self.his[var] == value {
            return;
        }
        self.los[var] = value.clone();
        self.his[var] = value;
        self.touch(var);
    }

    /// Makes `constraint` dirty whenever the domain of `var` changes.
    pub fn set_watch(&mut self, var: usize, constraint: usize) {
        self.watching[var * self.num_constraints + constraint] = true;
    }

    fn touch(&mut self, var: usize) {
        let start = var * self.num_constraints;
        for (dirty, watching) in self
            .dirty
            .iter_mut()
            .zip(&self.watching[start..start + self.num_constraints])
        {
            *dirty |= *watching;
        }
    }

    fn first_unfixed(&self) -> Option<usize> {
        (0..self.num_vars).find(|&var| !self.is_fixed(var))
    }

    fn push(&mut self) {
        let (n, w, c) = (
            self.num_vars,
            self.num_vars * self.num_constraints,
            self.num_constraints,
        );
        self.pushed_los.truncate(self.depth * n);
        self.pushed_los.extend_from_slice(&self.los);
        self.pushed_his.truncate(self.depth * n);
        self.pushed_his.extend_from_slice(&self.his);
        self.pushed_watching.truncate(self.depth * w);
        self.pushed_watching.extend_from_slice(&self.watching);
        self.pushed_dirty.truncate(self.depth * c);
        self.pushed_dirty.extend_from_slice(&self.dirty);
        self.depth += 1;
    }

    fn pop(&mut self) {
        self.depth -= 1;
        let (n, w, c) = (
            self.num_vars,
            self.num_vars * self.num_constraints,
            self.num_constraints,
        );
        let d = self.depth;
        self.los.clone_from_slice(&self.pushed_los[d * n..(d + 1) * n]);
        self.his.clone_from_slice(&self.pushed_his[d * n..(d + 1) * n]);
        self.watching
            .copy_from_slice(&self.pushed_watching[d * w..(d + 1) * w]);
        self.dirty
            .copy_from_slice(&self.pushed_dirty[d * c..(d + 1) * c]);
        self.failed = false;
    }

    fn solution(&self) -> Result<Row> {
        self.los
            .iter()
            .map(|bound| {
                bound
                    .value()
                    .cloned()
                    .ok_or_else(|| Error::internal("solution contains an unbounded column"))
            })
            .collect()
    }
}

// =============================================================================
// Solver
// =============================================================================

/// Enumerates solutions of a conjunction of constraints over `num_vars`
/// columns.
#[derive(Debug)]
pub struct Solver {
    constraints: Vec<Constraint>,
    state: SolverState,
    max_steps: Option<u64>,
    steps: u64,
}

impl Solver {
    /// Creates a solver over `num_vars` columns.
    ///
    /// # Errors
    /// Returns `Internal` if a constraint names a column outside the row.
    pub fn new(num_vars: usize, constraints: Vec<Constraint>) -> Result<Self> {
        if let Some(var) = constraints
            .iter()
            .flat_map(Constraint::vars)
            .find(|&var| var >= num_vars)
        {
            return Err(Error::internal(format!(
                "constraint refers to column {var} of a {num_vars}-column solver"
            )));
        }
        let state = SolverState::new(num_vars, constraints.len());
        Ok(Self {
            constraints,
            state,
            max_steps: None,
            steps: 0,
        })
    }

    /// Builder method to bound the loop iterations of one enumeration.
    #[must_use]
    pub fn with_max_steps(mut self, max_steps: Option<u64>) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Returns the number of columns in a solution row.
    #[must_use]
    pub const fn num_vars(&self) -> usize {
        self.state.num_vars
    }

    /// Returns the constraints.
    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Returns the current domains.
    #[must_use]
    pub const fn state(&self) -> &SolverState {
        &self.state
    }

    /// Restarts enumeration from the full domain.
    pub fn reset(&mut self) {
        self.state.reset();
        self.steps = 0;
        for (ix, constraint) in self.constraints.iter().enumerate() {
            constraint.reset(&mut self.state, ix);
        }
    }

    /// Produces the next solution, or `None` when the search is exhausted.
    ///
    /// # Errors
    /// Returns `CannotSplit` when a variable is unbound and no constraint can
    /// split it, and `LimitExceeded` when the step limit is hit.
    pub fn next(&mut self, memory: &Memory) -> Result<Option<Row>> {
        let mut ix = 0;
        loop {
            self.steps += 1;
            if let Some(limit) = self.max_steps.filter(|&limit| self.steps > limit) {
                return Err(Error::limit_exceeded(SemanticLimit::MaxSearchSteps {
                    limit,
                }));
            }

            if self.state.failed {
                if self.state.depth == 0 {
                    return Ok(None);
                }
                self.backtrack(memory);
                ix = 0;
            } else if ix == self.constraints.len() {
                match self.state.first_unfixed() {
                    None => {
                        let row = self.state.solution()?;
                        self.state.failed = true;
                        return Ok(Some(row));
                    }
                    Some(var) => {
                        self.split(memory, var)?;
                        ix = 0;
                    }
                }
            } else if self.state.dirty[ix] {
                self.constraints[ix].propagate(&mut self.state, ix, memory);
                self.state.dirty[ix] = false;
                ix = 0;
            } else {
                ix += 1;
            }
        }
    }

    /// Returns the multiplicity of the current solution.
    ///
    /// The product of every constraint's own multiplicity.
    #[must_use]
    pub fn val(&self, memory: &Memory) -> i64 {
        self.constraints
            .iter()
            .map(|c| c.val(&self.state, memory))
            .product()
    }

    /// Collects all remaining solutions with their multiplicities.
    ///
    /// # Errors
    /// Propagates errors from [`Solver::next`].
    pub fn elems(&mut self, memory: &Memory) -> Result<Vec<(Row, i64)>> {
        let mut out = Vec::new();
        while let Some(row) = self.next(memory)? {
            let count = self.val(memory);
            out.push((row, count));
        }
        trace!(solutions = out.len(), steps = self.steps, "solver exhausted");
        Ok(out)
    }

    /// Resets and collects every solution.
    ///
    /// # Errors
    /// Propagates errors from [`Solver::next`].
    pub fn solve(&mut self, memory: &Memory) -> Result<Vec<(Row, i64)>> {
        self.reset();
        self.elems(memory)
    }

    fn split(&mut self, memory: &Memory, var: usize) -> Result<()> {
        self.state.push();
        for (ix, constraint) in self.constraints.iter().enumerate() {
            if constraint.split_left(&mut self.state, ix, memory) {
                self.state.splitters.push(ix);
                return Ok(());
            }
        }
        self.state.pop();
        Err(Error::new(ErrorKind::CannotSplit { variable: var }))
    }

    fn backtrack(&mut self, memory: &Memory) {
        self.state.pop();
        if let Some(ix) = self.state.splitters.pop() {
            self.constraints[ix].split_right(&mut self.state, ix, memory);
        }
    }
}
