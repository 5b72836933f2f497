//! A compiled rule: sources feeding a solver feeding sinks.

use aurora_foundation::{Error, Result, Row, SemanticLimit};
use aurora_storage::{Memory, SinkId, SourceId};
use tracing::{debug, trace};

use crate::config::EngineConfig;
use crate::solver::Solver;

/// One compiled rule.
#[derive(Debug)]
pub struct Flow {
    rule: String,
    sources: Vec<SourceId>,
    solver: Solver,
    sinks: Vec<SinkId>,
}

impl Flow {
    /// Creates a flow from its compiled parts.
    #[must_use]
    pub fn new(
        rule: impl Into<String>,
        sources: Vec<SourceId>,
        solver: Solver,
        sinks: Vec<SinkId>,
    ) -> Self {
        Self {
            rule: rule.into(),
            sources,
            solver,
            sinks,
        }
    }

    /// Returns the rule name.
    #[must_use]
    pub fn rule(&self) -> &str {
        &self.rule
    }

    /// Returns the sources the rule joins.
    #[must_use]
    pub fn sources(&self) -> &[SourceId] {
        &self.sources
    }

    /// Returns the sinks the rule writes.
    #[must_use]
    pub fn sinks(&self) -> &[SinkId] {
        &self.sinks
    }

    /// Returns the solver.
    #[must_use]
    pub const fn solver(&self) -> &Solver {
        &self.solver
    }

    /// Enumerates every solution of the rule body with its multiplicity.
    ///
    /// # Errors
    /// Returns solver errors and `LimitExceeded(MaxSolutions)`, tagged with
    /// the rule name.
    pub fn solve(&mut self, memory: &Memory, config: &EngineConfig) -> Result<Vec<(Row, i64)>> {
        self.solver.reset();
        let mut elems = Vec::new();
        while let Some(row) = self.solver.next(memory).map_err(|e| e.in_source(&self.rule))? {
            if let Some(limit) = config.max_solutions.filter(|&limit| elems.len() >= limit) {
                return Err(
                    Error::limit_exceeded(SemanticLimit::MaxSolutions { limit })
                        .in_source(&self.rule),
                );
            }
            let count = self.solver.val(memory);
            trace!(rule = %self.rule, ?row, count, "solution");
            elems.push((row, count));
        }
        Ok(elems)
    }

    /// Runs the rule once and writes its solutions to every sink.
    ///
    /// Returns the number of solutions, or `None` if the flow was skipped
    /// because one of its sources is empty.
    ///
    /// # Errors
    /// Propagates errors from [`Flow::solve`] and from the sink writes.
    pub fn run(&mut self, memory: &mut Memory, config: &EngineConfig) -> Result<Option<usize>> {
        if config.skip_empty_sources
            && self
                .sources
                .iter()
                .any(|&source| memory.source_index(source).is_empty())
        {
            debug!(rule = %self.rule, "skipped flow with an empty source");
            return Ok(None);
        }
        let elems = self.solve(memory, config)?;
        for &sink in &self.sinks {
            memory
                .update(sink, &elems)
                .map_err(|e| e.in_source(&self.rule))?;
        }
        Ok(Some(elems.len()))
    }
}
