//! Configuration for compiling and running logic.

use aurora_language::meta::FINAL_STAGE;

/// Configuration for the rule compiler and the flows it builds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Evaluation stage whose rules are compiled into flows.
    pub stage: String,

    /// Skip a flow outright when any of its sources is empty.
    pub skip_empty_sources: bool,

    /// Kill switch: maximum solver loop iterations per flow run.
    pub max_search_steps: Option<u64>,

    /// Kill switch: maximum solutions per flow run.
    pub max_solutions: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stage: FINAL_STAGE.to_string(),
            skip_empty_sources: true,
            max_search_steps: None,
            max_solutions: None,
        }
    }
}

impl EngineConfig {
    /// Creates a configuration with no kill switches.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Creates a configuration that stops any single search after `steps`
    /// solver iterations.
    #[must_use]
    pub fn bounded(steps: u64) -> Self {
        Self {
            max_search_steps: Some(steps),
            ..Self::default()
        }
    }

    /// Builder method to set the compiled stage.
    #[must_use]
    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = stage.into();
        self
    }

    /// Builder method to enable/disable the empty-source short-circuit.
    #[must_use]
    pub fn with_skip_empty_sources(mut self, skip: bool) -> Self {
        self.skip_empty_sources = skip;
        self
    }

    /// Builder method to set the search step limit.
    #[must_use]
    pub fn with_max_search_steps(mut self, steps: u64) -> Self {
        self.max_search_steps = Some(steps);
        self
    }

    /// Builder method to set the solution limit.
    #[must_use]
    pub fn with_max_solutions(mut self, solutions: usize) -> Self {
        self.max_solutions = Some(solutions);
        self
    }
}
