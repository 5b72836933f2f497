//! A compiled program: flows plus per-tick bookkeeping.

use aurora_foundation::Result;
use aurora_storage::Memory;
use tracing::debug;

use crate::aggregate::AggregateFlow;
use crate::config::EngineConfig;
use crate::flow::Flow;
use crate::lifetime::{Persistent, Transient};

/// What one [`Logic::run`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Flows that enumerated solutions.
    pub flows_run: usize,
    /// Flows skipped because a source was empty.
    pub flows_skipped: usize,
    /// Solutions written across all flows.
    pub solutions: usize,
}

/// Everything compiled from one meta-schema.
#[derive(Debug, Default)]
pub struct Logic {
    flows: Vec<Flow>,
    transients: Vec<Transient>,
    persistents: Vec<Persistent>,
    aggregates: Vec<AggregateFlow>,
    config: EngineConfig,
}

impl Logic {
    /// Bundles compiled parts.
    #[must_use]
    pub fn new(
        flows: Vec<Flow>,
        transients: Vec<Transient>,
        persistents: Vec<Persistent>,
        config: EngineConfig,
    ) -> Self {
        Self {
            flows,
            transients,
            persistents,
            aggregates: Vec::new(),
            config,
        }
    }

    /// Returns the flows in run order.
    #[must_use]
    pub fn flows(&self) -> &[Flow] {
        &self.flows
    }

    /// Returns the transient tables' bookkeeping.
    #[must_use]
    pub fn transients(&self) -> &[Transient] {
        &self.transients
    }

    /// Returns the persistent tables' bookkeeping.
    #[must_use]
    pub fn persistents(&self) -> &[Persistent] {
        &self.persistents
    }

    /// Returns the configuration the logic was compiled with.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Adds an aggregate flow, run on every tick after the persistents.
    pub fn add_aggregate(&mut self, flow: AggregateFlow) {
        self.aggregates.push(flow);
    }

    /// Runs every flow once, in compiled order.
    ///
    /// # Errors
    /// Stops at the first failing flow; earlier flows' writes remain.
    pub fn run(&mut self, memory: &mut Memory) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        for flow in &mut self.flows {
            match flow.run(memory, &self.config)? {
                Some(solutions) => {
                    summary.flows_run += 1;
                    summary.solutions += solutions;
                }
                None => summary.flows_skipped += 1,
            }
        }
        debug!(
            flows_run = summary.flows_run,
            flows_skipped = summary.flows_skipped,
            solutions = summary.solutions,
            "logic run"
        );
        Ok(summary)
    }

    /// Runs transients, then persistents, then aggregate flows, once each.
    ///
    /// # Errors
    /// Stops at the first failing step.
    pub fn tick(&mut self, memory: &mut Memory) -> Result<()> {
        for transient in &self.transients {
            transient.run(memory)?;
        }
        for persistent in &self.persistents {
            persistent.run(memory)?;
        }
        for aggregate in &mut self.aggregates {
            aggregate.run(memory)?;
        }
        debug!(
            transients = self.transients.len(),
            persistents = self.persistents.len(),
            aggregates = self.aggregates.len(),
            "logic tick"
        );
        Ok(())
    }
}
