//! Constraint solver, dataflow runtime, and rule compiler for Aurora.
//!
//! This crate provides:
//! - [`Solver`] - Generic join by interval propagation and backtracking
//! - [`Constraint`] - The constraints a rule body compiles to
//! - [`Flow`] - One compiled rule: sources, solver, sinks
//! - [`Aggregate`] - Grouped reductions with minimal output diffs
//! - [`Transient`] / [`Persistent`] - Per-tick table bookkeeping
//! - [`Logic`] - Everything compiled from one meta-schema
//! - [`compile`] - The rule compiler

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod aggregate;
pub mod compiler;
pub mod config;
pub mod constraint;
pub mod flow;
pub mod lifetime;
pub mod logic;
pub mod solver;

pub use aggregate::{Aggregate, AggregateFlow, Direction, Reducer};
pub use compiler::compile;
pub use config::EngineConfig;
pub use constraint::Constraint;
pub use flow::Flow;
pub use lifetime::{Persistent, Transient};
pub use logic::{Logic, RunSummary};
pub use solver::{Solver, SolverState};
