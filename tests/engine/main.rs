//! Integration tests for Layer 3: Engine
//!
//! Tests for the solver, flows, aggregates, and table lifetimes.

mod aggregates;
mod joins;
