//! Aurora - Embeddable incremental relational query engine
//!
//! This crate re-exports all layers of the Aurora system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 3: aurora_engine     - Solver, constraints, flows, aggregates, rule compiler
//! Layer 2: aurora_language   - Expression language, meta-schema, rule-language parser
//! Layer 1: aurora_storage    - Sorted indexes, tables, sources, sinks
//! Layer 0: aurora_foundation - Core types (Value, Bound, Error)
//! ```
//!
//! # Example
//!
//! ```
//! use aurora::engine::{EngineConfig, compile};
//! use aurora::foundation::Value;
//! use aurora::language::parse_program;
//! use aurora::storage::Memory;
//!
//! let mut memory = Memory::new();
//! parse_program(
//!     &mut memory,
//!     "table persistent edge x y
//!      table transient connected x y
//!      rule simple-edge xx yy
//!      when edge x=xx y=yy
//!      know connected x=xx y=yy",
//! )?;
//! let mut logic = compile(&mut memory, &EngineConfig::default())?;
//!
//! memory.add("edge", &[vec![Value::from("a"), Value::from("b")]])?;
//! logic.run(&mut memory)?;
//! logic.tick(&mut memory)?;
//! assert_eq!(memory.table("connected").map(|t| t.len()), Some(1));
//! # Ok::<(), aurora::foundation::Error>(())
//! ```

pub use aurora_engine as engine;
pub use aurora_foundation as foundation;
pub use aurora_language as language;
pub use aurora_storage as storage;
