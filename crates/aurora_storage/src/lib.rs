//! Relation storage for Aurora.
//!
//! This crate provides:
//! - [`SortedIndex`] - Persistent sorted multiset with sentinel-padded seeks
//! - [`Table`] - A named relation with its derived sources and sinks
//! - [`Memory`] - The registry of all tables, addressed through handles
//!
//! Sources are always consistent with their table: every `add`, `del`,
//! `update` and `clear` is propagated before the call returns.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod fieldmap;
pub mod index;
pub mod memory;
pub mod table;

pub use fieldmap::{make_fieldmap, make_sparse_fieldmap, remap};
pub use index::{SortedIndex, greatest_key, prefix_ne, to_key, to_row};
pub use memory::{Memory, SinkId, SourceId, TableId};
pub use table::{RowId, Sink, Source, Table};
