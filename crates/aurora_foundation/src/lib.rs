//! Core values, bounds, and error types for Aurora.
//!
//! This crate provides:
//! - [`Value`] - The scalar value stored in every relation column
//! - [`Bound`] - A value extended with `Least`/`Greatest` sentinels, used for
//!   solver domains and index seeks
//! - [`Row`] - A tuple of values
//! - [`Error`] - Rich error types with context

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod value;

pub use error::{Error, ErrorContext, ErrorKind, SemanticLimit};
pub use value::{Bound, Row, Value};

/// Result type alias using Aurora's Error type.
pub type Result<T> = std::result::Result<T, Error>;
