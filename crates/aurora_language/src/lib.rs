//! Expression language, meta-schema and rule-language front end for Aurora.
//!
//! This crate provides:
//! - [`Lexer`] / [`Parser`] - Expression text to [`Expr`]
//! - [`compile_expression`] - [`Expr`] to a positional [`CompiledExpr`]
//! - [`meta`] - The meta-schema tables the rule compiler reads
//! - [`parse_program`] - The compact rule language, written as meta facts

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod ast;
pub mod compiler;
pub mod lexer;
pub mod meta;
mod native;
pub mod parser;
pub mod span;
pub mod syntax;
pub mod token;

pub use ast::{BinaryOp, Builtin, Expr, UnaryOp};
pub use compiler::{CompiledExpr, Evaluator, compile_expression, compile_source};
pub use lexer::Lexer;
pub use meta::Lifetime;
pub use parser::{Parser, parse_expression};
pub use span::Span;
pub use syntax::{ProgramSummary, parse_program};
pub use token::{Token, TokenKind};
