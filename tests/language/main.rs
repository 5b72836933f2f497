//! Integration tests for Layer 2: Language
//!
//! Tests for the expression lexer, parser, compiler, and the rule language.

mod parser;
mod programs;
