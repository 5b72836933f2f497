//! Error types for the Aurora engine.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.
//! Only structural problems are errors; a solver domain that becomes empty is
//! ordinary backtracking and never surfaces here.

use std::fmt;

use thiserror::Error;

/// The main error type for Aurora operations.
#[derive(Debug, Error)]
#[error("{kind}{}", render_context(.context.as_ref()))]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Adds context naming the rule or table the error belongs to,
    /// unless the error already carries context.
    #[must_use]
    pub fn in_source(self, source: impl Into<String>) -> Self {
        if self.context.is_some() {
            self
        } else {
            self.with_context(ErrorContext::new().with_source(source))
        }
    }

    /// Creates a field count mismatch error.
    #[must_use]
    pub fn field_count(table: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::new(ErrorKind::FieldCountMismatch {
            table: table.into(),
            expected,
            actual,
        })
    }

    /// Creates a field name mismatch error.
    #[must_use]
    pub fn field_mismatch(from: &[String], to: &[String]) -> Self {
        Self::new(ErrorKind::FieldMismatch {
            from: from.to_vec(),
            to: to.to_vec(),
        })
    }

    /// Creates a type mismatch error.
    #[must_use]
    pub fn type_mismatch(expected: &'static str, actual: &'static str) -> Self {
        Self::new(ErrorKind::TypeMismatch { expected, actual })
    }

    /// Creates an unknown clause action error.
    #[must_use]
    pub fn unknown_action(action: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownAction(action.into()))
    }

    /// Creates a malformed meta-schema error.
    #[must_use]
    pub fn meta_schema(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MetaSchema(message.into()))
    }

    /// Creates a semantic limit exceeded error.
    #[must_use]
    pub fn limit_exceeded(limit: SemanticLimit) -> Self {
        Self::new(ErrorKind::LimitExceeded(limit))
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal(message.into()))
    }
}

fn render_context(context: Option<&ErrorContext>) -> String {
    context.map(|c| format!(" ({c})")).unwrap_or_default()
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// A tuple's width does not match the table or sink it is written to.
    #[error("field count mismatch in {table}: expected {expected}, got {actual}")]
    FieldCountMismatch {
        /// The table (or sink target) being written.
        table: String,
        /// Number of fields expected.
        expected: usize,
        /// Number of values supplied.
        actual: usize,
    },

    /// A requested field does not exist in the ordering being mapped from.
    #[error("field mismatch: {from:?} cannot supply {to:?}")]
    FieldMismatch {
        /// The field order being mapped from.
        from: Vec<String>,
        /// The field order being mapped to.
        to: Vec<String>,
    },

    /// Table was not found in memory.
    #[error("unknown table: {0}")]
    UnknownTable(String),

    /// Clause action is not one of `primitive`, `when`, `know`, `remember`, `forget`.
    #[error("unsupported clause action: {0}")]
    UnknownAction(String),

    /// Primitive clause names an unsupported primitive.
    #[error("unsupported primitive: {0}")]
    UnknownPrimitive(String),

    /// A name used by a clause or expression is not a variable of the rule.
    #[error("unknown variable: {0}")]
    UnknownVariable(String),

    /// Meta-schema facts are missing or malformed.
    #[error("malformed meta-schema: {0}")]
    MetaSchema(String),

    /// No constraint can split a domain that is not yet a single point.
    #[error("no constraint can split unbound variable {variable}")]
    CannotSplit {
        /// Column of the first variable that is still unbound.
        variable: usize,
    },

    /// Type mismatch while evaluating an expression.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// The expected type name.
        expected: &'static str,
        /// The actual type name encountered.
        actual: &'static str,
    },

    /// Division by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// Integer arithmetic overflowed.
    #[error("integer overflow")]
    Overflow,

    /// Parse error in rule text or an expression.
    #[error("parse error at {line}:{column}: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Line number (1-indexed).
        line: u32,
        /// Column number (1-indexed).
        column: u32,
        /// The source line where the error occurred.
        context: String,
    },

    /// Semantic limit exceeded (kill switch triggered).
    #[error("limit exceeded: {0}")]
    LimitExceeded(SemanticLimit),

    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Semantic limits (kill switches) that can be exceeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemanticLimit {
    /// Maximum solver loop iterations for one enumeration exceeded.
    MaxSearchSteps {
        /// The configured limit.
        limit: u64,
    },
    /// Maximum solutions produced by one flow run exceeded.
    MaxSolutions {
        /// The configured limit.
        limit: usize,
    },
}

impl fmt::Display for SemanticLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxSearchSteps { limit } => write!(f, "max search steps ({limit}) exceeded"),
            Self::MaxSolutions { limit } => write!(f, "max solutions ({limit}) exceeded"),
        }
    }
}

/// Context about where an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Rule or table name.
    pub source: Option<String>,
    /// Line number in rule text.
    pub line: Option<usize>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the source name.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Sets the line.
    #[must_use]
    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.source, self.line) {
            (Some(source), Some(line)) => write!(f, "in {source} at line {line}"),
            (Some(source), None) => write!(f, "in {source}"),
            (None, Some(line)) => write!(f, "at line {line}"),
            (None, None) => Ok(()),
        }
    }
}
