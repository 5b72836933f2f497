//! Abstract syntax tree of the expression language.
//!
//! Expressions appear in `=function` and `filter` clauses. They are parsed
//! once, at rule-compile time, and the free variables are read off the tree.

use aurora_foundation::Value;

use crate::span::Span;

/// Unary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `!x`
    Not,
}

/// Binary operators, loosest binding first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    /// `||`
    Or,
    /// `&&`
    And,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
}

impl BinaryOp {
    /// Returns the binding power; higher binds tighter.
    #[must_use]
    pub const fn precedence(self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Eq | Self::Ne => 3,
            Self::Lt | Self::Le | Self::Gt | Self::Ge => 4,
            Self::Add | Self::Sub => 5,
            Self::Mul | Self::Div | Self::Rem => 6,
        }
    }
}

/// Built-in functions callable from expressions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Builtin {
    /// `abs(n)`
    Abs,
    /// `min(a, b, ...)`
    Min,
    /// `max(a, b, ...)`
    Max,
    /// `floor(n)`
    Floor,
    /// `ceil(n)`
    Ceil,
    /// `len(s)`
    Len,
    /// `str(v)`
    Str,
}

impl Builtin {
    /// Looks up a builtin by name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "abs" => Some(Self::Abs),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "floor" => Some(Self::Floor),
            "ceil" => Some(Self::Ceil),
            "len" => Some(Self::Len),
            "str" => Some(Self::Str),
            _ => None,
        }
    }

    /// Returns the name used to call this builtin.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Abs => "abs",
            Self::Min => "min",
            Self::Max => "max",
            Self::Floor => "floor",
            Self::Ceil => "ceil",
            Self::Len => "len",
            Self::Str => "str",
        }
    }

    /// Returns true if `count` arguments are acceptable.
    #[must_use]
    pub const fn accepts(self, count: usize) -> bool {
        match self {
            Self::Min | Self::Max => count >= 1,
            _ => count == 1,
        }
    }
}

/// An expression node.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Literal value
    Literal(Value, Span),
    /// Variable reference
    Var(String, Span),
    /// Unary operation
    Unary(UnaryOp, Box<Expr>, Span),
    /// Binary operation
    Binary(BinaryOp, Box<Expr>, Box<Expr>, Span),
    /// Builtin call
    Call(Builtin, Vec<Expr>, Span),
}

impl Expr {
    /// Returns the source span of this node.
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Literal(_, s)
            | Self::Var(_, s)
            | Self::Unary(_, _, s)
            | Self::Binary(_, _, _, s)
            | Self::Call(_, _, s) => *s,
        }
    }

    /// Returns every variable referenced, in first-occurrence order,
    /// without duplicates.
    #[must_use]
    pub fn variables(&self) -> Vec<&str> {
        let mut found = Vec::new();
        self.collect_variables(&mut found);
        found
    }

    fn collect_variables<'a>(&'a self, found: &mut Vec<&'a str>) {
        match self {
            Self::Literal(..) => {}
            Self::Var(name, _) => {
                if !found.contains(&name.as_str()) {
                    found.push(name);
                }
            }
            Self::Unary(_, operand, _) => operand.collect_variables(found),
            Self::Binary(_, lhs, rhs, _) => {
                lhs.collect_variables(found);
                rhs.collect_variables(found);
            }
            Self::Call(_, args, _) => {
                for arg in args {
                    arg.collect_variables(found);
                }
            }
        }
    }
}
