//! Parser for the expression language.
//!
//! Precedence climbing over the token stream, producing an [`Expr`].
//! Builtin calls are resolved and arity-checked here, so a parsed tree
//! always compiles.

use aurora_foundation::{Error, ErrorKind, Result, Value};

use crate::ast::{BinaryOp, Builtin, Expr, UnaryOp};
use crate::lexer::Lexer;
use crate::span::Span;
use crate::token::{Token, TokenKind};

/// Parser for expression text.
pub struct Parser<'src> {
    /// The lexer providing tokens.
    lexer: Lexer<'src>,
    /// Current token (lookahead).
    current: Token,
    /// Source text (for error messages).
    source: &'src str,
}

impl<'src> Parser<'src> {
    /// Creates a new parser for the given source.
    #[must_use]
    pub fn new(source: &'src str) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token();
        Self {
            lexer,
            current,
            source,
        }
    }

    /// Parses one complete expression; trailing tokens are an error.
    ///
    /// # Errors
    /// Returns `ParseError` if the source is not a well-formed expression.
    pub fn parse(&mut self) -> Result<Expr> {
        let expr = self.parse_binary(0)?;
        if self.current.kind != TokenKind::Eof {
            return Err(self.error(&format!(
                "unexpected {} after expression",
                self.current.kind.name()
            )));
        }
        Ok(expr)
    }

    /// Parses operators binding tighter than `min_precedence`.
    fn parse_binary(&mut self, min_precedence: u8) -> Result<Expr> {
        let mut lhs = self.parse_unary()?;
        while let Some(op) = binary_op(&self.current.kind) {
            if op.precedence() <= min_precedence {
                break;
            }
            self.advance();
            let rhs = self.parse_binary(op.precedence())?;
            let span = lhs.span().to(rhs.span());
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs), span);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let op = match self.current.kind {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Bang => UnaryOp::Not,
            _ => return self.parse_primary(),
        };
        let start = self.current.span;
        self.advance();
        let operand = self.parse_unary()?;
        let span = start.to(operand.span());
        Ok(Expr::Unary(op, Box::new(operand), span))
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let span = self.current.span;
        let literal = match &self.current.kind {
            TokenKind::True => Value::Bool(true),
            TokenKind::False => Value::Bool(false),
            TokenKind::Int(n) => Value::Int(*n),
            TokenKind::Float(n) => Value::Float(*n),
            TokenKind::String(s) => Value::from(s.as_str()),
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                if self.current.kind == TokenKind::LParen {
                    return self.parse_call(&name, span);
                }
                return Ok(Expr::Var(name, span));
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_binary(0)?;
                self.expect(&TokenKind::RParen)?;
                return Ok(inner);
            }
            TokenKind::Error(msg) => return Err(self.error(msg)),
            kind => return Err(self.error(&format!("unexpected {}", kind.name()))),
        };
        self.advance();
        Ok(Expr::Literal(literal, span))
    }

    /// Parses the argument list of a call to `name`.
    fn parse_call(&mut self, name: &str, start: Span) -> Result<Expr> {
        let builtin = Builtin::from_name(name)
            .ok_or_else(|| self.error_at(start, &format!("unknown function: {name}")))?;
        self.expect(&TokenKind::LParen)?;

        let mut args = Vec::new();
        if self.current.kind != TokenKind::RParen {
            loop {
                args.push(self.parse_binary(0)?);
                if self.current.kind != TokenKind::Comma {
                    break;
                }
                self.advance();
            }
        }
        let end = self.current.span;
        self.expect(&TokenKind::RParen)?;

        if !builtin.accepts(args.len()) {
            return Err(self.error_at(
                start,
                &format!("{name} does not take {} arguments", args.len()),
            ));
        }
        Ok(Expr::Call(builtin, args, start.to(end)))
    }

    /// Advances to the next token.
    fn advance(&mut self) {
        self.current = self.lexer.next_token();
    }

    /// Expects the current token to be of a specific kind, then advances.
    fn expect(&mut self, expected: &TokenKind) -> Result<()> {
        if std::mem::discriminant(&self.current.kind) == std::mem::discriminant(expected) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(&format!(
                "expected {}, found {}",
                expected.name(),
                self.current.kind.name()
            )))
        }
    }

    /// Creates a parse error at the current position.
    fn error(&self, message: &str) -> Error {
        self.error_at(self.current.span, message)
    }

    /// Creates a parse error at a specific span.
    fn error_at(&self, span: Span, message: &str) -> Error {
        Error::new(ErrorKind::ParseError {
            message: message.to_string(),
            line: span.line,
            column: span.column,
            context: self.context_at(span),
        })
    }

    /// Returns the source line containing `span`.
    fn context_at(&self, span: Span) -> String {
        let line_start = self.source[..span.start].rfind('\n').map_or(0, |i| i + 1);
        let line_end = self.source[span.start..]
            .find('\n')
            .map_or(self.source.len(), |i| span.start + i);
        self.source[line_start..line_end].to_string()
    }
}

const fn binary_op(kind: &TokenKind) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::OrOr => BinaryOp::Or,
        TokenKind::AndAnd => BinaryOp::And,
        TokenKind::EqEq => BinaryOp::Eq,
        TokenKind::NotEq => BinaryOp::Ne,
        TokenKind::Lt => BinaryOp::Lt,
        TokenKind::Le => BinaryOp::Le,
        TokenKind::Gt => BinaryOp::Gt,
        TokenKind::Ge => BinaryOp::Ge,
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Rem,
        _ => return None,
    })
}

/// Parses expression text into an AST.
///
/// # Errors
/// Returns `ParseError` if the source is not a well-formed expression.
pub fn parse_expression(source: &str) -> Result<Expr> {
    Parser::new(source).parse()
}
