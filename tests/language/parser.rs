//! Integration tests for the expression parser
//!
//! Tests tree shape, precedence, and error reporting.

use aurora_foundation::{ErrorKind, Value};
use aurora_language::{BinaryOp, Builtin, Expr, UnaryOp, parse_expression};

fn shape(expr: &Expr) -> String {
    match expr {
        Expr::Literal(v, _) => v.to_string(),
        Expr::Var(name, _) => name.clone(),
        Expr::Unary(op, operand, _) => format!("({op:?} {})", shape(operand)),
        Expr::Binary(op, lhs, rhs, _) => format!("({op:?} {} {})", shape(lhs), shape(rhs)),
        Expr::Call(builtin, args, _) => {
            let args: Vec<String> = args.iter().map(shape).collect();
            format!("({} {})", builtin.name(), args.join(" "))
        }
    }
}

fn parsed(source: &str) -> String {
    shape(&parse_expression(source).unwrap())
}

// =============================================================================
// Structure
// =============================================================================

#[test]
fn literals_and_variables() {
    assert!(matches!(
        parse_expression("42").unwrap(),
        Expr::Literal(Value::Int(42), _)
    ));
    assert!(matches!(parse_expression("x").unwrap(), Expr::Var(ref n, _) if n == "x"));
}

#[test]
fn multiplication_binds_tighter() {
    assert_eq!(parsed("a + b * c"), "(Add a (Mul b c))");
    assert_eq!(parsed("(a + b) * c"), "(Mul (Add a b) c)");
}

#[test]
fn operators_are_left_associative() {
    assert_eq!(parsed("a - b - c"), "(Sub (Sub a b) c)");
}

#[test]
fn logic_binds_loosest() {
    assert_eq!(
        parsed("a < 1 || b == 2 && c"),
        "(Or (Lt a 1) (And (Eq b 2) c))"
    );
}

#[test]
fn unary_operators() {
    assert_eq!(parsed("-x * 2"), "(Mul (Neg x) 2)");
    assert_eq!(parsed("!!done"), "(Not (Not done))");
    let Expr::Unary(op, ..) = parse_expression("-1").unwrap() else {
        panic!("expected a unary node");
    };
    assert_eq!(op, UnaryOp::Neg);
}

#[test]
fn calls() {
    assert_eq!(parsed("max(a, b + 1, 3)"), "(max a (Add b 1) 3)");
    assert!(matches!(
        parse_expression("abs(x)").unwrap(),
        Expr::Call(Builtin::Abs, ref args, _) if args.len() == 1
    ));
}

#[test]
fn variables_in_first_occurrence_order() {
    let expr = parse_expression("b + a * b - c").unwrap();
    assert_eq!(expr.variables(), vec!["b", "a", "c"]);
}

#[test]
fn precedence_table() {
    assert!(BinaryOp::Mul.precedence() > BinaryOp::Add.precedence());
    assert!(BinaryOp::Add.precedence() > BinaryOp::Lt.precedence());
    assert!(BinaryOp::And.precedence() > BinaryOp::Or.precedence());
}

// =============================================================================
// Errors
// =============================================================================

fn parse_error(source: &str) -> (String, u32) {
    match parse_expression(source).unwrap_err().kind {
        ErrorKind::ParseError {
            message, column, ..
        } => (message, column),
        other => panic!("expected a parse error, got {other:?}"),
    }
}

#[test]
fn trailing_operator() {
    let (message, _) = parse_error("1 +");
    assert!(message.contains("end of input"), "{message}");
}

#[test]
fn unbalanced_parens() {
    parse_error("(a + b");
    parse_error("a + b)");
}

#[test]
fn unknown_function() {
    let (message, column) = parse_error("1 + nope(2)");
    assert!(message.contains("unknown function: nope"));
    assert_eq!(column, 5);
}

#[test]
fn wrong_arity() {
    let (message, _) = parse_error("abs(1, 2)");
    assert!(message.contains("abs does not take 2 arguments"));
    parse_error("min()");
}

#[test]
fn empty_expression() {
    parse_error("");
}
