//! Compiler from expression trees to evaluators.
//!
//! An expression is compiled once, against an explicit ordered parameter
//! list, into a tree of boxed closures. Evaluation takes the argument
//! values positionally and never looks at names again.

use std::fmt;

use aurora_foundation::{Error, ErrorKind, Result, Value};

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::native;
use crate::parser::parse_expression;

/// A compiled evaluator over positional arguments.
pub type Evaluator = Box<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// An expression compiled against a fixed parameter list.
pub struct CompiledExpr {
    params: Vec<String>,
    eval: Evaluator,
}

impl CompiledExpr {
    /// Returns the parameter names, in argument order.
    #[must_use]
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Evaluates the expression.
    ///
    /// `args[i]` is the value of `params()[i]`.
    ///
    /// # Errors
    /// Returns `TypeMismatch`, `DivisionByZero` or `Overflow` when the
    /// arguments do not suit the expression.
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        if args.len() != self.params.len() {
            return Err(Error::internal(format!(
                "expression expects {} arguments, got {}",
                self.params.len(),
                args.len()
            )));
        }
        (self.eval)(args)
    }
}

impl fmt::Debug for CompiledExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledExpr")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Compiles an expression whose variables are drawn from `params`.
///
/// # Errors
/// Returns `UnknownVariable` if the expression references a name that is
/// not in `params`.
pub fn compile_expression(expr: &Expr, params: &[String]) -> Result<CompiledExpr> {
    Ok(CompiledExpr {
        params: params.to_vec(),
        eval: compile_node(expr, params)?,
    })
}

/// Parses and compiles expression text in one step, using the expression's
/// own variables (in first-occurrence order) as parameters.
///
/// # Errors
/// Returns `ParseError` if the text is malformed.
pub fn compile_source(source: &str) -> Result<CompiledExpr> {
    let expr = parse_expression(source)?;
    let params: Vec<String> = expr.variables().into_iter().map(String::from).collect();
    compile_expression(&expr, &params)
}

fn boxed<F>(f: F) -> Evaluator
where
    F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
{
    Box::new(f)
}

fn compile_node(expr: &Expr, params: &[String]) -> Result<Evaluator> {
    match expr {
        Expr::Literal(value, _) => {
            let value = value.clone();
            Ok(boxed(move |_| Ok(value.clone())))
        }
        Expr::Var(name, _) => {
            let ix = params
                .iter()
                .position(|p| p == name)
                .ok_or_else(|| Error::new(ErrorKind::UnknownVariable(name.clone())))?;
            Ok(boxed(move |args| Ok(args[ix].clone())))
        }
        Expr::Unary(op, operand, _) => {
            let operand = compile_node(operand, params)?;
            Ok(match op {
                UnaryOp::Neg => boxed(move |args| native::neg_value(&operand(args)?)),
                UnaryOp::Not => {
                    boxed(move |args| Ok(Value::Bool(!native::truthy(&operand(args)?)?)))
                }
            })
        }
        Expr::Binary(op, lhs, rhs, _) => {
            let lhs = compile_node(lhs, params)?;
            let rhs = compile_node(rhs, params)?;
            Ok(compile_binary(*op, lhs, rhs))
        }
        Expr::Call(builtin, args, _) => {
            let builtin = *builtin;
            let args = args
                .iter()
                .map(|a| compile_node(a, params))
                .collect::<Result<Vec<_>>>()?;
            Ok(boxed(move |values| {
                let evaluated = args
                    .iter()
                    .map(|a| a(values))
                    .collect::<Result<Vec<_>>>()?;
                native::call_builtin(builtin, &evaluated)
            }))
        }
    }
}

fn compile_binary(op: BinaryOp, lhs: Evaluator, rhs: Evaluator) -> Evaluator {
    let apply: fn(&Value, &Value) -> Result<Value> = match op {
        // Logical operators short-circuit
        BinaryOp::And => {
            return boxed(move |args| {
                Ok(Value::Bool(
                    native::truthy(&lhs(args)?)? && native::truthy(&rhs(args)?)?,
                ))
            });
        }
        BinaryOp::Or => {
            return boxed(move |args| {
                Ok(Value::Bool(
                    native::truthy(&lhs(args)?)? || native::truthy(&rhs(args)?)?,
                ))
            });
        }
        BinaryOp::Add => native::add_values,
        BinaryOp::Sub => native::sub_values,
        BinaryOp::Mul => native::mul_values,
        BinaryOp::Div => native::div_values,
        BinaryOp::Rem => native::rem_values,
        BinaryOp::Eq => |a, b| Ok(Value::Bool(native::values_equal(a, b))),
        BinaryOp::Ne => |a, b| Ok(Value::Bool(!native::values_equal(a, b))),
        BinaryOp::Lt => |a, b| Ok(Value::Bool(native::compare_values(a, b)?.is_lt())),
        BinaryOp::Le => |a, b| Ok(Value::Bool(native::compare_values(a, b)?.is_le())),
        BinaryOp::Gt => |a, b| Ok(Value::Bool(native::compare_values(a, b)?.is_gt())),
        BinaryOp::Ge => |a, b| Ok(Value::Bool(native::compare_values(a, b)?.is_ge())),
    };
    boxed(move |args| apply(&lhs(args)?, &rhs(args)?))
}
