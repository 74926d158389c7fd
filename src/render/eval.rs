//! Expression evaluation.

use crate::render::ExecutionContext;
use crate::types::ast::{BinaryOp, Expr, ExprKind, UnaryOp};
use crate::types::span::Position;
use crate::value::CallError;
use crate::{Error, Result, Value};

impl Expr {
    /// Evaluates the expression against the execution context.
    pub fn evaluate(&self, ctx: &mut ExecutionContext<'_>) -> Result<Value> {
        match &self.kind {
            ExprKind::Literal(value) => Ok(value.clone()),

            ExprKind::Var(name) => Ok(ctx.get(name).cloned().unwrap_or(Value::None)),

            ExprKind::Attr(expr, name) => expr
                .evaluate(ctx)?
                .try_attr(name)
                .map_err(|err| call_error(err, name, &self.pos)),

            ExprKind::Item(expr, key) => {
                let value = expr.evaluate(ctx)?;
                let key = key.evaluate(ctx)?;
                Ok(value.index(&key))
            }

            ExprKind::Call(callee, args) => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(arg.evaluate(ctx)?);
                }
                call(ctx, callee, &values)
            }

            ExprKind::Filter(expr, call) => {
                let input = expr.evaluate(ctx)?;
                ctx.apply_filter(call, input)
            }

            ExprKind::Unary(op, expr) => {
                let value = expr.evaluate(ctx)?;
                Ok(unary(*op, value))
            }

            ExprKind::Binary(BinaryOp::And, lhs, rhs) => {
                let ok = lhs.evaluate(ctx)?.is_true() && rhs.evaluate(ctx)?.is_true();
                Ok(Value::Bool(ok))
            }

            ExprKind::Binary(BinaryOp::Or, lhs, rhs) => {
                let ok = lhs.evaluate(ctx)?.is_true() || rhs.evaluate(ctx)?.is_true();
                Ok(Value::Bool(ok))
            }

            ExprKind::Binary(op, lhs, rhs) => {
                let lhs = lhs.evaluate(ctx)?;
                let rhs = rhs.evaluate(ctx)?;
                binary(*op, lhs, rhs, &self.pos)
            }

            ExprKind::Cond {
                then,
                cond,
                otherwise,
            } => {
                if cond.evaluate(ctx)?.is_true() {
                    then.evaluate(ctx)
                } else if let Some(otherwise) = otherwise {
                    otherwise.evaluate(ctx)
                } else {
                    Ok(Value::None)
                }
            }

            ExprKind::BlockSuper => ctx.render_super(&self.pos),
        }
    }
}

/// Calls a host function, or a method when the callee is an attribute of an
/// object.
fn call(ctx: &mut ExecutionContext<'_>, callee: &Expr, args: &[Value]) -> Result<Value> {
    let (name, target) = match &callee.kind {
        ExprKind::Attr(expr, method) => {
            let receiver = expr.evaluate(ctx)?;
            if let Value::Object(object) = &receiver {
                if let Some(result) = object.call_method(method, args) {
                    return result.map_err(|err| call_error(err, method, &callee.pos));
                }
            }
            (method.as_str(), receiver.attr(method))
        }
        ExprKind::Var(name) => (name.as_str(), callee.evaluate(ctx)?),
        _ => ("<expression>", callee.evaluate(ctx)?),
    };

    match target {
        Value::Function(function) => function
            .call(args)
            .map_err(|err| call_error(err, name, &callee.pos)),
        value => {
            let msg = format!("'{name}' is not callable (found {})", value.human());
            Err(Error::execution(msg, &callee.pos))
        }
    }
}

fn call_error(err: CallError, name: &str, pos: &Position) -> Error {
    match err {
        CallError::ArgType {
            index,
            expected,
            got,
        } => {
            let msg = format!(
                "function input argument {index} of '{name}' must be of type {expected} (not {got})"
            );
            Error::execution(msg, pos)
        }
        err @ CallError::Arity { .. } => Error::execution(format!("function '{name}' {err}"), pos),
        CallError::Host(source) => Error::execution(source.to_string(), pos).with_boxed_source(source),
    }
}

fn unary(op: UnaryOp, value: Value) -> Value {
    match op {
        UnaryOp::Not => Value::Bool(!value.is_true()),
        UnaryOp::Pos => number(&value),
        UnaryOp::Neg => match number(&value) {
            Value::Integer(i) => i
                .checked_neg()
                .map(Value::Integer)
                .unwrap_or(Value::Float(-(i as f64))),
            Value::Float(f) => Value::Float(-f),
            _ => Value::Integer(0),
        },
    }
}

fn binary(op: BinaryOp, lhs: Value, rhs: Value, pos: &Position) -> Result<Value> {
    use std::cmp::Ordering::*;

    let value = match op {
        BinaryOp::Eq => Value::Bool(lhs == rhs),
        BinaryOp::Ne => Value::Bool(lhs != rhs),
        BinaryOp::Lt => Value::Bool(lhs.compare(&rhs) == Some(Less)),
        BinaryOp::Le => Value::Bool(matches!(lhs.compare(&rhs), Some(Less | Equal))),
        BinaryOp::Gt => Value::Bool(lhs.compare(&rhs) == Some(Greater)),
        BinaryOp::Ge => Value::Bool(matches!(lhs.compare(&rhs), Some(Greater | Equal))),
        BinaryOp::In => Value::Bool(rhs.contains(&lhs)),
        BinaryOp::NotIn => Value::Bool(!rhs.contains(&lhs)),
        BinaryOp::Add => add(lhs, rhs),
        BinaryOp::Sub => arithmetic(lhs, rhs, i64::checked_sub, |a, b| a - b),
        BinaryOp::Mul => arithmetic(lhs, rhs, i64::checked_mul, |a, b| a * b),
        BinaryOp::Div => {
            if is_zero_integer(&lhs, &rhs) {
                return Err(Error::execution("division by zero", pos));
            }
            arithmetic(lhs, rhs, i64::checked_div, |a, b| a / b)
        }
        BinaryOp::Rem => {
            if is_zero_integer(&lhs, &rhs) {
                return Err(Error::execution("division by zero", pos));
            }
            arithmetic(lhs, rhs, |a, b| Some(a.wrapping_rem(b)), |a, b| a % b)
        }
        BinaryOp::And => Value::Bool(lhs.is_true() && rhs.is_true()),
        BinaryOp::Or => Value::Bool(lhs.is_true() || rhs.is_true()),
    };
    Ok(value)
}

/// `+` concatenates strings and lists and adds anything else.
fn add(lhs: Value, rhs: Value) -> Value {
    match (lhs, rhs) {
        (Value::Safe(a), Value::Safe(b)) => Value::Safe(a + &b),
        (Value::String(a) | Value::Safe(a), Value::String(b) | Value::Safe(b)) => {
            Value::String(a + &b)
        }
        (Value::List(mut a), Value::List(b)) => {
            a.extend(b);
            Value::List(a)
        }
        (lhs @ (Value::String(_) | Value::Safe(_)), rhs)
        | (lhs, rhs @ (Value::String(_) | Value::Safe(_))) => {
            Value::String(format!("{lhs}{rhs}"))
        }
        (lhs, rhs) => arithmetic(lhs, rhs, i64::checked_add, |a, b| a + b),
    }
}

/// Applies a numeric operator. Integers stay integers unless the operation
/// overflows, in which case the result is a float.
fn arithmetic(
    lhs: Value,
    rhs: Value,
    int: impl Fn(i64, i64) -> Option<i64>,
    float: impl Fn(f64, f64) -> f64,
) -> Value {
    match (number(&lhs), number(&rhs)) {
        (Value::Integer(a), Value::Integer(b)) => int(a, b)
            .map(Value::Integer)
            .unwrap_or_else(|| Value::Float(float(a as f64, b as f64))),
        (a, b) => Value::Float(float(a.to_float(), b.to_float())),
    }
}

/// Coerces a value into an integer or a float.
fn number(value: &Value) -> Value {
    match value {
        Value::Integer(_) | Value::Float(_) => value.clone(),
        Value::String(s) | Value::Safe(s) if s.contains('.') => Value::Float(value.to_float()),
        _ => Value::Integer(value.to_integer()),
    }
}

fn is_zero_integer(lhs: &Value, rhs: &Value) -> bool {
    matches!((number(lhs), number(rhs)), (Value::Integer(_), Value::Integer(0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos() -> Position {
        use std::sync::Arc;

        use crate::types::span::{Origin, Span};

        let origin = Arc::new(Origin::new("<string>", "x", false));
        Position::new(&origin, Span::from(0..1))
    }

    #[test]
    fn arithmetic_keeps_integers() {
        let v = binary(BinaryOp::Add, Value::Integer(2), Value::Integer(3), &pos()).unwrap();
        assert_eq!(v, Value::Integer(5));
        let v = binary(BinaryOp::Div, Value::Integer(7), Value::Integer(2), &pos()).unwrap();
        assert_eq!(v, Value::Integer(3));
        let v = binary(BinaryOp::Div, Value::Float(7.0), Value::Integer(2), &pos()).unwrap();
        assert_eq!(v, Value::Float(3.5));
        let v = binary(BinaryOp::Mul, Value::Integer(i64::MAX), Value::Integer(2), &pos()).unwrap();
        assert!(matches!(v, Value::Float(_)));
    }

    #[test]
    fn add_concatenates() {
        let v = add(Value::from("a"), Value::from("b"));
        assert_eq!(v, Value::from("ab"));
        let v = add(Value::from("n"), Value::Integer(1));
        assert_eq!(v, Value::from("n1"));
        let v = add(Value::from(vec![1]), Value::from(vec![2]));
        assert_eq!(v, Value::from(vec![1, 2]));
        assert!(add(Value::safe("<b>"), Value::safe("</b>")).is_safe());
    }

    #[test]
    fn division_by_zero() {
        let err = binary(BinaryOp::Rem, Value::Integer(1), Value::Integer(0), &pos()).unwrap_err();
        assert_eq!(err.message(), "division by zero");
    }

    #[test]
    fn comparisons_across_kinds() {
        let v = binary(BinaryOp::Lt, Value::Integer(1), Value::Float(1.5), &pos()).unwrap();
        assert_eq!(v, Value::Bool(true));
        let v = binary(BinaryOp::Lt, Value::Integer(1), Value::from("2"), &pos()).unwrap();
        assert_eq!(v, Value::Bool(false));
        let v = binary(BinaryOp::Ge, Value::from("b"), Value::from("a"), &pos()).unwrap();
        assert_eq!(v, Value::Bool(true));
    }
}
