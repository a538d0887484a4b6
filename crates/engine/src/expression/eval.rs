//! Tree-walking interpreter.

use std::cmp::Ordering;

use super::{ArithOp, CompareOp, Expr, LogicalOp, Value};
use crate::error::EvaluationError;
use crate::facts::FactBindings;

pub(crate) fn evaluate(expr: &Expr, facts: &FactBindings) -> Result<Value, EvaluationError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),

        Expr::FieldRef(path) => facts
            .resolve(path)
            .map(Value::from)
            .ok_or_else(|| EvaluationError::UnresolvedReference(path.to_string())),

        Expr::Not(operand) => match evaluate(operand, facts)? {
            Value::Bool(b) => Ok(Value::Bool(!b)),
            other => Err(EvaluationError::unary_mismatch("!", &other)),
        },

        Expr::Negate(operand) => match evaluate(operand, facts)? {
            Value::Number(n) => Ok(Value::Number(-n)),
            other => Err(EvaluationError::unary_mismatch("-", &other)),
        },

        Expr::Logical { op, left, right } => {
            let lhs = evaluate(left, facts)?;
            let Some(l) = lhs.as_bool() else {
                return Err(EvaluationError::binary_mismatch(op, &lhs, None));
            };
            // Short-circuit: the right side is not evaluated at all.
            match (op, l) {
                (LogicalOp::And, false) => return Ok(Value::Bool(false)),
                (LogicalOp::Or, true) => return Ok(Value::Bool(true)),
                _ => {}
            }
            let rhs = evaluate(right, facts)?;
            rhs.as_bool()
                .map(Value::Bool)
                .ok_or_else(|| EvaluationError::binary_mismatch(op, &lhs, Some(&rhs)))
        }

        Expr::Comparison { op, left, right } => {
            let lhs = evaluate(left, facts)?;
            let rhs = evaluate(right, facts)?;
            compare(*op, &lhs, &rhs).map(Value::Bool)
        }

        Expr::Arithmetic { op, left, right } => {
            let lhs = evaluate(left, facts)?;
            let rhs = evaluate(right, facts)?;
            arithmetic(*op, lhs, rhs)
        }
    }
}

fn compare(op: CompareOp, lhs: &Value, rhs: &Value) -> Result<bool, EvaluationError> {
    if matches!(op, CompareOp::Eq | CompareOp::Ne) {
        let equal = match (lhs, rhs) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Composite(a), Value::Composite(b)) => a == b,
            _ => return Err(EvaluationError::binary_mismatch(&op, lhs, Some(rhs))),
        };
        return Ok(if op == CompareOp::Eq { equal } else { !equal });
    }

    let ordering = match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => return Err(EvaluationError::binary_mismatch(&op, lhs, Some(rhs))),
    };
    // NaN compares false under every ordering operator.
    let Some(ordering) = ordering else {
        return Ok(false);
    };
    Ok(match op {
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Le => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Ge => ordering != Ordering::Less,
        CompareOp::Eq | CompareOp::Ne => unreachable!("equality handled above"),
    })
}

fn arithmetic(op: ArithOp, lhs: Value, rhs: Value) -> Result<Value, EvaluationError> {
    match (op, &lhs, &rhs) {
        (ArithOp::Add, Value::String(a), Value::String(b)) => Ok(Value::String(format!("{a}{b}"))),
        (_, Value::Number(a), Value::Number(b)) => {
            let (a, b) = (*a, *b);
            match op {
                ArithOp::Add => Ok(Value::Number(a + b)),
                ArithOp::Sub => Ok(Value::Number(a - b)),
                ArithOp::Mul => Ok(Value::Number(a * b)),
                ArithOp::Div | ArithOp::Rem if b == 0.0 => Err(EvaluationError::DivisionByZero),
                ArithOp::Div => Ok(Value::Number(a / b)),
                ArithOp::Rem => Ok(Value::Number(a % b)),
            }
        }
        _ => Err(EvaluationError::binary_mismatch(&op, &lhs, Some(&rhs))),
    }
}
