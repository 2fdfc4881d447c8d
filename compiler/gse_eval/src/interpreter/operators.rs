//! Binary operators.
//!
//! Integer arithmetic is checked: overflow and division by zero are
//! errors. Mixing ints and floats promotes to float. `+` also concatenates
//! strings (either side, using display conversion) and arrays.

use std::cmp::Ordering;

use gse_ir::Operator;

use super::Interpreter;
use crate::errors::{
    division_by_zero, integer_overflow, invalid_operands, invariant_violation, EvalError,
};
use crate::value::Value;

impl Interpreter<'_> {
    pub(crate) fn evaluate_binary(
        &mut self,
        op: Operator,
        left: &Value,
        right: &Value,
    ) -> Result<Value, EvalError> {
        match op {
            Operator::Eq => Ok(Value::Bool(self.space.values_equal(left, right))),
            Operator::Ne => Ok(Value::Bool(!self.space.values_equal(left, right))),
            Operator::Lt | Operator::Lte | Operator::Gt | Operator::Gte => {
                compare(op, left, right).map(Value::Bool)
            }
            Operator::Add => self.add(left, right),
            Operator::Sub | Operator::Mult | Operator::Div | Operator::Mod => {
                arithmetic(op, left, right)
            }
            other => invariant_violation(&format!(
                "`{}` is not a binary operator",
                other.as_symbol()
            )),
        }
    }

    fn add(&mut self, left: &Value, right: &Value) -> Result<Value, EvalError> {
        match (left, right) {
            (Value::String(_), _) | (_, Value::String(_)) => {
                let mut joined = self.space.to_display_string(left);
                joined.push_str(&self.space.to_display_string(right));
                Ok(Value::string(joined))
            }
            (Value::Array(a), Value::Array(b)) => {
                let mut items = self.space.array(*a).clone();
                items.extend(self.space.array(*b).iter().cloned());
                Ok(self.space.alloc_array(items))
            }
            _ => arithmetic(Operator::Add, left, right),
        }
    }
}

#[allow(
    clippy::cast_precision_loss,
    reason = "int operands promote to float when mixed with floats"
)]
fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Int(n) => Some(*n as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

fn compare(op: Operator, left: &Value, right: &Value) -> Result<bool, EvalError> {
    let ordering = match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => match (as_float(left), as_float(right)) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => {
                return Err(invalid_operands(
                    op.as_symbol(),
                    left.type_name(),
                    right.type_name(),
                ))
            }
        },
    };
    // NaN compares false against everything.
    let Some(ordering) = ordering else {
        return Ok(false);
    };
    Ok(match op {
        Operator::Lt => ordering == Ordering::Less,
        Operator::Lte => ordering != Ordering::Greater,
        Operator::Gt => ordering == Ordering::Greater,
        Operator::Gte => ordering != Ordering::Less,
        other => invariant_violation(&format!("`{}` is not a comparison", other.as_symbol())),
    })
}

fn arithmetic(op: Operator, left: &Value, right: &Value) -> Result<Value, EvalError> {
    if let (Value::Int(a), Value::Int(b)) = (left, right) {
        return int_arithmetic(op, *a, *b).map(Value::Int);
    }
    let (Some(a), Some(b)) = (as_float(left), as_float(right)) else {
        return Err(invalid_operands(
            op.as_symbol(),
            left.type_name(),
            right.type_name(),
        ));
    };
    let result = match op {
        Operator::Add => a + b,
        Operator::Sub => a - b,
        Operator::Mult => a * b,
        Operator::Div => a / b,
        Operator::Mod => a % b,
        other => invariant_violation(&format!("`{}` is not arithmetic", other.as_symbol())),
    };
    Ok(Value::Float(result))
}

fn int_arithmetic(op: Operator, a: i64, b: i64) -> Result<i64, EvalError> {
    let (result, operation) = match op {
        Operator::Add => (a.checked_add(b), "addition"),
        Operator::Sub => (a.checked_sub(b), "subtraction"),
        Operator::Mult => (a.checked_mul(b), "multiplication"),
        Operator::Div | Operator::Mod if b == 0 => return Err(division_by_zero()),
        Operator::Div => (a.checked_div(b), "division"),
        Operator::Mod => (a.checked_rem(b), "remainder"),
        other => invariant_violation(&format!("`{}` is not arithmetic", other.as_symbol())),
    };
    result.ok_or_else(|| integer_overflow(operation))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests use unwrap to panic on unexpected state")]
mod tests {
    use super::*;
    use crate::errors::EvalErrorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn int_arithmetic_is_checked() {
        assert_eq!(int_arithmetic(Operator::Add, 2, 3).ok(), Some(5));
        assert_eq!(
            int_arithmetic(Operator::Add, i64::MAX, 1).map_err(|e| e.kind),
            Err(EvalErrorKind::IntegerOverflow {
                operation: "addition"
            })
        );
        assert_eq!(
            int_arithmetic(Operator::Mod, 7, 0).map_err(|e| e.kind),
            Err(EvalErrorKind::DivisionByZero)
        );
        assert_eq!(int_arithmetic(Operator::Div, 7, 2).ok(), Some(3));
    }

    #[test]
    fn mixed_arithmetic_promotes_to_float() {
        let v = arithmetic(Operator::Mult, &Value::Int(2), &Value::Float(1.5)).ok();
        assert_eq!(v, Some(Value::Float(3.0)));
    }

    #[test]
    fn comparisons() {
        assert_eq!(compare(Operator::Lt, &Value::Int(1), &Value::Int(2)).ok(), Some(true));
        assert_eq!(compare(Operator::Gte, &Value::Int(2), &Value::Float(2.0)).ok(), Some(true));
        assert_eq!(
            compare(Operator::Lt, &Value::from("a"), &Value::from("b")).ok(),
            Some(true)
        );
        assert_eq!(
            compare(Operator::Lt, &Value::Float(f64::NAN), &Value::Int(0)).ok(),
            Some(false)
        );
        assert!(compare(Operator::Lt, &Value::Bool(true), &Value::Int(0)).is_err());
    }

    #[test]
    fn arithmetic_rejects_non_numbers() {
        let err = arithmetic(Operator::Sub, &Value::Null, &Value::Int(1)).unwrap_err();
        assert_eq!(err.message, "operator `-` cannot be applied to Null and Int");
    }
}
