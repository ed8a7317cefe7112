//! Native operator semantics.
//!
//! Overload dispatch happens before any of these run; by the time a function
//! in this module is called, both operands are plain (non-overloaded)
//! values. `Int` arithmetic wraps on overflow (two's complement); division
//! of two `Int`s stays `Int` only when exact; `%` on two `Int`s is floor
//! modulo (result takes the sign of the divisor).

use crate::{
    ast::Operator,
    exception::{ErrorKind, FigError},
    type_info::TypeRegistry,
    value::Value,
};

fn unsupported(op: Operator, lhs: &Value, rhs: &Value, types: &TypeRegistry) -> FigError {
    FigError::new(
        ErrorKind::TypeError,
        format!(
            "Unsupported operation: {} '{}' {}",
            lhs.pretty_type(types),
            op.symbol(),
            rhs.pretty_type(types)
        ),
    )
}

/// Exponentiation by squaring with wrapping multiplication.
fn wrapping_ipow(base: i64, exp: u64) -> i64 {
    let mut result: i64 = 1;
    let mut base = base;
    let mut exp = exp;
    while exp > 0 {
        if exp & 1 == 1 {
            result = result.wrapping_mul(base);
        }
        base = base.wrapping_mul(base);
        exp >>= 1;
    }
    result
}

pub(crate) fn binary_native(
    op: Operator,
    lhs: &Value,
    rhs: &Value,
    types: &TypeRegistry,
) -> Result<Value, FigError> {
    match op {
        Operator::Add => add(lhs, rhs, types),
        Operator::Sub => arithmetic(op, lhs, rhs, types, i64::wrapping_sub, |l, r| l - r),
        Operator::Mul => mul(lhs, rhs, types),
        Operator::Div => div(lhs, rhs, types),
        Operator::Mod => modulo(lhs, rhs, types),
        Operator::Pow => pow(lhs, rhs, types),
        Operator::And | Operator::Or => logic(op, lhs, rhs, types),
        Operator::Eq => Ok(Value::Bool(lhs.eq_value(rhs))),
        Operator::NotEq => Ok(Value::Bool(!lhs.eq_value(rhs))),
        Operator::Less | Operator::LessEq | Operator::Greater | Operator::GreaterEq => {
            compare(op, lhs, rhs, types)
        }
        Operator::BitAnd => bitwise(op, lhs, rhs, types, |l, r| l & r),
        Operator::BitOr => bitwise(op, lhs, rhs, types, |l, r| l | r),
        Operator::BitXor => bitwise(op, lhs, rhs, types, |l, r| l ^ r),
        Operator::Shl => bitwise(op, lhs, rhs, types, |l, r| l.wrapping_shl(r as u32)),
        Operator::Shr => bitwise(op, lhs, rhs, types, |l, r| l.wrapping_shr(r as u32)),
        _ => Err(FigError::new(
            ErrorKind::UnsupportedOpError,
            format!("Unsupported binary operator '{}'", op.symbol()),
        )),
    }
}

pub(crate) fn unary_native(op: Operator, value: &Value, types: &TypeRegistry) -> Result<Value, FigError> {
    match (op, value) {
        (Operator::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (Operator::Not, other) => Err(FigError::new(
            ErrorKind::TypeError,
            format!("Logical NOT requires Bool, got '{}'", other.pretty_type(types)),
        )),
        (Operator::Sub, Value::Int(i)) => Ok(Value::Int(i.wrapping_neg())),
        (Operator::Sub, Value::Double(d)) => Ok(Value::Double(-d)),
        (Operator::Sub, other) => Err(FigError::new(
            ErrorKind::TypeError,
            format!("Unary minus requires Int or Double, got '{}'", other.pretty_type(types)),
        )),
        (Operator::BitNot, Value::Int(i)) => Ok(Value::Int(!i)),
        (Operator::BitNot, other) => Err(FigError::new(
            ErrorKind::TypeError,
            format!("Bitwise NOT requires Int, got '{}'", other.pretty_type(types)),
        )),
        (op, _) => Err(FigError::new(
            ErrorKind::UnsupportedOpError,
            format!("Unsupported unary operator '{}'", op.symbol()),
        )),
    }
}

fn add(lhs: &Value, rhs: &Value, types: &TypeRegistry) -> Result<Value, FigError> {
    match (lhs, rhs) {
        (Value::Int(l), Value::Int(r)) => Ok(Value::Int(l.wrapping_add(*r))),
        (Value::Str(l), Value::Str(r)) => {
            let joined = l.borrow().concat(&r.borrow());
            Ok(Value::str_value(joined))
        }
        _ => match (lhs.as_f64(), rhs.as_f64()) {
            (Some(l), Some(r)) => Ok(Value::Double(l + r)),
            _ => Err(unsupported(Operator::Add, lhs, rhs, types)),
        },
    }
}

fn arithmetic(
    op: Operator,
    lhs: &Value,
    rhs: &Value,
    types: &TypeRegistry,
    int_op: fn(i64, i64) -> i64,
    double_op: fn(f64, f64) -> f64,
) -> Result<Value, FigError> {
    match (lhs, rhs) {
        (Value::Int(l), Value::Int(r)) => Ok(Value::Int(int_op(*l, *r))),
        _ => match (lhs.as_f64(), rhs.as_f64()) {
            (Some(l), Some(r)) => Ok(Value::Double(double_op(l, r))),
            _ => Err(unsupported(op, lhs, rhs, types)),
        },
    }
}

fn mul(lhs: &Value, rhs: &Value, types: &TypeRegistry) -> Result<Value, FigError> {
    if let (Value::Str(s), Value::Int(count)) = (lhs, rhs) {
        let repeated = s.borrow().repeat(*count);
        return Ok(Value::str_value(repeated));
    }
    arithmetic(Operator::Mul, lhs, rhs, types, i64::wrapping_mul, |l, r| l * r)
}

fn div(lhs: &Value, rhs: &Value, types: &TypeRegistry) -> Result<Value, FigError> {
    let (Some(l), Some(r)) = (lhs.as_f64(), rhs.as_f64()) else {
        return Err(unsupported(Operator::Div, lhs, rhs, types));
    };
    if r == 0.0 {
        return Err(FigError::new(
            ErrorKind::ValueError,
            format!("Division by zero: {} / {}", lhs.display(), rhs.display()),
        ));
    }
    // Division never truncates: Int / Int stays Int only when exact.
    if let (Value::Int(li), Value::Int(ri)) = (lhs, rhs)
        && li.wrapping_rem(*ri) == 0
    {
        return Ok(Value::Int(li.wrapping_div(*ri)));
    }
    Ok(Value::Double(l / r))
}

fn modulo(lhs: &Value, rhs: &Value, types: &TypeRegistry) -> Result<Value, FigError> {
    match (lhs, rhs) {
        (Value::Int(l), Value::Int(r)) => {
            if *r == 0 {
                return Err(FigError::new(
                    ErrorKind::ValueError,
                    format!("Modulo by zero: {l} % {r}"),
                ));
            }
            // Floor modulo: the result takes the sign of the divisor.
            let rem = l.wrapping_rem(*r);
            let rem = if rem != 0 && (rem < 0) != (*r < 0) { rem.wrapping_add(*r) } else { rem };
            Ok(Value::Int(rem))
        }
        _ => match (lhs.as_f64(), rhs.as_f64()) {
            (Some(l), Some(r)) => {
                if r == 0.0 {
                    return Err(FigError::new(
                        ErrorKind::ValueError,
                        format!("Modulo by zero: {} % {}", lhs.display(), rhs.display()),
                    ));
                }
                Ok(Value::Double(l % r))
            }
            _ => Err(unsupported(Operator::Mod, lhs, rhs, types)),
        },
    }
}

fn pow(lhs: &Value, rhs: &Value, types: &TypeRegistry) -> Result<Value, FigError> {
    match (lhs, rhs) {
        (Value::Int(base), Value::Int(exp)) => {
            if *exp >= 0 {
                Ok(Value::Int(wrapping_ipow(*base, *exp as u64)))
            } else {
                Ok(Value::Double((*base as f64).powf(*exp as f64)))
            }
        }
        _ => match (lhs.as_f64(), rhs.as_f64()) {
            (Some(l), Some(r)) => Ok(Value::Double(l.powf(r))),
            _ => Err(unsupported(Operator::Pow, lhs, rhs, types)),
        },
    }
}

fn logic(op: Operator, lhs: &Value, rhs: &Value, types: &TypeRegistry) -> Result<Value, FigError> {
    match (lhs, rhs) {
        (Value::Bool(l), Value::Bool(r)) => Ok(Value::Bool(match op {
            Operator::And => *l && *r,
            _ => *l || *r,
        })),
        _ => Err(FigError::new(
            ErrorKind::TypeError,
            format!(
                "Logical '{}' requires Bool operands, got '{}' and '{}'",
                op.symbol(),
                lhs.pretty_type(types),
                rhs.pretty_type(types)
            ),
        )),
    }
}

fn compare(op: Operator, lhs: &Value, rhs: &Value, types: &TypeRegistry) -> Result<Value, FigError> {
    let less = match (lhs, rhs) {
        (Value::Str(l), Value::Str(r)) => match op {
            Operator::Less | Operator::LessEq => *l.borrow() < *r.borrow(),
            _ => *l.borrow() > *r.borrow(),
        },
        _ => match (lhs.as_f64(), rhs.as_f64()) {
            (Some(l), Some(r)) => match op {
                Operator::Less | Operator::LessEq => l < r,
                _ => l > r,
            },
            _ => return Err(unsupported(op, lhs, rhs, types)),
        },
    };
    // `<=` / `>=` admit epsilon equality, like `==`.
    let result = match op {
        Operator::Less | Operator::Greater => less && !lhs.eq_value(rhs),
        _ => less || lhs.eq_value(rhs),
    };
    Ok(Value::Bool(result))
}

fn bitwise(
    op: Operator,
    lhs: &Value,
    rhs: &Value,
    types: &TypeRegistry,
    apply: fn(i64, i64) -> i64,
) -> Result<Value, FigError> {
    match (lhs, rhs) {
        (Value::Int(l), Value::Int(r)) => Ok(Value::Int(apply(*l, *r))),
        _ => Err(FigError::new(
            ErrorKind::TypeError,
            format!(
                "Bitwise '{}' requires Int operands, got '{}' and '{}'",
                op.symbol(),
                lhs.pretty_type(types),
                rhs.pretty_type(types)
            ),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::nearly_equal;

    fn types() -> TypeRegistry {
        TypeRegistry::new()
    }

    fn int_op(op: Operator, l: i64, r: i64) -> Value {
        binary_native(op, &Value::Int(l), &Value::Int(r), &types()).expect("op succeeds")
    }

    #[test]
    fn floor_modulo_takes_divisor_sign() {
        assert!(int_op(Operator::Mod, -7, 3).eq_value(&Value::Int(2)));
        assert!(int_op(Operator::Mod, 7, -3).eq_value(&Value::Int(-2)));
        assert!(int_op(Operator::Mod, -7, -3).eq_value(&Value::Int(-1)));
        assert!(int_op(Operator::Mod, 7, 3).eq_value(&Value::Int(1)));
    }

    #[test]
    fn exact_division_stays_int() {
        assert!(matches!(int_op(Operator::Div, 6, 3), Value::Int(2)));
        assert!(matches!(int_op(Operator::Div, 7, 2), Value::Double(_)));
    }

    #[test]
    fn division_by_zero_is_value_error() {
        let err = binary_native(Operator::Div, &Value::Int(1), &Value::Int(0), &types()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValueError);
        let err = binary_native(Operator::Mod, &Value::Int(1), &Value::Int(0), &types()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValueError);
    }

    #[test]
    fn int_overflow_wraps() {
        assert!(matches!(int_op(Operator::Add, i64::MAX, 1), Value::Int(i64::MIN)));
        assert!(matches!(int_op(Operator::Mul, i64::MAX, 2), Value::Int(-2)));
    }

    #[test]
    fn integer_power() {
        assert!(matches!(int_op(Operator::Pow, 2, 10), Value::Int(1024)));
        assert!(matches!(int_op(Operator::Pow, 2, -1), Value::Double(_)));
    }

    #[test]
    fn string_concat_and_repeat() {
        let out = binary_native(Operator::Add, &Value::str_from("fi"), &Value::str_from("g"), &types()).unwrap();
        assert_eq!(out.display_plain(), "fig");
        let out = binary_native(Operator::Mul, &Value::str_from("ab"), &Value::Int(-1), &types()).unwrap();
        assert_eq!(out.display_plain(), "");
    }

    #[test]
    fn mixed_comparison_is_type_error() {
        let err = binary_native(Operator::Less, &Value::Int(1), &Value::str_from("a"), &types()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeError);
    }

    #[test]
    fn widening_arithmetic() {
        let out = binary_native(Operator::Add, &Value::Int(1), &Value::Double(0.5), &types()).unwrap();
        assert!(matches!(out, Value::Double(d) if nearly_equal(d, 1.5)));
    }
}
