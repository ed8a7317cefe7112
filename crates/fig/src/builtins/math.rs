//! The `__fmath_*` builtins, mirroring the common numeric math library.

use crate::{
    builtins::BuiltinFunction,
    exception::{ErrorKind, FigError},
    type_info::TypeRegistry,
    value::{EPSILON, Value},
};

fn numeric(value: &Value, types: &TypeRegistry) -> Result<f64, FigError> {
    value.as_f64().ok_or_else(|| {
        FigError::new(
            ErrorKind::TypeError,
            format!("Math builtins take numeric arguments, got '{}'", value.pretty_type(types)),
        )
    })
}

fn integer(value: &Value, types: &TypeRegistry) -> Result<i64, FigError> {
    match value {
        Value::Int(i) => Ok(*i),
        other => Err(FigError::new(
            ErrorKind::TypeError,
            format!("`__fmath_gcd` takes Int arguments, got '{}'", other.pretty_type(types)),
        )),
    }
}

fn gcd(mut a: i64, mut b: i64) -> i64 {
    a = a.wrapping_abs();
    b = b.wrapping_abs();
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

pub(crate) fn call(builtin: BuiltinFunction, args: &[Value], types: &TypeRegistry) -> Result<Value, FigError> {
    use BuiltinFunction as B;

    if builtin == B::Gcd {
        let a = integer(&args[0], types)?;
        let b = integer(&args[1], types)?;
        return Ok(Value::Int(gcd(a, b)));
    }

    let x = numeric(&args[0], types)?;
    let unary = |result: f64| Ok(Value::Double(result));
    match builtin {
        B::Acos => unary(x.acos()),
        B::Acosh => unary(x.acosh()),
        B::Asin => unary(x.asin()),
        B::Asinh => unary(x.asinh()),
        B::Atan => unary(x.atan()),
        B::Atanh => unary(x.atanh()),
        B::Ceil => unary(x.ceil()),
        B::Cos => unary(x.cos()),
        B::Cosh => unary(x.cosh()),
        B::Exp => unary(x.exp()),
        B::Expm1 => unary(x.exp_m1()),
        B::Fabs => unary(x.abs()),
        B::Floor => unary(x.floor()),
        B::Log => unary(x.ln()),
        B::Log10 => unary(x.log10()),
        B::Log1p => unary(x.ln_1p()),
        B::Log2 => unary(x.log2()),
        B::Sin => unary(x.sin()),
        B::Sinh => unary(x.sinh()),
        B::Sqrt => unary(x.sqrt()),
        B::Tan => unary(x.tan()),
        B::Tanh => unary(x.tanh()),
        B::Trunc => unary(x.trunc()),
        B::Frexp => {
            // (mantissa, exponent) with mantissa in [0.5, 1).
            let (mantissa, exponent) = frexp(x);
            Ok(Value::list_from(vec![Value::Double(mantissa), Value::Int(exponent)]))
        }
        B::Atan2 => {
            let y = numeric(&args[1], types)?;
            Ok(Value::Double(x.atan2(y)))
        }
        B::Fmod => {
            let y = numeric(&args[1], types)?;
            Ok(Value::Double(x % y))
        }
        B::Hypot => {
            let y = numeric(&args[1], types)?;
            Ok(Value::Double(x.hypot(y)))
        }
        B::IsEqual => {
            let y = numeric(&args[1], types)?;
            Ok(Value::Bool((x - y).abs() < EPSILON))
        }
        other => Err(FigError::new(
            ErrorKind::RuntimeError,
            format!("`{other}` is not a math builtin"),
        )),
    }
}

fn frexp(x: f64) -> (f64, i64) {
    if x == 0.0 || !x.is_finite() {
        return (x, 0);
    }
    let exponent = x.abs().log2().floor() as i64 + 1;
    let mantissa = x / (2f64).powi(exponent as i32);
    (mantissa, exponent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frexp_halves() {
        let (m, e) = frexp(8.0);
        assert!((m - 0.5).abs() < 1e-12);
        assert_eq!(e, 4);
        let (m, e) = frexp(0.0);
        assert_eq!(m, 0.0);
        assert_eq!(e, 0);
    }

    #[test]
    fn gcd_of_negatives() {
        assert_eq!(gcd(-12, 18), 6);
        assert_eq!(gcd(0, 5), 5);
    }
}
