//! The `__fvalue_*` builtins: type queries and scalar conversions.

use crate::{
    builtins::BuiltinFunction,
    exception::{ErrorKind, FigError},
    type_info::TypeRegistry,
    value::Value,
};

pub(crate) fn call(builtin: BuiltinFunction, args: &[Value], types: &TypeRegistry) -> Result<Value, FigError> {
    let value = &args[0];
    match builtin {
        BuiltinFunction::ValueTypeOf => Ok(Value::str_from(value.type_info(types).name())),
        BuiltinFunction::StringFrom => Ok(Value::str_from(&value.display_plain())),
        BuiltinFunction::IntParse => {
            let Value::Str(s) = value else {
                return Err(FigError::new(
                    ErrorKind::TypeError,
                    format!("`__fvalue_int_parse` takes a String, got '{}'", value.pretty_type(types)),
                ));
            };
            let text = s.borrow().to_string();
            text.parse::<i64>().map(Value::Int).map_err(|_| {
                FigError::new(ErrorKind::ValueError, format!("Invalid int string for parsing: \"{text}\""))
            })
        }
        BuiltinFunction::DoubleParse => {
            let Value::Str(s) = value else {
                return Err(FigError::new(
                    ErrorKind::TypeError,
                    format!("`__fvalue_double_parse` takes a String, got '{}'", value.pretty_type(types)),
                ));
            };
            let text = s.borrow().to_string();
            text.parse::<f64>().map(Value::Double).map_err(|_| {
                FigError::new(ErrorKind::ValueError, format!("Invalid double string for parsing: \"{text}\""))
            })
        }
        BuiltinFunction::IntFrom => match value {
            Value::Double(d) => Ok(Value::Int(*d as i64)),
            Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
            other => Err(FigError::new(
                ErrorKind::TypeError,
                format!("Type '{}' cannot be converted to Int", other.pretty_type(types)),
            )),
        },
        BuiltinFunction::DoubleFrom => match value {
            Value::Int(i) => Ok(Value::Double(*i as f64)),
            Value::Bool(b) => Ok(Value::Double(if *b { 1.0 } else { 0.0 })),
            other => Err(FigError::new(
                ErrorKind::TypeError,
                format!("Type '{}' cannot be converted to Double", other.pretty_type(types)),
            )),
        },
        other => Err(FigError::new(
            ErrorKind::RuntimeError,
            format!("`{other}` is not a conversion builtin"),
        )),
    }
}
