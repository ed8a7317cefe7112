//! Builtin functions and builtin values.
//!
//! Builtin functions are enum variants whose strum serialization is the
//! surface name (`__fstdout_print`); `import _builtins` iterates the enum
//! and defines one function value per variant.

mod convert;
mod math;

use std::{cell::RefCell, rc::Rc};

use strum::IntoEnumIterator as _;

use crate::{
    ast::{AccessModifier, FunctionParams, InterfaceMethod},
    env::Env,
    exception::FigError,
    function::Function,
    interp::Evaluator,
    io::{PrintWriter, ReadInput},
    type_info::BuiltinType,
    value::{InterfaceType, StructType, Value},
};

/// Every interpreter-native function, keyed by its `__f<namespace>_<name>`
/// surface name.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
    strum::EnumIter,
)]
pub enum BuiltinFunction {
    #[strum(serialize = "__fstdout_print")]
    StdoutPrint,
    #[strum(serialize = "__fstdout_println")]
    StdoutPrintln,
    #[strum(serialize = "__fstdin_read")]
    StdinRead,
    #[strum(serialize = "__fstdin_readln")]
    StdinReadln,
    #[strum(serialize = "__fvalue_type")]
    ValueTypeOf,
    #[strum(serialize = "__fvalue_int_parse")]
    IntParse,
    #[strum(serialize = "__fvalue_int_from")]
    IntFrom,
    #[strum(serialize = "__fvalue_double_parse")]
    DoubleParse,
    #[strum(serialize = "__fvalue_double_from")]
    DoubleFrom,
    #[strum(serialize = "__fvalue_string_from")]
    StringFrom,
    #[strum(serialize = "__ftime_now_ns")]
    TimeNowNs,
    #[strum(serialize = "__fmath_acos")]
    Acos,
    #[strum(serialize = "__fmath_acosh")]
    Acosh,
    #[strum(serialize = "__fmath_asin")]
    Asin,
    #[strum(serialize = "__fmath_asinh")]
    Asinh,
    #[strum(serialize = "__fmath_atan")]
    Atan,
    #[strum(serialize = "__fmath_atan2")]
    Atan2,
    #[strum(serialize = "__fmath_atanh")]
    Atanh,
    #[strum(serialize = "__fmath_ceil")]
    Ceil,
    #[strum(serialize = "__fmath_cos")]
    Cos,
    #[strum(serialize = "__fmath_cosh")]
    Cosh,
    #[strum(serialize = "__fmath_exp")]
    Exp,
    #[strum(serialize = "__fmath_expm1")]
    Expm1,
    #[strum(serialize = "__fmath_fabs")]
    Fabs,
    #[strum(serialize = "__fmath_floor")]
    Floor,
    #[strum(serialize = "__fmath_fmod")]
    Fmod,
    #[strum(serialize = "__fmath_frexp")]
    Frexp,
    #[strum(serialize = "__fmath_gcd")]
    Gcd,
    #[strum(serialize = "__fmath_hypot")]
    Hypot,
    #[strum(serialize = "__fmath_isequal")]
    IsEqual,
    #[strum(serialize = "__fmath_log")]
    Log,
    #[strum(serialize = "__fmath_log10")]
    Log10,
    #[strum(serialize = "__fmath_log1p")]
    Log1p,
    #[strum(serialize = "__fmath_log2")]
    Log2,
    #[strum(serialize = "__fmath_sin")]
    Sin,
    #[strum(serialize = "__fmath_sinh")]
    Sinh,
    #[strum(serialize = "__fmath_sqrt")]
    Sqrt,
    #[strum(serialize = "__fmath_tan")]
    Tan,
    #[strum(serialize = "__fmath_tanh")]
    Tanh,
    #[strum(serialize = "__fmath_trunc")]
    Trunc,
}

impl BuiltinFunction {
    /// Fixed argument count, or `None` for variadic.
    #[must_use]
    pub fn arity(self) -> Option<usize> {
        match self {
            Self::StdoutPrint | Self::StdoutPrintln => None,
            Self::StdinRead | Self::StdinReadln | Self::TimeNowNs => Some(0),
            Self::Atan2 | Self::Fmod | Self::Gcd | Self::Hypot | Self::IsEqual => Some(2),
            _ => Some(1),
        }
    }
}

impl<W: PrintWriter, R: ReadInput> Evaluator<'_, W, R> {
    /// Dispatches a builtin call. Arity has already been checked.
    pub(crate) fn call_builtin(&mut self, builtin: BuiltinFunction, args: &[Value]) -> Result<Value, FigError> {
        match builtin {
            BuiltinFunction::StdoutPrint => {
                for arg in args {
                    self.print.write_text(&arg.display_plain());
                }
                Ok(Value::Int(args.len() as i64))
            }
            BuiltinFunction::StdoutPrintln => {
                for arg in args {
                    self.print.write_text(&arg.display_plain());
                }
                self.print.write_char('\n');
                Ok(Value::Int(args.len() as i64))
            }
            BuiltinFunction::StdinRead => {
                Ok(Value::str_from(&self.input.read_token().unwrap_or_default()))
            }
            BuiltinFunction::StdinReadln => {
                Ok(Value::str_from(&self.input.read_line().unwrap_or_default()))
            }
            BuiltinFunction::TimeNowNs => {
                Ok(Value::Int(self.started.elapsed().as_nanos() as i64))
            }
            BuiltinFunction::ValueTypeOf
            | BuiltinFunction::IntParse
            | BuiltinFunction::IntFrom
            | BuiltinFunction::DoubleParse
            | BuiltinFunction::DoubleFrom
            | BuiltinFunction::StringFrom => convert::call(builtin, args, &self.types),
            _ => math::call(builtin, args, &self.types),
        }
    }

    /// Defines the whole builtin function table in `env`. The top-level
    /// scope gets it automatically; modules opt in via `import _builtins`.
    /// Idempotent, so a top-level `import _builtins;` is harmless.
    pub(crate) fn register_builtin_functions(&mut self, env: &Env) -> Result<(), FigError> {
        for builtin in BuiltinFunction::iter() {
            let name: Rc<str> = Rc::from(<&'static str>::from(builtin));
            if env.contains_in_this_scope(&name) {
                continue;
            }
            let func = Function::builtin(self.next_function_id(), builtin);
            env.define(
                &name,
                self.types.function(),
                AccessModifier::Const,
                Value::Function(Rc::new(func)),
            )?;
        }
        Ok(())
    }

    /// Seeds the values every scope chain starts from: the literal
    /// singletons, the builtin type objects, and the `Error` interface.
    pub(crate) fn register_builtin_values(&mut self, env: &Env) -> Result<(), FigError> {
        let null_name: Rc<str> = Rc::from("null");
        env.define(&null_name, self.types.null(), AccessModifier::Const, Value::Null)?;
        let true_name: Rc<str> = Rc::from("true");
        env.define(&true_name, self.types.bool(), AccessModifier::Const, Value::Bool(true))?;
        let false_name: Rc<str> = Rc::from("false");
        env.define(&false_name, self.types.bool(), AccessModifier::Const, Value::Bool(false))?;

        const TYPE_OBJECTS: [(&str, BuiltinType); 9] = [
            ("Any", BuiltinType::Any),
            ("Null", BuiltinType::Null),
            ("Int", BuiltinType::Int),
            ("Double", BuiltinType::Double),
            ("Bool", BuiltinType::Bool),
            ("String", BuiltinType::String),
            ("Function", BuiltinType::Function),
            ("List", BuiltinType::List),
            ("Map", BuiltinType::Map),
        ];
        for (name, builtin) in TYPE_OBJECTS {
            let name: Rc<str> = Rc::from(name);
            let ty = StructType {
                type_info: self.types.builtin(builtin),
                def_env: None,
                fields: RefCell::new(Vec::new()),
                builtin: true,
            };
            env.define(
                &name,
                self.types.struct_type(),
                AccessModifier::Const,
                Value::Struct(Rc::new(ty)),
            )?;
        }

        let error_info = self.types.register("Error");
        let string_ret: Rc<str> = Rc::from("String");
        let methods = ["toString", "getErrorClass", "getErrorMessage"]
            .into_iter()
            .map(|name| InterfaceMethod {
                name: Rc::from(name),
                params: FunctionParams::default(),
                ret_type: Rc::clone(&string_ret),
                default_body: None,
            })
            .collect();
        let error_name: Rc<str> = Rc::from("Error");
        env.define(
            &error_name,
            self.types.interface_type(),
            AccessModifier::Const,
            Value::Interface(Rc::new(InterfaceType { type_info: error_info, methods })),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use super::BuiltinFunction;

    #[test]
    fn names_round_trip() {
        let b = BuiltinFunction::from_str("__fstdout_println").unwrap();
        assert_eq!(b, BuiltinFunction::StdoutPrintln);
        assert_eq!(b.to_string(), "__fstdout_println");
        assert!(BuiltinFunction::from_str("__fstdout_nope").is_err());
    }

    #[test]
    fn arities() {
        assert_eq!(BuiltinFunction::StdoutPrint.arity(), None);
        assert_eq!(BuiltinFunction::TimeNowNs.arity(), Some(0));
        assert_eq!(BuiltinFunction::Sqrt.arity(), Some(1));
        assert_eq!(BuiltinFunction::Gcd.arity(), Some(2));
    }
}
