//! Struct instantiation: `T { ... }` in positional, named and shorthand
//! modes, plus construction of builtin type values.

use std::rc::Rc;

use ahash::AHashMap;

use crate::{
    ast::{CodeLoc, Expr, InitArg, InitMode},
    env::{Env, Scope, ScopeKind},
    exception::{ErrorKind, RunResult},
    interp::Evaluator,
    io::{PrintWriter, ReadInput},
    value::{Field, StructInstance, StructType, Value, ValueMap, type_matches},
};

impl<W: PrintWriter, R: ReadInput> Evaluator<'_, W, R> {
    pub(crate) fn eval_struct_init(
        &mut self,
        target: &Expr,
        mode: InitMode,
        args: &[InitArg],
        loc: CodeLoc,
        env: &Env,
    ) -> RunResult<Value> {
        let place = self.eval_place(target, env)?;
        let struct_name = place.name().unwrap_or_else(|| Rc::from("<struct>"));
        let target_val = place.get().map_err(|e| self.locate(e, target.loc, env))?;
        let Value::Struct(struct_type) = target_val else {
            return Err(self.error(
                ErrorKind::TypeError,
                format!("'{struct_name}' is not a structure type"),
                loc,
                env,
            ));
        };

        if struct_type.builtin {
            return self.construct_builtin(&struct_type, args, loc, env);
        }

        let def_env = struct_type
            .def_env
            .clone()
            .expect("a user-defined struct carries its defining scope");
        let fields: Vec<Field> = struct_type.fields.borrow().clone();
        let required = fields.iter().filter(|f| f.default.is_none()).count();
        if args.len() < required || args.len() > fields.len() {
            return Err(self.error(
                ErrorKind::StructInitArgumentMismatchError,
                format!(
                    "Structure '{struct_name}' expects {required} to {} fields, but {} were provided",
                    fields.len(),
                    args.len()
                ),
                loc,
                env,
            ));
        }

        // A shorthand initializer that names anything that is not a field
        // degrades to positional mode (each name evaluates as a variable).
        let mode = if mode == InitMode::Shorthand {
            let all_fields = args.iter().all(|arg| {
                arg.name
                    .as_ref()
                    .is_some_and(|name| fields.iter().any(|f| f.name == *name))
            });
            if all_fields { InitMode::Named } else { InitMode::Positional }
        } else {
            mode
        };

        let instance_env = Scope::new(
            format!("<StructInstance {}>", struct_type.type_info),
            ScopeKind::Block,
            Some(&def_env),
        );

        match mode {
            InitMode::Positional => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval_expr(&arg.value, env)?);
                }
                for (i, field) in fields.iter().enumerate() {
                    let value = match values.get(i) {
                        Some(value) => value.clone(),
                        None => self.eval_field_default(&struct_name, field, &def_env, loc, env)?,
                    };
                    self.bind_field(&struct_name, field, value, &instance_env, loc, env)?;
                }
            }
            InitMode::Named | InitMode::Shorthand => {
                let mut by_name: AHashMap<Rc<str>, Value> = AHashMap::new();
                for arg in args {
                    let name = arg.name.clone().expect("named init args carry names");
                    let value = self.eval_expr(&arg.value, env)?;
                    if by_name.insert(Rc::clone(&name), value).is_some() {
                        return Err(self.error(
                            ErrorKind::StructFieldRedeclarationError,
                            format!("Field '{name}' already initialized in structure '{struct_name}'"),
                            loc,
                            env,
                        ));
                    }
                }
                let unknown = by_name
                    .keys()
                    .find(|name| !fields.iter().any(|f| f.name == **name));
                if let Some(unknown) = unknown {
                    return Err(self.error(
                        ErrorKind::StructFieldNotFoundError,
                        format!("Field '{unknown}' not found in structure '{struct_name}'"),
                        loc,
                        env,
                    ));
                }
                for field in &fields {
                    let value = match by_name.remove(&field.name) {
                        Some(value) => value,
                        None => self.eval_field_default(&struct_name, field, &def_env, loc, env)?,
                    };
                    self.bind_field(&struct_name, field, value, &instance_env, loc, env)?;
                }
            }
        }

        // Rebind every method of the defining scope onto this instance, so
        // field names resolve through the method's closure chain.
        for (method_name, func) in def_env.own_functions() {
            let access = def_env
                .lookup_here(&method_name)
                .map_or(crate::ast::AccessModifier::Const, |slot| slot.borrow().access);
            let rebound = self.rebind_user_fn(&func, Rc::clone(&instance_env));
            instance_env
                .define(&method_name, self.types.function(), access, Value::Function(rebound))
                .map_err(|e| self.locate(e, loc, env))?;
        }

        Ok(Value::Instance(Rc::new(StructInstance {
            parent: struct_type.type_info.clone(),
            env: instance_env,
        })))
    }

    fn eval_field_default(
        &mut self,
        struct_name: &str,
        field: &Field,
        def_env: &Env,
        loc: CodeLoc,
        env: &Env,
    ) -> RunResult<Value> {
        let Some(default) = field.default.as_ref() else {
            return Err(self.error(
                ErrorKind::StructInitArgumentMismatchError,
                format!("Structure '{struct_name}' is missing required field '{}'", field.name),
                loc,
                env,
            ));
        };
        // Defaults evaluate in the struct's defining scope, not the caller's.
        let value = self.eval_expr(default, def_env)?;
        if !type_matches(&field.ty, &value, env, &self.types) {
            return Err(self.error(
                ErrorKind::StructFieldTypeMismatchError,
                format!(
                    "In structure '{struct_name}', field '{}' expects type '{}', but got type '{}'",
                    field.name,
                    field.ty,
                    value.pretty_type(&self.types)
                ),
                loc,
                env,
            ));
        }
        Ok(value)
    }

    fn bind_field(
        &mut self,
        struct_name: &str,
        field: &Field,
        value: Value,
        instance_env: &Env,
        loc: CodeLoc,
        env: &Env,
    ) -> RunResult<()> {
        if !type_matches(&field.ty, &value, env, &self.types) {
            return Err(self.error(
                ErrorKind::StructFieldTypeMismatchError,
                format!(
                    "In structure '{struct_name}', field '{}' expects type '{}', but got type '{}'",
                    field.name,
                    field.ty,
                    value.pretty_type(&self.types)
                ),
                loc,
                env,
            ));
        }
        instance_env
            .define(&field.name, field.ty.clone(), field.access, value)
            .map_err(|e| self.locate(e, loc, env))?;
        Ok(())
    }

    /// `Int{}`, `String{"x"}`, `List{other}`: builtin type values take zero
    /// or one argument; containers shallow-copy their source.
    fn construct_builtin(
        &mut self,
        struct_type: &StructType,
        args: &[InitArg],
        loc: CodeLoc,
        env: &Env,
    ) -> RunResult<Value> {
        let ty = &struct_type.type_info;
        if args.len() > 1 {
            return Err(self.error(
                ErrorKind::StructInitArgumentMismatchError,
                format!("Builtin type `{ty}` expects 0 or 1 argument, but {} were provided", args.len()),
                loc,
                env,
            ));
        }
        let not_constructible = *ty == self.types.any() || *ty == self.types.function();
        if args.is_empty() {
            if not_constructible || *ty == self.types.null() {
                return Err(self.error(
                    ErrorKind::TypeError,
                    format!("Builtin type `{ty}` cannot be constructed"),
                    loc,
                    env,
                ));
            }
            return Ok(Value::default_for(ty, &self.types));
        }
        if not_constructible {
            return Err(self.error(
                ErrorKind::TypeError,
                format!("Builtin type `{ty}` cannot be constructed"),
                loc,
                env,
            ));
        }

        let value = self.eval_expr(&args[0].value, env)?;
        let mismatch = |this: &Self| {
            this.error(
                ErrorKind::TypeError,
                format!(
                    "Builtin `{ty}` constructor expects {ty}, got '{}'",
                    value.pretty_type(&this.types)
                ),
                loc,
                env,
            )
        };
        match &value {
            Value::Int(_) if *ty == self.types.int() => Ok(value.clone()),
            Value::Double(_) if *ty == self.types.double() => Ok(value.clone()),
            Value::Bool(_) if *ty == self.types.bool() => Ok(value.clone()),
            Value::Null if *ty == self.types.null() => Ok(Value::Null),
            Value::Str(s) if *ty == self.types.string() => Ok(Value::str_value(s.borrow().clone())),
            Value::List(items) if *ty == self.types.list() => {
                Ok(Value::list_from(items.borrow().clone()))
            }
            Value::Map(map) if *ty == self.types.map() => {
                let copied: ValueMap = map.borrow().clone();
                Ok(Value::map_from(copied))
            }
            _ => Err(mismatch(self)),
        }
    }
}
