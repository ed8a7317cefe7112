//! The function-calling discipline.
//!
//! Builtins enforce a fixed arity unless variadic; variadic user functions
//! collect every argument into a `List`; normal user functions accept between
//! `positional` and `positional + defaulted` arguments, type-check each one,
//! and re-evaluate missing defaults in the caller's scope. Every call frame
//! is a fresh scope whose parent is the function's closure scope, never the
//! caller's.

use std::rc::Rc;

use smallvec::SmallVec;

use crate::{
    ast::{CodeLoc, Expr, ExprKind},
    env::{Env, Scope, ScopeKind},
    exception::{ErrorKind, RunResult},
    function::{Function, FunctionKind, UserFunction},
    interp::{Evaluator, Flow},
    io::{PrintWriter, ReadInput},
    value::{Value, type_matches},
    ast::AccessModifier,
};

type ArgValues = SmallVec<[Value; 4]>;

impl<W: PrintWriter, R: ReadInput> Evaluator<'_, W, R> {
    pub(crate) fn eval_call(&mut self, callee: &Expr, args: &[Expr], loc: CodeLoc, env: &Env) -> RunResult<Value> {
        let (func_val, name) = match &callee.kind {
            ExprKind::Var(_) | ExprKind::Member { .. } | ExprKind::Index { .. } => {
                let place = self.eval_place(callee, env)?;
                let name = place
                    .name()
                    .or_else(|| match &callee.kind {
                        ExprKind::Member { member, .. } => Some(Rc::clone(member)),
                        _ => None,
                    })
                    .unwrap_or_else(|| Rc::from("<anonymous>"));
                let value = place.get().map_err(|e| self.locate(e, callee.loc, env))?;
                (value, name)
            }
            _ => (self.eval_expr(callee, env)?, Rc::from("<anonymous>")),
        };
        let Value::Function(func) = &func_val else {
            return Err(self.error(
                ErrorKind::TypeError,
                format!("'{}' is not callable", func_val.pretty_type(&self.types)),
                loc,
                env,
            ));
        };
        let func = Rc::clone(func);

        // For normal user functions the argument-count window is checked
        // before any argument expression runs.
        if let FunctionKind::User(user) = &func.kind
            && user.params.variadic.is_none()
        {
            self.check_arg_count(&user.params, args.len(), &name, loc, env)?;
        }

        let mut argv: ArgValues = SmallVec::with_capacity(args.len());
        for arg in args {
            argv.push(self.eval_expr(arg, env)?);
        }
        self.dispatch_call(&func, &name, argv, env, loc)
    }

    /// Calls a function with already-evaluated arguments (operator overloads,
    /// re-entrant calls).
    pub(crate) fn call_with_values(
        &mut self,
        func: &Rc<Function>,
        name: &str,
        argv: Vec<Value>,
        env: &Env,
        loc: CodeLoc,
    ) -> RunResult<Value> {
        if let FunctionKind::User(user) = &func.kind
            && user.params.variadic.is_none()
        {
            self.check_arg_count(&user.params, argv.len(), name, loc, env)?;
        }
        self.dispatch_call(func, name, ArgValues::from_vec(argv), env, loc)
    }

    fn check_arg_count(
        &self,
        params: &crate::ast::FunctionParams,
        provided: usize,
        name: &str,
        loc: CodeLoc,
        env: &Env,
    ) -> RunResult<()> {
        let min = params.positional.len();
        let max = params.len();
        if provided < min || provided > max {
            return Err(self.error(
                ErrorKind::ArgumentMismatchError,
                format!("Function '{name}' expects {min} to {max} arguments, but {provided} were provided"),
                loc,
                env,
            ));
        }
        Ok(())
    }

    fn dispatch_call(
        &mut self,
        func: &Rc<Function>,
        name: &str,
        argv: ArgValues,
        env: &Env,
        loc: CodeLoc,
    ) -> RunResult<Value> {
        match &func.kind {
            FunctionKind::Builtin(builtin) => {
                if let Some(arity) = builtin.arity()
                    && argv.len() != arity
                {
                    return Err(self.error(
                        ErrorKind::ArgumentMismatchError,
                        format!(
                            "Builtin function '{name}' expects {arity} arguments, but {} were provided",
                            argv.len()
                        ),
                        loc,
                        env,
                    ));
                }
                self.call_builtin(*builtin, &argv).map_err(|e| self.locate(e, loc, env))
            }
            FunctionKind::Bound(bound) => {
                let arity = bound.method.arity();
                if argv.len() != arity {
                    return Err(self.error(
                        ErrorKind::ArgumentMismatchError,
                        format!(
                            "`{name}` expects {arity} arguments, but {} were provided",
                            argv.len()
                        ),
                        loc,
                        env,
                    ));
                }
                bound
                    .method
                    .invoke(&bound.receiver, &argv, &self.types)
                    .map_err(|e| self.locate(e, loc, env))
            }
            FunctionKind::User(user) => self.call_user(user, name, argv, env, loc),
        }
    }

    fn call_user(
        &mut self,
        user: &UserFunction,
        name: &str,
        argv: ArgValues,
        caller_env: &Env,
        loc: CodeLoc,
    ) -> RunResult<Value> {
        let frame = Scope::new(
            format!("<Function {name}()>"),
            ScopeKind::Function,
            Some(&user.closure),
        );

        if let Some(variadic) = &user.params.variadic {
            let collected = Value::list_from(argv.into_vec());
            frame
                .define(variadic, self.types.list(), AccessModifier::Normal, collected)
                .map_err(|e| self.locate(e, loc, caller_env))?;
            return self.run_function_body(user, name, &frame, caller_env, loc);
        }

        self.check_arg_count(&user.params, argv.len(), name, loc, caller_env)?;

        for (i, param) in user.params.positional.iter().enumerate() {
            let declared = match &param.ty {
                Some(ty_name) => self.resolve_type_name(ty_name, &user.closure, loc)?,
                None => self.types.any(),
            };
            let value = argv[i].clone();
            if !type_matches(&declared, &value, caller_env, &self.types) {
                return Err(self.error(
                    ErrorKind::ArgumentTypeMismatchError,
                    format!(
                        "In function '{name}', argument '{}' expects type '{declared}', but got type '{}'",
                        param.name,
                        value.pretty_type(&self.types)
                    ),
                    loc,
                    caller_env,
                ));
            }
            frame
                .define(&param.name, declared, AccessModifier::Normal, value)
                .map_err(|e| self.locate(e, loc, caller_env))?;
        }

        for (j, param) in user.params.defaulted.iter().enumerate() {
            let index = user.params.positional.len() + j;
            let declared = match &param.ty {
                Some(ty_name) => self.resolve_type_name(ty_name, &user.closure, loc)?,
                None => self.types.any(),
            };
            let value = if index < argv.len() {
                let value = argv[index].clone();
                if !type_matches(&declared, &value, caller_env, &self.types) {
                    return Err(self.error(
                        ErrorKind::ArgumentTypeMismatchError,
                        format!(
                            "In function '{name}', argument '{}' expects type '{declared}', but got type '{}'",
                            param.name,
                            value.pretty_type(&self.types)
                        ),
                        loc,
                        caller_env,
                    ));
                }
                value
            } else {
                // Missing defaults re-evaluate their expression in the
                // caller's scope, and the type is re-checked.
                let value = self.eval_expr(&param.default, caller_env)?;
                if !type_matches(&declared, &value, caller_env, &self.types) {
                    return Err(self.error(
                        ErrorKind::DefaultParameterTypeError,
                        format!(
                            "In function '{name}', default parameter '{}' has type '{}', which does not match the expected type '{declared}'",
                            param.name,
                            value.pretty_type(&self.types)
                        ),
                        loc,
                        caller_env,
                    ));
                }
                value
            };
            frame
                .define(&param.name, declared, AccessModifier::Normal, value)
                .map_err(|e| self.locate(e, loc, caller_env))?;
        }

        self.run_function_body(user, name, &frame, caller_env, loc)
    }

    fn run_function_body(
        &mut self,
        user: &UserFunction,
        name: &str,
        frame: &Env,
        caller_env: &Env,
        loc: CodeLoc,
    ) -> RunResult<Value> {
        let returned = match self.exec_block(&user.body, frame)? {
            Flow::Return(value) => value,
            Flow::Normal(_) | Flow::Break | Flow::Continue => Value::Null,
        };
        if !type_matches(&user.ret_type, &returned, caller_env, &self.types) {
            return Err(self.error(
                ErrorKind::ReturnTypeMismatchError,
                format!(
                    "Function '{name}' expects return type '{}', but got type '{}'",
                    user.ret_type,
                    returned.pretty_type(&self.types)
                ),
                loc,
                caller_env,
            ));
        }
        Ok(returned)
    }
}
