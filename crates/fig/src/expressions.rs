//! Expression evaluation: rvalues, lvalues, operator dispatch.
//!
//! Binary and unary evaluation consult the operator-overload registry before
//! native semantics; the left operand's type selects the method. `and`/`or`
//! short-circuit only when the left operand is already a `Bool`.

use std::rc::Rc;

use crate::{
    ast::{Expr, ExprKind, Literal, Operator, CodeLoc},
    env::{Env, OperatorKey},
    exception::{ErrorKind, RunResult},
    function::Function,
    interp::Evaluator,
    io::{PrintWriter, ReadInput},
    lvalue::Place,
    methods::TypeMethod,
    ops,
    value::{MapKey, Value, ValueMap},
};

impl<W: PrintWriter, R: ReadInput> Evaluator<'_, W, R> {
    pub(crate) fn eval_expr(&mut self, expr: &Expr, env: &Env) -> RunResult<Value> {
        match &expr.kind {
            ExprKind::Literal(lit) => Ok(match lit {
                Literal::Null => Value::Null,
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Int(i) => Value::Int(*i),
                Literal::Double(d) => Value::Double(*d),
                // A fresh string per evaluation: string values are mutable.
                Literal::Str(text) => Value::str_from(text),
            }),
            ExprKind::Var(_) | ExprKind::Member { .. } | ExprKind::Index { .. } => {
                let place = self.eval_place(expr, env)?;
                place.get().map_err(|e| self.locate(e, expr.loc, env))
            }
            ExprKind::Unary { op, operand } => self.eval_unary(*op, operand, expr.loc, env),
            ExprKind::Binary { op, lhs, rhs } => self.eval_binary(*op, lhs, rhs, expr.loc, env),
            ExprKind::Ternary { cond, when_true, when_false } => {
                let cond_val = self.eval_expr(cond, env)?;
                match cond_val {
                    Value::Bool(true) => self.eval_expr(when_true, env),
                    Value::Bool(false) => self.eval_expr(when_false, env),
                    other => Err(self.error(
                        ErrorKind::TypeError,
                        format!("Condition must be Bool, got '{}'", other.pretty_type(&self.types)),
                        cond.loc,
                        env,
                    )),
                }
            }
            ExprKind::FunctionLiteral(literal) => {
                let func = Function::user(
                    self.next_function_id(),
                    "<lambda>",
                    literal.params.clone(),
                    self.types.any(),
                    Rc::clone(&literal.body),
                    Rc::clone(env),
                );
                Ok(Value::Function(Rc::new(func)))
            }
            ExprKind::Call { callee, args } => self.eval_call(callee, args, expr.loc, env),
            ExprKind::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval_expr(item, env)?);
                }
                Ok(Value::list_from(values))
            }
            // The runtime has no tuple value; tuple expressions build lists.
            ExprKind::Tuple(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval_expr(item, env)?);
                }
                Ok(Value::list_from(values))
            }
            ExprKind::Map(entries) => {
                let mut map = ValueMap::default();
                for (key_expr, value_expr) in entries {
                    let key = self.eval_expr(key_expr, env)?;
                    let value = self.eval_expr(value_expr, env)?;
                    map.insert(MapKey(key), value);
                }
                Ok(Value::map_from(map))
            }
            ExprKind::StructInit { target, mode, args } => {
                self.eval_struct_init(target, *mode, args, expr.loc, env)
            }
        }
    }

    pub(crate) fn eval_place(&mut self, expr: &Expr, env: &Env) -> RunResult<Place> {
        match &expr.kind {
            ExprKind::Var(name) => match env.lookup(name) {
                Some(slot) => Ok(Place::Variable(slot)),
                None => Err(self.error(
                    ErrorKind::UndeclaredIdentifierError,
                    format!("Variable `{name}` is not defined"),
                    expr.loc,
                    env,
                )),
            },
            ExprKind::Member { base, member } => self.member_place(base, member, expr.loc, env),
            ExprKind::Index { base, index } => self.index_place(base, index, expr.loc, env),
            _ => Err(self.error(
                ErrorKind::TypeError,
                "Expression does not refer to an lvalue",
                expr.loc,
                env,
            )),
        }
    }

    fn eval_unary(&mut self, op: Operator, operand: &Expr, loc: CodeLoc, env: &Env) -> RunResult<Value> {
        let value = self.eval_expr(operand, env)?;
        if let Value::Instance(inst) = &value {
            let key = OperatorKey { type_id: inst.parent.id(), op, arity: 1 };
            if let Some(func) = env.operator_fn(key) {
                let name = format!("Operation.{}.{}", inst.parent.name(), op);
                return self.call_with_values(&func, &name, vec![value.clone()], env, loc);
            }
        }
        ops::unary_native(op, &value, &self.types).map_err(|e| self.locate(e, loc, env))
    }

    fn eval_binary(&mut self, op: Operator, lhs: &Expr, rhs: &Expr, loc: CodeLoc, env: &Env) -> RunResult<Value> {
        if op.is_assignment() {
            return self.eval_assignment(op, lhs, rhs, loc, env);
        }
        let lhs_val = self.eval_expr(lhs, env)?;
        // Short-circuit before the right operand is evaluated.
        match (op, &lhs_val) {
            (Operator::And, Value::Bool(false)) => return Ok(Value::Bool(false)),
            (Operator::Or, Value::Bool(true)) => return Ok(Value::Bool(true)),
            _ => {}
        }
        let rhs_val = self.eval_expr(rhs, env)?;
        self.binary_op_values(op, &lhs_val, &rhs_val, loc, env)
    }

    /// Overload-aware binary application on already-evaluated operands. Also
    /// used by the compound assignments.
    pub(crate) fn binary_op_values(
        &mut self,
        op: Operator,
        lhs: &Value,
        rhs: &Value,
        loc: CodeLoc,
        env: &Env,
    ) -> RunResult<Value> {
        for operand in [lhs, rhs] {
            if let Value::Instance(inst) = operand {
                let key = OperatorKey { type_id: inst.parent.id(), op, arity: 2 };
                if let Some(func) = env.operator_fn(key) {
                    let name = format!("Operation.{}.{}", inst.parent.name(), op);
                    return self.call_with_values(&func, &name, vec![lhs.clone(), rhs.clone()], env, loc);
                }
            }
        }
        if op == Operator::Is {
            return self.eval_is(lhs, rhs, loc, env);
        }
        ops::binary_native(op, lhs, rhs, &self.types).map_err(|e| self.locate(e, loc, env))
    }

    fn eval_assignment(&mut self, op: Operator, lhs: &Expr, rhs: &Expr, loc: CodeLoc, env: &Env) -> RunResult<Value> {
        let base_op = match op {
            Operator::Assign => None,
            Operator::AddAssign => Some(Operator::Add),
            Operator::SubAssign => Some(Operator::Sub),
            Operator::MulAssign => Some(Operator::Mul),
            Operator::DivAssign => Some(Operator::Div),
            Operator::ModAssign => Some(Operator::Mod),
            _ => {
                return Err(self.error(
                    ErrorKind::UnsupportedOpError,
                    format!("Operator '{}' is not supported", op.symbol()),
                    loc,
                    env,
                ));
            }
        };
        let place = self.eval_place(lhs, env)?;
        let rhs_val = self.eval_expr(rhs, env)?;
        let stored = match base_op {
            None => rhs_val,
            Some(base) => {
                let current = place.get().map_err(|e| self.locate(e, lhs.loc, env))?;
                self.binary_op_values(base, &current, &rhs_val, loc, env)?
            }
        };
        place
            .set(stored.clone(), env, &self.types)
            .map_err(|e| self.locate(e, loc, env))?;
        Ok(stored)
    }

    fn eval_is(&self, lhs: &Value, rhs: &Value, loc: CodeLoc, env: &Env) -> RunResult<Value> {
        match (lhs, rhs) {
            (Value::Instance(inst), Value::Struct(st)) => {
                Ok(Value::Bool(inst.parent == st.type_info))
            }
            (Value::Instance(inst), Value::Interface(it)) => {
                Ok(Value::Bool(env.implements(inst.parent.id(), it.type_info.id())))
            }
            (value, Value::Struct(st)) if st.builtin => {
                Ok(Value::Bool(value.type_info(&self.types) == st.type_info))
            }
            _ => Err(self.error(
                ErrorKind::TypeError,
                format!(
                    "Unsupported operator `is` for '{}' and '{}'",
                    lhs.pretty_type(&self.types),
                    rhs.pretty_type(&self.types)
                ),
                loc,
                env,
            )),
        }
    }

    /// Member access, in dispatch order: module members, builtin member
    /// methods, impl-registry methods, instance fields/methods, interface
    /// defaults.
    fn member_place(&mut self, base: &Expr, member: &str, loc: CodeLoc, env: &Env) -> RunResult<Place> {
        let base_val = self.eval_expr(base, env)?;

        if let Value::Module(module) = &base_val {
            let slot = module.env.lookup_here(member);
            return match slot {
                Some(slot) if slot.borrow().access.is_public() => Ok(Place::Variable(slot)),
                _ => Err(self.error(
                    ErrorKind::NoAttributeError,
                    format!(
                        "{} has no member '{member}', check that it is public",
                        base_val.display()
                    ),
                    loc,
                    env,
                )),
            };
        }

        if let Some(method) = TypeMethod::lookup(&base_val, member) {
            let func = Function::bound(self.next_function_id(), base_val.clone(), method);
            return Ok(Place::Bound(Value::Function(Rc::new(func))));
        }

        // For instances the impl registry is consulted with the parent type;
        // builtin values use their own type and keep the current scope as
        // the method's closure.
        let (subject, instance_env) = match &base_val {
            Value::Instance(inst) => (inst.parent.clone(), Some(Rc::clone(&inst.env))),
            other => (other.type_info(&self.types), None),
        };
        if let Some(func) = env.impl_method(subject.id(), member) {
            let closure = instance_env.clone().unwrap_or_else(|| Rc::clone(env));
            let rebound = self.rebind_user_fn(&func, closure);
            return Ok(Place::Bound(Value::Function(rebound)));
        }

        let Value::Instance(inst) = &base_val else {
            return Err(self.error(
                ErrorKind::NoAttributeError,
                format!("{} has no attribute '{member}'", base_val.display()),
                loc,
                env,
            ));
        };

        if let Some(slot) = inst.env.lookup_here(member)
            && slot.borrow().access.is_public()
        {
            return Ok(Place::Variable(slot));
        }

        if let Some(method) = env.default_method(subject.id(), member) {
            let ret_type = self.resolve_type_name(&method.ret_type, env, loc)?;
            let body = method.default_body.clone().expect("default_method returns defaults only");
            let func = Function::user(
                self.next_function_id(),
                Rc::clone(&method.name),
                method.params.clone(),
                ret_type,
                body,
                Rc::clone(env),
            );
            return Ok(Place::Bound(Value::Function(Rc::new(func))));
        }

        Err(self.error(
            ErrorKind::NoAttributeError,
            format!(
                "{} has no attribute '{member}' and no implemented interface provides it",
                base_val.display()
            ),
            loc,
            env,
        ))
    }

    /// Rebinds an impl method onto a new closure scope, producing a fresh
    /// function identity.
    pub(crate) fn rebind_user_fn(&mut self, func: &Rc<Function>, closure: Env) -> Rc<Function> {
        let user = func.as_user().expect("impl methods are user-defined functions");
        Rc::new(Function::user(
            self.next_function_id(),
            Rc::clone(&user.name),
            user.params.clone(),
            user.ret_type.clone(),
            Rc::clone(&user.body),
            closure,
        ))
    }

    fn index_place(&mut self, base: &Expr, index: &Expr, loc: CodeLoc, env: &Env) -> RunResult<Place> {
        let base_val = self.eval_expr(base, env)?;
        let index_val = self.eval_expr(index, env)?;
        match &base_val {
            Value::List(list) => {
                let Value::Int(i) = index_val else {
                    return Err(self.error(
                        ErrorKind::TypeError,
                        format!(
                            "`List` indices must be `Int`, got '{}'",
                            index_val.pretty_type(&self.types)
                        ),
                        index.loc,
                        env,
                    ));
                };
                let len = list.borrow().len();
                if i < 0 || i as usize >= len {
                    return Err(self.error(
                        ErrorKind::IndexOutOfRangeError,
                        format!("Index {i} out of range for list of length {len}"),
                        index.loc,
                        env,
                    ));
                }
                Ok(Place::ListIndex { list: Rc::clone(list), index: i as usize })
            }
            Value::Map(map) => Ok(Place::MapEntry { map: Rc::clone(map), key: MapKey(index_val) }),
            Value::Str(text) => {
                let Value::Int(i) = index_val else {
                    return Err(self.error(
                        ErrorKind::TypeError,
                        format!(
                            "`String` indices must be `Int`, got '{}'",
                            index_val.pretty_type(&self.types)
                        ),
                        index.loc,
                        env,
                    ));
                };
                let len = text.borrow().len();
                if i < 0 || i as usize >= len {
                    return Err(self.error(
                        ErrorKind::IndexOutOfRangeError,
                        format!("Index {i} out of range for string of length {len}"),
                        index.loc,
                        env,
                    ));
                }
                Ok(Place::StrIndex { text: Rc::clone(text), index: i as usize })
            }
            other => Err(self.error(
                ErrorKind::NoSubscriptableError,
                format!("'{}' object is not subscriptable", other.pretty_type(&self.types)),
                loc,
                env,
            )),
        }
    }
}
