//! Statement execution: definitions, control flow, exceptions.

use std::{collections::HashSet, rc::Rc};

use ahash::AHashMap;

use crate::{
    ast::{
        Block, CodeLoc, FunctionDef, ImplDef, InterfaceDef, InterfaceMethod, Operator, Stmt,
        StmtKind, StructDef, TypeAnnotation, VarDef,
    },
    ast::AccessModifier,
    env::{Env, ImplRecord, OperatorKey, Scope, ScopeKind},
    exception::{ErrorKind, RunResult},
    function::Function,
    interp::{Evaluator, Flow},
    io::{PrintWriter, ReadInput},
    type_info::TypeInfo,
    value::{Field, StructType, Value, type_matches},
};

/// Magic method names of the `Operation` interface, with the operator and
/// arity each one overloads.
fn magic_operator(name: &str) -> Option<(Operator, u8)> {
    let entry = match name {
        "Add" => (Operator::Add, 2),
        "Sub" => (Operator::Sub, 2),
        "Mul" => (Operator::Mul, 2),
        "Div" => (Operator::Div, 2),
        "Mod" => (Operator::Mod, 2),
        "Pow" => (Operator::Pow, 2),
        "Neg" => (Operator::Sub, 1),
        "Not" => (Operator::Not, 1),
        "And" => (Operator::And, 2),
        "Or" => (Operator::Or, 2),
        "Equal" => (Operator::Eq, 2),
        "NotEqual" => (Operator::NotEq, 2),
        "LessThan" => (Operator::Less, 2),
        "LessEqual" => (Operator::LessEq, 2),
        "GreaterThan" => (Operator::Greater, 2),
        "GreaterEqual" => (Operator::GreaterEq, 2),
        "Is" => (Operator::Is, 2),
        "BitNot" => (Operator::BitNot, 1),
        "BitAnd" => (Operator::BitAnd, 2),
        "BitOr" => (Operator::BitOr, 2),
        "BitXor" => (Operator::BitXor, 2),
        "ShiftLeft" => (Operator::Shl, 2),
        "ShiftRight" => (Operator::Shr, 2),
        _ => return None,
    };
    Some(entry)
}

impl<W: PrintWriter, R: ReadInput> Evaluator<'_, W, R> {
    /// Runs the statements of a block in the given scope; the first
    /// non-normal flow short-circuits.
    pub(crate) fn exec_block(&mut self, block: &Block, env: &Env) -> RunResult<Flow> {
        let mut flow = Flow::Normal(Value::Null);
        for stmt in &block.stmts {
            flow = self.exec_stmt(stmt, env)?;
            if !matches!(flow, Flow::Normal(_)) {
                return Ok(flow);
            }
        }
        Ok(flow)
    }

    pub(crate) fn exec_stmt(&mut self, stmt: &Stmt, env: &Env) -> RunResult<Flow> {
        let loc = stmt.loc;
        match &stmt.kind {
            StmtKind::Expression(expr) => Ok(Flow::Normal(self.eval_expr(expr, env)?)),
            StmtKind::Block(block) => {
                let block_env = Scope::new(
                    format!("<Block {}:{}>", loc.line, loc.column),
                    ScopeKind::Block,
                    Some(env),
                );
                self.exec_block(block, &block_env)
            }
            StmtKind::VarDef(def) => self.exec_var_def(def, env, loc),
            StmtKind::FunctionDef(def) => {
                self.define_function(def, env, loc)?;
                Ok(Flow::Normal(Value::Null))
            }
            StmtKind::StructDef(def) => self.exec_struct_def(def, env, loc),
            StmtKind::InterfaceDef(def) => self.exec_interface_def(def, env, loc),
            StmtKind::Impl(def) => self.exec_impl(def, env, loc),
            StmtKind::If { cond, body, elifs, else_body } => {
                if self.eval_condition(cond, env)? {
                    return self.exec_nested_block(body, env);
                }
                for (elif_cond, elif_body) in elifs {
                    if self.eval_condition(elif_cond, env)? {
                        return self.exec_nested_block(elif_body, env);
                    }
                }
                match else_body {
                    Some(body) => self.exec_nested_block(body, env),
                    None => Ok(Flow::Normal(Value::Null)),
                }
            }
            StmtKind::While { cond, body } => {
                loop {
                    if !self.eval_condition(cond, env)? {
                        break;
                    }
                    let iter_env = Scope::new(
                        format!("<While {}:{}>", loc.line, loc.column),
                        ScopeKind::Loop,
                        Some(env),
                    );
                    match self.exec_block(body, &iter_env)? {
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Break => break,
                        Flow::Continue | Flow::Normal(_) => {}
                    }
                }
                Ok(Flow::Normal(Value::Null))
            }
            StmtKind::For { init, cond, step, body } => {
                let loop_env = Scope::new(
                    format!("<For {}:{}>", loc.line, loc.column),
                    ScopeKind::Loop,
                    Some(env),
                );
                self.exec_stmt(init, &loop_env)?;
                let mut iteration = 0u64;
                loop {
                    if !self.eval_condition(cond, &loop_env)? {
                        break;
                    }
                    iteration += 1;
                    let iter_env = Scope::new(
                        format!("<For {}:{}, iteration {iteration}>", loc.line, loc.column),
                        ScopeKind::Loop,
                        Some(&loop_env),
                    );
                    match self.exec_block(body, &iter_env)? {
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Break => break,
                        // `continue` still advances to the increment.
                        Flow::Continue | Flow::Normal(_) => {}
                    }
                    if let Some(step) = step {
                        self.exec_stmt(step, &loop_env)?;
                    }
                }
                Ok(Flow::Normal(Value::Null))
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr, env)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }
            StmtKind::Break => {
                if !env.is_in_loop() {
                    return Err(self.error(
                        ErrorKind::BreakOutsideLoopError,
                        "`break` statement outside loop",
                        loc,
                        env,
                    ));
                }
                Ok(Flow::Break)
            }
            StmtKind::Continue => {
                if !env.is_in_loop() {
                    return Err(self.error(
                        ErrorKind::ContinueOutsideLoopError,
                        "`continue` statement outside loop",
                        loc,
                        env,
                    ));
                }
                Ok(Flow::Continue)
            }
            StmtKind::Try { body, catches, finally } => self.exec_try(body, catches, finally.as_ref(), env, loc),
            StmtKind::Throw(expr) => {
                let value = self.eval_expr(expr, env)?;
                if value.is_null() {
                    return Err(self.error(ErrorKind::TypeError, "Cannot throw null", loc, env));
                }
                Err(self.thrown(value, loc, env))
            }
            StmtKind::Import(path) => self.exec_import(path, env, loc),
        }
    }

    fn eval_condition(&mut self, cond: &crate::ast::Expr, env: &Env) -> RunResult<bool> {
        match self.eval_expr(cond, env)? {
            Value::Bool(b) => Ok(b),
            other => Err(self.error(
                ErrorKind::TypeError,
                format!("Condition must be Bool, got '{}'", other.pretty_type(&self.types)),
                cond.loc,
                env,
            )),
        }
    }

    fn exec_nested_block(&mut self, block: &Block, env: &Env) -> RunResult<Flow> {
        let block_env = Scope::new(
            format!("<Block {}:{}>", block.loc.line, block.loc.column),
            ScopeKind::Block,
            Some(env),
        );
        self.exec_block(block, &block_env)
    }

    fn exec_var_def(&mut self, def: &VarDef, env: &Env, loc: CodeLoc) -> RunResult<Flow> {
        if env.contains_in_this_scope(&def.name) {
            return Err(self.error(
                ErrorKind::RedeclarationError,
                format!("Variable `{}` already declared in this scope", def.name),
                loc,
                env,
            ));
        }
        let mut value = match &def.init {
            Some(expr) => Some(self.eval_expr(expr, env)?),
            None => None,
        };
        let declared = match &def.annotation {
            TypeAnnotation::Default => self.types.any(),
            TypeAnnotation::Inferred => {
                let init = value.as_ref().expect("`:=` always has an initializer");
                self.inferred_type(init)
            }
            TypeAnnotation::Named(name) => {
                let declared = self.resolve_type_name(name, env, loc)?;
                match &value {
                    Some(v) => {
                        if !type_matches(&declared, v, env, &self.types) {
                            return Err(self.error(
                                ErrorKind::TypeError,
                                format!(
                                    "Variable `{}` expects init-value type `{declared}`, but got '{}'",
                                    def.name,
                                    v.pretty_type(&self.types)
                                ),
                                loc,
                                env,
                            ));
                        }
                    }
                    None => value = Some(Value::default_for(&declared, &self.types)),
                }
                declared
            }
        };
        let access = AccessModifier::from_flags(def.is_public, def.is_const);
        env.define(&def.name, declared, access, value.unwrap_or(Value::Null))
            .map_err(|e| self.locate(e, loc, env))?;
        Ok(Flow::Normal(Value::Null))
    }

    /// The declared type a `:=` definition infers from its initializer. A
    /// type value infers the type it denotes.
    fn inferred_type(&self, value: &Value) -> TypeInfo {
        match value {
            Value::Struct(st) => st.type_info.clone(),
            Value::Interface(it) => it.type_info.clone(),
            other => other.type_info(&self.types),
        }
    }

    pub(crate) fn define_function(&mut self, def: &FunctionDef, env: &Env, loc: CodeLoc) -> RunResult<()> {
        if env.contains_in_this_scope(&def.name) {
            return Err(self.error(
                ErrorKind::RedeclarationError,
                format!("Function `{}` already declared in this scope", def.name),
                loc,
                env,
            ));
        }
        let ret_type = match &def.ret_type {
            Some(name) => self.resolve_type_name(name, env, loc)?,
            None => self.types.any(),
        };
        let func = Function::user(
            self.next_function_id(),
            Rc::clone(&def.name),
            def.params.clone(),
            ret_type,
            Rc::clone(&def.body),
            Rc::clone(env),
        );
        let access = if def.is_public { AccessModifier::PublicConst } else { AccessModifier::Const };
        env.define(&def.name, self.types.function(), access, Value::Function(Rc::new(func)))
            .map_err(|e| self.locate(e, loc, env))?;
        Ok(())
    }

    fn exec_struct_def(&mut self, def: &StructDef, env: &Env, loc: CodeLoc) -> RunResult<Flow> {
        if env.contains_in_this_scope(&def.name) {
            return Err(self.error(
                ErrorKind::RedeclarationError,
                format!("Structure '{}' already defined in this scope", def.name),
                loc,
                env,
            ));
        }
        let type_info = self.types.register(&def.name);
        let def_env = Scope::new(
            format!("<Struct {} at {}:{}>", def.name, loc.line, loc.column),
            ScopeKind::Block,
            Some(env),
        );
        let struct_type = Rc::new(StructType {
            type_info,
            def_env: Some(Rc::clone(&def_env)),
            fields: std::cell::RefCell::new(Vec::new()),
            builtin: false,
        });
        let value = Value::Struct(Rc::clone(&struct_type));
        let access = if def.is_public { AccessModifier::PublicConst } else { AccessModifier::Const };
        // Pre-defined in both scopes, so fields, defaults and methods can
        // refer to the struct itself.
        env.define(&def.name, self.types.struct_type(), access, value.clone())
            .map_err(|e| self.locate(e, loc, env))?;
        def_env
            .define(&def.name, self.types.struct_type(), AccessModifier::Const, value)
            .map_err(|e| self.locate(e, loc, env))?;

        let mut fields = Vec::with_capacity(def.fields.len());
        let mut seen: HashSet<&str> = HashSet::new();
        for field in &def.fields {
            if !seen.insert(&field.name) {
                return Err(self.error(
                    ErrorKind::RedeclarationError,
                    format!("Field '{}' already defined in structure '{}'", field.name, def.name),
                    field.loc,
                    env,
                ));
            }
            let ty = match &field.ty {
                Some(name) => self.resolve_type_name(name, env, field.loc)?,
                None => self.types.any(),
            };
            // Fields read back through member access regardless of a
            // `public` marker; `const`/`final` still reject writes.
            let access = match field.access {
                AccessModifier::Normal => AccessModifier::Public,
                AccessModifier::Const => AccessModifier::PublicConst,
                other => other,
            };
            fields.push(Field {
                access,
                name: Rc::clone(&field.name),
                ty,
                default: field.default.clone(),
            });
        }
        *struct_type.fields.borrow_mut() = fields;

        for method in &def.methods {
            self.define_function(method, &def_env, loc)?;
        }
        Ok(Flow::Normal(Value::Null))
    }

    fn exec_interface_def(&mut self, def: &InterfaceDef, env: &Env, loc: CodeLoc) -> RunResult<Flow> {
        if env.contains_in_this_scope(&def.name) {
            return Err(self.error(
                ErrorKind::RedeclarationError,
                format!("Interface `{}` already declared in this scope", def.name),
                loc,
                env,
            ));
        }
        let mut methods: Vec<InterfaceMethod> = def.methods.clone();
        let mut seen: AHashMap<Rc<str>, Rc<str>> = methods
            .iter()
            .map(|m| (Rc::clone(&m.name), Rc::clone(&def.name)))
            .collect();

        for bundle_name in &def.bundles {
            let Some(slot) = env.lookup(bundle_name) else {
                return Err(self.error(
                    ErrorKind::UndeclaredIdentifierError,
                    format!("Interface `{bundle_name}` is not defined"),
                    loc,
                    env,
                ));
            };
            let bundled_val = slot.borrow().value.clone();
            let Value::Interface(bundled) = &bundled_val else {
                return Err(self.error(
                    ErrorKind::TypeError,
                    format!(
                        "Cannot bundle `{bundle_name}`: '{}' is not an interface",
                        bundled_val.pretty_type(&self.types)
                    ),
                    loc,
                    env,
                ));
            };
            for method in &bundled.methods {
                if let Some(owner) = seen.get(&method.name) {
                    return Err(self.error(
                        ErrorKind::DuplicateImplementMethodError,
                        format!(
                            "Interface `{}` has duplicate method '{}' with '{owner}.{}'",
                            def.name, method.name, method.name
                        ),
                        loc,
                        env,
                    ));
                }
                seen.insert(Rc::clone(&method.name), Rc::clone(bundle_name));
                methods.push(method.clone());
            }
        }

        let type_info = self.types.register(&def.name);
        let access = if def.is_public { AccessModifier::PublicConst } else { AccessModifier::Const };
        env.define(
            &def.name,
            type_info.clone(),
            access,
            Value::Interface(Rc::new(crate::value::InterfaceType { type_info, methods })),
        )
        .map_err(|e| self.locate(e, loc, env))?;
        Ok(Flow::Normal(Value::Null))
    }

    fn exec_impl(&mut self, def: &ImplDef, env: &Env, loc: CodeLoc) -> RunResult<Flow> {
        let Some(interface_slot) = env.lookup(&def.interface_name) else {
            return Err(self.error(
                ErrorKind::UndeclaredIdentifierError,
                format!("Interface '{}' not found", def.interface_name),
                loc,
                env,
            ));
        };
        let Some(struct_slot) = env.lookup(&def.struct_name) else {
            return Err(self.error(
                ErrorKind::UndeclaredIdentifierError,
                format!("Struct '{}' not found", def.struct_name),
                loc,
                env,
            ));
        };
        let interface_val = interface_slot.borrow().value.clone();
        let struct_val = struct_slot.borrow().value.clone();
        let Value::Interface(interface) = interface_val else {
            return Err(self.error(
                ErrorKind::TypeError,
                format!("`{}` is not an interface", def.interface_name),
                loc,
                env,
            ));
        };
        let Value::Struct(struct_type) = struct_val else {
            return Err(self.error(
                ErrorKind::TypeError,
                format!("`{}` is not a struct type", def.struct_name),
                loc,
                env,
            ));
        };

        if &*def.interface_name == "Operation" {
            return self.register_operation_impl(def, &struct_type, env, loc);
        }

        if env.impl_registered(struct_type.type_info.id(), interface.type_info.id()) {
            return Err(self.error(
                ErrorKind::DuplicateImplementError,
                format!("Duplicate implement `{}` for `{}`", def.interface_name, def.struct_name),
                loc,
                env,
            ));
        }

        let mut iface_methods: AHashMap<&str, &InterfaceMethod> = AHashMap::new();
        for method in &interface.methods {
            if iface_methods.insert(&method.name, method).is_some() {
                return Err(self.error(
                    ErrorKind::DuplicateImplementMethodError,
                    format!(
                        "Interface '{}' has duplicate method '{}'",
                        def.interface_name, method.name
                    ),
                    loc,
                    env,
                ));
            }
        }

        let mut implemented: HashSet<&str> = HashSet::new();
        let mut record_methods: AHashMap<Rc<str>, Rc<Function>> = AHashMap::new();
        for impl_method in &def.methods {
            let Some(iface_method) = iface_methods.get(&*impl_method.name) else {
                return Err(self.error(
                    ErrorKind::RedundantImplementationError,
                    format!(
                        "Struct '{}' implements extra method '{}' which is not required by interface '{}'",
                        def.struct_name, impl_method.name, def.interface_name
                    ),
                    impl_method.loc,
                    env,
                ));
            };
            if implemented.contains(&*impl_method.name) {
                return Err(self.error(
                    ErrorKind::DuplicateImplementMethodError,
                    format!("Duplicate implement method '{}'", impl_method.name),
                    impl_method.loc,
                    env,
                ));
            }
            if !impl_method.params.signature_matches(&iface_method.params) {
                return Err(self.error(
                    ErrorKind::InterfaceSignatureMismatchError,
                    format!(
                        "Interface method '{}({})' signature mismatch with implementation '{}({})'",
                        iface_method.name,
                        iface_method.params.describe(),
                        impl_method.name,
                        impl_method.params.describe()
                    ),
                    impl_method.loc,
                    env,
                ));
            }
            if env.method_implemented(struct_type.type_info.id(), &impl_method.name) {
                return Err(self.error(
                    ErrorKind::DuplicateImplementMethodError,
                    format!(
                        "Method '{}' already implemented by another interface for struct '{}'",
                        impl_method.name, def.struct_name
                    ),
                    impl_method.loc,
                    env,
                ));
            }
            implemented.insert(&impl_method.name);

            let ret_type = self.resolve_type_name(&iface_method.ret_type, env, impl_method.loc)?;
            let func = Function::user(
                self.next_function_id(),
                Rc::clone(&impl_method.name),
                impl_method.params.clone(),
                ret_type,
                Rc::clone(&impl_method.body),
                Rc::clone(env),
            );
            record_methods.insert(Rc::clone(&impl_method.name), Rc::new(func));
        }

        for method in &interface.methods {
            if implemented.contains(&*method.name) || method.default_body.is_some() {
                continue;
            }
            return Err(self.error(
                ErrorKind::MissingImplementationError,
                format!(
                    "Struct '{}' does not implement required interface method '{}' and interface '{}' provides no default implementation",
                    def.struct_name, method.name, def.interface_name
                ),
                loc,
                env,
            ));
        }

        env.register_impl(Rc::new(ImplRecord {
            interface: Rc::clone(&interface),
            struct_type: struct_type.type_info.clone(),
            methods: record_methods,
        }));
        Ok(Flow::Normal(Value::Null))
    }

    /// `impl Operation for T`: each magic-named method lands in the operator
    /// registry instead of the impl registry.
    fn register_operation_impl(
        &mut self,
        def: &ImplDef,
        struct_type: &Rc<StructType>,
        env: &Env,
        loc: CodeLoc,
    ) -> RunResult<Flow> {
        if struct_type.builtin || self.types.is_builtin(&struct_type.type_info) {
            return Err(self.error(
                ErrorKind::TypeError,
                format!(
                    "Operators of builtin type `{}` cannot be overloaded",
                    struct_type.type_info
                ),
                loc,
                env,
            ));
        }
        for method in &def.methods {
            // Names outside the magic table are ignored.
            let Some((op, arity)) = magic_operator(&method.name) else { continue };
            let key = OperatorKey { type_id: struct_type.type_info.id(), op, arity };
            if env.operator_fn(key).is_some() {
                return Err(self.error(
                    ErrorKind::DuplicateImplementError,
                    format!("`{}` has already been implemented for `{}`", method.name, def.struct_name),
                    method.loc,
                    env,
                ));
            }
            let positional_only =
                method.params.defaulted.is_empty() && method.params.variadic.is_none();
            if !positional_only || method.params.positional.len() != arity as usize {
                return Err(self.error(
                    ErrorKind::InterfaceSignatureMismatchError,
                    format!(
                        "Operator {} for {} must take exactly {arity} positional parameters, got ({})",
                        method.name,
                        def.struct_name,
                        method.params.describe()
                    ),
                    method.loc,
                    env,
                ));
            }
            for param in &method.params.positional {
                let Some(ty_name) = &param.ty else { continue };
                let declared = self.resolve_type_name(ty_name, env, method.loc)?;
                if declared != self.types.any() && declared != struct_type.type_info {
                    return Err(self.error(
                        ErrorKind::TypeError,
                        format!(
                            "Operator parameter '{}' must be `Any` or `{}`, got `{declared}`",
                            param.name, struct_type.type_info
                        ),
                        method.loc,
                        env,
                    ));
                }
            }
            let name = format!("Operation.{}.{}", struct_type.type_info, method.name);
            let func = Function::user(
                self.next_function_id(),
                name,
                method.params.clone(),
                self.types.any(),
                Rc::clone(&method.body),
                Rc::clone(env),
            );
            env.register_operator(key, Rc::new(func));
        }
        Ok(Flow::Normal(Value::Null))
    }

    fn exec_try(
        &mut self,
        body: &Block,
        catches: &[crate::ast::CatchClause],
        finally: Option<&Block>,
        env: &Env,
        loc: CodeLoc,
    ) -> RunResult<Flow> {
        let try_env = Scope::new(
            format!("<Try {}:{}>", loc.line, loc.column),
            ScopeKind::Block,
            Some(env),
        );
        let mut outcome = self.exec_block(body, &try_env);

        if let Err(err) = outcome {
            let mut handled = None;
            for catch in catches {
                let declared = match &catch.ty {
                    Some(name) => Some(self.resolve_type_name(name, env, catch.loc)?),
                    None => None,
                };
                // Host-raised errors bind as "<Kind>: <message>" strings;
                // thrown values keep their identity.
                let bound = match &err {
                    crate::exception::RunError::Thrown { value, .. } => value.clone(),
                    crate::exception::RunError::Raised(e) => {
                        Value::str_from(&format!("{}: {}", e.kind, e.message))
                    }
                };
                let matches = declared
                    .as_ref()
                    .is_none_or(|ti| type_matches(ti, &bound, env, &self.types));
                if matches {
                    let catch_env = Scope::new(
                        format!("<Catch {}:{}>", catch.loc.line, catch.loc.column),
                        ScopeKind::Block,
                        Some(env),
                    );
                    catch_env
                        .define(
                            &catch.var_name,
                            declared.unwrap_or_else(|| self.types.any()),
                            AccessModifier::Normal,
                            bound,
                        )
                        .map_err(|e| self.locate(e, catch.loc, env))?;
                    handled = Some(self.exec_block(&catch.body, &catch_env));
                    break;
                }
            }
            // No matching catch: the error keeps propagating outward.
            outcome = handled.unwrap_or(Err(err));
        }

        if let Some(finally_block) = finally {
            let finally_env = Scope::new(
                format!("<Finally {}:{}>", finally_block.loc.line, finally_block.loc.column),
                ScopeKind::Block,
                Some(env),
            );
            match self.exec_block(finally_block, &finally_env)? {
                // A normal finally preserves the try/catch outcome; any other
                // flow overrides it.
                Flow::Normal(_) => {}
                flow => outcome = Ok(flow),
            }
        }
        outcome
    }
}
