//! Scoped environments.
//!
//! A scope maps names to variable slots and carries three registries that
//! lookups walk up the parent chain for: the function-id index, interface
//! implementation records, and operator-overload entries.

use std::{cell::RefCell, fmt, rc::Rc};

use ahash::AHashMap;

use crate::{
    ast::{AccessModifier, InterfaceMethod, Operator},
    exception::{ErrorKind, FigError},
    function::Function,
    type_info::TypeInfo,
    value::{InterfaceType, Value},
};

pub type Env = Rc<Scope>;

/// What a scope was opened for. Loop membership checks walk outward until
/// they hit a function or root boundary, so a closure body called from
/// inside a loop is not "in" that loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Module,
    Function,
    Loop,
    Block,
}

#[derive(Debug)]
pub struct VariableSlot {
    pub name: Rc<str>,
    pub value: Value,
    pub declared_type: TypeInfo,
    pub access: AccessModifier,
}

/// One `impl Interface for Struct` registration.
pub struct ImplRecord {
    pub interface: Rc<InterfaceType>,
    pub struct_type: TypeInfo,
    pub methods: AHashMap<Rc<str>, Rc<Function>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperatorKey {
    pub type_id: usize,
    pub op: Operator,
    pub arity: u8,
}

pub struct Scope {
    name: String,
    kind: ScopeKind,
    vars: RefCell<AHashMap<Rc<str>, Rc<RefCell<VariableSlot>>>>,
    functions: RefCell<AHashMap<u64, Rc<Function>>>,
    function_names: RefCell<AHashMap<u64, Rc<str>>>,
    impls: RefCell<AHashMap<(usize, usize), Rc<ImplRecord>>>,
    operators: RefCell<AHashMap<OperatorKey, Rc<Function>>>,
    parent: Option<Env>,
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Scope {}>", self.name)
    }
}

impl Scope {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ScopeKind, parent: Option<&Env>) -> Env {
        Rc::new(Self {
            name: name.into(),
            kind,
            vars: RefCell::new(AHashMap::new()),
            functions: RefCell::new(AHashMap::new()),
            function_names: RefCell::new(AHashMap::new()),
            impls: RefCell::new(AHashMap::new()),
            operators: RefCell::new(AHashMap::new()),
            parent: parent.map(Rc::clone),
        })
    }

    /// Defines a name in this scope; a name is defined at most once per
    /// scope. Function values are additionally indexed by their id.
    pub fn define(
        &self,
        name: &Rc<str>,
        declared_type: TypeInfo,
        access: AccessModifier,
        value: Value,
    ) -> Result<(), FigError> {
        if self.vars.borrow().contains_key(name) {
            return Err(FigError::new(
                ErrorKind::RedeclarationError,
                format!("`{name}` already declared in this scope"),
            ));
        }
        if let Value::Function(f) = &value {
            self.functions.borrow_mut().insert(f.id, Rc::clone(f));
            self.function_names.borrow_mut().insert(f.id, Rc::clone(name));
        }
        let slot = VariableSlot { name: Rc::clone(name), value, declared_type, access };
        self.vars.borrow_mut().insert(Rc::clone(name), Rc::new(RefCell::new(slot)));
        Ok(())
    }

    /// First hit wins along the parent chain.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Rc<RefCell<VariableSlot>>> {
        if let Some(slot) = self.vars.borrow().get(name) {
            return Some(Rc::clone(slot));
        }
        self.parent.as_ref().and_then(|p| p.lookup(name))
    }

    #[must_use]
    pub fn contains_in_this_scope(&self, name: &str) -> bool {
        self.vars.borrow().contains_key(name)
    }

    /// Scope-local slot lookup, used for instance member access.
    #[must_use]
    pub fn lookup_here(&self, name: &str) -> Option<Rc<RefCell<VariableSlot>>> {
        self.vars.borrow().get(name).map(Rc::clone)
    }

    /// Functions defined directly in this scope, with their names.
    #[must_use]
    pub fn own_functions(&self) -> Vec<(Rc<str>, Rc<Function>)> {
        let names = self.function_names.borrow();
        self.functions
            .borrow()
            .iter()
            .filter_map(|(id, f)| names.get(id).map(|n| (Rc::clone(n), Rc::clone(f))))
            .collect()
    }

    #[must_use]
    pub fn is_in_loop(&self) -> bool {
        match self.kind {
            ScopeKind::Loop => true,
            ScopeKind::Function | ScopeKind::Global | ScopeKind::Module => false,
            ScopeKind::Block => self.parent.as_ref().is_some_and(|p| p.is_in_loop()),
        }
    }

    /// Scope names from outermost to innermost, for stack traces.
    #[must_use]
    pub fn frames(&self) -> Vec<String> {
        let mut frames = vec![self.name.clone()];
        let mut current = self.parent.clone();
        while let Some(scope) = current {
            frames.push(scope.name.clone());
            current = scope.parent.clone();
        }
        frames.reverse();
        frames
    }

    // ----- impl registry -----

    #[must_use]
    pub fn impl_registered(&self, struct_id: usize, interface_id: usize) -> bool {
        if self.impls.borrow().contains_key(&(struct_id, interface_id)) {
            return true;
        }
        self.parent.as_ref().is_some_and(|p| p.impl_registered(struct_id, interface_id))
    }

    pub fn register_impl(&self, record: Rc<ImplRecord>) {
        let key = (record.struct_type.id(), record.interface.type_info.id());
        self.impls.borrow_mut().insert(key, record);
    }

    /// A concrete (non-default) method implemented for a type, from any
    /// record reachable in this scope chain.
    #[must_use]
    pub fn impl_method(&self, type_id: usize, name: &str) -> Option<Rc<Function>> {
        for record in self.impls.borrow().values() {
            if record.struct_type.id() == type_id
                && let Some(f) = record.methods.get(name)
            {
                return Some(Rc::clone(f));
            }
        }
        self.parent.as_ref().and_then(|p| p.impl_method(type_id, name))
    }

    #[must_use]
    pub fn method_implemented(&self, type_id: usize, name: &str) -> bool {
        self.impl_method(type_id, name).is_some()
    }

    /// An interface-default method applicable to a type: the type implements
    /// the interface, the interface method has a default body, and the impl
    /// did not override it.
    #[must_use]
    pub fn default_method(&self, type_id: usize, name: &str) -> Option<InterfaceMethod> {
        for record in self.impls.borrow().values() {
            if record.struct_type.id() != type_id || record.methods.contains_key(name) {
                continue;
            }
            let found = record
                .interface
                .methods
                .iter()
                .find(|m| &*m.name == name && m.default_body.is_some());
            if let Some(method) = found {
                return Some(method.clone());
            }
        }
        self.parent.as_ref().and_then(|p| p.default_method(type_id, name))
    }

    #[must_use]
    pub fn implements(&self, type_id: usize, interface_id: usize) -> bool {
        self.impl_registered(type_id, interface_id)
    }

    /// Copies this scope's own impl records into `target` (used when a
    /// module is imported).
    pub fn merge_impls_into(&self, target: &Self) {
        let mut dst = target.impls.borrow_mut();
        for (key, record) in self.impls.borrow().iter() {
            dst.insert(*key, Rc::clone(record));
        }
    }

    // ----- operator-overload registry -----

    #[must_use]
    pub fn operator_fn(&self, key: OperatorKey) -> Option<Rc<Function>> {
        if let Some(f) = self.operators.borrow().get(&key) {
            return Some(Rc::clone(f));
        }
        self.parent.as_ref().and_then(|p| p.operator_fn(key))
    }

    pub fn register_operator(&self, key: OperatorKey, func: Rc<Function>) {
        self.operators.borrow_mut().insert(key, func);
    }
}
