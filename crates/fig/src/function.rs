//! Function values.
//!
//! Three variants share one session-unique id space: user-defined functions
//! carrying their closure scope, builtins dispatched by table entry, and
//! member-bound builtin methods produced by `obj.method` access.

use std::rc::Rc;

use crate::{
    ast::{Block, FunctionParams},
    builtins::BuiltinFunction,
    env::Env,
    methods::TypeMethod,
    type_info::TypeInfo,
    value::Value,
};

pub struct Function {
    /// Unique for the session; two function values are equal iff their ids
    /// are equal.
    pub id: u64,
    pub kind: FunctionKind,
}

pub enum FunctionKind {
    User(UserFunction),
    Builtin(BuiltinFunction),
    Bound(BoundMethod),
}

pub struct UserFunction {
    pub name: Rc<str>,
    pub params: FunctionParams,
    pub ret_type: TypeInfo,
    pub body: Rc<Block>,
    pub closure: Env,
}

/// A builtin member method captured together with its receiver, so
/// `list.push` can be passed around and called later.
pub struct BoundMethod {
    pub receiver: Value,
    pub method: TypeMethod,
}

impl Function {
    #[must_use]
    pub fn user(
        id: u64,
        name: impl Into<Rc<str>>,
        params: FunctionParams,
        ret_type: TypeInfo,
        body: Rc<Block>,
        closure: Env,
    ) -> Self {
        Self {
            id,
            kind: FunctionKind::User(UserFunction { name: name.into(), params, ret_type, body, closure }),
        }
    }

    #[must_use]
    pub fn builtin(id: u64, builtin: BuiltinFunction) -> Self {
        Self { id, kind: FunctionKind::Builtin(builtin) }
    }

    #[must_use]
    pub fn bound(id: u64, receiver: Value, method: TypeMethod) -> Self {
        Self { id, kind: FunctionKind::Bound(BoundMethod { receiver, method }) }
    }

    #[must_use]
    pub fn as_user(&self) -> Option<&UserFunction> {
        match &self.kind {
            FunctionKind::User(user) => Some(user),
            _ => None,
        }
    }
}
