//! Runtime type identities.
//!
//! A [`TypeInfo`] is a small id-keyed value; equality is id equality, never
//! string equality. Ids are handed out by a [`TypeRegistry`] owned by the
//! running session, so independent runs stay independent.

use std::{fmt, hash::Hash, rc::Rc};

use ahash::AHashMap;

#[derive(Debug, Clone)]
pub struct TypeInfo {
    id: usize,
    name: Rc<str>,
}

impl TypeInfo {
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl Hash for TypeInfo {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// The builtin types, in registration order.
///
/// Their ids occupy `0..BUILTIN_TYPE_COUNT`; every user struct or interface
/// registers above that range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum BuiltinType {
    Any,
    Null,
    Int,
    Double,
    Bool,
    String,
    Function,
    StructType,
    StructInstance,
    List,
    Map,
    Module,
    InterfaceType,
}

const BUILTIN_TYPE_NAMES: [&str; 13] = [
    "Any",
    "Null",
    "Int",
    "Double",
    "Bool",
    "String",
    "Function",
    "StructType",
    "StructInstance",
    "List",
    "Map",
    "Module",
    "InterfaceType",
];

pub const BUILTIN_TYPE_COUNT: usize = BUILTIN_TYPE_NAMES.len();

pub struct TypeRegistry {
    by_name: AHashMap<Rc<str>, TypeInfo>,
    builtins: Vec<TypeInfo>,
    next_id: usize,
}

impl TypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self {
            by_name: AHashMap::new(),
            builtins: Vec::with_capacity(BUILTIN_TYPE_COUNT),
            next_id: 0,
        };
        for name in BUILTIN_TYPE_NAMES {
            let info = registry.register(name);
            registry.builtins.push(info);
        }
        registry
    }

    /// Registers a type name, returning the existing identity when the name
    /// was registered before.
    pub fn register(&mut self, name: &str) -> TypeInfo {
        if let Some(existing) = self.by_name.get(name) {
            return existing.clone();
        }
        let name: Rc<str> = Rc::from(name);
        let info = TypeInfo { id: self.next_id, name: Rc::clone(&name) };
        self.next_id += 1;
        self.by_name.insert(name, info.clone());
        info
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<TypeInfo> {
        self.by_name.get(name).cloned()
    }

    #[must_use]
    pub fn builtin(&self, b: BuiltinType) -> TypeInfo {
        self.builtins[b as usize].clone()
    }

    #[must_use]
    pub fn is_builtin(&self, info: &TypeInfo) -> bool {
        info.id < BUILTIN_TYPE_COUNT
    }

    #[must_use]
    pub fn any(&self) -> TypeInfo {
        self.builtin(BuiltinType::Any)
    }

    #[must_use]
    pub fn null(&self) -> TypeInfo {
        self.builtin(BuiltinType::Null)
    }

    #[must_use]
    pub fn int(&self) -> TypeInfo {
        self.builtin(BuiltinType::Int)
    }

    #[must_use]
    pub fn double(&self) -> TypeInfo {
        self.builtin(BuiltinType::Double)
    }

    #[must_use]
    pub fn bool(&self) -> TypeInfo {
        self.builtin(BuiltinType::Bool)
    }

    #[must_use]
    pub fn string(&self) -> TypeInfo {
        self.builtin(BuiltinType::String)
    }

    #[must_use]
    pub fn function(&self) -> TypeInfo {
        self.builtin(BuiltinType::Function)
    }

    #[must_use]
    pub fn struct_type(&self) -> TypeInfo {
        self.builtin(BuiltinType::StructType)
    }

    #[must_use]
    pub fn struct_instance(&self) -> TypeInfo {
        self.builtin(BuiltinType::StructInstance)
    }

    #[must_use]
    pub fn list(&self) -> TypeInfo {
        self.builtin(BuiltinType::List)
    }

    #[must_use]
    pub fn map(&self) -> TypeInfo {
        self.builtin(BuiltinType::Map)
    }

    #[must_use]
    pub fn module(&self) -> TypeInfo {
        self.builtin(BuiltinType::Module)
    }

    #[must_use]
    pub fn interface_type(&self) -> TypeInfo {
        self.builtin(BuiltinType::InterfaceType)
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_by_id_not_name() {
        let mut reg = TypeRegistry::new();
        let a = reg.register("Point");
        let b = reg.register("Point");
        assert_eq!(a, b);
        assert_eq!(a.id(), b.id());
        assert!(!reg.is_builtin(&a));
        assert!(reg.is_builtin(&reg.int()));
    }

    #[test]
    fn builtin_names_resolve() {
        let reg = TypeRegistry::new();
        assert_eq!(reg.lookup("Int").unwrap(), reg.int());
        assert_eq!(reg.lookup("InterfaceType").unwrap(), reg.interface_type());
        assert!(reg.lookup("Missing").is_none());
    }
}
