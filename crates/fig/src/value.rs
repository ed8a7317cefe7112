//! The runtime value sum and its identity/equality/display semantics.
//!
//! Values are shared by reference: containers, strings and struct instances
//! sit behind `Rc<RefCell<..>>`, so mutation through one alias is visible
//! through every other. Cyclic graphs (an instance whose methods close over
//! the instance's own scope) are not reclaimed until the session ends.

use std::{cell::RefCell, fmt, hash::Hash, rc::Rc};

use indexmap::IndexMap;

use crate::{
    ast::{AccessModifier, Expr, InterfaceMethod},
    env::Env,
    function::{Function, FunctionKind},
    text::FigStr,
    type_info::{BuiltinType, TypeInfo, TypeRegistry},
};

pub type StrRef = Rc<RefCell<FigStr>>;
pub type ListRef = Rc<RefCell<Vec<Value>>>;
pub type MapRef = Rc<RefCell<ValueMap>>;
pub type ValueMap = IndexMap<MapKey, Value, ahash::RandomState>;

/// Numeric equality tolerance (`1e-9`), applied by `==`/`!=` and the
/// compound comparisons.
pub const EPSILON: f64 = 1e-9;

#[must_use]
pub fn nearly_equal(lhs: f64, rhs: f64) -> bool {
    (lhs - rhs).abs() < EPSILON
}

#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(StrRef),
    List(ListRef),
    Map(MapRef),
    Function(Rc<Function>),
    Struct(Rc<StructType>),
    Instance(Rc<StructInstance>),
    Module(Rc<Module>),
    Interface(Rc<InterfaceType>),
}

/// A struct field: modifier, name, declared type and optional default
/// expression (evaluated in the struct's defining scope at instantiation).
#[derive(Debug, Clone)]
pub struct Field {
    pub access: AccessModifier,
    pub name: Rc<str>,
    pub ty: TypeInfo,
    pub default: Option<Expr>,
}

pub struct StructType {
    pub type_info: TypeInfo,
    /// Scope the struct was defined in; methods live here. `None` only for
    /// the builtin type objects (`Int`, `String`, ...).
    pub def_env: Option<Env>,
    /// Filled in after the type value is pre-defined, so field default
    /// expressions may refer to the struct itself.
    pub fields: RefCell<Vec<Field>>,
    pub builtin: bool,
}

pub struct StructInstance {
    pub parent: TypeInfo,
    /// Fields plus rebound methods; parent scope is the struct's defining
    /// scope.
    pub env: Env,
}

pub struct Module {
    pub name: Rc<str>,
    pub env: Env,
}

pub struct InterfaceType {
    pub type_info: TypeInfo,
    pub methods: Vec<InterfaceMethod>,
}

impl Value {
    #[must_use]
    pub fn str_from(text: &str) -> Self {
        Self::Str(Rc::new(RefCell::new(FigStr::from(text))))
    }

    #[must_use]
    pub fn str_value(text: FigStr) -> Self {
        Self::Str(Rc::new(RefCell::new(text)))
    }

    #[must_use]
    pub fn list_from(items: Vec<Self>) -> Self {
        Self::List(Rc::new(RefCell::new(items)))
    }

    #[must_use]
    pub fn map_from(map: ValueMap) -> Self {
        Self::Map(Rc::new(RefCell::new(map)))
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Double(_))
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// The value's runtime type. Struct instances report the generic
    /// `StructInstance` type; their concrete parent type is carried on the
    /// instance itself.
    #[must_use]
    pub fn type_info(&self, types: &TypeRegistry) -> TypeInfo {
        let builtin = match self {
            Self::Null => BuiltinType::Null,
            Self::Bool(_) => BuiltinType::Bool,
            Self::Int(_) => BuiltinType::Int,
            Self::Double(_) => BuiltinType::Double,
            Self::Str(_) => BuiltinType::String,
            Self::List(_) => BuiltinType::List,
            Self::Map(_) => BuiltinType::Map,
            Self::Function(_) => BuiltinType::Function,
            Self::Struct(_) => BuiltinType::StructType,
            Self::Instance(_) => BuiltinType::StructInstance,
            Self::Module(_) => BuiltinType::Module,
            Self::Interface(_) => BuiltinType::InterfaceType,
        };
        types.builtin(builtin)
    }

    /// Type name for diagnostics: the parent type name for instances, the
    /// runtime type name for everything else.
    #[must_use]
    pub fn pretty_type(&self, types: &TypeRegistry) -> String {
        match self {
            Self::Instance(inst) => inst.parent.name().to_owned(),
            other => other.type_info(types).name().to_owned(),
        }
    }

    /// The zero value of a declared type, used when a typed definition has
    /// no initializer.
    #[must_use]
    pub fn default_for(ty: &TypeInfo, types: &TypeRegistry) -> Self {
        if *ty == types.int() {
            Self::Int(0)
        } else if *ty == types.double() {
            Self::Double(0.0)
        } else if *ty == types.string() {
            Self::str_from("")
        } else if *ty == types.bool() {
            Self::Bool(false)
        } else if *ty == types.list() {
            Self::list_from(Vec::new())
        } else if *ty == types.map() {
            Self::map_from(ValueMap::default())
        } else {
            Self::Null
        }
    }

    /// Structural equality with the numeric epsilon; identity for instances
    /// and id equality for functions and named types.
    #[must_use]
    pub fn eq_value(&self, other: &Self) -> bool {
        if let (Some(l), Some(r)) = (self.as_f64(), other.as_f64()) {
            return nearly_equal(l, r);
        }
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(l), Self::Bool(r)) => l == r,
            (Self::Str(l), Self::Str(r)) => Rc::ptr_eq(l, r) || *l.borrow() == *r.borrow(),
            (Self::List(l), Self::List(r)) => {
                if Rc::ptr_eq(l, r) {
                    return true;
                }
                let (l, r) = (l.borrow(), r.borrow());
                l.len() == r.len() && l.iter().zip(r.iter()).all(|(a, b)| a.eq_value(b))
            }
            (Self::Map(l), Self::Map(r)) => {
                if Rc::ptr_eq(l, r) {
                    return true;
                }
                let (l, r) = (l.borrow(), r.borrow());
                l.len() == r.len()
                    && l.iter().all(|(k, v)| r.get(k).is_some_and(|other| v.eq_value(other)))
            }
            (Self::Function(l), Self::Function(r)) => l.id == r.id,
            (Self::Struct(l), Self::Struct(r)) => l.type_info == r.type_info,
            (Self::Instance(l), Self::Instance(r)) => Rc::ptr_eq(l, r),
            (Self::Module(l), Self::Module(r)) => l.name == r.name,
            (Self::Interface(l), Self::Interface(r)) => l.type_info == r.type_info,
            _ => false,
        }
    }

    /// Display form with strings quoted, as seen inside containers.
    #[must_use]
    pub fn display(&self) -> String {
        let mut out = String::new();
        let mut visited = Vec::new();
        self.write_display(&mut out, &mut visited);
        out
    }

    /// Display form for IO: strings print raw, everything else as
    /// [`Self::display`].
    #[must_use]
    pub fn display_plain(&self) -> String {
        match self {
            Self::Str(s) => s.borrow().to_string(),
            other => other.display(),
        }
    }

    fn write_display(&self, out: &mut String, visited: &mut Vec<usize>) {
        match self {
            Self::Null => out.push_str("null"),
            Self::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Self::Int(i) => out.push_str(&i.to_string()),
            Self::Double(d) => out.push_str(&format_double(*d)),
            Self::Str(s) => {
                out.push('"');
                out.push_str(&s.borrow().to_string());
                out.push('"');
            }
            Self::List(items) => {
                let addr = Rc::as_ptr(items) as usize;
                if visited.contains(&addr) {
                    out.push_str("[...]");
                    return;
                }
                visited.push(addr);
                out.push('[');
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.write_display(out, visited);
                }
                out.push(']');
                visited.pop();
            }
            Self::Map(map) => {
                let addr = Rc::as_ptr(map) as usize;
                if visited.contains(&addr) {
                    out.push_str("{...}");
                    return;
                }
                visited.push(addr);
                out.push('{');
                for (i, (key, value)) in map.borrow().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    key.0.write_display(out, visited);
                    out.push_str(" : ");
                    value.write_display(out, visited);
                }
                out.push('}');
                visited.pop();
            }
            Self::Function(f) => {
                let name = match &f.kind {
                    FunctionKind::User(user) => user.name.to_string(),
                    FunctionKind::Builtin(b) => (*b).to_string(),
                    FunctionKind::Bound(bound) => bound.method.name().to_owned(),
                };
                out.push_str(&format!("<Function '{name}'({})>", f.id));
            }
            Self::Struct(st) => out.push_str(&format!("<StructType '{}'>", st.type_info.name())),
            Self::Instance(inst) => {
                out.push_str(&format!("<StructInstance '{}'>", inst.parent.name()));
            }
            Self::Module(m) => out.push_str(&format!("<Module '{}'>", m.name)),
            Self::Interface(i) => {
                out.push_str(&format!("<InterfaceType '{}'>", i.type_info.name()));
            }
        }
    }
}

/// Whether a value satisfies a declared type.
///
/// `Any` is top. A struct instance matches its own parent type and any
/// interface that parent implements in a scope reachable from `env`.
#[must_use]
pub fn type_matches(declared: &TypeInfo, value: &Value, env: &crate::env::Scope, types: &TypeRegistry) -> bool {
    if *declared == types.any() {
        return true;
    }
    if value.type_info(types) == *declared {
        return true;
    }
    if let Value::Instance(inst) = value {
        if inst.parent == *declared {
            return true;
        }
        return env.implements(inst.parent.id(), declared.id());
    }
    false
}

/// `2.0` displays as `2`, `2.5` as `2.5`; ryu keeps the shortest form that
/// round-trips.
#[must_use]
pub fn format_double(d: f64) -> String {
    if d.is_nan() {
        return "nan".to_owned();
    }
    if d.is_infinite() {
        return if d > 0.0 { "inf".to_owned() } else { "-inf".to_owned() };
    }
    let mut buffer = ryu::Buffer::new();
    let text = buffer.format(d);
    text.strip_suffix(".0").unwrap_or(text).to_owned()
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// A `Map` key.
///
/// Scalars, strings and named-type values compare structurally; containers
/// and instances compare by identity. Float keys compare by bit pattern, so
/// key equality is exact even though `==` on values is epsilon-based.
#[derive(Debug, Clone)]
pub struct MapKey(pub Value);

impl PartialEq for MapKey {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(l), Value::Bool(r)) => l == r,
            (Value::Int(l), Value::Int(r)) => l == r,
            (Value::Double(l), Value::Double(r)) => l.to_bits() == r.to_bits(),
            (Value::Str(l), Value::Str(r)) => Rc::ptr_eq(l, r) || *l.borrow() == *r.borrow(),
            (Value::List(l), Value::List(r)) => Rc::ptr_eq(l, r),
            (Value::Map(l), Value::Map(r)) => Rc::ptr_eq(l, r),
            (Value::Function(l), Value::Function(r)) => l.id == r.id,
            (Value::Struct(l), Value::Struct(r)) => l.type_info == r.type_info,
            (Value::Instance(l), Value::Instance(r)) => Rc::ptr_eq(l, r),
            (Value::Module(l), Value::Module(r)) => Rc::ptr_eq(l, r),
            (Value::Interface(l), Value::Interface(r)) => l.type_info == r.type_info,
            _ => false,
        }
    }
}

impl Eq for MapKey {}

impl Hash for MapKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(&self.0).hash(state);
        match &self.0 {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Double(d) => d.to_bits().hash(state),
            Value::Str(s) => s.borrow().hash(state),
            Value::List(l) => (Rc::as_ptr(l) as usize).hash(state),
            Value::Map(m) => (Rc::as_ptr(m) as usize).hash(state),
            Value::Function(f) => f.id.hash(state),
            Value::Struct(s) => s.type_info.id().hash(state),
            Value::Instance(i) => (Rc::as_ptr(i) as usize).hash(state),
            Value::Module(m) => (Rc::as_ptr(m) as usize).hash(state),
            Value::Interface(i) => i.type_info.id().hash(state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epsilon_equality() {
        assert!(Value::Int(2).eq_value(&Value::Double(2.0)));
        assert!(Value::Double(0.1).eq_value(&Value::Double(0.1 + 1e-12)));
        assert!(!Value::Double(0.1).eq_value(&Value::Double(0.2)));
        assert!(!Value::Int(1).eq_value(&Value::Bool(true)));
    }

    #[test]
    fn double_display_trims_trailing_zero() {
        assert_eq!(format_double(2.0), "2");
        assert_eq!(format_double(2.5), "2.5");
        assert_eq!(format_double(-0.001), "-0.001");
    }

    #[test]
    fn map_keys_are_structural_for_scalars() {
        let mut map = ValueMap::default();
        map.insert(MapKey(Value::str_from("k")), Value::Int(1));
        assert!(map.contains_key(&MapKey(Value::str_from("k"))));
        map.insert(MapKey(Value::Int(3)), Value::Int(2));
        assert!(map.contains_key(&MapKey(Value::Int(3))));
        // Int and Double keys are distinct even when numerically equal.
        assert!(!map.contains_key(&MapKey(Value::Double(3.0))));
    }

    #[test]
    fn list_keys_are_identity() {
        let list = Value::list_from(vec![Value::Int(1)]);
        let same_shape = Value::list_from(vec![Value::Int(1)]);
        let mut map = ValueMap::default();
        map.insert(MapKey(list.clone()), Value::Bool(true));
        assert!(map.contains_key(&MapKey(list)));
        assert!(!map.contains_key(&MapKey(same_shape)));
    }

    #[test]
    fn cyclic_list_display_terminates() {
        let inner: ListRef = Rc::new(RefCell::new(vec![Value::Int(1)]));
        inner.borrow_mut().push(Value::List(Rc::clone(&inner)));
        assert_eq!(Value::List(inner).display(), "[1, [...]]");
    }
}
