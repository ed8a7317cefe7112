//! Assignable places.
//!
//! `eval_place` produces one of these for every expression that can appear
//! on the left of an assignment; a single read path and a single write path
//! replace the virtual-dispatch design the lvalue model usually invites.

use std::{cell::RefCell, rc::Rc};

use crate::{
    env::{Scope, VariableSlot},
    exception::{ErrorKind, FigError},
    text::FigStr,
    type_info::TypeRegistry,
    value::{ListRef, MapKey, MapRef, StrRef, Value, type_matches},
};

pub enum Place {
    Variable(Rc<RefCell<VariableSlot>>),
    ListIndex { list: ListRef, index: usize },
    MapEntry { map: MapRef, key: MapKey },
    StrIndex { text: StrRef, index: usize },
    /// A member-bound function. Callable, but reads back immutable.
    Bound(Value),
}

impl Place {
    pub fn get(&self) -> Result<Value, FigError> {
        match self {
            Self::Variable(slot) => Ok(slot.borrow().value.clone()),
            Self::ListIndex { list, index } => {
                let list = list.borrow();
                list.get(*index).cloned().ok_or_else(|| {
                    FigError::new(
                        ErrorKind::IndexOutOfRangeError,
                        format!("Index {index} out of range for list of length {}", list.len()),
                    )
                })
            }
            Self::MapEntry { map, key } => map.borrow().get(key).cloned().ok_or_else(|| {
                FigError::new(ErrorKind::KeyError, format!("Key {} not found", key.0.display()))
            }),
            Self::StrIndex { text, index } => {
                let text = text.borrow();
                text.char_at(*index).map(|c| Value::str_value(FigStr::from(c))).ok_or_else(|| {
                    FigError::new(
                        ErrorKind::IndexOutOfRangeError,
                        format!("Index {index} out of range for string of length {}", text.len()),
                    )
                })
            }
            Self::Bound(value) => Ok(value.clone()),
        }
    }

    pub fn set(&self, value: Value, env: &Scope, types: &TypeRegistry) -> Result<(), FigError> {
        match self {
            Self::Variable(slot) => {
                let mut slot = slot.borrow_mut();
                if !type_matches(&slot.declared_type, &value, env, types) {
                    return Err(FigError::new(
                        ErrorKind::TypeError,
                        format!(
                            "Variable `{}` expects type `{}`, but got '{}'",
                            slot.name,
                            slot.declared_type,
                            value.pretty_type(types)
                        ),
                    ));
                }
                if slot.access.is_const() {
                    return Err(FigError::new(
                        ErrorKind::ImmutableError,
                        format!("Variable `{}` is immutable", slot.name),
                    ));
                }
                slot.value = value;
                Ok(())
            }
            Self::ListIndex { list, index } => {
                let mut list = list.borrow_mut();
                if *index >= list.len() {
                    return Err(FigError::new(
                        ErrorKind::IndexOutOfRangeError,
                        format!("Index {index} out of range for list of length {}", list.len()),
                    ));
                }
                list[*index] = value;
                Ok(())
            }
            Self::MapEntry { map, key } => {
                map.borrow_mut().insert(key.clone(), value);
                Ok(())
            }
            Self::StrIndex { text, index } => {
                let Value::Str(replacement) = &value else {
                    return Err(FigError::new(
                        ErrorKind::TypeError,
                        format!("Cannot assign {} to a string element", value.display()),
                    ));
                };
                let replacement = replacement.borrow().clone();
                if replacement.len() != 1 {
                    return Err(FigError::new(
                        ErrorKind::TypeError,
                        format!(
                            "A string element takes exactly one code point, got \"{replacement}\""
                        ),
                    ));
                }
                let mut text = text.borrow_mut();
                if *index >= text.len() {
                    return Err(FigError::new(
                        ErrorKind::IndexOutOfRangeError,
                        format!("Index {index} out of range for string of length {}", text.len()),
                    ));
                }
                text.replace(*index, &replacement);
                Ok(())
            }
            Self::Bound(_) => Err(FigError::new(
                ErrorKind::ImmutableError,
                "A bound method is not assignable".to_owned(),
            )),
        }
    }

    /// The name a call through this place reports in diagnostics.
    #[must_use]
    pub fn name(&self) -> Option<Rc<str>> {
        match self {
            Self::Variable(slot) => Some(Rc::clone(&slot.borrow().name)),
            _ => None,
        }
    }
}
