//! Builtin member methods on `String`, `List` and `Map` values.

use crate::{
    exception::{ErrorKind, FigError},
    text::FigStr,
    type_info::TypeRegistry,
    value::{MapKey, Value},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeMethod {
    StrLength,
    StrReplace,
    StrErase,
    StrInsert,
    ListLength,
    ListGet,
    ListPush,
    MapGet,
    MapContains,
}

impl TypeMethod {
    /// Resolves `receiver.name` against the builtin method catalog.
    #[must_use]
    pub fn lookup(receiver: &Value, name: &str) -> Option<Self> {
        let method = match (receiver, name) {
            (Value::Str(_), "length") => Self::StrLength,
            (Value::Str(_), "replace") => Self::StrReplace,
            (Value::Str(_), "erase") => Self::StrErase,
            (Value::Str(_), "insert") => Self::StrInsert,
            (Value::List(_), "length") => Self::ListLength,
            (Value::List(_), "get") => Self::ListGet,
            (Value::List(_), "push") => Self::ListPush,
            (Value::Map(_), "get") => Self::MapGet,
            (Value::Map(_), "contains") => Self::MapContains,
            _ => return None,
        };
        Some(method)
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::StrLength | Self::ListLength => "length",
            Self::StrReplace => "replace",
            Self::StrErase => "erase",
            Self::StrInsert => "insert",
            Self::ListGet | Self::MapGet => "get",
            Self::ListPush => "push",
            Self::MapContains => "contains",
        }
    }

    #[must_use]
    pub fn arity(self) -> usize {
        match self {
            Self::StrLength | Self::ListLength => 0,
            Self::ListGet | Self::ListPush | Self::MapGet | Self::MapContains => 1,
            Self::StrReplace | Self::StrErase | Self::StrInsert => 2,
        }
    }

    pub fn invoke(self, receiver: &Value, args: &[Value], types: &TypeRegistry) -> Result<Value, FigError> {
        match self {
            Self::StrLength => {
                let Value::Str(s) = receiver else { unreachable!("receiver checked at lookup") };
                Ok(Value::Int(s.borrow().len() as i64))
            }
            Self::StrReplace => {
                let Value::Str(s) = receiver else { unreachable!("receiver checked at lookup") };
                let index = int_arg(self, 1, &args[0], types)?;
                let text = str_arg(self, 2, &args[1], types)?;
                let mut s = s.borrow_mut();
                let end = usize::try_from(index).ok().map(|i| i + text.len());
                if index < 0 || end.is_none_or(|e| e > s.len()) {
                    return Err(FigError::new(
                        ErrorKind::IndexOutOfRangeError,
                        format!("`replace` at index {index} is out of range"),
                    ));
                }
                s.replace(index as usize, &text);
                Ok(Value::Null)
            }
            Self::StrErase => {
                let Value::Str(s) = receiver else { unreachable!("receiver checked at lookup") };
                let index = int_arg(self, 1, &args[0], types)?;
                let count = int_arg(self, 2, &args[1], types)?;
                let mut s = s.borrow_mut();
                if index < 0 || count < 0 || (index as usize) + (count as usize) > s.len() {
                    return Err(FigError::new(
                        ErrorKind::IndexOutOfRangeError,
                        format!("`erase` of {count} at index {index} is out of range"),
                    ));
                }
                s.erase(index as usize, count as usize);
                Ok(Value::Null)
            }
            Self::StrInsert => {
                let Value::Str(s) = receiver else { unreachable!("receiver checked at lookup") };
                let index = int_arg(self, 1, &args[0], types)?;
                let text = str_arg(self, 2, &args[1], types)?;
                let mut s = s.borrow_mut();
                if index < 0 || index as usize > s.len() {
                    return Err(FigError::new(
                        ErrorKind::IndexOutOfRangeError,
                        format!("`insert` at index {index} is out of range"),
                    ));
                }
                s.insert(index as usize, &text);
                Ok(Value::Null)
            }
            Self::ListLength => {
                let Value::List(list) = receiver else { unreachable!("receiver checked at lookup") };
                Ok(Value::Int(list.borrow().len() as i64))
            }
            Self::ListGet => {
                let Value::List(list) = receiver else { unreachable!("receiver checked at lookup") };
                let index = int_arg(self, 1, &args[0], types)?;
                let list = list.borrow();
                if index < 0 || index as usize >= list.len() {
                    return Ok(Value::Null);
                }
                Ok(list[index as usize].clone())
            }
            Self::ListPush => {
                let Value::List(list) = receiver else { unreachable!("receiver checked at lookup") };
                list.borrow_mut().push(args[0].clone());
                Ok(Value::Null)
            }
            Self::MapGet => {
                let Value::Map(map) = receiver else { unreachable!("receiver checked at lookup") };
                let key = MapKey(args[0].clone());
                Ok(map.borrow().get(&key).cloned().unwrap_or(Value::Null))
            }
            Self::MapContains => {
                let Value::Map(map) = receiver else { unreachable!("receiver checked at lookup") };
                let key = MapKey(args[0].clone());
                Ok(Value::Bool(map.borrow().contains_key(&key)))
            }
        }
    }
}

fn int_arg(method: TypeMethod, position: usize, value: &Value, types: &TypeRegistry) -> Result<i64, FigError> {
    match value {
        Value::Int(i) => Ok(*i),
        other => Err(FigError::new(
            ErrorKind::TypeError,
            format!(
                "`{}` argument {position} expects Int, got '{}'",
                method.name(),
                other.pretty_type(types)
            ),
        )),
    }
}

fn str_arg(method: TypeMethod, position: usize, value: &Value, types: &TypeRegistry) -> Result<FigStr, FigError> {
    match value {
        Value::Str(s) => Ok(s.borrow().clone()),
        other => Err(FigError::new(
            ErrorKind::TypeError,
            format!(
                "`{}` argument {position} expects String, got '{}'",
                method.name(),
                other.pretty_type(types)
            ),
        )),
    }
}
