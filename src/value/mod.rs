//! Defines the [`Value`] enum, the uniform representation of data while
//! rendering.

mod from;
mod function;
mod object;
#[cfg(feature = "serde")]
mod ser;

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

pub use std::collections::BTreeMap as Map;
pub use std::vec::Vec as List;

pub use crate::value::function::{
    CallError, Callable, Function, FunctionArg, FunctionArgs, FunctionReturn, Rest,
};
pub use crate::value::object::Object;
#[cfg(feature = "serde")]
pub use crate::value::ser::to_value;

/// Data to be rendered represented as a recursive enum.
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    /// A string that is already escaped and is written as is.
    Safe(String),
    List(List<Value>),
    Map(Map<String, Value>),
    /// A callable host function.
    Function(Function),
    /// An opaque host value exposing fields and methods through [`Object`].
    Object(Arc<dyn Object>),
}

impl Value {
    /// Constructs a string value that will not be escaped when rendered.
    pub fn safe(s: impl Into<String>) -> Self {
        Self::Safe(s.into())
    }

    /// Constructs a callable value from a Rust function or closure.
    ///
    /// See [`Function::new`] for the supported signatures.
    pub fn function<F, R, A>(f: F) -> Self
    where
        F: Callable<R, A> + Send + Sync + 'static,
        R: FunctionReturn,
        A: FunctionArgs,
    {
        Self::Function(Function::new(f))
    }

    /// Wraps a host object.
    pub fn object<O>(object: O) -> Self
    where
        O: Object + 'static,
    {
        Self::Object(Arc::new(object))
    }

    /// A human readable name of the kind of value, used in error messages.
    pub fn human(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) | Self::Safe(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Function(_) => "function",
            Self::Object(o) => o.type_name(),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Whether the value is a string marked as safe.
    pub fn is_safe(&self) -> bool {
        matches!(self, Self::Safe(_))
    }

    /// Returns the text of a string value, safe or not.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Safe(s) => Some(s),
            _ => None,
        }
    }

    /// Truthiness as used by `if` and boolean operators.
    ///
    /// None, `false`, zero, and empty strings, lists and maps are false.
    pub fn is_true(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(b) => *b,
            Self::Integer(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::String(s) | Self::Safe(s) => !s.is_empty(),
            Self::List(l) => !l.is_empty(),
            Self::Map(m) => !m.is_empty(),
            Self::Function(_) => true,
            Self::Object(o) => o.is_true(),
        }
    }

    /// Orders two values.
    ///
    /// Numbers compare numerically, strings lexicographically and lists
    /// element-wise. Any other combination is incomparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::Integer(a), Self::Float(b)) => (*a as f64).partial_cmp(b),
            (Self::Float(a), Self::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::List(a), Self::List(b)) => {
                for (x, y) in a.iter().zip(b) {
                    match x.compare(y)? {
                        Ordering::Equal => continue,
                        ord => return Some(ord),
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            (a, b) => match (a.as_str(), b.as_str()) {
                (Some(a), Some(b)) => Some(a.cmp(b)),
                _ => None,
            },
        }
    }

    /// Looks up `key` in this value.
    ///
    /// Integer keys index lists and strings, negative indices count from the
    /// end. Any other key is converted to a string and looked up in maps.
    /// Missing entries yield [`Value::None`].
    pub fn index(&self, key: &Value) -> Value {
        match (self, key) {
            (Self::List(list), Self::Integer(i)) => {
                position(list.len(), *i).map_or(Self::None, |i| list[i].clone())
            }
            (Self::String(s) | Self::Safe(s), Self::Integer(i)) => {
                let len = s.chars().count();
                position(len, *i)
                    .and_then(|i| s.chars().nth(i))
                    .map_or(Self::None, |c| Self::String(c.to_string()))
            }
            (Self::Map(map), key) => match map_key(key) {
                Some(k) => map.get(k.as_ref()).cloned().unwrap_or(Self::None),
                None => Self::None,
            },
            (Self::Object(object), key) => object.get(key).unwrap_or(Self::None),
            _ => Self::None,
        }
    }

    /// Looks up an attribute, as in `value.name` or `value.0`.
    ///
    /// Host objects are asked for a field first, then for a method callable
    /// without arguments, then for a keyed entry. A failing method resolves
    /// to [`Value::None`]; use [`try_attr`][Value::try_attr] to observe the
    /// error.
    pub fn attr(&self, name: &str) -> Value {
        self.try_attr(name).unwrap_or(Self::None)
    }

    /// Like [`attr`][Value::attr] but returns the error of a failing host
    /// method.
    pub fn try_attr(&self, name: &str) -> Result<Value, CallError> {
        let value = match self {
            Self::Map(map) => map.get(name).cloned().unwrap_or(Self::None),
            Self::List(_) | Self::String(_) | Self::Safe(_) => match name.parse::<i64>() {
                Ok(i) => self.index(&Self::Integer(i)),
                Err(_) => Self::None,
            },
            Self::Object(object) => {
                if let Some(v) = object.field(name) {
                    return Ok(v);
                }
                if let Some(result) = object.call_method(name, &[]) {
                    return result;
                }
                let key = match name.parse::<i64>() {
                    Ok(i) => Self::Integer(i),
                    Err(_) => Self::String(name.to_owned()),
                };
                object.get(&key).unwrap_or(Self::None)
            }
            _ => Self::None,
        };
        Ok(value)
    }

    /// Whether `item` is contained in this value, as used by `in`.
    pub fn contains(&self, item: &Value) -> bool {
        match self {
            Self::String(s) | Self::Safe(s) => item.as_str().map_or(false, |i| s.contains(i)),
            Self::List(list) => list.iter().any(|v| v == item),
            Self::Map(map) => map_key(item).map_or(false, |k| map.contains_key(k.as_ref())),
            Self::Object(object) => match object.iter() {
                Some(values) => values.iter().any(|v| v == item),
                None => object.get(item).is_some(),
            },
            _ => false,
        }
    }

    /// The number of elements, characters or entries, if the value has a
    /// length.
    pub fn length(&self) -> Option<usize> {
        match self {
            Self::String(s) | Self::Safe(s) => Some(s.chars().count()),
            Self::List(l) => Some(l.len()),
            Self::Map(m) => Some(m.len()),
            Self::Object(o) => o.length(),
            _ => None,
        }
    }

    /// Best effort integer conversion, falling back to zero.
    pub fn to_integer(&self) -> i64 {
        match self {
            Self::Integer(i) => *i,
            Self::Float(f) => *f as i64,
            Self::Bool(b) => i64::from(*b),
            Self::String(s) | Self::Safe(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
                    .unwrap_or(0)
            }
            _ => 0,
        }
    }

    /// Best effort float conversion, falling back to zero.
    pub fn to_float(&self) -> f64 {
        match self {
            Self::Integer(i) => *i as f64,
            Self::Float(f) => *f,
            Self::Bool(b) => f64::from(u8::from(*b)),
            Self::String(s) | Self::Safe(s) => s.trim().parse().unwrap_or(0.0),
            _ => 0.0,
        }
    }
}

/// Resolves a possibly negative index against a length.
fn position(len: usize, i: i64) -> Option<usize> {
    let i = if i < 0 {
        len.checked_sub(usize::try_from(i.unsigned_abs()).ok()?)?
    } else {
        usize::try_from(i).ok()?
    };
    (i < len).then_some(i)
}

fn map_key(key: &Value) -> Option<std::borrow::Cow<'_, str>> {
    match key {
        Value::String(s) | Value::Safe(s) => Some(s.as_str().into()),
        Value::Integer(_) | Value::Bool(_) | Value::Float(_) => Some(key.to_string().into()),
        _ => None,
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Integer(_) | Self::Float(_), Self::Integer(_) | Self::Float(_)) => {
                self.to_float() == other.to_float()
            }
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Function(a), Self::Function(b)) => a.ptr_eq(b),
            (Self::Object(a), Self::Object(b)) => {
                Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
            }
            (a, b) => match (a.as_str(), b.as_str()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::String(s) | Self::Safe(s) => f.write_str(s),
            Self::List(list) => {
                f.write_str("[")?;
                for (i, v) in list.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    fmt_repr(v, f)?;
                }
                f.write_str("]")
            }
            Self::Map(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "'{k}': ")?;
                    fmt_repr(v, f)?;
                }
                f.write_str("}")
            }
            Self::Function(_) => f.write_str("<function>"),
            Self::Object(o) => match o.to_display() {
                Some(s) => f.write_str(&s),
                None => write!(f, "<{}>", o.type_name()),
            },
        }
    }
}

/// Formats nested values, quoting strings.
fn fmt_repr(v: &Value, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match v {
        Value::String(s) | Value::Safe(s) => write!(f, "'{s}'"),
        Value::None => f.write_str("None"),
        v => write!(f, "{v}"),
    }
}
