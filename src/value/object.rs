use std::fmt;

use crate::value::CallError;
use crate::Value;

/// An introspectable host value.
///
/// Implement this trait to expose a Rust type to templates without first
/// converting it into a [`Value::Map`] or [`Value::List`]. Attribute access
/// `obj.name` asks for [`field`][Object::field] first, then for a method
/// callable without arguments, then [`get`][Object::get] with the name as a
/// string key. `obj.name(args)` always goes through
/// [`call_method`][Object::call_method].
///
/// Every method has a default implementation returning `None`, so only the
/// capabilities the type actually has need to be provided.
///
/// # Examples
///
/// ```
/// use trellis::{CallError, Object, Value};
///
/// #[derive(Debug)]
/// struct User {
///     first: String,
///     last: String,
/// }
///
/// impl Object for User {
///     fn type_name(&self) -> &'static str {
///         "User"
///     }
///
///     fn field(&self, name: &str) -> Option<Value> {
///         match name {
///             "first" => Some(Value::from(&self.first)),
///             "last" => Some(Value::from(&self.last)),
///             _ => None,
///         }
///     }
///
///     fn call_method(&self, name: &str, args: &[Value]) -> Option<Result<Value, CallError>> {
///         match name {
///             "full_name" if args.is_empty() => {
///                 Some(Ok(Value::from(format!("{} {}", self.first, self.last))))
///             }
///             _ => None,
///         }
///     }
/// }
///
/// let user = Value::object(User { first: "John".into(), last: "Smith".into() });
/// assert_eq!(user.attr("full_name"), Value::from("John Smith"));
/// ```
pub trait Object: fmt::Debug + Send + Sync {
    /// The name used for this type in error messages.
    fn type_name(&self) -> &'static str {
        "object"
    }

    /// Returns the named field.
    fn field(&self, name: &str) -> Option<Value> {
        let _ = name;
        None
    }

    /// Calls the named method, returning `None` if there is no such method.
    fn call_method(&self, name: &str, args: &[Value]) -> Option<Result<Value, CallError>> {
        let _ = (name, args);
        None
    }

    /// Keyed or indexed lookup, as in `obj[key]`.
    fn get(&self, key: &Value) -> Option<Value> {
        let _ = key;
        None
    }

    /// The number of elements, used by the `length` filter.
    fn length(&self) -> Option<usize> {
        None
    }

    /// The values produced when iterating over the object in a `for` loop.
    fn iter(&self) -> Option<Vec<Value>> {
        None
    }

    /// The text written when the object is rendered.
    fn to_display(&self) -> Option<String> {
        None
    }

    fn is_true(&self) -> bool {
        self.length().map_or(true, |n| n > 0)
    }
}
