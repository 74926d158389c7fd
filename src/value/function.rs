use std::error::Error as StdError;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::value::{List, Map};
use crate::Value;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

type FunctionImpl = dyn Fn(&[Value]) -> Result<Value, CallError> + Send + Sync + 'static;

/// A host function that can be called from a template.
///
/// Cloning is cheap, clones share the same underlying function.
#[derive(Clone)]
pub struct Function {
    imp: Arc<FunctionImpl>,
}

/// The reason a call of a host function failed.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CallError {
    /// The function was called with the wrong number of arguments.
    #[error("{}", arity_message(.expected, .variadic, .got))]
    Arity {
        expected: usize,
        variadic: bool,
        got: usize,
    },

    /// An argument could not be converted to the declared parameter type.
    #[error("input argument {index} must be of type {expected} (not {got})")]
    ArgType {
        index: usize,
        expected: &'static str,
        got: &'static str,
    },

    /// The function itself returned an error.
    #[error("{0}")]
    Host(BoxError),
}

fn arity_message(expected: &usize, variadic: &bool, got: &usize) -> String {
    let at_least = if *variadic { "at least " } else { "" };
    let s = if *expected == 1 { "" } else { "s" };
    format!("expected {at_least}{expected} argument{s}, got {got}")
}

impl CallError {
    /// Wraps an arbitrary error returned by a host function.
    pub fn host<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Host(err.into())
    }
}

impl Function {
    /// Constructs a function from a Rust function or closure.
    ///
    /// The closure may take up to five parameters of any type implementing
    /// [`FunctionArg`]: integers, floats, [`bool`], [`String`], [`Value`],
    /// lists and maps, `Option<T>` (none maps to `None`) and a trailing
    /// [`Rest<T>`] collecting any remaining arguments. It may return anything
    /// that converts into a [`Value`], or a `Result` of such a type whose
    /// error is surfaced as a render error.
    ///
    /// ```
    /// use trellis::{Function, Value};
    ///
    /// let add = Function::new(|a: i64, b: i64| a + b);
    /// assert_eq!(add.call(&[Value::from(1), Value::from(2)]).unwrap(), Value::from(3));
    /// assert!(add.call(&[Value::from("x"), Value::from(2)]).is_err());
    /// ```
    pub fn new<F, R, A>(f: F) -> Self
    where
        F: Callable<R, A> + Send + Sync + 'static,
        R: FunctionReturn,
        A: FunctionArgs,
    {
        Self::from_fn(move |args: &[Value]| {
            let args = A::from_values(args)?;
            f.call(args).into_result()
        })
    }

    /// Constructs a function operating on the raw argument list.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        Self { imp: Arc::new(f) }
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, CallError> {
        (self.imp)(args)
    }

    /// Whether both values refer to the same function.
    pub fn ptr_eq(&self, other: &Function) -> bool {
        Arc::as_ptr(&self.imp) as *const () == Arc::as_ptr(&other.imp) as *const ()
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function").finish_non_exhaustive()
    }
}

/// Collects all remaining arguments of a call.
///
/// Only valid as the last parameter of a function.
#[derive(Debug, Clone, PartialEq)]
pub struct Rest<T>(pub Vec<T>);

impl<T> Deref for Rest<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Represents any function that can be wrapped in a [`Function`].
///
/// This is implemented for every `Fn` of up to five parameters whose
/// parameters implement [`FunctionArg`].
pub trait Callable<R, A> {
    #[doc(hidden)]
    fn call(&self, args: A) -> R;
}

/// A tuple of parameters extracted from the call arguments.
pub trait FunctionArgs: Sized {
    #[doc(hidden)]
    fn from_values(args: &[Value]) -> Result<Self, CallError>;
}

/// A single parameter of a host function.
pub trait FunctionArg: Sized {
    /// Whether this parameter swallows all remaining arguments.
    #[doc(hidden)]
    const REST: bool = false;

    #[doc(hidden)]
    fn extract(args: &[Value], index: usize) -> Result<Self, CallError>;
}

/// The return type of a host function.
pub trait FunctionReturn {
    #[doc(hidden)]
    fn into_result(self) -> Result<Value, CallError>;
}

////////////////////////////////////////////////////////////////////////////////
// Callable
////////////////////////////////////////////////////////////////////////////////

impl<Func, R> Callable<R, ()> for Func
where
    Func: Fn() -> R,
{
    fn call(&self, (): ()) -> R {
        self()
    }
}

macro_rules! impl_callable {
    ($($arg:ident $val:ident)+) => {
        impl<Func, R, $($arg,)+> Callable<R, ($($arg,)+)> for Func
        where
            Func: Fn($($arg),+) -> R,
        {
            fn call(&self, ($($val,)+): ($($arg,)+)) -> R {
                self($($val),+)
            }
        }
    };
}

impl_callable! { A a }
impl_callable! { A a B b }
impl_callable! { A a B b C c }
impl_callable! { A a B b C c D d }
impl_callable! { A a B b C c D d E e }

////////////////////////////////////////////////////////////////////////////////
// FunctionArgs
////////////////////////////////////////////////////////////////////////////////

fn check_arity(args: &[Value], expected: usize, variadic: bool) -> Result<(), CallError> {
    let ok = if variadic {
        args.len() + 1 >= expected
    } else {
        args.len() == expected
    };
    if ok {
        Ok(())
    } else {
        let expected = if variadic { expected - 1 } else { expected };
        Err(CallError::Arity {
            expected,
            variadic,
            got: args.len(),
        })
    }
}

impl FunctionArgs for () {
    fn from_values(args: &[Value]) -> Result<Self, CallError> {
        check_arity(args, 0, false)
    }
}

macro_rules! impl_function_args {
    ($n:literal; $($arg:ident $i:tt)+; $last:ident) => {
        impl<$($arg,)+> FunctionArgs for ($($arg,)+)
        where
            $($arg: FunctionArg,)+
        {
            fn from_values(args: &[Value]) -> Result<Self, CallError> {
                check_arity(args, $n, $last::REST)?;
                Ok(($($arg::extract(args, $i)?,)+))
            }
        }
    };
}

impl_function_args! { 1; A 0; A }
impl_function_args! { 2; A 0 B 1; B }
impl_function_args! { 3; A 0 B 1 C 2; C }
impl_function_args! { 4; A 0 B 1 C 2 D 3; D }
impl_function_args! { 5; A 0 B 1 C 2 D 3 E 4; E }

////////////////////////////////////////////////////////////////////////////////
// FunctionArg
////////////////////////////////////////////////////////////////////////////////

/// Converts a single argument, naming the expected type on failure.
trait FromValue: Sized {
    const TYPE: &'static str;

    fn from_value(value: &Value) -> Option<Self>;
}

fn get(args: &[Value], index: usize) -> Result<&Value, CallError> {
    args.get(index).ok_or(CallError::Arity {
        expected: index + 1,
        variadic: false,
        got: args.len(),
    })
}

fn convert<T: FromValue>(value: &Value, index: usize) -> Result<T, CallError> {
    T::from_value(value).ok_or(CallError::ArgType {
        index,
        expected: T::TYPE,
        got: value.human(),
    })
}

macro_rules! impl_int {
    ($($ty:ty)+) => {
        $(
            impl FromValue for $ty {
                const TYPE: &'static str = "integer";

                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::Integer(i) => <$ty>::try_from(*i).ok(),
                        _ => None,
                    }
                }
            }
        )+
    };
}

impl_int! { u8 u16 u32 u64 usize i8 i16 i32 i64 isize }

impl FromValue for f64 {
    const TYPE: &'static str = "float";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl FromValue for f32 {
    const TYPE: &'static str = "float";

    fn from_value(value: &Value) -> Option<Self> {
        f64::from_value(value).map(|f| f as f32)
    }
}

impl FromValue for bool {
    const TYPE: &'static str = "bool";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromValue for String {
    const TYPE: &'static str = "string";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(String::from)
    }
}

impl FromValue for Value {
    const TYPE: &'static str = "value";

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromValue for List<Value> {
    const TYPE: &'static str = "list";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::List(list) => Some(list.clone()),
            _ => None,
        }
    }
}

impl FromValue for Map<String, Value> {
    const TYPE: &'static str = "map";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Map(map) => Some(map.clone()),
            _ => None,
        }
    }
}

macro_rules! impl_arg {
    ($($ty:ty)+) => {
        $(
            impl FunctionArg for $ty {
                fn extract(args: &[Value], index: usize) -> Result<Self, CallError> {
                    convert(get(args, index)?, index)
                }
            }

            impl FunctionArg for Option<$ty> {
                fn extract(args: &[Value], index: usize) -> Result<Self, CallError> {
                    match get(args, index)? {
                        Value::None => Ok(None),
                        value => convert(value, index).map(Some),
                    }
                }
            }

            impl FunctionArg for Rest<$ty> {
                const REST: bool = true;

                fn extract(args: &[Value], index: usize) -> Result<Self, CallError> {
                    let rest = args.get(index..).unwrap_or_default();
                    rest.iter()
                        .enumerate()
                        .map(|(i, v)| convert(v, index + i))
                        .collect::<Result<Vec<_>, _>>()
                        .map(Rest)
                }
            }
        )+
    };
}

impl_arg! {
    u8 u16 u32 u64 usize i8 i16 i32 i64 isize f32 f64
    bool String Value List<Value> Map<String, Value>
}

////////////////////////////////////////////////////////////////////////////////
// FunctionReturn
////////////////////////////////////////////////////////////////////////////////

impl<T> FunctionReturn for T
where
    T: Into<Value>,
{
    fn into_result(self) -> Result<Value, CallError> {
        Ok(self.into())
    }
}

impl<T, E> FunctionReturn for Result<T, E>
where
    T: Into<Value>,
    E: Into<BoxError>,
{
    fn into_result(self) -> Result<Value, CallError> {
        self.map(Into::into).map_err(CallError::host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_arguments() {
        let f = Function::new(|s: String, n: usize| s.repeat(n));
        let v = f.call(&[Value::from("ab"), Value::from(2)]).unwrap();
        assert_eq!(v, Value::from("abab"));

        let err = f.call(&[Value::None, Value::from(2)]).unwrap_err();
        assert_eq!(err.to_string(), "input argument 0 must be of type string (not none)");

        let err = f.call(&[Value::from("ab")]).unwrap_err();
        assert_eq!(err.to_string(), "expected 2 arguments, got 1");
    }

    #[test]
    fn float_accepts_integer() {
        let f = Function::new(|x: f64| x / 2.0);
        assert_eq!(f.call(&[Value::from(3)]).unwrap(), Value::from(1.5));
    }

    #[test]
    fn optional_and_rest() {
        let f = Function::new(|sep: Option<String>, parts: Rest<String>| {
            parts.join(sep.as_deref().unwrap_or(","))
        });
        let v = f
            .call(&[Value::None, Value::from("a"), Value::from("b")])
            .unwrap();
        assert_eq!(v, Value::from("a,b"));
        assert_eq!(f.call(&[Value::from("-")]).unwrap(), Value::from(""));

        let err = f.call(&[]).unwrap_err();
        assert_eq!(err.to_string(), "expected at least 1 argument, got 0");

        let err = f.call(&[Value::None, Value::from(1)]).unwrap_err();
        assert!(matches!(err, CallError::ArgType { index: 1, .. }));
    }

    #[test]
    fn host_errors() {
        let f = Function::new(|| -> Result<i64, String> { Err("something went wrong".into()) });
        let err = f.call(&[]).unwrap_err();
        assert!(matches!(err, CallError::Host(_)));
        assert_eq!(err.to_string(), "something went wrong");
    }

    #[test]
    fn ptr_eq() {
        let f = Function::new(|| 1);
        let g = f.clone();
        assert!(f.ptr_eq(&g));
        assert!(!f.ptr_eq(&Function::new(|| 1)));
    }
}
