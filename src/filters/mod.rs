//! Filters transform a value in an expression pipeline.
//!
//! A filter receives the piped value and its parameter, which is
//! [`Value::None`] when the template does not pass one.
//!
//! ```text
//! {{ user.name|default:"anonymous"|upper }}
//! ```
//!
//! Filters are registered on a set with
//! [`Set::add_filter`][crate::Set::add_filter]. A filter that fails returns a
//! [`FilterError`], which is reported as an execution error at the filter's
//! position in the template.
//!
//! ## Examples
//!
//! ```rust
//! use trellis::{FilterError, Set, Value};
//!
//! fn repeat(value: &Value, times: &Value) -> Result<Value, FilterError> {
//!     let times = match times {
//!         Value::Integer(n) if *n >= 0 => *n as usize,
//!         Value::None => 2,
//!         other => return Err(FilterError::Type { expected: "integer", found: other.human() }),
//!     };
//!     Ok(Value::from(value.to_string().repeat(times)))
//! }
//!
//! let mut set = Set::default();
//! set.add_filter("repeat", repeat);
//! let template = set.from_string("{{ word|repeat:3 }}")?;
//! assert_eq!(template.render(trellis::value! { word: "ab" })?, "ababab");
//! # Ok::<(), trellis::Error>(())
//! ```

#[cfg(feature = "builtins")]
mod builtins;

use std::collections::HashMap;
use std::error::Error as StdError;
use std::sync::Arc;

use crate::fmt::{escape_html, Formatter};
use crate::Value;

/// A filter function or closure.
pub(crate) type FilterFn =
    dyn Fn(&Value, &Value) -> Result<Value, FilterError> + Send + Sync + 'static;

/// An error returned by a filter.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum FilterError {
    #[error("{0}")]
    Message(String),

    /// The piped value or the parameter has the wrong type.
    #[error("expected {expected}, found {found}")]
    Type {
        expected: &'static str,
        found: &'static str,
    },

    #[error("{0}")]
    Other(Box<dyn StdError + Send + Sync + 'static>),
}

impl From<String> for FilterError {
    fn from(msg: String) -> Self {
        Self::Message(msg)
    }
}

impl From<&str> for FilterError {
    fn from(msg: &str) -> Self {
        Self::Message(msg.to_owned())
    }
}

impl From<Box<dyn StdError + Send + Sync + 'static>> for FilterError {
    fn from(err: Box<dyn StdError + Send + Sync + 'static>) -> Self {
        Self::Other(err)
    }
}

/// The filters every set starts with.
pub(crate) fn defaults() -> HashMap<String, Arc<FilterFn>> {
    let mut filters: HashMap<String, Arc<FilterFn>> = HashMap::new();
    filters.insert("safe".into(), Arc::new(safe));
    filters.insert("escape".into(), Arc::new(escape));
    filters.insert("e".into(), Arc::new(escape));
    #[cfg(feature = "builtins")]
    builtins::register(&mut filters);
    filters
}

/// Marks the value as safe so that it is written without escaping.
fn safe(value: &Value, _: &Value) -> Result<Value, FilterError> {
    Ok(match value {
        Value::Safe(_) => value.clone(),
        value => Value::Safe(value.to_string()),
    })
}

/// Escapes the value as HTML and marks the result as safe.
fn escape(value: &Value, _: &Value) -> Result<Value, FilterError> {
    if let Value::Safe(_) = value {
        return Ok(value.clone());
    }
    let mut buf = String::new();
    escape_html(&mut Formatter::with_string(&mut buf), &value.to_string())
        .map_err(|_| FilterError::from("failed to escape value"))?;
    Ok(Value::Safe(buf))
}
