//! Builtin filters.

use std::collections::HashMap;
use std::sync::Arc;

use crate::filters::{FilterError, FilterFn};
use crate::Value;

pub(super) fn register(filters: &mut HashMap<String, Arc<FilterFn>>) {
    let builtins: [(&str, Arc<FilterFn>); 11] = [
        ("add", Arc::new(add)),
        ("default", Arc::new(default)),
        ("length", Arc::new(length)),
        ("lower", Arc::new(lower)),
        ("upper", Arc::new(upper)),
        ("capfirst", Arc::new(capfirst)),
        ("title", Arc::new(title)),
        ("join", Arc::new(join)),
        ("first", Arc::new(first)),
        ("last", Arc::new(last)),
        ("cut", Arc::new(cut)),
    ];
    for (name, filter) in builtins {
        filters.insert(name.to_owned(), filter);
    }
}

/// Adds the parameter to the value.
///
/// Numbers are added, lists are concatenated and anything else is joined as
/// text.
fn add(value: &Value, param: &Value) -> Result<Value, FilterError> {
    Ok(match (value, param) {
        (Value::Integer(a), Value::Integer(b)) => a
            .checked_add(*b)
            .map(Value::Integer)
            .unwrap_or(Value::Float(*a as f64 + *b as f64)),
        (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
            Value::Float(value.to_float() + param.to_float())
        }
        (Value::List(a), Value::List(b)) => Value::List(a.iter().chain(b).cloned().collect()),
        (value, param) => Value::String(format!("{value}{param}")),
    })
}

/// Returns the parameter if the value is false.
fn default(value: &Value, param: &Value) -> Result<Value, FilterError> {
    if value.is_true() {
        Ok(value.clone())
    } else {
        Ok(param.clone())
    }
}

/// Returns the number of characters in a string or the number of items in a
/// list or map.
fn length(value: &Value, _: &Value) -> Result<Value, FilterError> {
    match value.length() {
        Some(n) => Ok(Value::from(n)),
        None => Err(FilterError::Type {
            expected: "string, list or map",
            found: value.human(),
        }),
    }
}

/// Applies a text transformation, keeping safe strings safe.
fn map_text(value: &Value, f: impl FnOnce(&str) -> String) -> Value {
    match value {
        Value::Safe(s) => Value::Safe(f(s)),
        Value::String(s) => Value::String(f(s)),
        value => Value::String(f(&value.to_string())),
    }
}

fn lower(value: &Value, _: &Value) -> Result<Value, FilterError> {
    Ok(map_text(value, str::to_lowercase))
}

fn upper(value: &Value, _: &Value) -> Result<Value, FilterError> {
    Ok(map_text(value, str::to_uppercase))
}

/// Uppercases the first character.
fn capfirst(value: &Value, _: &Value) -> Result<Value, FilterError> {
    Ok(map_text(value, |s| {
        let mut chars = s.chars();
        match chars.next() {
            Some(c) => c.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }))
}

/// Uppercases the first letter of every word and lowercases the rest.
fn title(value: &Value, _: &Value) -> Result<Value, FilterError> {
    Ok(map_text(value, |s| {
        let mut out = String::with_capacity(s.len());
        let mut start = true;
        for c in s.chars() {
            if start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            start = !c.is_alphanumeric() && c != '\'';
        }
        out
    }))
}

/// Joins the items of a list with the parameter.
fn join(value: &Value, sep: &Value) -> Result<Value, FilterError> {
    let sep = match sep {
        Value::None => String::new(),
        sep => sep.to_string(),
    };
    match value {
        Value::List(items) => {
            let items: Vec<_> = items.iter().map(Value::to_string).collect();
            Ok(Value::String(items.join(&sep)))
        }
        value => Ok(value.clone()),
    }
}

/// Returns the first item of a list or the first character of a string.
fn first(value: &Value, _: &Value) -> Result<Value, FilterError> {
    Ok(match value {
        Value::List(items) => items.first().cloned().unwrap_or(Value::None),
        Value::String(s) | Value::Safe(s) => s.chars().next().map(Value::from).unwrap_or(Value::None),
        _ => Value::None,
    })
}

/// Returns the last item of a list or the last character of a string.
fn last(value: &Value, _: &Value) -> Result<Value, FilterError> {
    Ok(match value {
        Value::List(items) => items.last().cloned().unwrap_or(Value::None),
        Value::String(s) | Value::Safe(s) => s.chars().last().map(Value::from).unwrap_or(Value::None),
        _ => Value::None,
    })
}

/// Removes every occurrence of the parameter.
fn cut(value: &Value, param: &Value) -> Result<Value, FilterError> {
    match param.as_str() {
        Some(pat) if !pat.is_empty() => Ok(map_text(value, |s| s.replace(pat, ""))),
        Some(_) => Ok(value.clone()),
        None => Err(FilterError::Type {
            expected: "string",
            found: param.human(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Value {
        Value::from(v)
    }

    #[test]
    fn text_filters() {
        assert_eq!(lower(&s("HeLLo"), &Value::None).unwrap(), s("hello"));
        assert_eq!(capfirst(&s("élan vital"), &Value::None).unwrap(), s("Élan vital"));
        assert_eq!(title(&s("the QUICK fox's-tail"), &Value::None).unwrap(), s("The Quick Fox's-Tail"));
        assert_eq!(cut(&s("a b c"), &s(" ")).unwrap(), s("abc"));
        assert!(upper(&Value::safe("<b>"), &Value::None).unwrap().is_safe());
    }

    #[test]
    fn list_filters() {
        let list = Value::from(vec![1, 2, 3]);
        assert_eq!(join(&list, &s(", ")).unwrap(), s("1, 2, 3"));
        assert_eq!(first(&list, &Value::None).unwrap(), Value::Integer(1));
        assert_eq!(last(&s("abc"), &Value::None).unwrap(), s("c"));
        assert_eq!(length(&list, &Value::None).unwrap(), Value::Integer(3));
        assert!(length(&Value::Integer(3), &Value::None).is_err());
    }

    #[test]
    fn add_and_default() {
        assert_eq!(add(&Value::Integer(1), &Value::Integer(2)).unwrap(), Value::Integer(3));
        assert_eq!(add(&Value::Integer(1), &Value::Float(0.5)).unwrap(), Value::Float(1.5));
        assert_eq!(add(&s("a"), &Value::Integer(1)).unwrap(), s("a1"));
        assert_eq!(default(&Value::None, &s("x")).unwrap(), s("x"));
        assert_eq!(default(&s("y"), &s("x")).unwrap(), s("y"));
    }
}
