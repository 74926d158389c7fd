/// Constructs a [`Value`][crate::Value] map from `key: value` pairs.
///
/// Keys are identifiers. Values can be nested maps `{ ... }`, lists
/// `[ ... ]`, `None`, or any expression that converts into a
/// [`Value`][crate::Value].
///
/// ```
/// let ctx = trellis::value! {
///     user: { name: "John", roles: ["admin", "dev"] },
///     visits: 42,
///     referrer: None,
/// };
/// assert_eq!(ctx.attr("user").attr("roles").index(&1.into()), "dev".into());
/// ```
#[macro_export]
macro_rules! value {
    ($($tt:tt)*) => {
        $crate::_value!({ $($tt)* })
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! _value {
    // Pushes each element onto `$list`.
    (@list $list:ident) => {};
    (@list $list:ident None $(, $($rest:tt)*)?) => {
        $list.push($crate::Value::None);
        $crate::_value!(@list $list $($($rest)*)?);
    };
    (@list $list:ident [$($inner:tt)*] $(, $($rest:tt)*)?) => {
        $list.push($crate::_value!([$($inner)*]));
        $crate::_value!(@list $list $($($rest)*)?);
    };
    (@list $list:ident {$($inner:tt)*} $(, $($rest:tt)*)?) => {
        $list.push($crate::_value!({$($inner)*}));
        $crate::_value!(@list $list $($($rest)*)?);
    };
    (@list $list:ident $next:expr $(, $($rest:tt)*)?) => {
        $list.push($crate::_value!($next));
        $crate::_value!(@list $list $($($rest)*)?);
    };

    // Inserts each `key: value` entry into `$map`.
    (@map $map:ident) => {};
    (@map $map:ident $key:ident : None $(, $($rest:tt)*)?) => {
        $map.insert(stringify!($key).to_owned(), $crate::Value::None);
        $crate::_value!(@map $map $($($rest)*)?);
    };
    (@map $map:ident $key:ident : [$($inner:tt)*] $(, $($rest:tt)*)?) => {
        $map.insert(stringify!($key).to_owned(), $crate::_value!([$($inner)*]));
        $crate::_value!(@map $map $($($rest)*)?);
    };
    (@map $map:ident $key:ident : {$($inner:tt)*} $(, $($rest:tt)*)?) => {
        $map.insert(stringify!($key).to_owned(), $crate::_value!({$($inner)*}));
        $crate::_value!(@map $map $($($rest)*)?);
    };
    (@map $map:ident $key:ident : $value:expr $(, $($rest:tt)*)?) => {
        $map.insert(stringify!($key).to_owned(), $crate::_value!($value));
        $crate::_value!(@map $map $($($rest)*)?);
    };

    (None) => {
        $crate::Value::None
    };

    ([ $($tt:tt)* ]) => {
        $crate::Value::List({
            #[allow(unused_mut)]
            let mut list = $crate::List::new();
            $crate::_value!(@list list $($tt)*);
            list
        })
    };

    ({ $($tt:tt)* }) => {
        $crate::Value::Map({
            #[allow(unused_mut)]
            let mut map = $crate::Map::new();
            $crate::_value!(@map map $($tt)*);
            map
        })
    };

    ($other:expr) => {
        $crate::Value::from($other)
    };
}

#[cfg(test)]
mod tests {
    use crate::value::{List, Map};
    use crate::Value;

    #[test]
    fn value_empty() {
        assert_eq!(value! {}, Value::Map(Map::new()));
    }

    #[test]
    fn value_scalars() {
        let v = value! { s: "testing...", n: None, i: 3 };
        let exp = Value::from([
            ("s".to_owned(), Value::from("testing...")),
            ("n".to_owned(), Value::None),
            ("i".to_owned(), Value::Integer(3)),
        ]);
        assert_eq!(v, exp);
    }

    #[test]
    fn value_list() {
        let v = value! { items: ["testing...", None, {}, []] };
        let exp = Value::from([(
            "items".to_owned(),
            Value::from([
                Value::from("testing..."),
                Value::None,
                Value::Map(Map::new()),
                Value::List(List::new()),
            ]),
        )]);
        assert_eq!(v, exp);
    }

    #[test]
    fn value_nested_with_trailing_commas() {
        let v = value! {
            w: "hello",
            x: {
                y: "hello",
                z: String::from("world!"),
            },
        };
        let exp = Value::from([
            ("w".to_owned(), Value::from("hello")),
            (
                "x".to_owned(),
                Value::from([
                    ("y".to_owned(), Value::from("hello")),
                    ("z".to_owned(), Value::from("world!")),
                ]),
            ),
        ]);
        assert_eq!(v, exp);
    }
}
