use crate::compile::{Parser, Token};
use crate::fmt::Formatter;
use crate::render::ExecutionContext;
use crate::tags::TagNode;
use crate::types::ast::{Expr, NodeList};
use crate::value::{List, Map};
use crate::{Result, Value};

/// `{% if a %} ... {% elif b %} ... {% else %} ... {% endif %}`
struct IfNode {
    branches: Vec<(Expr, NodeList)>,
    otherwise: Option<NodeList>,
}

/// `{% for k, v in items reversed %} ... {% empty %} ... {% endfor %}`
struct ForNode {
    key: String,
    value: Option<String>,
    iterable: Expr,
    reversed: bool,
    body: NodeList,
    empty: Option<NodeList>,
}

pub(super) fn parse_if<'p>(
    doc: &mut Parser<'p>,
    _: &Token,
    args: &mut Parser<'p>,
) -> Result<Box<dyn TagNode>> {
    let mut branches = Vec::new();
    let mut cond = args.parse_expression()?;
    loop {
        let (body, end, mut end_args) = doc.wrap_until(&["elif", "else", "endif"])?;
        branches.push((cond, body));
        match end.as_str() {
            "elif" => {
                cond = end_args.parse_expression()?;
                end_args.finish()?;
            }
            "else" => {
                end_args.finish()?;
                let (body, _, end_args) = doc.wrap_until(&["endif"])?;
                end_args.finish()?;
                return Ok(Box::new(IfNode {
                    branches,
                    otherwise: Some(body),
                }));
            }
            _ => {
                end_args.finish()?;
                return Ok(Box::new(IfNode {
                    branches,
                    otherwise: None,
                }));
            }
        }
    }
}

impl TagNode for IfNode {
    fn execute(&self, ctx: &mut ExecutionContext<'_>, f: &mut Formatter<'_>) -> Result<()> {
        for (cond, body) in &self.branches {
            if cond.evaluate(ctx)?.is_true() {
                return ctx.render(body, f);
            }
        }
        match &self.otherwise {
            Some(body) => ctx.render(body, f),
            None => Ok(()),
        }
    }
}

pub(super) fn parse_for<'p>(
    doc: &mut Parser<'p>,
    _: &Token,
    args: &mut Parser<'p>,
) -> Result<Box<dyn TagNode>> {
    let key = args.expect_ident()?.to_owned();
    let value = if args.match_symbol(",") {
        Some(args.expect_ident()?.to_owned())
    } else {
        None
    };
    if !args.match_ident("in") {
        return Err(args.err_expected("'in'"));
    }
    let iterable = args.parse_expression()?;
    let reversed = args.match_ident("reversed");

    let (body, end, end_args) = doc.wrap_until(&["empty", "endfor"])?;
    end_args.finish()?;
    let empty = if end == "empty" {
        let (body, _, end_args) = doc.wrap_until(&["endfor"])?;
        end_args.finish()?;
        Some(body)
    } else {
        None
    };

    Ok(Box::new(ForNode {
        key,
        value,
        iterable,
        reversed,
        body,
        empty,
    }))
}

impl ForNode {
    /// Turns the iterable into `(first, second)` loop variable pairs.
    ///
    /// Lists yield `(item, None)` or `(index, item)`, maps yield keys in
    /// order or `(key, value)`, strings yield characters. Anything else is
    /// empty.
    fn items(&self, iterable: Value) -> Vec<(Value, Value)> {
        let pair = self.value.is_some();
        let list = |items: List<Value>| -> Vec<(Value, Value)> {
            if pair {
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| (Value::from(i), v))
                    .collect()
            } else {
                items.into_iter().map(|v| (v, Value::None)).collect()
            }
        };
        match iterable {
            Value::List(items) => list(items),
            Value::Map(map) => map
                .into_iter()
                .map(|(k, v)| (Value::String(k), if pair { v } else { Value::None }))
                .collect(),
            Value::String(s) | Value::Safe(s) => list(s.chars().map(Value::from).collect()),
            Value::Object(o) => list(o.iter().unwrap_or_default()),
            _ => Vec::new(),
        }
    }
}

impl TagNode for ForNode {
    fn execute(&self, ctx: &mut ExecutionContext<'_>, f: &mut Formatter<'_>) -> Result<()> {
        let iterable = self.iterable.evaluate(ctx)?;
        let mut items = self.items(iterable);
        if self.reversed {
            items.reverse();
        }

        if items.is_empty() {
            return match &self.empty {
                Some(body) => ctx.render(body, f),
                None => Ok(()),
            };
        }

        let parent = ctx.get("forloop").cloned().unwrap_or(Value::None);
        let len = items.len();
        ctx.push_scope();
        let result = items.into_iter().enumerate().try_for_each(|(i, (first, second))| {
            ctx.set("forloop", forloop(i, len, &parent));
            ctx.set(self.key.clone(), first);
            if let Some(name) = &self.value {
                ctx.set(name.clone(), second);
            }
            ctx.render(&self.body, f)
        });
        ctx.pop_scope();
        result
    }
}

fn forloop(i: usize, len: usize, parent: &Value) -> Value {
    let mut map = Map::new();
    map.insert("Counter".into(), Value::from(i + 1));
    map.insert("Counter0".into(), Value::from(i));
    map.insert("Revcounter".into(), Value::from(len - i));
    map.insert("Revcounter0".into(), Value::from(len - i - 1));
    map.insert("First".into(), Value::Bool(i == 0));
    map.insert("Last".into(), Value::Bool(i + 1 == len));
    map.insert("Parentloop".into(), parent.clone());
    Value::Map(map)
}
