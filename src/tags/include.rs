use tracing::warn;

use crate::compile::{Parser, Token};
use crate::fmt::Formatter;
use crate::render::ExecutionContext;
use crate::tags::TagNode;
use crate::types::ast::Expr;
use crate::types::span::Position;
use crate::value::Map;
use crate::{Error, Result, Value};

/// `{% include "name" if_exists with key=value only %}`
///
/// The included template is rendered with a fresh context seeded from the
/// current bindings (or only the `with` bindings when `only` is given).
struct IncludeNode {
    name: Expr,
    if_exists: bool,
    bindings: Vec<(String, Expr)>,
    only: bool,
    pos: Position,
}

pub(super) fn parse_include<'p>(
    _: &mut Parser<'p>,
    tag: &Token,
    args: &mut Parser<'p>,
) -> Result<Box<dyn TagNode>> {
    let name = args.parse_expression()?;
    let if_exists = args.match_ident("if_exists");
    let mut bindings = Vec::new();
    if args.match_ident("with") {
        bindings = parse_bindings(args)?;
        if bindings.is_empty() {
            return Err(args.err_expected("'key=value'"));
        }
    }
    let only = args.match_ident("only");
    Ok(Box::new(IncludeNode {
        name,
        if_exists,
        bindings,
        only,
        pos: args.position(tag),
    }))
}

/// Parses `key=value` pairs until something else comes up.
pub(super) fn parse_bindings(args: &mut Parser<'_>) -> Result<Vec<(String, Expr)>> {
    let mut bindings = Vec::new();
    while args.remaining() >= 2 && !args.peek_ident("only") {
        let key = args.expect_ident()?.to_owned();
        args.expect_symbol("=")?;
        let value = args.parse_expression()?;
        bindings.push((key, value));
    }
    Ok(bindings)
}

impl TagNode for IncludeNode {
    fn execute(&self, ctx: &mut ExecutionContext<'_>, f: &mut Formatter<'_>) -> Result<()> {
        let max = ctx.max_include_depth();
        if ctx.include_depth() >= max {
            return Err(Error::execution(
                format!("maximum include depth ({max}) exceeded"),
                &self.pos,
            ));
        }

        let name = match self.name.evaluate(ctx)? {
            Value::String(s) | Value::Safe(s) => s,
            value => {
                let msg = format!("include name must be a string, found {}", value.human());
                return Err(Error::execution(msg, self.name.position()));
            }
        };

        let origin = &self.pos.origin;
        let relative_to = origin.loaded.then_some(origin.identity.as_str());
        let set = ctx.template_set();
        let loaded = if self.if_exists {
            set.load_include(&name, relative_to)
        } else {
            set.load_template(&name, relative_to).map(Some)
        };
        let template = match loaded.map_err(|err| err.or_at(&self.pos))? {
            Some(template) => template,
            None => {
                warn!(name = %name, from = %origin.identity, "skipping missing optional include");
                return Ok(());
            }
        };

        let mut bindings = Map::new();
        for (key, expr) in &self.bindings {
            bindings.insert(key.clone(), expr.evaluate(ctx)?);
        }
        let mut inner = ctx.isolated(template, bindings, self.only);
        inner.render_template(f)
    }
}

