use std::fmt::Write;

use crate::compile::{Parser, Token, TokenKind};
use crate::fmt::Formatter;
use crate::render::ExecutionContext;
use crate::tags::include::parse_bindings;
use crate::tags::TagNode;
use crate::types::ast::{Expr, FilterCall, NodeList};
use crate::{Result, Value};

/// `{% set name = expr %}`
struct SetNode {
    name: String,
    value: Expr,
}

/// `{% with a=1 b=2 %} ... {% endwith %}` or
/// `{% with expr as name %} ... {% endwith %}`
struct WithNode {
    bindings: Vec<(String, Expr)>,
    body: NodeList,
}

/// `{% autoescape off %} ... {% endautoescape %}`
struct AutoescapeNode {
    on: bool,
    body: NodeList,
}

/// `{% filter lower|cut:" " %} ... {% endfilter %}`
struct FilterNode {
    filters: Vec<FilterCall>,
    body: NodeList,
}

pub(super) fn parse_set<'p>(
    _: &mut Parser<'p>,
    _: &Token,
    args: &mut Parser<'p>,
) -> Result<Box<dyn TagNode>> {
    let name = args.expect_ident()?.to_owned();
    args.expect_symbol("=")?;
    let value = args.parse_expression()?;
    Ok(Box::new(SetNode { name, value }))
}

impl TagNode for SetNode {
    fn execute(&self, ctx: &mut ExecutionContext<'_>, _: &mut Formatter<'_>) -> Result<()> {
        let value = self.value.evaluate(ctx)?;
        ctx.set(self.name.clone(), value);
        Ok(())
    }
}

pub(super) fn parse_with<'p>(
    doc: &mut Parser<'p>,
    _: &Token,
    args: &mut Parser<'p>,
) -> Result<Box<dyn TagNode>> {
    let bindings = if is_assignment(args) {
        parse_bindings(args)?
    } else {
        let value = args.parse_expression()?;
        if !args.match_ident("as") {
            return Err(args.err_expected("'as'"));
        }
        let name = args.expect_ident()?.to_owned();
        vec![(name, value)]
    };
    let (body, _, end_args) = doc.wrap_until(&["endwith"])?;
    end_args.finish()?;
    Ok(Box::new(WithNode { bindings, body }))
}

/// Whether the arguments start with `ident =`.
fn is_assignment(args: &Parser<'_>) -> bool {
    let mut upcoming = args.tokens[args.idx..].iter();
    matches!(
        (upcoming.next(), upcoming.next()),
        (Some(a), Some(b)) if a.kind == TokenKind::Ident
            && b.kind == TokenKind::Operator
            && args.text(b) == "="
    )
}

impl TagNode for WithNode {
    fn execute(&self, ctx: &mut ExecutionContext<'_>, f: &mut Formatter<'_>) -> Result<()> {
        let mut values = Vec::with_capacity(self.bindings.len());
        for (name, expr) in &self.bindings {
            values.push((name.clone(), expr.evaluate(ctx)?));
        }
        ctx.push_scope();
        for (name, value) in values {
            ctx.set(name, value);
        }
        let result = ctx.render(&self.body, f);
        ctx.pop_scope();
        result
    }
}

pub(super) fn parse_autoescape<'p>(
    doc: &mut Parser<'p>,
    _: &Token,
    args: &mut Parser<'p>,
) -> Result<Box<dyn TagNode>> {
    let on = if args.match_ident("on") {
        true
    } else if args.match_ident("off") {
        false
    } else {
        return Err(args.err_expected("'on' or 'off'"));
    };
    let (body, _, end_args) = doc.wrap_until(&["endautoescape"])?;
    end_args.finish()?;
    Ok(Box::new(AutoescapeNode { on, body }))
}

impl TagNode for AutoescapeNode {
    fn execute(&self, ctx: &mut ExecutionContext<'_>, f: &mut Formatter<'_>) -> Result<()> {
        let previous = ctx.autoescape();
        ctx.set_autoescape(self.on);
        let result = ctx.render(&self.body, f);
        ctx.set_autoescape(previous);
        result
    }
}

pub(super) fn parse_filter<'p>(
    doc: &mut Parser<'p>,
    _: &Token,
    args: &mut Parser<'p>,
) -> Result<Box<dyn TagNode>> {
    let mut filters = vec![args.parse_filter_call()?];
    while args.match_symbol("|") {
        filters.push(args.parse_filter_call()?);
    }
    let (body, _, end_args) = doc.wrap_until(&["endfilter"])?;
    end_args.finish()?;
    Ok(Box::new(FilterNode { filters, body }))
}

impl TagNode for FilterNode {
    fn execute(&self, ctx: &mut ExecutionContext<'_>, f: &mut Formatter<'_>) -> Result<()> {
        let mut value = Value::String(ctx.render_to_string(&self.body)?);
        for call in &self.filters {
            value = ctx.apply_filter(call, value)?;
        }
        write!(f, "{value}")?;
        Ok(())
    }
}
