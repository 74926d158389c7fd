use std::sync::Arc;

use crate::compile::{Parser, Token};
use crate::fmt::Formatter;
use crate::render::ExecutionContext;
use crate::tags::TagNode;
use crate::types::ast::NodeList;
use crate::Result;

/// `{% block name %} ... {% endblock %}`
///
/// Renders the leaf-most definition of the block in the template family
/// being rendered, which is this body when nothing overrides it.
struct BlockNode {
    name: String,
    body: Arc<NodeList>,
}

/// `{% extends "base.html" %}`
///
/// All the work happens at compile time.
struct ExtendsNode;

pub(super) fn parse_block<'p>(
    doc: &mut Parser<'p>,
    tag: &Token,
    args: &mut Parser<'p>,
) -> Result<Box<dyn TagNode>> {
    let name = args.expect_ident()?.to_owned();

    let (body, _, mut end_args) = doc.wrap_until(&["endblock"])?;
    if let Some(end_tok) = end_args.peek().copied() {
        let end_name = end_args.expect_ident()?;
        if end_name != name {
            let msg = format!("expected 'endblock' for block '{name}', found block '{end_name}'");
            return Err(end_args.error(msg, Some(&end_tok)));
        }
    }
    end_args.finish()?;

    let body = Arc::new(body);
    doc.register_block(&name, body.clone(), tag)?;
    Ok(Box::new(BlockNode { name, body }))
}

impl TagNode for BlockNode {
    fn execute(&self, ctx: &mut ExecutionContext<'_>, f: &mut Formatter<'_>) -> Result<()> {
        ctx.render_block(&self.name, &self.body, f)
    }
}

pub(super) fn parse_extends<'p>(
    doc: &mut Parser<'p>,
    tag: &Token,
    args: &mut Parser<'p>,
) -> Result<Box<dyn TagNode>> {
    let name = args.expect_string()?;
    doc.set_parent(&name, tag)?;
    Ok(Box::new(ExtendsNode))
}

impl TagNode for ExtendsNode {
    fn execute(&self, _: &mut ExecutionContext<'_>, _: &mut Formatter<'_>) -> Result<()> {
        Ok(())
    }
}
