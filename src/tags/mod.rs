//! The directive protocol and the directives registered on every set.
//!
//! A directive (tag) is registered under a name with
//! [`Set::add_tag`][crate::Set::add_tag]. When the parser meets
//! `{% name ... %}` it calls the registered parse function with
//!
//! - the document parser, used to consume the directive's body with
//!   [`Parser::wrap_until`],
//! - the token of the directive's name, for error positions,
//! - a parser over the directive's arguments, up to the end delimiter.
//!
//! The parse function returns a [`TagNode`] that is executed every time the
//! template is rendered. Leftover argument tokens are a compile error.
//!
//! # Examples
//!
//! A `{% shout %} ... {% endshout %}` directive that renders its body in
//! uppercase:
//!
//! ```
//! use std::fmt::Write;
//! use trellis::{ExecutionContext, Formatter, NodeList, Parser, Set, TagNode, Token};
//!
//! struct Shout {
//!     body: NodeList,
//! }
//!
//! impl TagNode for Shout {
//!     fn execute(&self, ctx: &mut ExecutionContext<'_>, f: &mut Formatter<'_>) -> trellis::Result<()> {
//!         let body = ctx.render_to_string(&self.body)?;
//!         f.write_str(&body.to_uppercase())?;
//!         Ok(())
//!     }
//! }
//!
//! fn parse_shout(
//!     doc: &mut Parser<'_>,
//!     _: &Token,
//!     _: &mut Parser<'_>,
//! ) -> trellis::Result<Box<dyn TagNode>> {
//!     let (body, _, _) = doc.wrap_until(&["endshout"])?;
//!     Ok(Box::new(Shout { body }))
//! }
//!
//! let mut set = Set::default();
//! set.add_tag("shout", parse_shout);
//! let template = set.from_string("{% shout %}hi {{ name }}{% endshout %}")?;
//! assert_eq!(template.render(trellis::value! { name: "bob" })?, "HI BOB");
//! # Ok::<(), trellis::Error>(())
//! ```

mod control;
mod include;
mod inherit;
mod scope;

use std::collections::HashMap;
use std::sync::Arc;

use crate::compile::{Parser, Token};
use crate::fmt::Formatter;
use crate::render::ExecutionContext;
use crate::Result;

/// A parsed directive, executed on every render.
pub trait TagNode: Send + Sync {
    fn execute(&self, ctx: &mut ExecutionContext<'_>, f: &mut Formatter<'_>) -> Result<()>;
}

/// A directive parse function.
pub(crate) type TagParseFn = dyn for<'p> Fn(&mut Parser<'p>, &Token, &mut Parser<'p>) -> Result<Box<dyn TagNode>>
    + Send
    + Sync
    + 'static;

/// The directives every set starts with.
pub(crate) fn defaults() -> HashMap<String, Arc<TagParseFn>> {
    let mut tags: HashMap<String, Arc<TagParseFn>> = HashMap::new();
    let mut add = |name: &str, f: Arc<TagParseFn>| {
        tags.insert(name.to_owned(), f);
    };
    add("if", Arc::new(control::parse_if));
    add("for", Arc::new(control::parse_for));
    add("block", Arc::new(inherit::parse_block));
    add("extends", Arc::new(inherit::parse_extends));
    add("include", Arc::new(include::parse_include));
    add("set", Arc::new(scope::parse_set));
    add("with", Arc::new(scope::parse_with));
    add("autoescape", Arc::new(scope::parse_autoescape));
    add("filter", Arc::new(scope::parse_filter));
    tags
}
