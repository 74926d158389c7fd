//! A template engine with template inheritance, pluggable directives and a
//! sandbox.
//!
//! # Features
//!
//! ### Syntax
//!
//! - Expressions: `{{ user.name|title }}`, `{{ price * 2 if sale else price }}`
//! - Conditionals: `{% if user.enabled %} ... {% elif x %} ... {% endif %}`
//! - Loops: `{% for key, value in map %} ... {% empty %} ... {% endfor %}`
//! - Inheritance: `{% extends "base.html" %}`, `{% block content %}`,
//!   `{{ block.super }}`
//! - Nested templates: `{% include "nav.html" with active="home" only %}`
//! - Whitespace control: `{{- value -}}`, plus trim and lstrip options
//! - Configurable delimiters: `<? user.name ?>`, `(( if user.enabled ))`
//!
//! ### Engine
//!
//! - Templates are compiled once and cached per [`Set`]
//! - Renders of the same template can run in parallel on many threads
//! - Host functions and objects callable from templates
//! - Custom directives and filters, and a deny-list to ban either
//! - Automatic HTML escaping with a replaceable escaper
//! - Render to a [`String`] or any [`std::io::Write`] implementor
//! - Render using any [`serde`] serializable values
//!
//! # Getting started
//!
//! Your entry point is the [`Set`] struct. A set stores the syntax config,
//! directives, filters, sandbox policy and compiled templates. Templates are
//! read through a [`Loader`].
//!
//! ```
//! use trellis::{MemoryLoader, Set};
//!
//! let loader = MemoryLoader::new().with("hello", "Hello {{ user.name }}!");
//! let set = Set::new("app", loader);
//! ```
//!
//! Next, [`.from_cache`][Set::from_cache] compiles a template on first use
//! and [`.render`][Template::render] renders it.
//!
//! ```
//! # let set = trellis::Set::new("app", trellis::MemoryLoader::new().with("hello", "Hello {{ user.name }}!"));
//! let template = set.from_cache("hello")?;
//! let result = template.render(trellis::value! { user: { name: "John Smith" } })?;
//! assert_eq!(result, "Hello John Smith!");
//! # Ok::<(), trellis::Error>(())
//! ```
//!
//! Templates that don't need to be stored can be compiled directly with
//! [`.from_string`][Set::from_string].
//!
//! ```
//! let set = trellis::Set::default();
//! let template = set.from_string("Hello {{ user.name }}!")?;
//! let result = template.render(trellis::value! { user: { name: "John Smith" } })?;
//! assert_eq!(result, "Hello John Smith!");
//! # Ok::<(), trellis::Error>(())
//! ```
//!
//! # Examples
//!
//! ### Render using structured data
//!
//! ```
//! #[derive(serde::Serialize)]
//! struct Context { user: User }
//!
//! #[derive(serde::Serialize)]
//! struct User { name: String }
//!
//! let ctx = Context { user: User { name: "<John>".into() } };
//!
//! let result = trellis::Set::default()
//!     .from_string("Hello {{ user.name }}")?
//!     .render(&ctx)?;
//!
//! assert_eq!(result, "Hello &lt;John&gt;");
//! # Ok::<(), trellis::Error>(())
//! ```
//!
//! ### Call host functions
//!
//! Functions keep their type when rendering from a [`Value`] with
//! [`render_from`][Template::render_from].
//!
//! ```
//! use trellis::{Set, Value};
//!
//! let ctx = trellis::value! {
//!     add: Value::function(|a: i64, b: i64| a + b),
//! };
//! let result = Set::default().from_string("{{ add(1, 2) }}")?.render_from(&ctx)?;
//! assert_eq!(result, "3");
//! # Ok::<(), trellis::Error>(())
//! ```
//!
//! ### Render a template using custom syntax
//!
//! ```
//! let mut set = trellis::Set::default();
//! set.set_syntax(trellis::Syntax::builder().expr("<?", "?>").block("<%", "%>").build());
//!
//! let result = set
//!     .from_string("<% if ok %>Hello <? user.name ?><% endif %>")?
//!     .render(trellis::value! { ok: true, user: { name: "John Smith" } })?;
//!
//! assert_eq!(result, "Hello John Smith");
//! # Ok::<(), trellis::Error>(())
//! ```

mod cache;
mod compile;
mod error;
pub mod filters;
pub mod fmt;
mod loader;
mod macros;
mod render;
mod set;
pub mod tags;
mod types;
mod value;

pub use crate::compile::{Parser, Token, TokenKind};
pub use crate::error::{Error, ErrorKind, Phase, Result};
pub use crate::filters::FilterError;
pub use crate::fmt::Formatter;
pub use crate::loader::{FileSystemLoader, LoadError, Loader, MemoryLoader};
pub use crate::render::ExecutionContext;
pub use crate::set::{Options, Set, Template};
pub use crate::tags::TagNode;
pub use crate::types::ast::{Expr, NodeList};
pub use crate::types::span::Position;
pub use crate::types::syntax::{Syntax, SyntaxBuilder};
#[cfg(feature = "serde")]
pub use crate::value::to_value;
pub use crate::value::{
    CallError, Callable, Function, FunctionArg, FunctionArgs, FunctionReturn, List, Map, Object,
    Rest, Value,
};
