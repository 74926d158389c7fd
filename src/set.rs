//! Sets of templates sharing configuration.

use std::cell::Cell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::io;
use std::sync::Arc;

use tracing::debug;

use crate::cache::Cache;
use crate::compile::{self, Parser, Searcher, Token};
use crate::filters::{self, FilterError, FilterFn};
use crate::fmt::{escape_html, EscapeFn, Formatter, Writer};
use crate::loader::{LoadError, Loader, MemoryLoader};
use crate::render;
use crate::tags::{self, TagNode, TagParseFn};
use crate::types::span::{Origin, Position};
use crate::types::template::CompiledTemplate;
use crate::value::Map;
use crate::{Error, ErrorKind, Phase, Result, Syntax, Value};

/// Options captured by every template compiled in a [`Set`].
#[derive(Debug, Clone)]
pub struct Options {
    /// Escape the output of variable nodes. Defaults to `true`.
    pub autoescape: bool,

    /// Remove the first newline after a tag.
    pub trim_blocks: bool,

    /// Strip spaces and tabs from the start of a line up to a tag.
    pub lstrip_blocks: bool,

    /// The maximum number of nested `include` directives. Defaults to `64`.
    pub max_include_depth: usize,

    /// Bypass the template cache, compiling on every
    /// [`from_cache`][Set::from_cache].
    pub debug: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            autoescape: true,
            trim_blocks: false,
            lstrip_blocks: false,
            max_include_depth: 64,
            debug: false,
        }
    }
}

/// An isolated configuration scope for compiling and rendering templates.
///
/// A set bundles the syntax, the directive and filter registries, the
/// sandbox deny-lists, global variables, the escaping policy and a cache of
/// compiled templates. Configure it through the `&mut self` methods, then
/// share it (for example behind an [`Arc`]) to compile and render from many
/// threads at once.
///
/// ```
/// use trellis::{MemoryLoader, Set};
///
/// let mut set = Set::new("mail", MemoryLoader::new().with("greeting", "Hi {{ name|capfirst }}!"));
/// set.add_global("site", "example.org");
/// let template = set.from_cache("greeting")?;
/// assert_eq!(template.render(trellis::value! { name: "ana" })?, "Hi Ana!");
/// # Ok::<(), trellis::Error>(())
/// ```
pub struct Set {
    name: String,
    loader: Box<dyn Loader>,
    syntax: Syntax,
    pub(crate) searcher: Searcher,
    pub(crate) options: Options,
    pub(crate) tags: HashMap<String, Arc<TagParseFn>>,
    pub(crate) banned_tags: HashSet<String>,
    pub(crate) filters: HashMap<String, Arc<FilterFn>>,
    pub(crate) banned_filters: HashSet<String>,
    pub(crate) globals: Map<String, Value>,
    pub(crate) escaper: Arc<EscapeFn>,
    cache: Cache,
}

/// A compiled template bound to the set it was compiled in.
#[derive(Clone)]
pub struct Template<'set> {
    set: &'set Set,
    inner: Arc<CompiledTemplate>,
}

impl Default for Set {
    /// A set named `default` over an empty [`MemoryLoader`].
    fn default() -> Self {
        Self::new("default", MemoryLoader::new())
    }
}

impl fmt::Debug for Set {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Set")
            .field("name", &self.name)
            .field("syntax", &self.syntax)
            .field("options", &self.options)
            .field("banned_tags", &self.banned_tags)
            .field("banned_filters", &self.banned_filters)
            .finish_non_exhaustive()
    }
}

impl Set {
    pub fn new(name: impl Into<String>, loader: impl Loader + 'static) -> Self {
        let syntax = Syntax::default();
        Self {
            name: name.into(),
            loader: Box::new(loader),
            searcher: Searcher::new(&syntax),
            syntax,
            options: Options::default(),
            tags: tags::defaults(),
            banned_tags: HashSet::new(),
            filters: filters::defaults(),
            banned_filters: HashSet::new(),
            globals: Map::new(),
            escaper: Arc::new(escape_html),
            cache: Cache::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the delimiters used by templates compiled from now on.
    pub fn set_syntax(&mut self, syntax: Syntax) {
        self.searcher = Searcher::new(&syntax);
        self.syntax = syntax;
    }

    pub fn set_options(&mut self, options: Options) {
        self.options = options;
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Turns cache bypassing on or off.
    pub fn set_debug(&mut self, debug: bool) {
        self.options.debug = debug;
    }

    pub fn set_autoescape(&mut self, autoescape: bool) {
        self.options.autoescape = autoescape;
    }

    /// Sets the function used to escape variable output.
    ///
    /// Defaults to [`escape_html`].
    pub fn set_escaper<F>(&mut self, f: F)
    where
        F: Fn(&mut Formatter<'_>, &str) -> fmt::Result + Send + Sync + 'static,
    {
        self.escaper = Arc::new(f);
    }

    /// Registers a filter, replacing any filter of the same name.
    pub fn add_filter<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&Value, &Value) -> std::result::Result<Value, FilterError> + Send + Sync + 'static,
    {
        self.filters.insert(name.into(), Arc::new(f));
    }

    /// Registers a directive, replacing any directive of the same name.
    ///
    /// See the [`tags`][crate::tags] module for the parse protocol.
    pub fn add_tag<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: for<'p> Fn(&mut Parser<'p>, &Token, &mut Parser<'p>) -> Result<Box<dyn TagNode>>
            + Send
            + Sync
            + 'static,
    {
        self.tags.insert(name.into(), Arc::new(f));
    }

    /// Bans a filter. Templates using it still compile but fail to render.
    pub fn ban_filter(&mut self, name: impl Into<String>) {
        self.banned_filters.insert(name.into());
    }

    /// Bans a directive. Templates using it fail to compile.
    pub fn ban_tag(&mut self, name: impl Into<String>) {
        self.banned_tags.insert(name.into());
    }

    /// Adds a variable visible to every render, below the render context.
    pub fn add_global(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.globals.insert(name.into(), value.into());
    }

    /// Compiles a template from source. The result is not cached.
    ///
    /// Relative names in `extends` and `include` are resolved from the
    /// loader's root.
    pub fn from_string(&self, source: impl Into<String>) -> Result<Template<'_>> {
        let origin = Origin::new("<string>", source.into(), false);
        let inner = compile::compile(self, Arc::new(origin), &[])?;
        Ok(self.template(Arc::new(inner)))
    }

    /// Loads and compiles a template without going through the cache.
    pub fn from_file(&self, name: &str) -> Result<Template<'_>> {
        let identity = self.resolve(name, None)?;
        let inner = self.compile_identity(&identity, &[])?;
        Ok(self.template(Arc::new(inner)))
    }

    /// Returns the cached template for `name`, loading and compiling it on
    /// first use.
    pub fn from_cache(&self, name: &str) -> Result<Template<'_>> {
        let inner = self.load_template(name, None)?;
        Ok(self.template(inner))
    }

    /// Drops every cached template.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Drops the cached template for `name`, returning whether it was cached.
    pub fn invalidate(&self, name: &str) -> bool {
        match self.loader.resolve(name, None) {
            Ok(identity) => self.cache.invalidate(&identity),
            Err(_) => false,
        }
    }

    fn template(&self, inner: Arc<CompiledTemplate>) -> Template<'_> {
        Template { set: self, inner }
    }

    fn resolve(&self, name: &str, relative_to: Option<&str>) -> Result<String> {
        self.loader
            .resolve(name, relative_to)
            .map_err(|err| load_error(err, relative_to))
    }

    fn compile_identity(&self, identity: &str, ancestry: &[String]) -> Result<CompiledTemplate> {
        self.compile_tracked(identity, ancestry, &Cell::new(false))
    }

    /// Like `compile_identity`, but sets `missing` when the template's own
    /// source does not exist.
    fn compile_tracked(
        &self,
        identity: &str,
        ancestry: &[String],
        missing: &Cell<bool>,
    ) -> Result<CompiledTemplate> {
        let source = self.loader.read(identity).map_err(|err| {
            missing.set(matches!(err, LoadError::NotFound(_)));
            load_error(err, Some(identity))
        })?;
        let origin = Origin::new(identity, source, true);
        compile::compile(self, Arc::new(origin), ancestry)
    }

    /// Loads a template through the cache, honoring the debug option.
    pub(crate) fn load_template(
        &self,
        name: &str,
        relative_to: Option<&str>,
    ) -> Result<Arc<CompiledTemplate>> {
        let identity = self.resolve(name, relative_to)?;
        self.load_identity(&identity, &Cell::new(false))
    }

    /// Loads an included template, returning `None` when the template itself
    /// does not exist. Missing templates further down its `extends` chain are
    /// still errors.
    pub(crate) fn load_include(
        &self,
        name: &str,
        relative_to: Option<&str>,
    ) -> Result<Option<Arc<CompiledTemplate>>> {
        let identity = match self.loader.resolve(name, relative_to) {
            Ok(identity) => identity,
            Err(LoadError::NotFound(_)) => return Ok(None),
            Err(err) => return Err(load_error(err, relative_to)),
        };
        let missing = Cell::new(false);
        match self.load_identity(&identity, &missing) {
            Err(_) if missing.get() => Ok(None),
            result => result.map(Some),
        }
    }

    fn load_identity(&self, identity: &str, missing: &Cell<bool>) -> Result<Arc<CompiledTemplate>> {
        if self.options.debug {
            debug!(identity = %identity, "cache bypassed");
            return self.compile_tracked(identity, &[], missing).map(Arc::new);
        }
        self.cache
            .get_or_compile(identity, false, || self.compile_tracked(identity, &[], missing))
    }

    /// Loads the parent named by an `extends` directive.
    ///
    /// `ancestry` lists the templates being compiled that lead to this
    /// parent, the child last.
    pub(crate) fn load_parent(
        &self,
        name: &str,
        child: &Origin,
        ancestry: &[String],
        pos: &Position,
    ) -> Result<Arc<CompiledTemplate>> {
        let relative_to = child.loaded.then_some(child.identity.as_str());
        let identity = self.resolve(name, relative_to).map_err(|e| e.or_at(pos))?;
        debug!(child = %child.identity, parent = %identity, "resolving parent template");

        if ancestry.contains(&identity) {
            let mut chain = ancestry.to_vec();
            chain.push(identity);
            let msg = format!("cyclic 'extends' detected: {}", chain.join(" -> "));
            return Err(Error::compile(msg, pos));
        }

        let compile = || self.compile_identity(&identity, ancestry);
        if self.options.debug {
            return compile().map(Arc::new);
        }
        self.cache.get_or_compile(&identity, true, compile)
    }
}

fn load_error(err: LoadError, identity: Option<&str>) -> Error {
    let error = Error::new(ErrorKind::Load, Phase::Compile, err.to_string()).with_source(err);
    match identity {
        Some(identity) => error.with_identity(identity),
        None => error,
    }
}

impl<'set> Template<'set> {
    /// Renders the template with a serializable context.
    #[cfg(feature = "serde")]
    pub fn render<S>(&self, ctx: S) -> Result<String>
    where
        S: serde::Serialize,
    {
        self.render_from(&crate::to_value(ctx)?)
    }

    /// Renders the template with a serializable context to a writer.
    #[cfg(feature = "serde")]
    pub fn render_to_writer<W, S>(&self, writer: W, ctx: S) -> Result<()>
    where
        W: io::Write,
        S: serde::Serialize,
    {
        self.render_from_to_writer(writer, &crate::to_value(ctx)?)
    }

    /// Renders the template with a context that is a [`Value::Map`] or
    /// [`Value::None`].
    ///
    /// Unlike [`render`][Template::render] this keeps [`Value::Function`]
    /// and [`Value::Object`] values intact.
    pub fn render_from(&self, ctx: &Value) -> Result<String> {
        let mut buf = String::with_capacity(self.inner.origin.source.len());
        render::render(self.set, &self.inner, ctx, &mut Formatter::with_string(&mut buf))?;
        Ok(buf)
    }

    pub fn render_from_to_writer<W>(&self, writer: W, ctx: &Value) -> Result<()>
    where
        W: io::Write,
    {
        let mut w = Writer::new(writer);
        render::render(self.set, &self.inner, ctx, &mut Formatter::with_writer(&mut w))
            .map_err(|err| w.take_err().map(Error::from).unwrap_or(err))
    }

    /// Renders each of the named blocks on its own.
    ///
    /// Blocks the template family does not define are left out of the
    /// result.
    #[cfg(feature = "serde")]
    pub fn render_blocks<S>(&self, ctx: S, names: &[&str]) -> Result<BTreeMap<String, String>>
    where
        S: serde::Serialize,
    {
        self.render_blocks_from(&crate::to_value(ctx)?, names)
    }

    pub fn render_blocks_from(&self, ctx: &Value, names: &[&str]) -> Result<BTreeMap<String, String>> {
        render::render_blocks(self.set, &self.inner, ctx, names)
    }

    /// The identity the template was compiled under.
    pub fn name(&self) -> &str {
        self.inner.identity()
    }

    /// The names of the blocks defined in this template, in source order.
    pub fn block_names(&self) -> impl Iterator<Item = &str> {
        self.inner.blocks.iter().map(|(name, _)| name.as_str())
    }

    /// The identity of the template this one extends.
    pub fn parent_name(&self) -> Option<&str> {
        self.inner.parent.as_ref().map(|p| p.identity())
    }

    /// Whether both handles refer to the same compiled template.
    pub fn ptr_eq(&self, other: &Template<'_>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Template<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("name", &self.name())
            .field("parent", &self.parent_name())
            .finish_non_exhaustive()
    }
}
