use std::fmt::Write;
use std::sync::Arc;

use crate::fmt::Formatter;
use crate::types::ast::{FilterCall, Node, NodeList};
use crate::types::span::Position;
use crate::types::template::CompiledTemplate;
use crate::value::Map;
use crate::{Error, Phase, Result, Set, Value};

/// The state of a single render.
///
/// Holds a stack of variable scopes. The bottom scope is seeded with the
/// render context and the set's globals are consulted after every scope.
/// Directives push a scope for their body and pop it when done.
pub struct ExecutionContext<'r> {
    set: &'r Set,
    /// The template the render was started with, which decides the active
    /// definition of every block.
    leaf: Arc<CompiledTemplate>,
    scopes: Vec<Map<String, Value>>,
    autoescape: bool,
    /// The blocks being rendered, with the index of the definition in the
    /// block's chain.
    blocks: Vec<(String, usize)>,
    include_depth: usize,
    /// Taken from the template the render was started with and kept for
    /// every included template.
    max_include_depth: usize,
}

impl<'r> ExecutionContext<'r> {
    pub(crate) fn new(set: &'r Set, leaf: Arc<CompiledTemplate>, data: Map<String, Value>) -> Self {
        let autoescape = leaf.options.autoescape;
        let max_include_depth = leaf.options.max_include_depth;
        Self {
            set,
            leaf,
            scopes: vec![data],
            autoescape,
            blocks: Vec::new(),
            include_depth: 0,
            max_include_depth,
        }
    }

    /// A context for rendering `template` from within this one.
    ///
    /// The new context starts out with a single scope holding the current
    /// bindings flattened, overridden by `bindings`. With `only` it holds
    /// `bindings` alone.
    pub(crate) fn isolated(
        &self,
        template: Arc<CompiledTemplate>,
        bindings: Map<String, Value>,
        only: bool,
    ) -> ExecutionContext<'r> {
        let mut seed = Map::new();
        if !only {
            for scope in &self.scopes {
                seed.extend(scope.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        seed.extend(bindings);
        ExecutionContext {
            set: self.set,
            leaf: template,
            scopes: vec![seed],
            autoescape: self.autoescape,
            blocks: Vec::new(),
            include_depth: self.include_depth + 1,
            max_include_depth: self.max_include_depth,
        }
    }

    pub(crate) fn template_set(&self) -> &'r Set {
        self.set
    }

    pub(crate) fn max_include_depth(&self) -> usize {
        self.max_include_depth
    }

    pub(crate) fn include_depth(&self) -> usize {
        self.include_depth
    }

    /// Looks up a variable, innermost scope first, then the set's globals.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .or_else(|| self.set.globals.get(name))
    }

    /// Resolves a dotted path such as `user.address.city`.
    ///
    /// Undefined names and missing segments resolve to [`Value::None`].
    pub fn resolve(&self, path: &str) -> Value {
        let mut segments = path.split('.');
        let first = segments.next().unwrap_or_default();
        let mut value = self.get(first).cloned().unwrap_or(Value::None);
        for segment in segments {
            if value.is_none() {
                break;
            }
            value = value.attr(segment);
        }
        value
    }

    /// Binds a variable in the innermost scope.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.into(), value);
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Map::new());
    }

    /// Pops the innermost scope. The scope seeded with the render context is
    /// never popped.
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Whether variable output is currently escaped.
    pub fn autoescape(&self) -> bool {
        self.autoescape
    }

    pub fn set_autoescape(&mut self, on: bool) {
        self.autoescape = on;
    }

    /// Renders a node list, e.g. the body of a directive.
    pub fn render(&mut self, nodes: &NodeList, f: &mut Formatter<'_>) -> Result<()> {
        for node in &nodes.nodes {
            match node {
                Node::Text(text) => f.write_str(text)?,
                Node::Variable(expr) => {
                    let value = expr.evaluate(self)?;
                    self.write_value(&value, f)?;
                }
                Node::Tag(tag) => tag.node.execute(self, f).map_err(|e| e.or_at(&tag.pos))?,
            }
        }
        Ok(())
    }

    /// Renders a node list into a new string.
    pub fn render_to_string(&mut self, nodes: &NodeList) -> Result<String> {
        let mut buf = String::new();
        self.render(nodes, &mut Formatter::with_string(&mut buf))?;
        Ok(buf)
    }

    /// Renders the root ancestor of the template family.
    pub(crate) fn render_template(&mut self, f: &mut Formatter<'_>) -> Result<()> {
        let leaf = self.leaf.clone();
        self.render(&leaf.root_ancestor().root, f)
    }

    /// Writes the value of a variable node, escaping it unless it is safe.
    fn write_value(&self, value: &Value, f: &mut Formatter<'_>) -> Result<()> {
        match value {
            Value::None => {}
            Value::Safe(s) => f.write_str(s)?,
            Value::String(s) if !self.autoescape => f.write_str(s)?,
            Value::String(s) => (self.set.escaper)(f, s)?,
            value if !self.autoescape => write!(f, "{value}")?,
            value => (self.set.escaper)(f, &value.to_string())?,
        }
        Ok(())
    }

    /// Renders the active definition of the named block.
    pub(crate) fn render_block(
        &mut self,
        name: &str,
        own: &Arc<NodeList>,
        f: &mut Formatter<'_>,
    ) -> Result<()> {
        let body = match self.leaf.chain(name).and_then(|chain| chain.first()) {
            Some(body) => body.clone(),
            None => own.clone(),
        };
        self.blocks.push((name.to_owned(), 0));
        self.push_scope();
        let result = self.render(&body, f);
        self.pop_scope();
        self.blocks.pop();
        result
    }

    /// Renders the definition of the current block one step up the chain.
    ///
    /// At the root definition there is nothing left and the result is empty.
    pub(crate) fn render_super(&mut self, pos: &Position) -> Result<Value> {
        let (name, next) = match self.blocks.last() {
            Some((name, index)) => (name.clone(), index + 1),
            None => return Err(Error::execution("'block.super' used outside of a block", pos)),
        };
        let body = match self.leaf.chain(&name).and_then(|chain| chain.get(next)) {
            Some(body) => body.clone(),
            None => return Ok(Value::safe("")),
        };
        self.blocks.push((name, next));
        let result = self.render_to_string(&body);
        self.blocks.pop();
        result.map(Value::Safe)
    }

    /// Applies a filter to `input`, evaluating the filter's parameter first.
    pub(crate) fn apply_filter(&mut self, call: &FilterCall, input: Value) -> Result<Value> {
        let name = &call.name;
        if self.set.banned_filters.contains(name) {
            let msg = format!("usage of filter '{name}' is not allowed (sandbox restriction active)");
            return Err(Error::sandbox(msg, Phase::Execution, &call.pos));
        }
        let filter = match self.set.filters.get(name) {
            Some(filter) => filter.clone(),
            None => return Err(Error::execution(format!("filter '{name}' does not exist"), &call.pos)),
        };
        let param = match &call.arg {
            Some(arg) => arg.evaluate(self)?,
            None => Value::None,
        };
        filter(&input, &param).map_err(|err| Error::execution(err.to_string(), &call.pos).with_source(err))
    }
}
