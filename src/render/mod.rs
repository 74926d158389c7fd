//! Render a compiled template against a context.
//!
//! Rendering walks the node tree of the root ancestor of the template family.
//! Blocks resolve to their leaf-most definition, so a child template only
//! contributes the blocks it overrides.

mod context;
mod eval;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::trace;

pub use crate::render::context::ExecutionContext;

use crate::fmt::Formatter;
use crate::types::template::CompiledTemplate;
use crate::value::Map;
use crate::{Error, ErrorKind, Phase, Result, Set, Value};

/// Renders the whole template.
pub(crate) fn render(
    set: &Set,
    template: &Arc<CompiledTemplate>,
    data: &Value,
    f: &mut Formatter<'_>,
) -> Result<()> {
    let start = Instant::now();
    trace!(identity = template.identity(), "render started");
    let data = scope(data).map_err(|e| e.with_identity(template.identity()))?;
    ExecutionContext::new(set, template.clone(), data).render_template(f)?;
    trace!(identity = template.identity(), elapsed = ?start.elapsed(), "render finished");
    Ok(())
}

/// Renders each of the named blocks on its own.
///
/// Names the template family does not define are left out of the result.
pub(crate) fn render_blocks(
    set: &Set,
    template: &Arc<CompiledTemplate>,
    data: &Value,
    names: &[&str],
) -> Result<BTreeMap<String, String>> {
    let data = scope(data).map_err(|e| e.with_identity(template.identity()))?;
    let mut out = BTreeMap::new();
    for &name in names {
        let body = match template.chain(name).and_then(|chain| chain.first()) {
            Some(body) => body.clone(),
            None => continue,
        };
        trace!(identity = template.identity(), block = name, "render block");
        let mut buf = String::new();
        ExecutionContext::new(set, template.clone(), data.clone()).render_block(
            name,
            &body,
            &mut Formatter::with_string(&mut buf),
        )?;
        out.insert(name.to_owned(), buf);
    }
    Ok(out)
}

/// Turns the render context into the bottom scope.
fn scope(data: &Value) -> Result<Map<String, Value>> {
    match data {
        Value::Map(map) => Ok(map.clone()),
        Value::None => Ok(Map::new()),
        value => Err(Error::new(
            ErrorKind::Execution,
            Phase::Execution,
            format!("render context must be a map, found {}", value.human()),
        )),
    }
}
