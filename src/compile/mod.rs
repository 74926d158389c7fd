//! Compile template source into a [`CompiledTemplate`].
//!
//! This process has two stages:
//! - The lexer chunks the template source into tokens.
//! - The parser constructs the node tree from the token stream, handing
//!   directives to the parse functions registered on the set.
//!
//! Parent templates named by `extends` are compiled (or fetched from the
//! cache) while the child is being parsed, so a compiled template owns its
//! whole ancestor chain.

mod expr;
mod lex;
mod parse;
mod search;

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

pub use crate::compile::lex::{Token, TokenKind};
pub use crate::compile::parse::Parser;
pub(crate) use crate::compile::search::Searcher;

use crate::compile::parse::CompileEnv;
use crate::types::span::Origin;
use crate::types::template::CompiledTemplate;
use crate::{Result, Set};

/// Compiles a template.
///
/// `ancestry` holds the identities of the templates that are extending this
/// one, used to detect `extends` cycles.
pub(crate) fn compile(set: &Set, origin: Arc<Origin>, ancestry: &[String]) -> Result<CompiledTemplate> {
    let start = Instant::now();
    let tokens = lex::lex(&set.searcher, &origin, &set.options)?;

    let mut chain = ancestry.to_vec();
    chain.push(origin.identity.clone());
    let env = CompileEnv {
        set,
        origin: origin.clone(),
        ancestry: &chain,
    };
    let (root, doc) = Parser::document(&env, &tokens).parse_document()?;

    let template = CompiledTemplate::new(origin, root, doc.blocks, doc.parent, set.options.clone());
    debug!(
        identity = template.identity(),
        parent = template.parent.as_ref().map(|p| p.identity()),
        blocks = template.blocks.len(),
        elapsed = ?start.elapsed(),
        "compiled template"
    );
    Ok(template)
}
