use std::collections::BTreeMap;
use std::sync::Arc;

use crate::types::ast::NodeList;
use crate::types::span::Origin;
use crate::Options;

/// A compiled template.
///
/// Created once by the parser and immutable afterwards. Templates that
/// `extends` another template hold the compiled parent, so a leaf template
/// owns its whole ancestor chain.
#[derive(Debug)]
pub struct CompiledTemplate {
    pub(crate) origin: Arc<Origin>,
    pub(crate) root: NodeList,
    /// The blocks defined in this template, in source order.
    pub(crate) blocks: Vec<(String, Arc<NodeList>)>,
    pub(crate) parent: Option<Arc<CompiledTemplate>>,
    /// For every block name in the family, the definitions from this template
    /// up to the root ancestor.
    pub(crate) chains: BTreeMap<String, Vec<Arc<NodeList>>>,
    /// The options the template was compiled with.
    pub(crate) options: Options,
}

impl CompiledTemplate {
    pub(crate) fn new(
        origin: Arc<Origin>,
        root: NodeList,
        blocks: Vec<(String, Arc<NodeList>)>,
        parent: Option<Arc<CompiledTemplate>>,
        options: Options,
    ) -> Self {
        let chains = build_chains(&blocks, parent.as_deref());
        Self {
            origin,
            root,
            blocks,
            parent,
            chains,
            options,
        }
    }

    pub fn identity(&self) -> &str {
        &self.origin.identity
    }

    /// The template whose nodes are rendered for this family.
    pub fn root_ancestor(&self) -> &CompiledTemplate {
        let mut current = self;
        while let Some(parent) = &current.parent {
            current = parent;
        }
        current
    }

    /// Returns the definitions of the named block, leaf first.
    pub fn chain(&self, name: &str) -> Option<&[Arc<NodeList>]> {
        self.chains.get(name).map(Vec::as_slice)
    }
}

/// Prepends this template's own definitions to the parent's chains.
fn build_chains(
    blocks: &[(String, Arc<NodeList>)],
    parent: Option<&CompiledTemplate>,
) -> BTreeMap<String, Vec<Arc<NodeList>>> {
    let mut chains: BTreeMap<String, Vec<Arc<NodeList>>> = BTreeMap::new();
    for (name, body) in blocks {
        chains.entry(name.clone()).or_default().push(body.clone());
    }
    if let Some(parent) = parent {
        for (name, defs) in &parent.chains {
            chains
                .entry(name.clone())
                .or_default()
                .extend(defs.iter().cloned());
        }
    }
    chains
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(name: &str, blocks: &[&str], parent: Option<Arc<CompiledTemplate>>) -> Arc<CompiledTemplate> {
        let origin = Arc::new(Origin::new(name, "", true));
        let blocks = blocks
            .iter()
            .map(|b| (b.to_string(), Arc::new(NodeList::default())))
            .collect();
        Arc::new(CompiledTemplate::new(
            origin,
            NodeList::default(),
            blocks,
            parent,
            Options::default(),
        ))
    }

    #[test]
    fn chains_are_leaf_first() {
        let base = template("base", &["title", "content"], None);
        let mid = template("mid", &["content"], Some(base.clone()));
        let leaf = template("leaf", &["content", "extra"], Some(mid.clone()));

        let content = leaf.chain("content").unwrap();
        assert_eq!(content.len(), 3);
        assert!(Arc::ptr_eq(&content[0], &leaf.blocks[0].1));
        assert!(Arc::ptr_eq(&content[1], &mid.blocks[0].1));
        assert!(Arc::ptr_eq(&content[2], &base.blocks[1].1));

        assert_eq!(leaf.chain("title").unwrap().len(), 1);
        assert_eq!(leaf.chain("extra").unwrap().len(), 1);
        assert!(leaf.chain("missing").is_none());
        assert_eq!(leaf.root_ancestor().identity(), "base");
    }
}
