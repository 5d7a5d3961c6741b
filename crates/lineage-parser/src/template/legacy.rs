//! Legacy-generation template AST. The first parser generation strips
//! the block's common indentation before assigning spans, so every
//! node carries byte offsets into that de-indented text.

use super::markup::{self, MarkupError, RawNode};
use super::{NodeId, NodeKind, TemplateAttr};

#[derive(Debug, Clone)]
pub struct LegacyNode {
    pub kind: NodeKind,
    pub tag: String,
    pub text: Option<String>,
    pub attrs: Vec<TemplateAttr>,
    pub children: Vec<NodeId>,
    /// Inclusive byte offsets into the de-indented template text.
    pub start: usize,
    pub end: usize,
    pub self_closing: bool,
}

#[derive(Debug, Clone)]
pub struct LegacyAst {
    pub nodes: Vec<LegacyNode>,
    pub roots: Vec<NodeId>,
    pub(super) parents: Vec<Option<NodeId>>,
    /// De-indented template text the spans index into.
    pub source: String,
}

/// Parses de-indented template text into a legacy AST.
pub fn parse(deindented: &str) -> Result<LegacyAst, MarkupError> {
    let raw = markup::parse_markup(deindented)?;
    let mut ast = LegacyAst {
        nodes: Vec::new(),
        roots: Vec::new(),
        parents: Vec::new(),
        source: deindented.to_string(),
    };
    for node in &raw {
        let id = add_node(&mut ast, node, None);
        ast.roots.push(id);
    }
    Ok(ast)
}

fn add_node(ast: &mut LegacyAst, raw: &RawNode, parent: Option<NodeId>) -> NodeId {
    let id = ast.nodes.len();
    match raw {
        RawNode::Element(el) => {
            ast.nodes.push(LegacyNode {
                kind: NodeKind::Element,
                tag: el.tag.clone(),
                text: None,
                attrs: el
                    .attrs
                    .iter()
                    .map(|a| TemplateAttr {
                        name: a.name.clone(),
                        value: a.value.clone(),
                    })
                    .collect(),
                children: Vec::new(),
                start: el.start,
                end: el.end,
                self_closing: el.self_closing,
            });
            ast.parents.push(parent);
            let children: Vec<NodeId> = el
                .children
                .iter()
                .map(|child| add_node(ast, child, Some(id)))
                .collect();
            ast.nodes[id].children = children;
        }
        RawNode::Text(t) => {
            ast.nodes.push(LegacyNode {
                kind: NodeKind::Text,
                tag: "#text".to_string(),
                text: Some(t.text.clone()),
                attrs: Vec::new(),
                children: Vec::new(),
                start: t.start,
                end: t.end,
                self_closing: false,
            });
            ast.parents.push(parent);
        }
    }
    id
}
