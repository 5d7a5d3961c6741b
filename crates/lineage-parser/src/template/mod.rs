//! Template ASTs for the two supported parser generations.
//!
//! Both dialects share one markup scanner but keep their own node
//! shapes and coordinate systems: legacy spans are byte offsets into
//! the de-indented template block, modern spans are file-relative
//! line/column pairs. Nodes live in a flat arena addressed by index; a
//! parent table is filled once while the arena is built and read-only
//! afterwards, so concurrent walks never mutate shared nodes.

pub mod legacy;
mod locate;
mod markup;
pub mod modern;
mod source;

pub use legacy::{LegacyAst, LegacyNode};
pub use locate::locate;
pub use markup::MarkupError;
pub use modern::{LineSpan, ModernAst, ModernNode};
pub use source::node_source;

/// Arena index of a template node.
pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateAttr {
    pub name: String,
    pub value: Option<String>,
}

/// Position probe in the coordinate system of the dialect under query.
#[derive(Debug, Clone, Copy)]
pub enum LocatePoint {
    /// Byte offset into the de-indented template text (legacy).
    Offset(usize),
    /// File-relative 1-based line / 0-based column (modern).
    LineColumn { line: u32, column: u32 },
}

/// Parsed template, polymorphic over dialect.
#[derive(Debug, Clone)]
pub enum TemplateAst {
    Legacy(LegacyAst),
    Modern(ModernAst),
}

impl TemplateAst {
    pub fn roots(&self) -> &[NodeId] {
        match self {
            TemplateAst::Legacy(ast) => &ast.roots,
            TemplateAst::Modern(ast) => &ast.roots,
        }
    }

    pub fn node_count(&self) -> usize {
        match self {
            TemplateAst::Legacy(ast) => ast.nodes.len(),
            TemplateAst::Modern(ast) => ast.nodes.len(),
        }
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        match self {
            TemplateAst::Legacy(ast) => ast.nodes[id].kind,
            TemplateAst::Modern(ast) => ast.nodes[id].kind,
        }
    }

    pub fn tag(&self, id: NodeId) -> &str {
        match self {
            TemplateAst::Legacy(ast) => &ast.nodes[id].tag,
            TemplateAst::Modern(ast) => &ast.nodes[id].tag,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self {
            TemplateAst::Legacy(ast) => ast.nodes[id].text.as_deref(),
            TemplateAst::Modern(ast) => ast.nodes[id].text.as_deref(),
        }
    }

    pub fn attrs(&self, id: NodeId) -> &[TemplateAttr] {
        match self {
            TemplateAst::Legacy(ast) => &ast.nodes[id].attrs,
            TemplateAst::Modern(ast) => &ast.nodes[id].props,
        }
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self {
            TemplateAst::Legacy(ast) => &ast.nodes[id].children,
            TemplateAst::Modern(ast) => &ast.nodes[id].children,
        }
    }

    /// Read-only parent lookup built at parse time.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        match self {
            TemplateAst::Legacy(ast) => ast.parents[id],
            TemplateAst::Modern(ast) => ast.parents[id],
        }
    }

    pub fn self_closing(&self, id: NodeId) -> bool {
        match self {
            TemplateAst::Legacy(ast) => ast.nodes[id].self_closing,
            TemplateAst::Modern(ast) => ast.nodes[id].self_closing,
        }
    }

    /// The template text node spans index into: de-indented for legacy,
    /// raw block text for modern.
    pub fn span_text(&self) -> &str {
        match self {
            TemplateAst::Legacy(ast) => &ast.source,
            TemplateAst::Modern(ast) => &ast.source,
        }
    }

    /// Byte range of the node within [`span_text`](Self::span_text).
    pub fn byte_span(&self, id: NodeId) -> (usize, usize) {
        match self {
            TemplateAst::Legacy(ast) => (ast.nodes[id].start, ast.nodes[id].end),
            TemplateAst::Modern(ast) => ast.nodes[id].offsets,
        }
    }

    pub fn contains(&self, id: NodeId, point: LocatePoint) -> bool {
        match (self, point) {
            (TemplateAst::Legacy(ast), LocatePoint::Offset(offset)) => {
                let node = &ast.nodes[id];
                node.start <= offset && offset <= node.end
            }
            (TemplateAst::Modern(ast), LocatePoint::LineColumn { line, column }) => {
                ast.nodes[id].span.contains(line, column)
            }
            // A probe in the other dialect's coordinate system never matches.
            _ => false,
        }
    }

    /// Attribute value for `name`, also answering the bound form
    /// (`:name` / `v-bind:name`).
    pub fn attr_value(&self, id: NodeId, name: &str) -> Option<&str> {
        let bound = format!(":{}", name);
        let long_bound = format!("v-bind:{}", name);
        self.attrs(id)
            .iter()
            .find(|a| a.name == name || a.name == bound || a.name == long_bound)
            .and_then(|a| a.value.as_deref())
    }

    fn walk_elements(&self, id: NodeId, out: &mut Vec<NodeId>) {
        if self.kind(id) == NodeKind::Element {
            out.push(id);
        }
        for &child in self.children(id) {
            self.walk_elements(child, out);
        }
    }

    /// All element nodes in source order.
    pub fn elements(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        for &root in self.roots() {
            self.walk_elements(root, &mut out);
        }
        out
    }

    /// Finds the first element matching one of `tags` that binds
    /// `prop`, returning the node and the bound expression. Static
    /// (unbound) attribute values are returned as quoted literals so
    /// the caller can tell them apart.
    pub fn find_prop_binding(&self, tags: &[String], prop: &str) -> Option<PropBinding> {
        let kebab = to_kebab_case(prop);
        for id in self.elements() {
            let tag = self.tag(id);
            if !tags.iter().any(|t| t == tag) {
                continue;
            }
            for candidate in [prop, kebab.as_str()] {
                for attr in self.attrs(id) {
                    let bound = attr.name.strip_prefix(':').or_else(|| attr.name.strip_prefix("v-bind:"));
                    if bound == Some(candidate) {
                        return Some(PropBinding {
                            node: id,
                            expression: attr.value.clone().unwrap_or_default(),
                            is_static: false,
                        });
                    }
                    if attr.name == candidate {
                        return Some(PropBinding {
                            node: id,
                            expression: format!("'{}'", attr.value.clone().unwrap_or_default()),
                            is_static: true,
                        });
                    }
                }
            }
        }
        None
    }
}

/// How a parent template feeds a pass-through parameter of a child.
#[derive(Debug, Clone)]
pub struct PropBinding {
    pub node: NodeId,
    pub expression: String,
    pub is_static: bool,
}

pub(crate) fn to_kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kebab_case_conversion() {
        assert_eq!(to_kebab_case("userName"), "user-name");
        assert_eq!(to_kebab_case("UserCard"), "user-card");
        assert_eq!(to_kebab_case("title"), "title");
    }

    #[test]
    fn prop_binding_lookup_prefers_bound_form() {
        let ast = legacy::parse("<div><user-card :user-info=\"currentUser\" /></div>").unwrap();
        let ast = TemplateAst::Legacy(ast);
        let binding = ast
            .find_prop_binding(&["user-card".to_string()], "userInfo")
            .expect("binding");
        assert_eq!(binding.expression, "currentUser");
        assert!(!binding.is_static);
    }

    #[test]
    fn static_attribute_is_reported_as_literal() {
        let ast = legacy::parse("<card title=\"Orders\"></card>").unwrap();
        let ast = TemplateAst::Legacy(ast);
        let binding = ast
            .find_prop_binding(&["card".to_string()], "title")
            .expect("binding");
        assert_eq!(binding.expression, "'Orders'");
        assert!(binding.is_static);
    }
}
