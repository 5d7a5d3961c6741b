//! Modern-generation template AST. The second parser generation sees
//! the template in place inside the component file and reports spans
//! as file-relative line/column pairs.

use super::markup::{self, MarkupError, RawNode};
use super::{NodeId, NodeKind, TemplateAttr};

/// File-relative span; 1-based lines, 0-based columns. Column bounds
/// are only meaningful on the span's own start/end lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpan {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl LineSpan {
    pub fn contains(&self, line: u32, column: u32) -> bool {
        if line < self.start_line || line > self.end_line {
            return false;
        }
        if line == self.start_line && column < self.start_column {
            return false;
        }
        if line == self.end_line && column > self.end_column {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone)]
pub struct ModernNode {
    pub kind: NodeKind,
    pub tag: String,
    pub text: Option<String>,
    /// The modern generation models attributes and directives as props.
    pub props: Vec<TemplateAttr>,
    pub children: Vec<NodeId>,
    pub span: LineSpan,
    /// Byte range within the raw template block, for source slicing.
    pub offsets: (usize, usize),
    pub self_closing: bool,
}

#[derive(Debug, Clone)]
pub struct ModernAst {
    pub nodes: Vec<ModernNode>,
    pub roots: Vec<NodeId>,
    pub(super) parents: Vec<Option<NodeId>>,
    /// Raw template block text the byte offsets index into.
    pub source: String,
}

struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (idx, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(idx + 1);
            }
        }
        Self { line_starts }
    }

    /// 0-based (line, column) of a byte offset.
    fn position(&self, offset: usize) -> (u32, u32) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        ((line) as u32, (offset - self.line_starts[line]) as u32)
    }
}

/// Parses the raw template block. `first_line` is the 1-based file line
/// the block content starts on and `first_line_column` the 0-based file
/// column of its first byte; both feed the file-relative spans.
pub fn parse(
    block: &str,
    first_line: u32,
    first_line_column: u32,
) -> Result<ModernAst, MarkupError> {
    let raw = markup::parse_markup(block)?;
    let index = LineIndex::new(block);
    let mut ast = ModernAst {
        nodes: Vec::new(),
        roots: Vec::new(),
        parents: Vec::new(),
        source: block.to_string(),
    };
    let ctx = SpanContext {
        index,
        first_line,
        first_line_column,
    };
    for node in &raw {
        let id = add_node(&mut ast, &ctx, node, None);
        ast.roots.push(id);
    }
    Ok(ast)
}

struct SpanContext {
    index: LineIndex,
    first_line: u32,
    first_line_column: u32,
}

impl SpanContext {
    fn file_position(&self, offset: usize) -> (u32, u32) {
        let (line0, col) = self.index.position(offset);
        let column = if line0 == 0 {
            col + self.first_line_column
        } else {
            col
        };
        (self.first_line + line0, column)
    }

    fn span(&self, start: usize, end: usize) -> LineSpan {
        let (start_line, start_column) = self.file_position(start);
        // end offset is exclusive; the span's end column is inclusive
        let (end_line, end_column) = self.file_position(end.saturating_sub(1).max(start));
        LineSpan {
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }
}

fn add_node(ast: &mut ModernAst, ctx: &SpanContext, raw: &RawNode, parent: Option<NodeId>) -> NodeId {
    let id = ast.nodes.len();
    match raw {
        RawNode::Element(el) => {
            ast.nodes.push(ModernNode {
                kind: NodeKind::Element,
                tag: el.tag.clone(),
                text: None,
                props: el
                    .attrs
                    .iter()
                    .map(|a| TemplateAttr {
                        name: a.name.clone(),
                        value: a.value.clone(),
                    })
                    .collect(),
                children: Vec::new(),
                span: ctx.span(el.start, el.end),
                offsets: (el.start, el.end),
                self_closing: el.self_closing,
            });
            ast.parents.push(parent);
            let children: Vec<NodeId> = el
                .children
                .iter()
                .map(|child| add_node(ast, ctx, child, Some(id)))
                .collect();
            ast.nodes[id].children = children;
        }
        RawNode::Text(t) => {
            ast.nodes.push(ModernNode {
                kind: NodeKind::Text,
                tag: "#text".to_string(),
                text: Some(t.text.clone()),
                props: Vec::new(),
                children: Vec::new(),
                span: ctx.span(t.start, t.end),
                offsets: (t.start, t.end),
                self_closing: false,
            });
            ast.parents.push(parent);
        }
    }
    id
}
