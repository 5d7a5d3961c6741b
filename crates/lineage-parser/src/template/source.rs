use super::{NodeId, TemplateAst};

/// Returns the node's original source span, truncated when it exceeds
/// `max_lines`. Truncation keeps the opening tag and annotates how many
/// lines were dropped; self-closing nodes are always returned verbatim.
/// The budget exists to bound payload size sent to the reasoning
/// collaborator.
pub fn node_source(ast: &TemplateAst, id: NodeId, max_lines: usize) -> String {
    let (start, end) = ast.byte_span(id);
    let text = &ast.span_text()[start..end.min(ast.span_text().len())];
    if ast.self_closing(id) {
        return text.to_string();
    }
    let line_count = text.lines().count();
    if line_count <= max_lines.max(1) {
        return text.to_string();
    }
    let opening_end = text.find('>').map(|i| i + 1).unwrap_or(text.len());
    let opening = &text[..opening_end];
    let omitted = line_count - opening.lines().count();
    format!("{}\n<!-- {} lines omitted -->", opening, omitted)
}
