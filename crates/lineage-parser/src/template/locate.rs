use super::{LocatePoint, NodeId, NodeKind, TemplateAst};

/// Finds the most specific element enclosing `point`. Depth-first:
/// children are consulted before a node accepts the match, and among
/// sibling matches the first in source order wins. Text nodes are
/// never returned; a hit inside one resolves to its element.
pub fn locate(ast: &TemplateAst, point: LocatePoint) -> Option<NodeId> {
    for &root in ast.roots() {
        if let Some(found) = locate_in(ast, root, point) {
            return Some(found);
        }
    }
    None
}

fn locate_in(ast: &TemplateAst, id: NodeId, point: LocatePoint) -> Option<NodeId> {
    if ast.kind(id) != NodeKind::Element || !ast.contains(id, point) {
        return None;
    }
    for &child in ast.children(id) {
        if let Some(found) = locate_in(ast, child, point) {
            return Some(found);
        }
    }
    Some(id)
}
