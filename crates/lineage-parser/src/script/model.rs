//! Script-block model: a tree-sitter parse segmented into top-level
//! declarations with their declared names and free identifiers.

use tree_sitter::{Node, Parser, Tree};

use crate::component::ScriptLang;
use crate::expr::is_traceable;
use lineage_core::{LineageError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Import,
    Variable,
    Function,
    Class,
    Interface,
    TypeAlias,
    /// The component's `export default { ... }` options declaration.
    ExportDefault,
    /// Any other top-level statement, e.g. a bare call expression.
    Statement,
}

#[derive(Debug, Clone)]
pub struct TopLevelDecl {
    pub kind: DeclKind,
    /// Names this declaration binds at the top level.
    pub names: Vec<String>,
    /// Byte range in the script source.
    pub span: (usize, usize),
    /// Identifiers the declaration references but does not bind.
    pub free_idents: Vec<String>,
}

pub struct ScriptModel {
    pub source: String,
    pub lang: ScriptLang,
    tree: Tree,
    pub decls: Vec<TopLevelDecl>,
}

fn language_for(lang: ScriptLang) -> tree_sitter::Language {
    match lang {
        ScriptLang::Js => tree_sitter_javascript::LANGUAGE.into(),
        ScriptLang::Ts => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
    }
}

pub fn parse_script(source: &str, lang: ScriptLang) -> Result<ScriptModel> {
    let mut parser = Parser::new();
    parser
        .set_language(&language_for(lang))
        .map_err(|e| LineageError::Internal(format!("script grammar unavailable: {}", e)))?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| LineageError::UnparsableComponent("script block did not parse".into()))?;

    let mut decls = Vec::new();
    let root = tree.root_node();
    for i in 0..root.named_child_count() {
        let Some(child) = root.named_child(i) else { continue };
        if child.kind() == "comment" {
            continue;
        }
        decls.push(build_decl(child, source));
    }

    Ok(ScriptModel {
        source: source.to_string(),
        lang,
        tree,
        decls,
    })
}

impl ScriptModel {
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn decl_source(&self, decl: &TopLevelDecl) -> &str {
        &self.source[decl.span.0..decl.span.1]
    }

    /// The syntax node of the `export default` options object, if any.
    /// Unwraps a wrapping call such as `defineComponent({ ... })`.
    pub fn options_object(&self) -> Option<Node<'_>> {
        let root = self.tree.root_node();
        for i in 0..root.named_child_count() {
            let child = root.named_child(i)?;
            if child.kind() != "export_statement" {
                continue;
            }
            if let Some(value) = child.child_by_field_name("value") {
                return first_object(value);
            }
        }
        None
    }
}

fn first_object(node: Node<'_>) -> Option<Node<'_>> {
    if node.kind() == "object" {
        return Some(node);
    }
    for i in 0..node.named_child_count() {
        if let Some(found) = node.named_child(i).and_then(first_object) {
            return Some(found);
        }
    }
    None
}

fn build_decl(node: Node<'_>, source: &str) -> TopLevelDecl {
    let (kind, names, body) = classify_decl(node, source);
    let mut free = Vec::new();
    collect_free_identifiers(body, source, &names, &mut free);
    TopLevelDecl {
        kind,
        names,
        span: (node.start_byte(), node.end_byte()),
        free_idents: free,
    }
}

/// Returns the declaration kind, its bound names, and the node to scan
/// for free identifiers (the inner declaration for export wrappers).
fn classify_decl<'a>(node: Node<'a>, source: &str) -> (DeclKind, Vec<String>, Node<'a>) {
    match node.kind() {
        "import_statement" => (DeclKind::Import, import_bindings(node, source), node),
        "lexical_declaration" | "variable_declaration" => {
            (DeclKind::Variable, declarator_names(node, source), node)
        }
        "function_declaration" | "generator_function_declaration" => (
            DeclKind::Function,
            field_name(node, source).into_iter().collect(),
            node,
        ),
        "class_declaration" => (
            DeclKind::Class,
            field_name(node, source).into_iter().collect(),
            node,
        ),
        "interface_declaration" => (
            DeclKind::Interface,
            field_name(node, source).into_iter().collect(),
            node,
        ),
        "type_alias_declaration" | "enum_declaration" => (
            DeclKind::TypeAlias,
            field_name(node, source).into_iter().collect(),
            node,
        ),
        "export_statement" => {
            if let Some(inner) = node.child_by_field_name("declaration") {
                let (kind, names, _) = classify_decl(inner, source);
                (kind, names, inner)
            } else if node.child_by_field_name("value").is_some() {
                (DeclKind::ExportDefault, Vec::new(), node)
            } else {
                (DeclKind::Statement, Vec::new(), node)
            }
        }
        _ => (DeclKind::Statement, Vec::new(), node),
    }
}

fn field_name(node: Node<'_>, source: &str) -> Option<String> {
    node.child_by_field_name("name")
        .and_then(|n| n.utf8_text(source.as_bytes()).ok())
        .map(|s| s.to_string())
}

fn import_bindings(node: Node<'_>, source: &str) -> Vec<String> {
    let mut names = Vec::new();
    walk(node, &mut |n| match n.kind() {
        "import_specifier" => {
            // `{ exported as local }` binds the local name
            let binding = n
                .child_by_field_name("alias")
                .or_else(|| n.child_by_field_name("name"));
            if let Some(text) = binding.and_then(|b| b.utf8_text(source.as_bytes()).ok()) {
                push_unique(&mut names, text);
            }
            false
        }
        "namespace_import" => {
            for i in 0..n.named_child_count() {
                if let Some(id) = n.named_child(i) {
                    if id.kind() == "identifier" {
                        if let Ok(text) = id.utf8_text(source.as_bytes()) {
                            push_unique(&mut names, text);
                        }
                    }
                }
            }
            false
        }
        "identifier" => {
            // default import binding sits directly under import_clause
            if n.parent().map(|p| p.kind()) == Some("import_clause") {
                if let Ok(text) = n.utf8_text(source.as_bytes()) {
                    push_unique(&mut names, text);
                }
            }
            true
        }
        _ => true,
    });
    names
}

fn declarator_names(node: Node<'_>, source: &str) -> Vec<String> {
    let mut names = Vec::new();
    for i in 0..node.named_child_count() {
        let Some(declarator) = node.named_child(i) else { continue };
        if declarator.kind() != "variable_declarator" {
            continue;
        }
        let Some(pattern) = declarator.child_by_field_name("name") else { continue };
        walk(pattern, &mut |n| {
            if matches!(n.kind(), "identifier" | "shorthand_property_identifier_pattern") {
                if let Ok(text) = n.utf8_text(source.as_bytes()) {
                    push_unique(&mut names, text);
                }
            }
            true
        });
    }
    names
}

/// Collects identifiers referenced below `node` that it does not bind
/// itself. Member-expression property names and non-computed object
/// keys have distinct node kinds and are skipped naturally; builtin
/// names are filtered.
pub fn collect_free_identifiers(
    node: Node<'_>,
    source: &str,
    bound: &[String],
    out: &mut Vec<String>,
) {
    walk(node, &mut |n| {
        if matches!(
            n.kind(),
            "identifier" | "shorthand_property_identifier" | "type_identifier"
        ) {
            if let Ok(text) = n.utf8_text(source.as_bytes()) {
                if is_traceable(text) && !bound.iter().any(|b| b == text) {
                    push_unique_string(out, text.to_string());
                }
            }
        }
        true
    });
}

fn push_unique(names: &mut Vec<String>, text: &str) {
    push_unique_string(names, text.to_string());
}

fn push_unique_string(names: &mut Vec<String>, text: String) {
    if !names.iter().any(|n| n == &text) {
        names.push(text);
    }
}

/// Pre-order walk; the callback returns whether to descend.
pub fn walk<'a>(node: Node<'a>, visit: &mut dyn FnMut(Node<'a>) -> bool) {
    if !visit(node) {
        return;
    }
    for i in 0..node.named_child_count() {
        if let Some(child) = node.named_child(i) {
            walk(child, visit);
        }
    }
}

/// String literal content without its quotes.
pub fn string_content<'a>(node: Node<'a>, source: &'a str) -> Option<&'a str> {
    if node.kind() != "string" {
        return None;
    }
    node.utf8_text(source.as_bytes())
        .ok()
        .map(|s| s.trim_matches(|c| c == '\'' || c == '"' || c == '`'))
}
