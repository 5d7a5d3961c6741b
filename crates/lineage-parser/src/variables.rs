//! Variable extraction and classification for a located template node.
//!
//! Variables land in one of three buckets: interpolation content,
//! dynamic attribute/event bindings, and visibility conditionals. Every
//! extracted identifier is alias-resolved against enclosing loop
//! directives before it is recorded, so a loop alias never reaches a
//! trace as if it were a data source.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::expr::extract_identifiers;
use crate::template::{NodeId, NodeKind, TemplateAst};
use lineage_core::{BoundExpression, CategorizedVariables};

static INTERPOLATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([^}]*)\}\}").expect("interpolation regex"));

static LOOP_EXPR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\(?\s*([A-Za-z_$][\w$]*)\s*(?:,\s*([A-Za-z_$][\w$]*))?\s*\)?\s+(?:in|of)\s+(.+)$",
    )
    .expect("loop expression regex")
});

const CONDITIONAL_DIRECTIVES: &[&str] = &["v-if", "v-else-if", "v-show"];
const LOOP_DIRECTIVE: &str = "v-for";

/// A parsed loop directive: alias, optional index alias, and the source
/// collection expression.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopBinding {
    pub alias: String,
    pub index: Option<String>,
    pub source: String,
}

pub fn parse_loop_expression(value: &str) -> Option<LoopBinding> {
    let caps = LOOP_EXPR.captures(value.trim())?;
    Some(LoopBinding {
        alias: caps[1].to_string(),
        index: caps.get(2).map(|m| m.as_str().to_string()),
        source: caps[3].trim().to_string(),
    })
}

fn loop_binding_of(ast: &TemplateAst, id: NodeId) -> Option<LoopBinding> {
    ast.attrs(id)
        .iter()
        .find(|a| a.name == LOOP_DIRECTIVE)
        .and_then(|a| a.value.as_deref())
        .and_then(parse_loop_expression)
}

/// Resolves a name against loop directives on the node and its
/// ancestors. When `name` is an iteration alias (or index alias), the
/// loop's source collection expression is returned; otherwise `name`
/// comes back unchanged.
pub fn resolve_source(ast: &TemplateAst, node: NodeId, name: &str) -> String {
    let mut current = Some(node);
    while let Some(id) = current {
        if let Some(binding) = loop_binding_of(ast, id) {
            if binding.alias == name || binding.index.as_deref() == Some(name) {
                return binding.source;
            }
        }
        current = ast.parent(id);
    }
    name.to_string()
}

/// Fully resolves one extracted identifier into the variable names it
/// stands for, following nested loop aliases upward. Bounded so a
/// pathological alias cycle cannot spin.
fn resolve_names(ast: &TemplateAst, node: NodeId, name: &str) -> Vec<String> {
    let mut out = Vec::new();
    resolve_names_from(ast, Some(node), name, 5, &mut out);
    out
}

fn resolve_names_from(
    ast: &TemplateAst,
    start: Option<NodeId>,
    name: &str,
    budget: usize,
    out: &mut Vec<String>,
) {
    let mut current = start;
    while let Some(id) = current {
        if let Some(binding) = loop_binding_of(ast, id) {
            if binding.alias == name || binding.index.as_deref() == Some(name) {
                if budget == 0 {
                    return;
                }
                for inner in extract_identifiers(&binding.source) {
                    resolve_names_from(ast, ast.parent(id), &inner, budget - 1, out);
                }
                return;
            }
        }
        current = ast.parent(id);
    }
    if !out.iter().any(|n| n == name) {
        out.push(name.to_string());
    }
}

/// Rewrites an expression with loop aliases replaced by their source
/// collections, for display in trace evidence.
fn resolve_expression(ast: &TemplateAst, node: NodeId, expression: &str) -> String {
    let mut resolved = expression.to_string();
    for name in extract_identifiers(expression) {
        let source = resolve_source(ast, node, &name);
        if source != name {
            if let Ok(re) = Regex::new(&format!(r"\b{}\b", regex::escape(&name))) {
                resolved = re.replace_all(&resolved, source.as_str()).into_owned();
            }
        }
    }
    resolved
}

fn bound_expression(
    ast: &TemplateAst,
    node: NodeId,
    directive: Option<&str>,
    raw: &str,
    expression: &str,
) -> BoundExpression {
    let mut variables = Vec::new();
    for name in extract_identifiers(expression) {
        for resolved in resolve_names(ast, node, &name) {
            if !variables.iter().any(|v: &String| v == &resolved) {
                variables.push(resolved);
            }
        }
    }
    BoundExpression {
        directive: directive.map(|d| d.to_string()),
        expression: resolve_expression(ast, node, expression),
        raw: raw.to_string(),
        variables,
    }
}

fn is_dynamic_binding(name: &str) -> bool {
    name.starts_with(':')
        || name.starts_with("v-bind:")
        || name.starts_with('@')
        || name.starts_with("v-on:")
        || name == "v-model"
        || (name.starts_with("v-")
            && name != LOOP_DIRECTIVE
            && name != "v-else"
            && !CONDITIONAL_DIRECTIVES.contains(&name))
}

/// Partitions the node's variables into the three semantic categories.
/// A result with an empty `all` set means the node is static content.
pub fn classify(ast: &TemplateAst, node: NodeId) -> CategorizedVariables {
    let mut vars = CategorizedVariables::default();

    // content: interpolations in direct child text nodes
    for &child in ast.children(node) {
        if ast.kind(child) != NodeKind::Text {
            continue;
        }
        let Some(text) = ast.text(child) else { continue };
        for caps in INTERPOLATION.captures_iter(text) {
            let raw = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
            let inner = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
            if inner.is_empty() {
                continue;
            }
            vars.content
                .push(bound_expression(ast, node, None, raw, inner));
        }
    }

    for attr in ast.attrs(node) {
        let Some(value) = attr.value.as_deref() else { continue };
        if value.trim().is_empty() {
            continue;
        }
        let raw = format!("{}=\"{}\"", attr.name, value);
        if CONDITIONAL_DIRECTIVES.contains(&attr.name.as_str()) {
            vars.conditionals.push(bound_expression(
                ast,
                node,
                Some(&attr.name),
                &raw,
                value,
            ));
        } else if is_dynamic_binding(&attr.name) {
            vars.attributes.push(bound_expression(
                ast,
                node,
                Some(&attr.name),
                &raw,
                value,
            ));
        }
    }

    vars.finalize();
    vars
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{legacy, locate, LocatePoint, TemplateAst};

    fn parse(text: &str) -> TemplateAst {
        TemplateAst::Legacy(legacy::parse(text).unwrap())
    }

    fn locate_at(ast: &TemplateAst, text: &str, needle: &str) -> NodeId {
        let offset = text.find(needle).expect("needle present");
        locate(ast, LocatePoint::Offset(offset)).expect("node at needle")
    }

    #[test]
    fn loop_expression_forms() {
        let full = parse_loop_expression("(item, idx) in items").unwrap();
        assert_eq!(full.alias, "item");
        assert_eq!(full.index.as_deref(), Some("idx"));
        assert_eq!(full.source, "items");

        let bare = parse_loop_expression("row of table.rows").unwrap();
        assert_eq!(bare.alias, "row");
        assert_eq!(bare.index, None);
        assert_eq!(bare.source, "table.rows");

        assert!(parse_loop_expression("not a loop").is_none());
    }

    #[test]
    fn alias_resolves_to_source_collection() {
        let text = "<ul><li v-for=\"(item, i) in orders\"><span>{{ item.total }}</span></li></ul>";
        let ast = parse(text);
        let span = locate_at(&ast, text, "{{ item.total }}");
        assert_eq!(resolve_source(&ast, span, "item"), "orders");
        assert_eq!(resolve_source(&ast, span, "i"), "orders");
        assert_eq!(resolve_source(&ast, span, "orders"), "orders");
        assert_eq!(resolve_source(&ast, span, "other"), "other");
    }

    #[test]
    fn classify_buckets_and_resolves_aliases() {
        let text = "<li v-for=\"entry in entries\" :class=\"entry.kind\" v-if=\"visible\">{{ entry.label }}</li>";
        let ast = parse(text);
        let li = locate_at(&ast, text, ":class");
        let vars = classify(&ast, li);

        assert_eq!(vars.content.len(), 1);
        assert_eq!(vars.content[0].variables, vec!["entries"]);
        assert_eq!(vars.content[0].expression, "entries.label");
        assert_eq!(vars.content[0].raw, "{{ entry.label }}");

        assert_eq!(vars.attributes.len(), 1);
        assert_eq!(vars.attributes[0].directive.as_deref(), Some(":class"));
        assert_eq!(vars.attributes[0].variables, vec!["entries"]);

        assert_eq!(vars.conditionals.len(), 1);
        assert_eq!(vars.conditionals[0].variables, vec!["visible"]);

        assert_eq!(vars.all, vec!["entries".to_string(), "visible".to_string()]);
    }

    #[test]
    fn nested_loop_aliases_resolve_transitively() {
        let text = "<div v-for=\"group in groups\"><p v-for=\"member in group.members\">{{ member.name }}</p></div>";
        let ast = parse(text);
        let p = locate_at(&ast, text, "{{ member.name }}");
        let vars = classify(&ast, p);
        assert_eq!(vars.all, vec!["groups"]);
    }

    #[test]
    fn static_markup_classifies_as_static() {
        let text = "<span class=\"label\">Label</span>";
        let ast = parse(text);
        let span = locate_at(&ast, text, "Label");
        let vars = classify(&ast, span);
        assert!(vars.is_static());
        assert!(vars.content.is_empty());
        assert!(vars.attributes.is_empty());
    }

    #[test]
    fn events_count_as_attribute_bindings() {
        let text = "<button @click=\"submitOrder(order)\">Go</button>";
        let ast = parse(text);
        let button = locate_at(&ast, text, "@click");
        let vars = classify(&ast, button);
        assert_eq!(vars.attributes.len(), 1);
        assert_eq!(
            vars.attributes[0].variables,
            vec!["submitOrder".to_string(), "order".to_string()]
        );
    }
}
