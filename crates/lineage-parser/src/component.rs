//! Component file parsing: block extraction, dialect selection and the
//! request-scoped [`ParsedComponent`] handle.
//!
//! Dialect selection runs an explicit ordered list of strategies; the
//! first one that parses wins and its tag is recorded on the result.
//! Nothing downstream ever probes node shapes to rediscover the
//! dialect.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::position;
use crate::template::{self, locate, LocatePoint, NodeId, TemplateAst};
use lineage_core::{Dialect, LineageError, Result, SourcePosition};

static TEMPLATE_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<template(\s[^>]*)?>").expect("template open regex"));
static SCRIPT_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<script(\s[^>]*)?>").expect("script open regex"));
static VERSION_MAJOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)").expect("version regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptLang {
    Js,
    Ts,
}

#[derive(Debug, Clone)]
pub struct ScriptBlock {
    pub text: String,
    pub lang: ScriptLang,
    /// 1-based file line the script content starts on; 0 when the
    /// component has no script block.
    pub start_line: u32,
}

impl ScriptBlock {
    fn empty() -> Self {
        Self {
            text: String::new(),
            lang: ScriptLang::Js,
            start_line: 0,
        }
    }
}

/// A parsed component file. Immutable once created; owned by the
/// request-scoped parse cache.
#[derive(Debug, Clone)]
pub struct ParsedComponent {
    pub dialect: Dialect,
    pub ast: TemplateAst,
    /// Full original file text.
    pub source: String,
    pub script: ScriptBlock,
    /// 1-based file line the template content starts on.
    pub template_start_line: u32,
    /// Columns of common indentation the legacy generation strips.
    pub base_indent: u32,
}

impl ParsedComponent {
    /// Converts a file-space click into this dialect's coordinate
    /// system, clamping the column to the clicked line first.
    pub fn locate_point(&self, line: u32, column: u32) -> LocatePoint {
        let column = position::clamp_column(&self.source, line, column);
        match self.dialect {
            Dialect::Modern => LocatePoint::LineColumn { line, column },
            Dialect::Legacy => {
                let pos = position::to_template_position(
                    line,
                    column,
                    self.template_start_line,
                    self.base_indent,
                );
                LocatePoint::Offset(position::offset_at(self.ast.span_text(), pos))
            }
        }
    }

    /// Most specific element at a file-space position.
    pub fn locate(&self, line: u32, column: u32) -> Option<NodeId> {
        locate(&self.ast, self.locate_point(line, column))
    }

    /// File-space position of a node's opening tag, usable as the next
    /// click position when the walk hops into this component.
    pub fn node_file_position(&self, id: NodeId) -> SourcePosition {
        match &self.ast {
            TemplateAst::Modern(ast) => SourcePosition::new(
                ast.nodes[id].span.start_line,
                ast.nodes[id].span.start_column,
            ),
            TemplateAst::Legacy(_) => {
                let (start, _) = self.ast.byte_span(id);
                let (line, column) = position::position_of_offset(self.ast.span_text(), start);
                SourcePosition::new(
                    self.template_start_line + line - 1,
                    column + self.base_indent,
                )
            }
        }
    }
}

struct Blocks<'a> {
    template: &'a str,
    template_start: usize,
    script: Option<ScriptBlock>,
}

fn extract_blocks<'a>(source: &'a str, path: &str) -> Result<Blocks<'a>> {
    let open = TEMPLATE_OPEN
        .find(source)
        .ok_or_else(|| LineageError::UnparsableComponent(format!("{}: no template block", path)))?;
    let content_start = open.end();
    // nested <template> tags inside the block must balance
    let mut depth = 1usize;
    let mut cursor = content_start;
    let content_end = loop {
        let open_at = TEMPLATE_OPEN.find_at(source, cursor).map(|m| m.range());
        let close_at = source[cursor..].find("</template>").map(|i| cursor + i);
        match (open_at, close_at) {
            (Some(open_range), Some(close)) if open_range.start < close => {
                depth += 1;
                cursor = open_range.end;
            }
            (_, Some(close)) => {
                depth -= 1;
                if depth == 0 {
                    break close;
                }
                cursor = close + "</template>".len();
            }
            _ => {
                return Err(LineageError::UnparsableComponent(format!(
                    "{}: unterminated template block",
                    path
                )))
            }
        }
    };

    let script = SCRIPT_OPEN.find(source).and_then(|open| {
        let content_start = open.end();
        let end = source[content_start..]
            .find("</script>")
            .map(|i| content_start + i)?;
        let lang = if open.as_str().contains("lang=\"ts\"")
            || open.as_str().contains("lang='ts'")
            || open.as_str().contains("typescript")
        {
            ScriptLang::Ts
        } else {
            ScriptLang::Js
        };
        let (line, _) = position::position_of_offset(source, content_start);
        Some(ScriptBlock {
            text: source[content_start..end].to_string(),
            lang,
            start_line: line,
        })
    });

    Ok(Blocks {
        template: &source[content_start..content_end],
        template_start: content_start,
        script,
    })
}

/// Dialect order for a parse attempt: explicit override first, then the
/// project's declared framework major version, then modern-first.
pub fn dialect_order(override_dialect: Option<Dialect>, framework_major: Option<u8>) -> [Dialect; 2] {
    match (override_dialect, framework_major) {
        (Some(Dialect::Legacy), _) => [Dialect::Legacy, Dialect::Modern],
        (Some(Dialect::Modern), _) => [Dialect::Modern, Dialect::Legacy],
        (None, Some(major)) if major <= 2 => [Dialect::Legacy, Dialect::Modern],
        _ => [Dialect::Modern, Dialect::Legacy],
    }
}

/// Framework major version declared by the target project, if any.
pub fn detect_framework_major(project_root: &Path) -> Option<u8> {
    let text = std::fs::read_to_string(project_root.join("package.json")).ok()?;
    let json: serde_json::Value = serde_json::from_str(&text).ok()?;
    let version = json
        .get("dependencies")
        .and_then(|d| d.get("vue"))
        .or_else(|| json.get("devDependencies").and_then(|d| d.get("vue")))?
        .as_str()?;
    VERSION_MAJOR
        .captures(version)
        .and_then(|c| c[1].parse().ok())
}

/// Parses a component file, trying each dialect in `order` until one
/// succeeds. Exhausting the list yields `UnparsableComponent`.
pub fn parse_component(source: &str, path: &str, order: &[Dialect]) -> Result<ParsedComponent> {
    let blocks = extract_blocks(source, path)?;
    let (template_start_line, first_line_column) =
        position::position_of_offset(source, blocks.template_start);
    let base_indent = position::common_indent(blocks.template);

    let mut failures: Vec<String> = Vec::new();
    for &dialect in order {
        let attempt = match dialect {
            Dialect::Legacy => {
                let deindented = position::strip_indent(blocks.template, base_indent);
                template::legacy::parse(&deindented).map(TemplateAst::Legacy)
            }
            Dialect::Modern => template::modern::parse(
                blocks.template,
                template_start_line,
                first_line_column,
            )
            .map(TemplateAst::Modern),
        };
        match attempt {
            Ok(ast) => {
                tracing::debug!(path, %dialect, "parsed component");
                return Ok(ParsedComponent {
                    dialect,
                    ast,
                    source: source.to_string(),
                    script: blocks.script.clone().unwrap_or_else(ScriptBlock::empty),
                    template_start_line,
                    base_indent,
                });
            }
            Err(err) => failures.push(format!("{}: {}", dialect, err)),
        }
    }
    Err(LineageError::UnparsableComponent(format!(
        "{}: {}",
        path,
        failures.join("; ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPONENT: &str = "<template>\n  <div class=\"card\">\n    <span>{{ user.name }}</span>\n  </div>\n</template>\n\n<script>\nexport default {\n  props: ['user'],\n};\n</script>\n";

    #[test]
    fn splits_blocks_and_records_metadata() {
        let parsed =
            parse_component(COMPONENT, "Card.vue", &[Dialect::Modern, Dialect::Legacy]).unwrap();
        assert_eq!(parsed.dialect, Dialect::Modern);
        assert_eq!(parsed.template_start_line, 1);
        assert_eq!(parsed.base_indent, 2);
        assert!(parsed.script.text.contains("props: ['user']"));
        assert_eq!(parsed.script.lang, ScriptLang::Js);
        assert_eq!(parsed.script.start_line, 7);
    }

    #[test]
    fn modern_locate_finds_clicked_span() {
        let parsed =
            parse_component(COMPONENT, "Card.vue", &[Dialect::Modern, Dialect::Legacy]).unwrap();
        // click on "{{ user.name }}" (file line 3, inside the span)
        let id = parsed.locate(3, 12).expect("span located");
        assert_eq!(parsed.ast.tag(id), "span");
        let pos = parsed.node_file_position(id);
        assert_eq!(pos.line, 3);
    }

    #[test]
    fn legacy_locate_compensates_stripped_indent() {
        let parsed =
            parse_component(COMPONENT, "Card.vue", &[Dialect::Legacy, Dialect::Modern]).unwrap();
        assert_eq!(parsed.dialect, Dialect::Legacy);
        let id = parsed.locate(3, 12).expect("span located");
        assert_eq!(parsed.ast.tag(id), "span");
        // file position round-trips through the de-indented offsets
        let pos = parsed.node_file_position(id);
        assert_eq!(pos.line, 3);
        assert_eq!(pos.column, 4);
    }

    #[test]
    fn both_dialects_locate_the_same_tag() {
        for order in [[Dialect::Legacy, Dialect::Modern], [Dialect::Modern, Dialect::Legacy]] {
            let parsed = parse_component(COMPONENT, "Card.vue", &order).unwrap();
            let id = parsed.locate(2, 4).expect("div located");
            assert_eq!(parsed.ast.tag(id), "div");
        }
    }

    #[test]
    fn missing_template_is_unparsable() {
        let err = parse_component("<script>export default {}</script>", "X.vue", &[Dialect::Modern])
            .unwrap_err();
        assert!(matches!(err, LineageError::UnparsableComponent(_)));
    }

    #[test]
    fn broken_markup_exhausts_both_strategies() {
        let source = "<template>\n  <div><span></div>\n</template>";
        let err = parse_component(source, "Broken.vue", &[Dialect::Modern, Dialect::Legacy])
            .unwrap_err();
        match err {
            LineageError::UnparsableComponent(msg) => {
                assert!(msg.contains("modern"));
                assert!(msg.contains("legacy"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn dialect_order_prefers_override_then_version() {
        assert_eq!(
            dialect_order(Some(Dialect::Legacy), Some(3))[0],
            Dialect::Legacy
        );
        assert_eq!(dialect_order(None, Some(2))[0], Dialect::Legacy);
        assert_eq!(dialect_order(None, Some(3))[0], Dialect::Modern);
        assert_eq!(dialect_order(None, None)[0], Dialect::Modern);
    }

    #[test]
    fn framework_major_comes_from_package_manifest() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(detect_framework_major(dir.path()), None);

        std::fs::write(
            dir.path().join("package.json"),
            r#"{"dependencies": {"vue": "^2.6.14"}}"#,
        )
        .unwrap();
        assert_eq!(detect_framework_major(dir.path()), Some(2));

        std::fs::write(
            dir.path().join("package.json"),
            r#"{"devDependencies": {"vue": "3.4.0"}}"#,
        )
        .unwrap();
        assert_eq!(detect_framework_major(dir.path()), Some(3));
    }

    #[test]
    fn ts_script_blocks_are_tagged() {
        let source = "<template><p>{{ n }}</p></template>\n<script lang=\"ts\">\nconst n: number = 1;\nexport default { data: () => ({ n }) };\n</script>";
        let parsed = parse_component(source, "T.vue", &[Dialect::Modern]).unwrap();
        assert_eq!(parsed.script.lang, ScriptLang::Ts);
    }
}
