//! Identifier extraction from embedded template expressions.
//!
//! Template expressions are small JS fragments; a full parse is not
//! needed to lift their root identifiers. The scanner walks the text
//! once, skipping string/template literals, and excludes
//! member-expression property names and non-computed object-literal
//! keys, matching what the render pipeline treats as data references.

use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Render helpers the framework injects into compiled templates; never
/// traceable data.
static RENDER_HELPERS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "_vm", "_c", "_v", "_s", "_e", "_m", "_l", "_t", "$event", "$emit", "$set", "$refs",
        "$router", "$route", "$t", "$tc", "$nextTick", "$slots", "$attrs",
    ]
    .into_iter()
    .collect()
});

/// Language built-ins and keywords excluded from extraction.
static BUILTINS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "true", "false", "null", "undefined", "this", "arguments", "window", "document",
        "console", "Math", "JSON", "Object", "Array", "String", "Number", "Boolean", "Date",
        "RegExp", "Promise", "Map", "Set", "Symbol", "parseInt", "parseFloat", "isNaN", "NaN",
        "Infinity", "require", "module", "exports", "typeof", "instanceof", "in", "of", "new",
        "function", "return", "if", "else", "for", "while", "do", "switch", "case", "break",
        "continue", "var", "let", "const", "class", "extends", "super", "import", "export",
        "default", "try", "catch", "finally", "throw", "delete", "void", "yield", "async",
        "await", "static", "get", "set",
    ]
    .into_iter()
    .collect()
});

/// Whether a name may appear in a trace seed set.
pub fn is_traceable(name: &str) -> bool {
    !name.is_empty() && !RENDER_HELPERS.contains(name) && !BUILTINS.contains(name)
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_part(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Bracket {
    Brace { object_literal: bool },
    Paren,
    Square,
}

/// Extracts root identifiers from an expression, in first-occurrence
/// order, deduplicated and filtered through the traceability sets.
pub fn extract_identifiers(expression: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let chars: Vec<char> = expression.chars().collect();
    let mut i = 0usize;
    let mut stack: Vec<Bracket> = Vec::new();
    // open ternaries per nesting depth, so `cond ? a : b` does not
    // mistake `a` for an object key
    let mut ternary_depth: Vec<usize> = vec![0];
    // last token category, used to tell an object literal `{` from a
    // block/arrow body and a key from a ternary branch
    let mut prev_significant: Option<char> = None;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' | '"' => {
                i = skip_string(&chars, i, c);
                prev_significant = Some('\'');
                continue;
            }
            '`' => {
                // template literal: the `${}` holes are expressions
                i += 1;
                while i < chars.len() && chars[i] != '`' {
                    if chars[i] == '\\' {
                        i += 2;
                        continue;
                    }
                    if chars[i] == '$' && chars.get(i + 1) == Some(&'{') {
                        let (inner, next) = read_balanced(&chars, i + 2);
                        for name in extract_identifiers(&inner) {
                            push_unique(&mut out, name);
                        }
                        i = next;
                        continue;
                    }
                    i += 1;
                }
                i += 1;
                prev_significant = Some('\'');
                continue;
            }
            '{' => {
                let object_literal = !matches!(prev_significant, Some(')') | Some('>'));
                stack.push(Bracket::Brace { object_literal });
                ternary_depth.push(0);
                prev_significant = Some('{');
                i += 1;
                continue;
            }
            '}' => {
                if matches!(stack.last(), Some(Bracket::Brace { .. })) {
                    stack.pop();
                    ternary_depth.pop();
                }
                prev_significant = Some('}');
                i += 1;
                continue;
            }
            '(' => {
                stack.push(Bracket::Paren);
                prev_significant = Some('(');
                i += 1;
                continue;
            }
            ')' => {
                if matches!(stack.last(), Some(Bracket::Paren)) {
                    stack.pop();
                }
                prev_significant = Some(')');
                i += 1;
                continue;
            }
            '[' => {
                stack.push(Bracket::Square);
                prev_significant = Some('[');
                i += 1;
                continue;
            }
            ']' => {
                if matches!(stack.last(), Some(Bracket::Square)) {
                    stack.pop();
                }
                prev_significant = Some(']');
                i += 1;
                continue;
            }
            '?' => {
                // `?.` is optional chaining, not a ternary
                if chars.get(i + 1) != Some(&'.') {
                    if let Some(depth) = ternary_depth.last_mut() {
                        *depth += 1;
                    }
                }
                prev_significant = Some('?');
                i += 1;
                continue;
            }
            ':' => {
                if let Some(depth) = ternary_depth.last_mut() {
                    if *depth > 0 {
                        *depth -= 1;
                    }
                }
                prev_significant = Some(':');
                i += 1;
                continue;
            }
            _ => {}
        }

        if is_ident_start(c) {
            let start = i;
            while i < chars.len() && is_ident_part(chars[i]) {
                i += 1;
            }
            let name: String = chars[start..i].iter().collect();
            let after_dot = prev_significant == Some('.');
            let next = next_significant(&chars, i);
            let in_object = matches!(stack.last(), Some(Bracket::Brace { object_literal: true }));
            let ternary_open = ternary_depth.last().copied().unwrap_or(0) > 0;
            // non-computed object key: `{ key: ... }` outside a ternary
            let is_object_key = in_object && !ternary_open && next == Some(':');
            if !after_dot && !is_object_key && is_traceable(&name) {
                push_unique(&mut out, name);
            }
            prev_significant = Some('a');
            continue;
        }

        if !c.is_whitespace() {
            prev_significant = Some(c);
        }
        i += 1;
    }
    out
}

fn push_unique(out: &mut Vec<String>, name: String) {
    if !out.iter().any(|n| n == &name) {
        out.push(name);
    }
}

fn next_significant(chars: &[char], mut i: usize) -> Option<char> {
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    chars.get(i).copied()
}

fn skip_string(chars: &[char], mut i: usize, quote: char) -> usize {
    i += 1;
    while i < chars.len() {
        if chars[i] == '\\' {
            i += 2;
            continue;
        }
        if chars[i] == quote {
            return i + 1;
        }
        i += 1;
    }
    i
}

/// Reads a `${ ... }` hole starting just inside the brace; returns the
/// inner text and the index after the closing brace.
fn read_balanced(chars: &[char], start: usize) -> (String, usize) {
    let mut depth = 1usize;
    let mut i = start;
    while i < chars.len() {
        match chars[i] {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return (chars[start..i].iter().collect(), i + 1);
                }
            }
            _ => {}
        }
        i += 1;
    }
    (chars[start..].iter().collect(), i)
}
