//! Markup scanner shared by both dialect builders. Produces a raw node
//! tree with byte offsets relative to the text it was handed; the
//! dialect builders decide what those offsets mean.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("markup error at offset {offset}: {message}")]
pub struct MarkupError {
    pub message: String,
    pub offset: usize,
}

#[derive(Debug, Clone)]
pub struct RawAttr {
    pub name: String,
    pub value: Option<String>,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone)]
pub struct RawElement {
    pub tag: String,
    pub attrs: Vec<RawAttr>,
    pub children: Vec<RawNode>,
    pub start: usize,
    pub end: usize,
    pub self_closing: bool,
}

#[derive(Debug, Clone)]
pub struct RawText {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone)]
pub enum RawNode {
    Element(RawElement),
    Text(RawText),
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

struct Scanner<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

pub fn parse_markup(text: &str) -> Result<Vec<RawNode>, MarkupError> {
    let mut scanner = Scanner {
        text,
        bytes: text.as_bytes(),
        pos: 0,
    };
    let nodes = scanner.parse_children(None)?;
    if scanner.pos < scanner.bytes.len() {
        return Err(scanner.error("unexpected closing tag"));
    }
    Ok(nodes)
}

impl<'a> Scanner<'a> {
    fn error(&self, message: &str) -> MarkupError {
        MarkupError {
            message: message.to_string(),
            offset: self.pos,
        }
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn starts_with(&self, s: &str) -> bool {
        self.text[self.pos..].starts_with(s)
    }

    fn skip_until(&mut self, needle: &str) -> Result<(), MarkupError> {
        match self.text[self.pos..].find(needle) {
            Some(idx) => {
                self.pos += idx + needle.len();
                Ok(())
            }
            None => Err(self.error("unterminated construct")),
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(0), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    /// Parses sibling nodes until EOF or a closing tag. When
    /// `enclosing` is set, the matching close tag is consumed and
    /// checked; a mismatched close tag is an error.
    fn parse_children(&mut self, enclosing: Option<&str>) -> Result<Vec<RawNode>, MarkupError> {
        let mut nodes = Vec::new();
        loop {
            if self.pos >= self.bytes.len() {
                if let Some(tag) = enclosing {
                    return Err(self.error(&format!("unclosed <{}>", tag)));
                }
                return Ok(nodes);
            }
            if self.starts_with("</") {
                match enclosing {
                    Some(tag) => {
                        self.consume_close_tag(tag)?;
                        return Ok(nodes);
                    }
                    // Surfaced by the caller as "unexpected closing tag".
                    None => return Ok(nodes),
                }
            }
            if self.starts_with("<!--") {
                self.skip_until("-->")?;
                continue;
            }
            if self.starts_with("<!") {
                self.skip_until(">")?;
                continue;
            }
            if self.peek(0) == Some(b'<') && matches!(self.peek(1), Some(b) if b.is_ascii_alphabetic())
            {
                nodes.push(RawNode::Element(self.parse_element()?));
                continue;
            }
            if let Some(text) = self.parse_text() {
                nodes.push(RawNode::Text(text));
            }
        }
    }

    fn parse_text(&mut self) -> Option<RawText> {
        let start = self.pos;
        while self.pos < self.bytes.len() {
            if self.peek(0) == Some(b'<') && self.pos > start {
                break;
            }
            if self.peek(0) == Some(b'<') {
                // Lone '<' that did not begin a construct; treat as text.
                self.pos += 1;
                continue;
            }
            self.pos += 1;
        }
        let text = &self.text[start..self.pos];
        if text.trim().is_empty() {
            return None;
        }
        Some(RawText {
            text: text.to_string(),
            start,
            end: self.pos,
        })
    }

    fn parse_tag_name(&mut self) -> String {
        let start = self.pos;
        while matches!(
            self.peek(0),
            Some(b) if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b'.'
        ) {
            self.pos += 1;
        }
        self.text[start..self.pos].to_string()
    }

    fn consume_close_tag(&mut self, expected: &str) -> Result<(), MarkupError> {
        let at = self.pos;
        self.pos += 2; // "</"
        let name = self.parse_tag_name();
        self.skip_whitespace();
        if self.peek(0) != Some(b'>') {
            return Err(self.error("malformed closing tag"));
        }
        self.pos += 1;
        if !name.eq_ignore_ascii_case(expected) {
            self.pos = at;
            return Err(MarkupError {
                message: format!("expected </{}>, found </{}>", expected, name),
                offset: at,
            });
        }
        Ok(())
    }

    fn parse_element(&mut self) -> Result<RawElement, MarkupError> {
        let start = self.pos;
        self.pos += 1; // '<'
        let tag = self.parse_tag_name();
        let mut attrs = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek(0) {
                None => return Err(self.error("unterminated opening tag")),
                Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(b'/') if self.peek(1) == Some(b'>') => {
                    self.pos += 2;
                    return Ok(RawElement {
                        tag,
                        attrs,
                        children: Vec::new(),
                        start,
                        end: self.pos,
                        self_closing: true,
                    });
                }
                Some(_) => attrs.push(self.parse_attr()?),
            }
        }

        if VOID_ELEMENTS.contains(&tag.to_ascii_lowercase().as_str()) {
            return Ok(RawElement {
                tag,
                attrs,
                children: Vec::new(),
                start,
                end: self.pos,
                self_closing: true,
            });
        }

        let children = self.parse_children(Some(&tag))?;
        Ok(RawElement {
            tag,
            attrs,
            children,
            start,
            end: self.pos,
            self_closing: false,
        })
    }

    fn parse_attr(&mut self) -> Result<RawAttr, MarkupError> {
        let start = self.pos;
        while matches!(
            self.peek(0),
            Some(b) if !b.is_ascii_whitespace() && b != b'=' && b != b'>' && !(b == b'/' && self.peek(1) == Some(b'>'))
        ) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("malformed attribute"));
        }
        let name = self.text[start..self.pos].to_string();
        self.skip_whitespace();
        if self.peek(0) != Some(b'=') {
            return Ok(RawAttr {
                name,
                value: None,
                start,
                end: self.pos,
            });
        }
        self.pos += 1;
        self.skip_whitespace();
        let value = match self.peek(0) {
            Some(quote @ (b'"' | b'\'')) => {
                self.pos += 1;
                let value_start = self.pos;
                while self.peek(0) != Some(quote) {
                    if self.pos >= self.bytes.len() {
                        return Err(self.error("unterminated attribute value"));
                    }
                    self.pos += 1;
                }
                let value = self.text[value_start..self.pos].to_string();
                self.pos += 1;
                value
            }
            _ => {
                let value_start = self.pos;
                while matches!(
                    self.peek(0),
                    Some(b) if !b.is_ascii_whitespace() && b != b'>'
                ) {
                    self.pos += 1;
                }
                self.text[value_start..self.pos].to_string()
            }
        };
        Ok(RawAttr {
            name,
            value: Some(value),
            start,
            end: self.pos,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn only_element(nodes: &[RawNode]) -> &RawElement {
        match nodes.first().expect("one node") {
            RawNode::Element(el) => el,
            RawNode::Text(_) => panic!("expected element"),
        }
    }

    #[test]
    fn parses_nested_elements_with_spans() {
        let text = "<div class=\"row\">\n  <span>{{ user.name }}</span>\n</div>";
        let nodes = parse_markup(text).unwrap();
        let div = only_element(&nodes);
        assert_eq!(div.tag, "div");
        assert_eq!(div.start, 0);
        assert_eq!(div.end, text.len());
        assert_eq!(div.attrs[0].name, "class");
        assert_eq!(div.attrs[0].value.as_deref(), Some("row"));
        let span = match &div.children[0] {
            RawNode::Element(el) => el,
            _ => panic!("expected span element"),
        };
        assert_eq!(span.tag, "span");
        match &span.children[0] {
            RawNode::Text(t) => assert_eq!(t.text, "{{ user.name }}"),
            _ => panic!("expected text child"),
        }
    }

    #[test]
    fn handles_self_closing_and_void_elements() {
        let nodes = parse_markup("<div><img src=\"a.png\"><user-card :user=\"u\" /></div>").unwrap();
        let div = only_element(&nodes);
        assert_eq!(div.children.len(), 2);
        for child in &div.children {
            match child {
                RawNode::Element(el) => assert!(el.self_closing),
                _ => panic!("expected elements"),
            }
        }
    }

    #[test]
    fn directive_attributes_survive_quoting() {
        let nodes =
            parse_markup("<li v-for=\"(item, i) in items\" :key=\"item.id\" @click='pick(item)'>x</li>")
                .unwrap();
        let li = only_element(&nodes);
        let names: Vec<_> = li.attrs.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["v-for", ":key", "@click"]);
        assert_eq!(li.attrs[0].value.as_deref(), Some("(item, i) in items"));
    }

    #[test]
    fn comments_are_skipped() {
        let nodes = parse_markup("<div><!-- note --><p>x</p></div>").unwrap();
        let div = only_element(&nodes);
        assert_eq!(div.children.len(), 1);
    }

    #[test]
    fn mismatched_close_tag_is_an_error() {
        let err = parse_markup("<div><span>x</div>").unwrap_err();
        assert!(err.message.contains("expected </span>"));
    }

    #[test]
    fn unclosed_element_is_an_error() {
        assert!(parse_markup("<div><p>x</p>").is_err());
    }
}
