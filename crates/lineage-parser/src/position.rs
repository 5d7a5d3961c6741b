//! Coordinate normalization between file space and template space.
//!
//! Click positions arrive as a 1-based line and 0-based column against
//! the component file. Legacy-dialect spans are byte offsets into the
//! template block after its common leading indentation has been
//! stripped, so translating a click means shifting lines by the
//! template start and columns by the stripped indentation. All
//! functions clamp rather than fail on out-of-range input.

/// Position inside the (possibly de-indented) template block.
/// 1-based line, 0-based column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplatePosition {
    pub line: u32,
    pub column: u32,
}

/// Returns the requested line of `source`, clamping the line number to
/// the file bounds. Lines are 1-based.
pub fn line_at(source: &str, line: u32) -> &str {
    let mut lines = source.lines();
    let count = source.lines().count().max(1);
    let idx = (line.max(1) as usize - 1).min(count - 1);
    lines.nth(idx).unwrap_or("")
}

/// Clamps a 0-based column to the last non-whitespace character of the
/// given line, never crossing a line boundary. An all-whitespace or
/// empty line clamps to column 0.
pub fn clamp_column(source: &str, line: u32, column: u32) -> u32 {
    let text = line_at(source, line);
    let last = match text.rfind(|c: char| !c.is_whitespace()) {
        Some(idx) => idx as u32,
        None => 0,
    };
    column.min(last)
}

/// Translates a file position into template space given the 1-based
/// file line on which the template content starts and the number of
/// leading columns stripped from every template line. Lines before the
/// template clamp to its first line.
pub fn to_template_position(
    line: u32,
    column: u32,
    template_start_line: u32,
    base_indent: u32,
) -> TemplatePosition {
    let template_line = line.saturating_sub(template_start_line).saturating_add(1).max(1);
    TemplatePosition {
        line: template_line,
        column: column.saturating_sub(base_indent),
    }
}

/// Byte offset of a template position within `text`, clamped to the
/// closest valid location. Columns are interpreted as byte columns,
/// clamped to the line length.
pub fn offset_at(text: &str, pos: TemplatePosition) -> usize {
    let mut offset = 0usize;
    let mut current = 1u32;
    for line in text.split_inclusive('\n') {
        if current == pos.line.max(1) {
            let content_len = line.trim_end_matches(['\n', '\r']).len();
            return offset + (pos.column as usize).min(content_len);
        }
        offset += line.len();
        current += 1;
    }
    text.len()
}

/// 1-based line and 0-based column of a byte offset, clamped to the
/// end of `text`.
pub fn position_of_offset(text: &str, offset: usize) -> (u32, u32) {
    let offset = offset.min(text.len());
    let mut line = 1u32;
    let mut line_start = 0usize;
    for (idx, byte) in text.bytes().enumerate() {
        if idx >= offset {
            break;
        }
        if byte == b'\n' {
            line += 1;
            line_start = idx + 1;
        }
    }
    (line, (offset - line_start) as u32)
}

/// Length of the common leading-whitespace prefix across all non-blank
/// lines, in bytes. This is the indentation a legacy-generation parser
/// strips before assigning offsets.
pub fn common_indent(text: &str) -> u32 {
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0) as u32
}

/// Removes `indent` leading bytes from every line (fewer when the line
/// is shorter), preserving line structure.
pub fn strip_indent(text: &str, indent: u32) -> String {
    let indent = indent as usize;
    text.split_inclusive('\n')
        .map(|line| {
            let content_len = line.trim_end_matches(['\n', '\r']).len();
            &line[indent.min(content_len)..]
        })
        .collect()
}
