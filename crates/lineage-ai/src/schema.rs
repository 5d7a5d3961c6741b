//! Structured-output parsing for collaborator responses. Models rarely
//! return bare JSON on the first try, so extraction is lenient: fenced
//! blocks are unwrapped and the outermost object is scanned out of
//! surrounding prose before strict schema validation.

use lineage_core::{AiAnalysis, LineageError, Result};

/// Parses a collaborator response against the analysis schema.
pub fn parse_analysis(content: &str) -> Result<AiAnalysis> {
    let candidate = extract_json(content)
        .ok_or_else(|| LineageError::LlmMalformedOutput("no JSON object in response".into()))?;
    serde_json::from_str(candidate).map_err(|e| LineageError::LlmMalformedOutput(e.to_string()))
}

/// The outermost JSON object embedded in `content`, if any. Handles
/// fenced code blocks and brace characters inside string literals.
fn extract_json(content: &str) -> Option<&str> {
    let trimmed = strip_fences(content.trim());
    let start = trimmed.find('{')?;
    let bytes = trimmed.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&trimmed[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

fn strip_fences(content: &str) -> &str {
    let Some(rest) = content.strip_prefix("```") else {
        return content;
    };
    // drop the info string on the fence line
    let body = rest.split_once('\n').map(|(_, b)| b).unwrap_or(rest);
    body.rsplit_once("```").map(|(b, _)| b).unwrap_or(body)
}

/// Follow-up request content for the single format-repair attempt. The
/// collaborator is asked to restate its previous answer as valid JSON
/// only; no new facts are permitted.
pub fn repair_prompt(previous: &str) -> String {
    format!(
        "Your previous response was not valid JSON matching the required schema. \
         Restate exactly the same analysis as a single valid JSON object with the fields \
         fullLinkTrace, dataSource, componentAnalysis, variableAnalysis, confidence and \
         suggestNextStep. Do not add, remove or change any facts. Previous response:\n\n{}",
        previous
    )
}
