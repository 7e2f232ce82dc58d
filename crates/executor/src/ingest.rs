//! Newline-delimited payload parsing.

use docgate_core::{Document, DocumentKind, Error, Result, FROM_FIELD, KEY_FIELD, TO_FIELD};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// One non-blank payload line.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParsedLine<'a> {
    /// 1-based line number in the payload.
    pub line: usize,
    /// The line as received.
    pub raw: &'a str,
    pub document: Document,
}

/// A payload split into documents.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParsedPayload<'a> {
    pub lines: Vec<ParsedLine<'a>>,
    /// Blank or whitespace-only lines.
    pub empty: u64,
}

/// Parse every line of `payload` as a JSON object.
///
/// Parsing is all-or-nothing: the first bad line fails the whole payload.
pub(crate) fn parse_payload(payload: &str) -> Result<ParsedPayload<'_>> {
    let mut parsed = ParsedPayload {
        lines: Vec::new(),
        empty: 0,
    };
    for (idx, raw) in payload.lines().enumerate() {
        let line = idx + 1;
        // Blank lines are counted, never parsed, so "\n" alone is one empty line.
        if raw.trim().is_empty() {
            parsed.empty += 1;
            continue;
        }
        let parse_error = |reason: String| Error::Parse {
            reason,
            pos: line,
            source_json: payload.to_string(),
        };
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(document)) => parsed.lines.push(ParsedLine {
                line,
                raw,
                document,
            }),
            Ok(other) => {
                return Err(parse_error(format!(
                    "line {}: expected a JSON object, found {}",
                    line,
                    type_name(&other)
                )))
            }
            Err(e) => return Err(parse_error(format!("line {}: {}", line, e))),
        }
    }
    Ok(parsed)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// The copy of `document` sent to the backend.
///
/// Edges submitted without `_key` get one derived from `_from`/`_to`, so the
/// same edge submitted twice lands on the same key.
pub(crate) fn submission(kind: DocumentKind, document: &Document) -> Document {
    let mut copy = document.clone();
    if kind == DocumentKind::Edge && !copy.contains_key(KEY_FIELD) {
        let endpoints = (
            copy.get(FROM_FIELD).and_then(Value::as_str),
            copy.get(TO_FIELD).and_then(Value::as_str),
        );
        if let (Some(from), Some(to)) = endpoints {
            let key = edge_key(from, to);
            copy.insert(KEY_FIELD.to_string(), Value::String(key));
        }
    }
    copy
}

/// First 16 bytes of SHA-256 over `from` and `to`, hex encoded.
pub(crate) fn edge_key(from: &str, to: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(from.as_bytes());
    hasher.update([0u8]);
    hasher.update(to.as_bytes());
    hasher.finalize()[..16]
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
