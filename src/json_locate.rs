//! Finds the JSON object inside a model completion.
//!
//! Completions often arrive wrapped in prose or markdown fences. Each `{`
//! is tried in order; the scanner tracks string literals so braces inside
//! quoted text do not affect depth. The text is only ever parsed as JSON
//! data, never evaluated.

use serde_json::{Map, Value};

/// Byte span of a balanced `{ ... }` starting at `start`.
fn balanced_object_end(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(start + offset + 1);
                }
            }
            _ => {}
        }
    }

    None
}

/// Every balanced object candidate, outermost first, in textual order.
pub fn object_candidates(text: &str) -> impl Iterator<Item = &str> {
    text.char_indices()
        .filter(|&(_, c)| c == '{')
        .filter_map(move |(start, _)| {
            balanced_object_end(text, start).map(|end| &text[start..end])
        })
}

/// Outcome of looking for an object in a completion.
#[derive(Debug, PartialEq)]
pub enum Located {
    Object(Map<String, Value>),
    /// Balanced braces were found but none held valid JSON.
    Unparseable { candidates: usize, error: String },
    NotFound,
}

/// Locate and strictly parse the first JSON object in `text`.
pub fn locate_object(text: &str) -> Located {
    let mut candidates = 0;
    let mut first_error = None;

    for candidate in object_candidates(text) {
        candidates += 1;
        match serde_json::from_str::<Value>(candidate) {
            Ok(Value::Object(map)) => return Located::Object(map),
            Ok(_) => {}
            Err(e) => {
                first_error.get_or_insert_with(|| e.to_string());
            }
        }
    }

    if candidates == 0 {
        Located::NotFound
    } else {
        Located::Unparseable {
            candidates,
            error: first_error.unwrap_or_else(|| "not a JSON object".to_string()),
        }
    }
}
