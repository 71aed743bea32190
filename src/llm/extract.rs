//! Defensive extraction of JSON from free-text model replies.
//!
//! Models wrap structured output in prose, markdown fences, or
//! "Here is the JSON you asked for:" preambles no matter how firmly the
//! prompt forbids it. These helpers scan the raw reply for the first
//! balanced JSON array or object and hand it to serde; anything that
//! fails to parse is simply not there. Callers treat `None` as
//! interpretation failure and fall back.

use serde_json::Value;

/// Extract the first balanced JSON array from arbitrary text.
pub fn extract_json_array(text: &str) -> Option<Value> {
    extract_balanced(text, '[', ']')
        .and_then(|s| serde_json::from_str::<Value>(&s).ok())
        .filter(Value::is_array)
}

/// Extract the first balanced JSON object from arbitrary text.
pub fn extract_json_object(text: &str) -> Option<Value> {
    extract_balanced(text, '{', '}')
        .and_then(|s| serde_json::from_str::<Value>(&s).ok())
        .filter(Value::is_object)
}

/// Scan for the first balanced `open`..`close` span, respecting JSON
/// string literals and escapes so braces inside strings don't confuse
/// the depth counter.
fn extract_balanced(text: &str, open: char, close: char) -> Option<String> {
    let start = text.find(open)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            c if c == open && !in_string => depth += 1,
            c if c == close && !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[start..start + offset + ch.len_utf8()].to_string());
                }
            }
            _ => {}
        }
    }
    None
}
