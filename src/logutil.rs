//! Log hygiene helpers.
//!
//! Player utterances and model replies are arbitrary text and routinely
//! contain newlines; anything we log must stay on one line so the log
//! remains grep-able.

/// Maximum characters of user/model text quoted in a log line.
const PREVIEW_LIMIT: usize = 120;

/// Flatten a string for single-line logging: control characters become
/// escapes, everything else passes through.
pub fn escape_log(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                use std::fmt::Write;
                let _ = write!(&mut out, "\\u{{{:04x}}}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// A short, single-line preview of arbitrary text, for debug logs that
/// quote what the player or the model said.
pub fn preview(text: &str) -> String {
    let escaped = escape_log(text.trim());
    if escaped.chars().count() <= PREVIEW_LIMIT {
        return escaped;
    }
    let mut out: String = escaped.chars().take(PREVIEW_LIMIT).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_control_characters() {
        assert_eq!(escape_log("a\nb\tc"), "a\\nb\\tc");
        assert_eq!(escape_log("back\\slash"), "back\\\\slash");
        assert_eq!(escape_log("bell\u{7}"), "bell\\u{0007}");
    }

    #[test]
    fn preview_truncates_long_text() {
        let long = "x".repeat(500);
        let p = preview(&long);
        assert_eq!(p.chars().count(), PREVIEW_LIMIT + 1);
        assert!(p.ends_with('…'));
    }

    #[test]
    fn preview_passes_short_text_through() {
        assert_eq!(preview("  go north  "), "go north");
    }
}
