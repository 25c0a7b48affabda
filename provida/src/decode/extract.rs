//! Locating the JSON payload inside a raw model response.

use std::sync::OnceLock;

use regex::Regex;

fn fenced_block() -> Option<&'static Regex> {
    static FENCED: OnceLock<Option<Regex>> = OnceLock::new();
    FENCED
        .get_or_init(|| Regex::new(r"(?s)```(?:json|JSON)?[ \t]*\r?\n?(.*?)```").ok())
        .as_ref()
}

/// Returns the part of `raw` most likely to be the JSON payload:
/// a fenced ```` ```json ```` block, else the first balanced object or array,
/// else the trimmed text from the first `{`/`[` on, else the whole trimmed text.
pub fn extract_json(raw: &str) -> &str {
    if let Some(inner) = fenced_block().and_then(|re| re.captures(raw)).and_then(|c| c.get(1)) {
        let inner = inner.as_str().trim();
        if !inner.is_empty() {
            return inner;
        }
    }
    let Some(start) = raw.find(['{', '[']) else {
        return raw.trim();
    };
    match balanced_end(&raw[start..]) {
        Some(len) => &raw[start..start + len],
        None => raw[start..].trim(),
    }
}

/// Byte length of the balanced value at the start of `text`, skipping brackets
/// inside string literals. `None` when the value never closes.
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + c.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}
